//! The `among` command-line interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use walkdir::WalkDir;

use crate::diagnostics::ReportKind;
use crate::engine::{AmongEngine, CompileResult, EngineConfig, FileSourceProvider};
use crate::errors::{AmongError, Result};
use crate::syntax::Source;

pub mod args;
pub mod output;

use args::{AmongArgs, Command, CompileOptions};
use output::CheckSummary;

/// Parses the process arguments and runs the command.
pub fn run() -> ExitCode {
    let args = AmongArgs::parse();
    let outcome = load_config(&args.options).and_then(|config| match &args.command {
        Command::Check { paths } => check(paths, &config),
        Command::Ast { file, compact } => ast(file, *compact, &config),
        Command::Macros { file } => macros(file, &config),
    });
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            output::print_error(err);
            ExitCode::from(2)
        }
    }
}

pub fn load_config(options: &CompileOptions) -> Result<EngineConfig> {
    let mut config = match &options.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if options.allow_duplicate_properties {
        config.allow_duplicate_object_property = true;
    }
    if options.allow_invalid_operators {
        config.allow_invalid_operator_registration = true;
    }
    Ok(config)
}

/// Compiles `file`, resolving `use` statements against the file's directory.
pub fn compile_file(file: &Path, config: &EngineConfig) -> Result<CompileResult> {
    let text = fs::read_to_string(file).map_err(|source| AmongError::Io {
        path: file.display().to_string(),
        source,
    })?;
    let root = file.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut engine = AmongEngine::with_config(config.clone());
    engine.add_source_provider(FileSourceProvider::new(root));
    debug!(file = %file.display(), "compiling");
    Ok(engine.read(Source::of(&text)))
}

/// Every `.among` file under `paths`, in a stable order. Files given directly are kept as is.
pub fn collect_sources(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|p| p.extension().is_some_and(|e| e == FileSourceProvider::EXTENSION))
            .collect();
        found.sort();
        files.extend(found);
    }
    files
}

fn check(paths: &[PathBuf], config: &EngineConfig) -> Result<bool> {
    let mut summary = CheckSummary::default();
    for file in collect_sources(paths) {
        let result = compile_file(&file, config)?;
        output::print_reports(&result, &file.display().to_string());
        summary.files += 1;
        summary.errors += result.reports().count(ReportKind::Error);
        summary.warnings += result.reports().count(ReportKind::Warn);
    }
    output::print_summary(&summary);
    Ok(summary.is_success())
}

fn ast(file: &Path, compact: bool, config: &EngineConfig) -> Result<bool> {
    let result = compile_file(file, config)?;
    output::print_reports(&result, &file.display().to_string());
    let json = if compact {
        serde_json::to_string(result.root())?
    } else {
        serde_json::to_string_pretty(result.root())?
    };
    println!("{json}");
    Ok(result.is_success())
}

fn macros(file: &Path, config: &EngineConfig) -> Result<bool> {
    let result = compile_file(file, config)?;
    output::print_reports(&result, &file.display().to_string());
    output::print_definition(result.definition());
    Ok(result.is_success())
}
