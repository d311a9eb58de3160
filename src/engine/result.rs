//! Outcomes of compiling a source and of resolving an import path.

use crate::ast::AmongRoot;
use crate::definition::{AmongDefinition, RootAndDefinition};
use crate::diagnostics::{LocatedReport, ReportKind, ReportList};
use crate::errors::{AmongError, Result};
use crate::syntax::Source;

/// A compiled source: the values, the definitions it exports, and everything reported on the way.
///
/// The root and definition are available even when compilation failed; they hold whatever could
/// be recovered.
#[derive(Debug, Clone)]
pub struct CompileResult {
    source: Source,
    root: AmongRoot,
    definition: AmongDefinition,
    reports: ReportList,
}

impl CompileResult {
    pub fn new(
        source: Source,
        root: AmongRoot,
        definition: AmongDefinition,
        reports: ReportList,
    ) -> Self {
        Self {
            source,
            root,
            definition,
            reports,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn root(&self) -> &AmongRoot {
        &self.root
    }

    pub fn definition(&self) -> &AmongDefinition {
        &self.definition
    }

    pub fn reports(&self) -> &ReportList {
        &self.reports
    }

    pub fn root_and_definition(&self) -> RootAndDefinition {
        RootAndDefinition::new(self.root.clone(), self.definition.clone())
    }

    pub fn into_root_and_definition(self) -> RootAndDefinition {
        RootAndDefinition::new(self.root, self.definition)
    }

    pub fn is_success(&self) -> bool {
        !self.has_error()
    }

    pub fn has_error(&self) -> bool {
        self.reports.has_error()
    }

    pub fn has_warning(&self) -> bool {
        self.reports.has_warning()
    }

    pub fn expect_success(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(AmongError::CompileFailed {
                errors: self.reports.count(ReportKind::Error),
            })
        }
    }

    /// Reports bound to the source, for rendering with `miette`.
    pub fn located_reports(&self, name: &str) -> Vec<LocatedReport> {
        self.reports
            .iter()
            .map(|report| report.located(&self.source, name))
            .collect()
    }

    /// Plain-text rendering of every report, one block per report.
    pub fn render_reports(&self, name: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(name) = name {
            out.push_str(&format!("Compilation report for '{name}':\n"));
        }
        for (i, report) in self.reports.iter().enumerate() {
            if i != 0 {
                out.push('\n');
            }
            out.push_str(&format!("{}: {}", report.kind, report.render(&self.source)));
        }
        out
    }
}

/// What resolving an import path produced.
#[derive(Debug, Clone)]
pub enum ReadResult {
    /// Supplied by an instance provider.
    Provided { path: String, value: RootAndDefinition },
    /// Compiled from a source provider's text; successful or not.
    Compiled { path: String, result: CompileResult },
    /// Nothing could be resolved; the reason has been reported.
    Failure { path: String },
}

impl ReadResult {
    pub fn path(&self) -> &str {
        match self {
            ReadResult::Provided { path, .. }
            | ReadResult::Compiled { path, .. }
            | ReadResult::Failure { path } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            ReadResult::Provided { .. } => true,
            ReadResult::Compiled { result, .. } => result.is_success(),
            ReadResult::Failure { .. } => false,
        }
    }

    pub fn root(&self) -> Option<&AmongRoot> {
        match self {
            ReadResult::Provided { value, .. } => Some(&value.root),
            ReadResult::Compiled { result, .. } => Some(result.root()),
            ReadResult::Failure { .. } => None,
        }
    }

    pub fn definition(&self) -> Option<&AmongDefinition> {
        match self {
            ReadResult::Provided { value, .. } => Some(&value.definition),
            ReadResult::Compiled { result, .. } => Some(result.definition()),
            ReadResult::Failure { .. } => None,
        }
    }

    pub fn compile_result(&self) -> Option<&CompileResult> {
        match self {
            ReadResult::Compiled { result, .. } => Some(result),
            _ => None,
        }
    }
}
