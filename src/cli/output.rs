//! Everything the CLI prints.
//!
//! Reports go to stderr through `miette`; results go to stdout.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::definition::AmongDefinition;
use crate::engine::CompileResult;

/// Renders each report of `result` with `miette`.
pub fn print_reports(result: &CompileResult, name: &str) {
    for located in result.located_reports(name) {
        eprintln!("{:?}", miette::Report::new(located));
    }
}

/// Prints a host error, such as an unreadable file.
pub fn print_error(error: crate::errors::AmongError) {
    eprintln!("{:?}", miette::Report::new(error));
}

/// Totals of a `check` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub files: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckSummary {
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

pub fn print_summary(summary: &CheckSummary) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let color = if summary.errors > 0 {
        Color::Red
    } else if summary.warnings > 0 {
        Color::Yellow
    } else {
        Color::Green
    };
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stderr, "checked {} file(s)", summary.files);
    let _ = stderr.reset();
    let _ = writeln!(
        stderr,
        ": {} error(s), {} warning(s)",
        summary.errors, summary.warnings
    );
}

/// Lists operators, then macro signatures with their parameters.
pub fn print_definition(definition: &AmongDefinition) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    print_heading(&mut stdout, "operators");
    for operator in definition.operators.all_operators() {
        let _ = writeln!(stdout, "  {operator}");
    }
    print_heading(&mut stdout, "macros");
    for m in definition.macros.all_macros() {
        let _ = writeln!(stdout, "  {}", m.signature_and_parameters(true));
    }
}

fn print_heading(stdout: &mut StandardStream, title: &str) {
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "{title}");
    let _ = stdout.reset();
}
