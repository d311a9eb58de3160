//! Structured compile reports.
//!
//! # Overview
//!
//! Compilation never aborts on a problem in the script. Every lexical, syntax, registration and
//! macro problem becomes a [`Report`] pushed into a [`ReportHandler`]. A compilation succeeds when
//! no report of kind [`ReportKind::Error`] was produced.
//!
//! # Handlers
//!
//! - [`ReportList`] collects reports in order.
//! - [`ReportAt`] wraps another handler and fills in a default position.
//! - [`Silent`] drops everything.
//!
//! # Rendering
//!
//! Reports only carry a code-point position. Pair them with the [`Source`] they came from to
//! render:
//!
//! - [`Report::render`] produces the plain `[line:col] message` form with a marked line snippet.
//! - [`Report::located`] produces a [`LocatedReport`], a `miette` diagnostic with a labelled span.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, Severity, SourceSpan};
use serde::Serialize;
use thiserror::Error;

use crate::syntax::source::{LineColumn, Source};

// ============================================================================
// REPORT
// ============================================================================

/// Severity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Info,
    Warn,
    Error,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Info => "info",
            ReportKind::Warn => "warning",
            ReportKind::Error => "error",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message with severity, optional code-point position, and hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub message: String,
    pub source_position: Option<usize>,
    pub hints: Vec<String>,
}

impl Report {
    pub fn new(
        kind: ReportKind,
        message: impl Into<String>,
        source_position: Option<usize>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source_position,
            hints: Vec::new(),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == ReportKind::Error
    }

    pub fn line_column(&self, source: &Source) -> Option<LineColumn> {
        self.source_position.map(|p| source.line_column(p))
    }

    /// Plain multi-line rendering:
    ///
    /// ```text
    /// [2:4] Expected value
    ///  2 |c: /* HERE >>> */}
    /// hint: ...
    /// ```
    pub fn render(&self, source: &Source) -> String {
        let mut out = String::new();
        match (self.source_position, self.line_column(source)) {
            (Some(position), Some(lc)) => {
                out.push_str(&format!("[{lc}] {}", self.message));
                out.push_str(&format!("\n {} |{}", lc.line, source.line_snippet(position)));
            }
            _ => out.push_str(&self.message),
        }
        for hint in &self.hints {
            out.push_str(&format!("\nhint: {hint}"));
        }
        out
    }

    /// Attaches the source so the report can be rendered by `miette`.
    pub fn located(&self, source: &Source, name: &str) -> LocatedReport {
        let span = self.source_position.map(|p| {
            let len = source.byte_len_at(p).max(1);
            SourceSpan::from((source.byte_offset(p), len))
        });
        LocatedReport {
            report: self.clone(),
            source_code: source.to_named_source(name),
            span,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Sink for reports. Positions are code-point offsets into the source being compiled.
pub trait ReportHandler {
    fn report(&mut self, kind: ReportKind, message: &str, position: Option<usize>, hints: &[&str]);

    fn error(&mut self, message: &str) {
        self.report(ReportKind::Error, message, None, &[]);
    }

    fn error_at(&mut self, message: &str, position: Option<usize>) {
        self.report(ReportKind::Error, message, position, &[]);
    }

    fn warn(&mut self, message: &str) {
        self.report(ReportKind::Warn, message, None, &[]);
    }

    fn warn_at(&mut self, message: &str, position: Option<usize>) {
        self.report(ReportKind::Warn, message, position, &[]);
    }

    fn info(&mut self, message: &str) {
        self.report(ReportKind::Info, message, None, &[]);
    }
}

/// Collects every report in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportList {
    reports: Vec<Report>,
}

impl ReportList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: Report) {
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn into_vec(self) -> Vec<Report> {
        self.reports
    }

    pub fn has_error(&self) -> bool {
        self.reports.iter().any(Report::is_error)
    }

    pub fn has_warning(&self) -> bool {
        self.reports.iter().any(|r| r.kind == ReportKind::Warn)
    }

    pub fn count(&self, kind: ReportKind) -> usize {
        self.reports.iter().filter(|r| r.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Report> {
        self.reports.iter()
    }
}

impl ReportHandler for ReportList {
    fn report(&mut self, kind: ReportKind, message: &str, position: Option<usize>, hints: &[&str]) {
        self.reports.push(Report {
            kind,
            message: message.to_string(),
            source_position: position,
            hints: hints.iter().map(|h| h.to_string()).collect(),
        });
    }
}

/// Forwards to another handler, substituting `position` when a report has none.
pub struct ReportAt<'a> {
    inner: &'a mut dyn ReportHandler,
    position: Option<usize>,
}

impl<'a> ReportAt<'a> {
    pub fn new(inner: &'a mut dyn ReportHandler, position: Option<usize>) -> Self {
        Self { inner, position }
    }
}

impl ReportHandler for ReportAt<'_> {
    fn report(&mut self, kind: ReportKind, message: &str, position: Option<usize>, hints: &[&str]) {
        self.inner.report(kind, message, position.or(self.position), hints);
    }
}

/// Drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ReportHandler for Silent {
    fn report(&mut self, _: ReportKind, _: &str, _: Option<usize>, _: &[&str]) {}
}

// ============================================================================
// MIETTE INTEGRATION
// ============================================================================

/// A report bound to its source, renderable with `miette::Report`.
#[derive(Debug, Error)]
#[error("{}", .report.message)]
pub struct LocatedReport {
    report: Report,
    source_code: Arc<NamedSource<String>>,
    span: Option<SourceSpan>,
}

impl LocatedReport {
    pub fn report(&self) -> &Report {
        &self.report
    }
}

impl Diagnostic for LocatedReport {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("among::report::{}", self.report.kind)))
    }

    fn severity(&self) -> Option<Severity> {
        Some(match self.report.kind {
            ReportKind::Info => Severity::Advice,
            ReportKind::Warn => Severity::Warning,
            ReportKind::Error => Severity::Error,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        if self.report.hints.is_empty() {
            None
        } else {
            Some(Box::new(self.report.hints.join("\n")))
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some("here".to_string()),
            span,
        ))))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_code)
    }
}
