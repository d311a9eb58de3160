//! Host-level error type.
//!
//! Problems *in a script* are never Rust errors: they are collected as
//! [`Report`](crate::diagnostics::Report)s on the compilation result. [`AmongError`] covers what
//! the host itself can get wrong: reading files, converting primitives, constructing macros and
//! operators with invalid shapes, and faults raised by native macro code.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = AmongError> = std::result::Result<T, E>;

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Debug, Error)]
pub enum AmongError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("node path '{path}' does not point at an existing node")]
    InvalidPath { path: String },
    #[error("value '{value}' is not a number")]
    NotANumber { value: String },
    #[error("value '{value}' is not an integer")]
    NotAnInteger { value: String },
    #[error("value '{value}' cannot be parsed to boolean")]
    NotABoolean { value: String },
    #[error("expected {expected}, found {found}")]
    UnexpectedNode {
        expected: &'static str,
        found: String,
    },
    #[error("invalid macro '{name}': {reason}")]
    InvalidMacro { name: String, reason: String },
    #[error("invalid operator '{name}': {reason}")]
    InvalidOperator { name: String, reason: String },
    #[error("macro '{name}' failed: {reason}")]
    MacroFault { name: String, reason: String },
    #[error("provider failed to resolve '{path}': {reason}")]
    Provider { path: String, reason: String },
    #[error("compilation failed with {errors} error(s)")]
    CompileFailed { errors: usize },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl AmongError {
    /// Area of the crate the error belongs to; the middle segment of the diagnostic code.
    pub const fn area(&self) -> &'static str {
        match self {
            Self::Io { .. } | Self::Provider { .. } | Self::Config(_) => "host",
            Self::InvalidPath { .. }
            | Self::NotANumber { .. }
            | Self::NotAnInteger { .. }
            | Self::NotABoolean { .. }
            | Self::UnexpectedNode { .. } => "value",
            Self::InvalidMacro { .. } | Self::MacroFault { .. } => "macro",
            Self::InvalidOperator { .. } => "operator",
            Self::CompileFailed { .. } => "compile",
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::InvalidPath { .. } => "invalid_path",
            Self::NotANumber { .. } => "not_a_number",
            Self::NotAnInteger { .. } => "not_an_integer",
            Self::NotABoolean { .. } => "not_a_boolean",
            Self::UnexpectedNode { .. } => "unexpected_node",
            Self::InvalidMacro { .. } => "invalid_definition",
            Self::MacroFault { .. } => "fault",
            Self::InvalidOperator { .. } => "invalid_definition",
            Self::Provider { .. } => "provider",
            Self::CompileFailed { .. } => "failed",
            Self::Config(_) => "config",
        }
    }

    pub(crate) fn macro_fault(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MacroFault {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl Diagnostic for AmongError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "among::{}::{}",
            self.area(),
            self.code_suffix()
        )))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self {
            Self::CompileFailed { .. } => "run `among check` on the file to list every report",
            Self::MacroFault { .. } => {
                "native macros should report expected failures instead of erroring"
            }
            Self::Config(_) => "the configuration file is JSON, see `EngineConfig` for the keys",
            _ => return None,
        };
        Some(Box::new(help))
    }
}
