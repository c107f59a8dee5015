//! Diagnostics produced from validator output
//!
//! [`Diagnostic`] is the server-side view of a problem report; it converts to
//! the `lsp-types` wire shape when published.

pub mod translator;

use lsp_types::{DiagnosticSeverity, Range};

pub use translator::DiagnosticTranslator;

/// Label identifying the validator in published diagnostics
pub const DIAGNOSTIC_SOURCE: &str = "glslang";

/// Severity as reported by the validator log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    /// Any token other than `ERROR` or `WARNING`
    Unknown,
}

impl Severity {
    pub fn from_token(token: &str) -> Self {
        match token {
            "ERROR" => Severity::Error,
            "WARNING" => Severity::Warning,
            _ => Severity::Unknown,
        }
    }

    /// Wire severity; unknown severities are left unset
    pub fn to_lsp(self) -> Option<DiagnosticSeverity> {
        match self {
            Severity::Error => Some(DiagnosticSeverity::ERROR),
            Severity::Warning => Some(DiagnosticSeverity::WARNING),
            Severity::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    pub source: String,
}

impl From<Diagnostic> for lsp_types::Diagnostic {
    fn from(diagnostic: Diagnostic) -> Self {
        lsp_types::Diagnostic::new(
            diagnostic.range,
            diagnostic.severity.to_lsp(),
            None,
            Some(diagnostic.source),
            diagnostic.message,
            None,
            None,
        )
    }
}
