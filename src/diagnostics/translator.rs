//! glslang info-log translator
//!
//! Turns the free-form log printed by the validator into position-mapped
//! diagnostics against the document text that was validated.
//!
//! The log grammar is two fixed patterns:
//! - a diagnostic line: `SEVERITY: 0:LINE: MESSAGE`
//! - inside MESSAGE, an optional subject: `'IDENTIFIER' : REST`

use lsp_types::{Position, Range};
use regex::Regex;
use tracing::{debug, warn};

use crate::diagnostics::{DIAGNOSTIC_SOURCE, Diagnostic, Severity};

/// One diagnostic line of the validator log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity_token: String,
    pub severity: Severity,
    /// 1-indexed, as printed by the validator
    pub line_number: usize,
    pub message: String,
}

#[derive(Clone)]
pub struct DiagnosticTranslator {
    log_line_regex: Regex,
    identifier_regex: Regex,
}

impl DiagnosticTranslator {
    /// Create a translator with compiled regex patterns
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // ERROR: 0:5: 'foo' : undeclared identifier
            log_line_regex: Regex::new(
                r"^\s*(?P<severity>[^\s:]+): 0:(?P<line>\d+): (?P<message>.*)$",
            )?,

            // 'foo' : undeclared identifier
            identifier_regex: Regex::new(r"'(?P<identifier>[^']*)' : ")?,
        })
    }

    /// Parse a single log line; lines that are not diagnostics yield None
    pub fn parse_line(&self, line: &str) -> Option<LogEntry> {
        let captures = self.log_line_regex.captures(line)?;
        let severity_token = captures.name("severity")?.as_str();
        let line_number = captures.name("line")?.as_str().parse().ok()?;
        let message = captures.name("message")?.as_str().trim_matches(' ');

        Some(LogEntry {
            severity_token: severity_token.to_string(),
            severity: Severity::from_token(severity_token),
            line_number,
            message: message.to_string(),
        })
    }

    /// Translate a validator log into diagnostics, in log order.
    ///
    /// Entries pointing outside `source` are skipped.
    pub fn translate(&self, log: &str, source: &str) -> Vec<Diagnostic> {
        let source_lines: Vec<&str> = source
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let mut diagnostics = Vec::new();
        for log_line in log.lines() {
            let Some(entry) = self.parse_line(log_line) else {
                continue;
            };

            if entry.severity == Severity::Unknown {
                warn!("Unknown diagnostic severity '{}'", entry.severity_token);
            }

            let Some(line_index) = entry.line_number.checked_sub(1) else {
                warn!("Skipping diagnostic with line number 0: {}", log_line);
                continue;
            };

            let Some(source_line) = source_lines.get(line_index) else {
                warn!(
                    "Skipping diagnostic for line {} of a {}-line document: {}",
                    entry.line_number,
                    source_lines.len(),
                    log_line
                );
                continue;
            };

            let (start, end) = self.column_range(&entry.message, source_line);
            let line = line_index as u32;

            diagnostics.push(Diagnostic {
                range: Range::new(Position::new(line, start), Position::new(line, end)),
                severity: entry.severity,
                message: entry.message,
                source: DIAGNOSTIC_SOURCE.to_string(),
            });
        }

        debug!("Translated {} diagnostics", diagnostics.len());
        diagnostics
    }

    /// Column span of the message subject within the source line.
    ///
    /// Columns are UTF-16 code units. Without a locatable subject the whole
    /// line is covered.
    fn column_range(&self, message: &str, source_line: &str) -> (u32, u32) {
        let identifier = self
            .identifier_regex
            .captures(message)
            .and_then(|captures| captures.name("identifier"))
            .map(|m| m.as_str())
            .filter(|identifier| !identifier.is_empty());

        if let Some(identifier) = identifier {
            if let Some(byte_index) = source_line.find(identifier) {
                let start = utf16_len(&source_line[..byte_index]);
                let end = start + utf16_len(identifier) - 1;
                return (start, end);
            }
        }

        (0, utf16_len(source_line))
    }
}

impl Default for DiagnosticTranslator {
    fn default() -> Self {
        Self::new().expect("Failed to compile regex patterns")
    }
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}
