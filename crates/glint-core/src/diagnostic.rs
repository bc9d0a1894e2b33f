//! Located diagnostics produced by the parse and check stages.

use crate::{LineIndex, Range, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The program is invalid.
    Error,
    /// Suspicious but valid.
    Warning,
    /// Informational only.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message attached to a source range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Byte span in the analyzed text.
    pub span: Span,
    /// Line/column range of `span`.
    pub range: Range,
    /// Severity.
    pub severity: Severity,
    /// Stable code (e.g. `P0003`, `E0039`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic, computing its range from `index`.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        span: Span,
        index: &LineIndex,
    ) -> Self {
        Self {
            span,
            range: index.range_of(span),
            severity,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this diagnostic is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}[{}]: {}",
            self.range.start, self.severity, self.code, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn test_diagnostic_range() {
        let index = LineIndex::new("let a = 1\nlet b = c");
        let diag = Diagnostic::new(
            "E0039",
            Severity::Error,
            "The value or constructor 'c' is not defined.",
            Span::new(18, 19),
            &index,
        );
        assert_eq!(diag.range.start, Position::new(1, 8));
        assert_eq!(diag.range.end, Position::new(1, 9));
        assert!(diag.is_error());
        assert_eq!(
            diag.to_string(),
            "2:9 error[E0039]: The value or constructor 'c' is not defined."
        );
    }

    #[test]
    fn test_diagnostic_json() {
        let index = LineIndex::new("let x = y");
        let diag = Diagnostic::new(
            "W1182",
            Severity::Warning,
            "The value 'y' is unused",
            Span::new(8, 9),
            &index,
        );
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["code"], "W1182");
        assert_eq!(json["range"]["start"]["character"], 8);
        assert_eq!(json["span"]["end"], 9);

        let back: Diagnostic = serde_json::from_value(json).unwrap();
        assert_eq!(back, diag);
    }
}
