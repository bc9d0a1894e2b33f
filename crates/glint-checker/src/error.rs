//! Checker error codes.

use glint_core::{Diagnostic, LineIndex, Severity, Span};
use thiserror::Error;

/// Type-check error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // === Errors ===
    /// E0001: The expression does not have the expected type.
    TypeMismatch,
    /// E0003: A value that is not a function was applied.
    NotAFunction,
    /// E0039: A value, member, namespace or type is not defined.
    NotDefined,
    /// E0041: No overload accepts the given arguments.
    NoOverloadMatch,
    /// E0072: Member lookup on a value whose type is not yet known.
    IndeterminateLookup,
    /// E0084: A referenced library could not be found.
    UnresolvedReference,

    // === Warnings ===
    /// W0020: The result of an expression is discarded.
    IgnoredResult,
    /// W0064: A top-level binding hides an earlier one.
    ShadowedBinding,
    /// W1182: A local binding is never used.
    UnusedBinding,
    /// W3353: A directive was recorded but had no effect.
    DirectiveNotApplied,
}

impl ErrorCode {
    /// Get the error code string (e.g., "E0039").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TypeMismatch => "E0001",
            Self::NotAFunction => "E0003",
            Self::NotDefined => "E0039",
            Self::NoOverloadMatch => "E0041",
            Self::IndeterminateLookup => "E0072",
            Self::UnresolvedReference => "E0084",
            Self::IgnoredResult => "W0020",
            Self::ShadowedBinding => "W0064",
            Self::UnusedBinding => "W1182",
            Self::DirectiveNotApplied => "W3353",
        }
    }

    /// Check if this is a warning (not an error).
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::IgnoredResult
                | Self::ShadowedBinding
                | Self::UnusedBinding
                | Self::DirectiveNotApplied
        )
    }

    /// Get the severity level.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        if self.is_warning() {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A type-check error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct TypeError {
    /// Error code.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
    /// Location in the checked text.
    pub span: Span,
}

impl TypeError {
    /// Create a new type error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    /// Locate the error, with the severity the context assigns.
    pub(crate) fn to_diagnostic(&self, severity: Severity, index: &LineIndex) -> Diagnostic {
        Diagnostic::new(self.code.code(), severity, &self.message, self.span, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_severity() {
        assert_eq!(ErrorCode::NotDefined.code(), "E0039");
        assert_eq!(ErrorCode::UnusedBinding.to_string(), "W1182");
        assert_eq!(ErrorCode::TypeMismatch.severity(), Severity::Error);
        assert_eq!(ErrorCode::IgnoredResult.severity(), Severity::Warning);
    }

    #[test]
    fn test_display() {
        let err = TypeError::new(
            ErrorCode::NotDefined,
            "The value 'x' is not defined",
            Span::new(0, 1),
        );
        assert_eq!(err.to_string(), "[E0039] The value 'x' is not defined");
    }
}
