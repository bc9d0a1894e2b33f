//! Parse error types.

use glint_core::{Diagnostic, LineIndex, Severity, Span};
use std::fmt;

/// A parse error with location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The span where the error occurred.
    pub span: Span,
    /// Optional context message.
    pub context: Option<String>,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl ParseError {
    /// Create a new parse error.
    #[must_use]
    pub const fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            context: None,
            hint: None,
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a hint for fixing this error.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Get a numeric code for the error kind.
    #[must_use]
    pub const fn kind_code(&self) -> u32 {
        match &self.kind {
            ParseErrorKind::UnexpectedChar(_) => 1,
            ParseErrorKind::UnexpectedEof => 2,
            ParseErrorKind::Expected(_) => 3,
            ParseErrorKind::ExpectedExpression => 4,
            ParseErrorKind::ExpectedMemberName => 5,
            ParseErrorKind::UnclosedDelimiter(_) => 6,
            ParseErrorKind::IncompleteLet => 7,
            ParseErrorKind::UnclosedString => 8,
            ParseErrorKind::InvalidNumber(_) => 9,
            ParseErrorKind::UnexpectedToken(_) => 10,
            ParseErrorKind::Offside => 11,
            ParseErrorKind::InvalidDirective(_) => 12,
            ParseErrorKind::UnterminatedComment => 13,
            ParseErrorKind::UnmatchedConditional(_) => 14,
            ParseErrorKind::InvalidPattern => 15,
        }
    }

    /// The diagnostic code, e.g. `P0004`.
    #[must_use]
    pub fn code(&self) -> String {
        format!("P{:04}", self.kind_code())
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{}", self.kind)
    }

    /// Get a short label for the error.
    #[must_use]
    pub const fn label(&self) -> &str {
        match &self.kind {
            ParseErrorKind::UnexpectedChar(_) => "unexpected character",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::Expected(_) => "expected different token",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedMemberName => "expected member name",
            ParseErrorKind::UnclosedDelimiter(_) => "unclosed delimiter",
            ParseErrorKind::IncompleteLet => "incomplete let",
            ParseErrorKind::UnclosedString => "unclosed string",
            ParseErrorKind::InvalidNumber(_) => "invalid number",
            ParseErrorKind::UnexpectedToken(_) => "unexpected token",
            ParseErrorKind::Offside => "indentation error",
            ParseErrorKind::InvalidDirective(_) => "invalid directive",
            ParseErrorKind::UnterminatedComment => "unterminated comment",
            ParseErrorKind::UnmatchedConditional(_) => "unmatched conditional",
            ParseErrorKind::InvalidPattern => "invalid pattern",
        }
    }

    /// Convert into a located diagnostic.
    #[must_use]
    pub fn to_diagnostic(&self, index: &LineIndex) -> Diagnostic {
        Diagnostic::new(self.code(), Severity::Error, self.to_string(), self.span, index)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Kinds of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected character in input.
    UnexpectedChar(char),
    /// Unexpected end of file.
    UnexpectedEof,
    /// Expected a specific token.
    Expected(String),
    /// An expression was required here.
    ExpectedExpression,
    /// A `.` was not followed by a member name.
    ExpectedMemberName,
    /// An opening delimiter was never closed.
    UnclosedDelimiter(char),
    /// A `let` ends its block without a body.
    IncompleteLet,
    /// Unclosed string literal.
    UnclosedString,
    /// Numeric literal out of range.
    InvalidNumber(String),
    /// A token that cannot appear here.
    UnexpectedToken(String),
    /// Possibly incorrect indentation.
    Offside,
    /// Malformed hash directive.
    InvalidDirective(String),
    /// Block comment without `*)`.
    UnterminatedComment,
    /// `#else`/`#endif` without `#if`, or `#if` without `#endif`.
    UnmatchedConditional(String),
    /// Not a valid binding pattern.
    InvalidPattern,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "syntax error: unexpected '{c}'"),
            Self::UnexpectedEof => write!(f, "unexpected end of file"),
            Self::Expected(what) => write!(f, "expected {what}"),
            Self::ExpectedExpression => write!(f, "expected an expression"),
            Self::ExpectedMemberName => write!(f, "expected a member name after '.'"),
            Self::UnclosedDelimiter(c) => write!(f, "unclosed delimiter '{c}'"),
            Self::IncompleteLet => {
                write!(f, "the block following this 'let' is unfinished")
            }
            Self::UnclosedString => write!(f, "unclosed string literal"),
            Self::InvalidNumber(s) => write!(f, "invalid number '{s}'"),
            Self::UnexpectedToken(s) => write!(f, "unexpected '{s}'"),
            Self::Offside => write!(f, "possible incorrect indentation"),
            Self::InvalidDirective(s) => write!(f, "invalid directive '{s}'"),
            Self::UnterminatedComment => write!(f, "unterminated block comment"),
            Self::UnmatchedConditional(s) => write!(f, "unmatched '{s}'"),
            Self::InvalidPattern => write!(f, "invalid pattern"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_with_context_and_hint() {
        let err = ParseError::new(ParseErrorKind::ExpectedExpression, Span::new(3, 4))
            .with_context("in let binding")
            .with_hint("add a value after '='");
        assert_eq!(err.to_string(), "expected an expression (in let binding)");
        assert_eq!(err.hint.as_deref(), Some("add a value after '='"));
    }

    #[test]
    fn test_codes_are_padded() {
        let err = ParseError::new(ParseErrorKind::ExpectedMemberName, Span::new(0, 1));
        assert_eq!(err.code(), "P0005");
        assert_eq!(err.label(), "expected member name");
    }

    #[test]
    fn test_kind_codes_are_unique() {
        let kinds = [
            ParseErrorKind::UnexpectedChar('x'),
            ParseErrorKind::UnexpectedEof,
            ParseErrorKind::Expected("')'".to_string()),
            ParseErrorKind::ExpectedExpression,
            ParseErrorKind::ExpectedMemberName,
            ParseErrorKind::UnclosedDelimiter('('),
            ParseErrorKind::IncompleteLet,
            ParseErrorKind::UnclosedString,
            ParseErrorKind::InvalidNumber("99999999999999999999".to_string()),
            ParseErrorKind::UnexpectedToken(")".to_string()),
            ParseErrorKind::Offside,
            ParseErrorKind::InvalidDirective("#r".to_string()),
            ParseErrorKind::UnterminatedComment,
            ParseErrorKind::UnmatchedConditional("#endif".to_string()),
            ParseErrorKind::InvalidPattern,
        ];
        let mut codes: Vec<u32> = kinds
            .into_iter()
            .map(|k| ParseError::new(k, Span::default()).kind_code())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes, (1..=15).collect::<Vec<_>>());
    }

    #[test]
    fn test_to_diagnostic() {
        let index = LineIndex::new("let x =\n");
        let err = ParseError::new(ParseErrorKind::ExpectedExpression, Span::new(7, 8));
        let diag = err.to_diagnostic(&index);
        assert_eq!(diag.code, "P0004");
        assert!(diag.is_error());
        assert_eq!(diag.range.start.character, 7);
    }
}
