//! Token classification at a source position.

use crate::lexer::{tokenize, Token};
use glint_core::{LineIndex, Position, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lexical category of the token at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// An identifier or type variable.
    Identifier,
    /// A keyword, including `true` and `false`.
    Keyword,
    /// A string literal.
    String,
    /// A numeric literal.
    Number,
    /// A character literal.
    Char,
    /// An operator.
    Operator,
    /// Delimiters and separators.
    Punctuation,
    /// A hash directive name.
    Directive,
    /// A comment.
    Comment,
    /// Between tokens.
    Whitespace,
    /// Input the lexer could not recognize.
    Unknown,
}

impl TokenKind {
    fn of(token: &Token<'_>) -> Self {
        match token {
            Token::Ident(_) | Token::TypeVar(_) => Self::Identifier,
            Token::String(_) | Token::UnclosedString(_) => Self::String,
            Token::Int(_) | Token::Float(_) => Self::Number,
            Token::Char(_) => Self::Char,
            Token::Directive(_) => Self::Directive,
            Token::LineComment(_) | Token::BlockComment => Self::Comment,
            Token::Error => Self::Unknown,
            Token::Eof => Self::Whitespace,
            t if t.is_keyword() => Self::Keyword,
            t if t.is_operator() => Self::Operator,
            _ => Self::Punctuation,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identifier => "identifier",
            Self::Keyword => "keyword",
            Self::String => "string",
            Self::Number => "number",
            Self::Char => "char",
            Self::Operator => "operator",
            Self::Punctuation => "punctuation",
            Self::Directive => "directive",
            Self::Comment => "comment",
            Self::Whitespace => "whitespace",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// The token covering `offset` and its span.
///
/// A token covers the offsets from its start up to and including its end, so
/// a cursor placed right after an identifier still addresses it. When two
/// tokens are adjacent the one starting at `offset` wins.
pub fn token_at(source: &str, offset: usize) -> Option<(TokenKind, Span)> {
    let tokens = tokenize(source);
    let inside = tokens
        .iter()
        .find(|(_, span)| span.start <= offset && offset < span.end);
    let after = || tokens.iter().find(|(_, span)| span.end == offset);
    inside
        .or_else(after)
        .map(|(token, span)| (TokenKind::of(token), *span))
}

/// Classify the token at a byte offset.
pub fn classify(source: &str, offset: usize) -> TokenKind {
    token_at(source, offset).map_or(TokenKind::Whitespace, |(kind, _)| kind)
}

/// Classify the token at a line/column position.
pub fn classify_at(index: &LineIndex, pos: Position) -> TokenKind {
    match index.offset_of(pos) {
        Some(offset) => classify(index.text(), offset),
        None => TokenKind::Whitespace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_inside_and_after() {
        let src = "let msg = \"hi\" // note";
        assert_eq!(classify(src, 0), TokenKind::Keyword);
        assert_eq!(classify(src, 5), TokenKind::Identifier);
        // Right after `msg`.
        assert_eq!(classify(src, 7), TokenKind::Identifier);
        assert_eq!(classify(src, 8), TokenKind::Operator);
        assert_eq!(classify(src, 11), TokenKind::String);
        assert_eq!(classify(src, 17), TokenKind::Comment);
    }

    #[test]
    fn test_classify_whitespace_and_unknown() {
        assert_eq!(classify("a   b", 2), TokenKind::Whitespace);
        assert_eq!(classify("", 0), TokenKind::Whitespace);
        assert_eq!(classify("x @ y", 2), TokenKind::Unknown);
    }

    #[test]
    fn test_classify_member_dot() {
        let src = "msg.";
        assert_eq!(classify(src, 4), TokenKind::Punctuation);
    }

    #[test]
    fn test_classify_at_position() {
        let index = LineIndex::new("#r \"System.IO\"\nlet x = 1");
        assert_eq!(classify_at(&index, Position::new(0, 1)), TokenKind::Directive);
        assert_eq!(classify_at(&index, Position::new(0, 6)), TokenKind::String);
        assert_eq!(classify_at(&index, Position::new(1, 4)), TokenKind::Identifier);
        assert_eq!(classify_at(&index, Position::new(7, 0)), TokenKind::Whitespace);
    }
}
