//! Lexer built on Logos.
//!
//! [`tokenize`] produces every token of a file, comments included, so that
//! token classification can answer questions about any column. The parser
//! consumes [`significant_tokens`], which drops comments and the inactive
//! branches of `#if`/`#else`/`#endif` regions.

use crate::error::{ParseError, ParseErrorKind};
use glint_core::Span;
use logos::{Lexer, Logos};
use std::fmt;

/// Token types produced by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'src> {
    // ===== Literals =====
    /// A floating point literal: `1.5`, `2e10`, `3.0e-2`.
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float(&'src str),

    /// An integer literal.
    #[regex(r"[0-9]+")]
    Int(&'src str),

    /// A single-line string literal. The slice includes the quotes.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String(&'src str),

    /// A string literal missing its closing quote before the end of the line.
    #[regex(r#""([^"\\\n]|\\.)*"#)]
    UnclosedString(&'src str),

    /// A character literal. The slice includes the quotes.
    #[regex(r"'([^'\\\n]|\\.)'")]
    Char(&'src str),

    /// A type variable such as `'a`.
    #[regex(r"'[a-zA-Z_][a-zA-Z0-9_]*")]
    TypeVar(&'src str),

    /// An identifier.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_']*")]
    Ident(&'src str),

    /// A hash directive such as `#r` or `#if`. The slice includes the hash.
    #[regex(r"#[a-zA-Z]+")]
    Directive(&'src str),

    // ===== Keywords =====
    /// `let`
    #[token("let")]
    Let,
    /// `rec`
    #[token("rec")]
    Rec,
    /// `in`
    #[token("in")]
    In,
    /// `fun`
    #[token("fun")]
    Fun,
    /// `if`
    #[token("if")]
    If,
    /// `then`
    #[token("then")]
    Then,
    /// `else`
    #[token("else")]
    Else,
    /// `open`
    #[token("open")]
    Open,
    /// `module`
    #[token("module")]
    Module,
    /// `type`
    #[token("type")]
    Type,
    /// `true`
    #[token("true")]
    True,
    /// `false`
    #[token("false")]
    False,
    /// `do`
    #[token("do")]
    Do,

    // ===== Operators =====
    // Longer tokens win over their prefixes.
    /// `->`
    #[token("->")]
    Arrow,
    /// `|>`
    #[token("|>")]
    PipeRight,
    /// `||`
    #[token("||")]
    OrOr,
    /// `&&`
    #[token("&&")]
    AndAnd,
    /// `<>`
    #[token("<>")]
    NotEq,
    /// `<=`
    #[token("<=")]
    LtEq,
    /// `>=`
    #[token(">=")]
    GtEq,
    /// `=`
    #[token("=")]
    Eq,
    /// `<`
    #[token("<")]
    Lt,
    /// `>`
    #[token(">")]
    Gt,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*`
    #[token("*")]
    Star,
    /// `/`
    #[token("/")]
    Slash,
    /// `%`
    #[token("%")]
    Percent,
    /// `^`
    #[token("^")]
    Caret,
    /// `|`
    #[token("|")]
    Bar,

    // ===== Punctuation =====
    /// `:`
    #[token(":")]
    Colon,
    /// `;`
    #[token(";")]
    Semicolon,
    /// `,`
    #[token(",")]
    Comma,
    /// `.`
    #[token(".")]
    Dot,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,

    // ===== Trivia =====
    /// A `//` comment. The slice includes the slashes.
    #[regex(r"//[^\n]*")]
    LineComment(&'src str),

    /// A possibly nested `(* ... *)` comment.
    #[token("(*", block_comment)]
    BlockComment,

    /// End of input (appended by [`significant_tokens`], not by Logos).
    Eof,

    /// Error token for unrecognized input.
    Error,
}

/// Consume the body of a block comment, honouring nesting.
///
/// Returns `false` (a lexer error) when the comment is not terminated; the
/// whole remainder of the input is consumed in that case.
fn block_comment<'src>(lex: &mut Lexer<'src, Token<'src>>) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'(', Some(b'*')) => {
                depth += 1;
                i += 2;
            }
            (b'*', Some(b')')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    lex.bump(i);
                    return true;
                }
            }
            _ => i += 1,
        }
    }
    lex.bump(rest.len());
    false
}

impl Token<'_> {
    /// Returns true for keywords.
    pub const fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Let
                | Self::Rec
                | Self::In
                | Self::Fun
                | Self::If
                | Self::Then
                | Self::Else
                | Self::Open
                | Self::Module
                | Self::Type
                | Self::True
                | Self::False
                | Self::Do
        )
    }

    /// Returns true for infix and prefix operators.
    pub const fn is_operator(&self) -> bool {
        matches!(
            self,
            Self::Arrow
                | Self::PipeRight
                | Self::OrOr
                | Self::AndAnd
                | Self::NotEq
                | Self::LtEq
                | Self::GtEq
                | Self::Eq
                | Self::Lt
                | Self::Gt
                | Self::Plus
                | Self::Minus
                | Self::Star
                | Self::Slash
                | Self::Percent
                | Self::Caret
                | Self::Bar
        )
    }

    /// Returns true for comments.
    pub const fn is_trivia(&self) -> bool {
        matches!(self, Self::LineComment(_) | Self::BlockComment)
    }

    /// Returns true if the token can begin an expression argument.
    pub const fn starts_atom(&self) -> bool {
        matches!(
            self,
            Self::Int(_)
                | Self::Float(_)
                | Self::String(_)
                | Self::UnclosedString(_)
                | Self::Char(_)
                | Self::Ident(_)
                | Self::True
                | Self::False
                | Self::LParen
                | Self::LBracket
                | Self::LBrace
        )
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(s)
            | Self::Int(s)
            | Self::String(s)
            | Self::UnclosedString(s)
            | Self::Char(s)
            | Self::TypeVar(s)
            | Self::Ident(s)
            | Self::Directive(s)
            | Self::LineComment(s) => write!(f, "{s}"),
            Self::Let => write!(f, "let"),
            Self::Rec => write!(f, "rec"),
            Self::In => write!(f, "in"),
            Self::Fun => write!(f, "fun"),
            Self::If => write!(f, "if"),
            Self::Then => write!(f, "then"),
            Self::Else => write!(f, "else"),
            Self::Open => write!(f, "open"),
            Self::Module => write!(f, "module"),
            Self::Type => write!(f, "type"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Do => write!(f, "do"),
            Self::Arrow => write!(f, "->"),
            Self::PipeRight => write!(f, "|>"),
            Self::OrOr => write!(f, "||"),
            Self::AndAnd => write!(f, "&&"),
            Self::NotEq => write!(f, "<>"),
            Self::LtEq => write!(f, "<="),
            Self::GtEq => write!(f, ">="),
            Self::Eq => write!(f, "="),
            Self::Lt => write!(f, "<"),
            Self::Gt => write!(f, ">"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::Caret => write!(f, "^"),
            Self::Bar => write!(f, "|"),
            Self::Colon => write!(f, ":"),
            Self::Semicolon => write!(f, ";"),
            Self::Comma => write!(f, ","),
            Self::Dot => write!(f, "."),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBracket => write!(f, "["),
            Self::RBracket => write!(f, "]"),
            Self::LBrace => write!(f, "{{"),
            Self::RBrace => write!(f, "}}"),
            Self::BlockComment => write!(f, "(* *)"),
            Self::Eof => write!(f, "end of file"),
            Self::Error => write!(f, "<error>"),
        }
    }
}

/// Tokenize source code into a vector of (Token, Span) pairs.
///
/// Comments are kept. Lexer errors become [`Token::Error`] tokens.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Span)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();
        tokens.push((result.unwrap_or(Token::Error), span));
    }
    tokens
}

/// A token as seen by the parser, with its layout information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaidToken<'src> {
    /// The token.
    pub token: Token<'src>,
    /// Byte span.
    pub span: Span,
    /// Zero-based character column of the token start.
    pub col: u32,
    /// The token is the first significant token on its line.
    pub line_start: bool,
}

/// The tokens the parser consumes, plus lexical errors.
///
/// Comments are dropped, the inactive branches of conditional regions are
/// removed according to `defines`, and a trailing [`Token::Eof`] is appended.
pub fn significant_tokens<'src>(
    source: &'src str,
    defines: &[String],
) -> (Vec<LaidToken<'src>>, Vec<ParseError>) {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    // One entry per open `#if`: whether the current branch is active.
    let mut regions: Vec<(bool, Span)> = Vec::new();
    let mut last_line_start = usize::MAX;

    let raw = tokenize(source);
    let mut i = 0;
    while i < raw.len() {
        let (token, span) = raw[i];
        i += 1;
        match token {
            Token::LineComment(_) | Token::BlockComment => continue,
            Token::Directive(name) if matches!(name, "#if" | "#else" | "#endif") => {
                let line_end = line_end(source, span.start);
                match name {
                    "#if" => {
                        let symbol = match raw.get(i) {
                            Some((Token::Ident(sym), s)) if s.start < line_end => {
                                i += 1;
                                Some(*sym)
                            }
                            _ => None,
                        };
                        let active = match symbol {
                            Some(sym) => defines.iter().any(|d| d == sym),
                            None => {
                                errors.push(ParseError::new(
                                    ParseErrorKind::InvalidDirective("#if".to_string()),
                                    span,
                                ).with_hint("write `#if SYMBOL`"));
                                false
                            }
                        };
                        regions.push((active, span));
                    }
                    "#else" => match regions.last_mut() {
                        Some((active, _)) => *active = !*active,
                        None => errors.push(ParseError::new(
                            ParseErrorKind::UnmatchedConditional("#else".to_string()),
                            span,
                        )),
                    },
                    _ => {
                        if regions.pop().is_none() {
                            errors.push(ParseError::new(
                                ParseErrorKind::UnmatchedConditional("#endif".to_string()),
                                span,
                            ));
                        }
                    }
                }
                // The rest of a conditional line is ignored.
                while raw.get(i).is_some_and(|(_, s)| s.start < line_end) {
                    i += 1;
                }
            }
            _ if regions.iter().all(|(active, _)| *active) => {
                match token {
                    Token::Error => {
                        errors.push(lex_error(source, span));
                        continue;
                    }
                    Token::UnclosedString(_) => {
                        errors.push(ParseError::new(ParseErrorKind::UnclosedString, span));
                    }
                    _ => {}
                }
                let start_of_line = source[..span.start].rfind('\n').map_or(0, |n| n + 1);
                let line_start = start_of_line != last_line_start;
                last_line_start = start_of_line;
                let col = source[start_of_line..span.start].chars().count() as u32;
                out.push(LaidToken {
                    token,
                    span,
                    col,
                    line_start,
                });
            }
            _ => {}
        }
    }

    for (_, span) in regions {
        errors.push(ParseError::new(
            ParseErrorKind::UnmatchedConditional("#if".to_string()),
            span,
        ).with_hint("add a matching `#endif`"));
    }

    out.push(LaidToken {
        token: Token::Eof,
        span: Span::empty(source.len()),
        col: 0,
        line_start: true,
    });
    (out, errors)
}

fn line_end(source: &str, from: usize) -> usize {
    source[from..].find('\n').map_or(source.len(), |n| from + n)
}

fn lex_error(source: &str, span: Span) -> ParseError {
    let text = span.text(source);
    if text.starts_with("(*") {
        ParseError::new(ParseErrorKind::UnterminatedComment, Span::new(span.start, span.start + 2))
            .with_hint("close the comment with `*)`")
    } else {
        let c = text.chars().next().unwrap_or('\0');
        ParseError::new(ParseErrorKind::UnexpectedChar(c), span)
    }
}

/// Strip the quotes of a string or char literal and resolve escapes.
pub fn unquote(raw: &str) -> String {
    let quote = raw.chars().next().unwrap_or('"');
    let body = raw.strip_prefix(quote).unwrap_or(raw);
    let body = body.strip_suffix(quote).unwrap_or(body);

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
