//! Error-tolerant recursive-descent parser.
//!
//! Layout is "offside-light": every construct remembers the column its
//! continuation lines must exceed (`offside`). A token that starts a line at
//! or left of that column ends the construct, except for continuation tokens
//! (`then`, `else`, infix operators) which may sit exactly on it.
//!
//! The parser never fails. Missing pieces become error nodes, and recovery at
//! declaration level skips to the next token that starts a line at or left of
//! the declaration column.

mod expr;
mod pattern;

use crate::ast::{Decl, DeclKind, Directive, FieldDecl, Ident, LongIdent, TypeRepr};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{unquote, LaidToken, Token};
use glint_core::{SourceKind, Span};

/// Output of a parser run before it is wrapped into a tree.
pub(crate) struct Parsed {
    pub header: Option<LongIdent>,
    pub decls: Vec<Decl>,
    pub errors: Vec<ParseError>,
}

pub(crate) struct Parser<'src> {
    tokens: Vec<LaidToken<'src>>,
    pos: usize,
    /// Column continuation lines must exceed.
    offside: u32,
    /// Index of the token starting the current statement; it may sit on the
    /// offside column.
    anchor: usize,
    /// Open `(`, `[` and `{` around the current position.
    nesting: u32,
    kind: SourceKind,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(
        tokens: Vec<LaidToken<'src>>,
        errors: Vec<ParseError>,
        kind: SourceKind,
    ) -> Self {
        debug_assert!(tokens.last().is_some_and(|t| t.token == Token::Eof));
        Self {
            tokens,
            pos: 0,
            offside: 0,
            anchor: usize::MAX,
            nesting: 0,
            kind,
            errors,
        }
    }

    pub(crate) fn parse_file(mut self) -> Parsed {
        let header = self.parse_header();
        let col = self.current().col;
        let decls = self.parse_decls(col);
        let mut errors = self.errors;
        errors.sort_by_key(|e| (e.span.start, e.span.end));
        Parsed {
            header,
            decls,
            errors,
        }
    }

    // ===== Token cursor =====

    fn current(&self) -> &LaidToken<'src> {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> Token<'src> {
        self.current().token
    }

    fn nth(&self, n: usize) -> Token<'src> {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)].token
    }

    fn at(&self, token: Token<'_>) -> bool {
        self.peek() == token
    }

    fn bump(&mut self) -> LaidToken<'src> {
        let tok = *self.current();
        if tok.token != Token::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: Token<'_>) -> Option<Span> {
        if self.at(token) {
            Some(self.bump().span)
        } else {
            None
        }
    }

    /// End offset of the last consumed token.
    fn prev_end(&self) -> usize {
        match self.pos.checked_sub(1) {
            Some(prev) => self.tokens[prev].span.end,
            None => 0,
        }
    }

    /// The current token starts a line left of `col`.
    fn before_column(&self, col: u32) -> bool {
        let tok = self.current();
        tok.token == Token::Eof || (tok.line_start && tok.col < col)
    }

    /// The current token ends the construct being parsed.
    fn is_offside(&self) -> bool {
        let tok = self.current();
        if tok.token == Token::Eof {
            return true;
        }
        if !tok.line_start || self.pos == self.anchor {
            return false;
        }
        if is_continuation(tok.token) {
            tok.col < self.offside
        } else {
            tok.col <= self.offside
        }
    }

    // ===== Errors =====

    fn error(&mut self, kind: ParseErrorKind, span: Span) {
        self.push_error(ParseError::new(kind, span));
    }

    fn push_error(&mut self, error: ParseError) {
        if self.errors.iter().any(|e| e.span.start == error.span.start) {
            return;
        }
        self.errors.push(error);
    }

    /// Report the current token as unexpected, or end of file.
    fn unexpected(&mut self) {
        let tok = *self.current();
        if tok.token == Token::Eof {
            self.error(ParseErrorKind::UnexpectedEof, Span::empty(self.prev_end()));
        } else {
            self.error(ParseErrorKind::UnexpectedToken(tok.token.to_string()), tok.span);
        }
    }

    fn expect(&mut self, token: Token<'_>, what: &str) -> Option<Span> {
        if let Some(span) = self.eat(token) {
            return Some(span);
        }
        self.missing(what);
        None
    }

    /// Report that `what` was required at the current position.
    fn missing(&mut self, what: &str) {
        let tok = *self.current();
        let span = if tok.token == Token::Eof || tok.line_start {
            Span::empty(self.prev_end())
        } else {
            tok.span
        };
        self.error(ParseErrorKind::Expected(what.to_string()), span);
    }

    fn ident(&mut self) -> Option<Ident> {
        match self.peek() {
            Token::Ident(text) => {
                let tok = self.bump();
                Some(Ident::new(text, tok.span))
            }
            _ => None,
        }
    }

    fn long_ident(&mut self) -> Option<LongIdent> {
        let mut parts = vec![self.ident()?];
        while self.at(Token::Dot) && matches!(self.nth(1), Token::Ident(_)) {
            self.bump();
            parts.extend(self.ident());
        }
        Some(LongIdent { parts })
    }

    /// Skip tokens until one starts a line at or left of `col`.
    fn synchronize(&mut self, col: u32) {
        loop {
            let tok = self.current();
            if tok.token == Token::Eof || (tok.line_start && tok.col <= col) {
                break;
            }
            self.bump();
        }
    }

    /// Report and skip leftover tokens on the current line.
    fn skip_stray(&mut self) {
        let tok = *self.current();
        if tok.line_start || tok.token == Token::Eof {
            return;
        }
        let closes_outer = self.nesting > 0
            && matches!(
                tok.token,
                Token::RParen | Token::RBracket | Token::RBrace | Token::Comma | Token::Semicolon
            );
        if closes_outer || matches!(tok.token, Token::In | Token::Then | Token::Else) {
            return;
        }
        self.error(ParseErrorKind::UnexpectedToken(tok.token.to_string()), tok.span);
        while !self.current().line_start {
            self.bump();
        }
    }

    // ===== Declarations =====

    /// `module A.B` at the top of a file (no `=`).
    fn parse_header(&mut self) -> Option<LongIdent> {
        if !self.at(Token::Module) {
            return None;
        }
        // `module X =` is a nested module, not a header.
        let mut n = 1;
        while matches!(self.nth(n), Token::Ident(_) | Token::Dot) {
            n += 1;
        }
        if self.nth(n) == Token::Eq {
            return None;
        }
        self.bump();
        let name = self.long_ident();
        if name.is_none() {
            self.unexpected();
        }
        name
    }

    fn parse_decls(&mut self, col: u32) -> Vec<Decl> {
        let saved = std::mem::replace(&mut self.offside, col);
        let mut decls = Vec::new();
        loop {
            let tok = *self.current();
            if self.before_column(col) {
                break;
            }
            if !tok.line_start || tok.col > col {
                let kind = if tok.line_start {
                    ParseErrorKind::Offside
                } else {
                    ParseErrorKind::UnexpectedToken(tok.token.to_string())
                };
                self.error(kind, tok.span);
                self.bump();
                self.synchronize(col);
                continue;
            }

            let start = self.pos;
            self.anchor = start;
            let decl = self.parse_decl(col);
            if self.pos == start {
                self.unexpected();
                self.bump();
            }
            decls.push(decl);

            if !self.current().line_start {
                self.unexpected();
            }
            self.synchronize(col);
        }
        self.offside = saved;
        decls
    }

    fn parse_decl(&mut self, col: u32) -> Decl {
        let start = self.current().span.start;
        let kind = match self.peek() {
            Token::Let => {
                let binding = self.parse_binding();
                if self.at(Token::In) {
                    let expr = self.finish_let_in(binding);
                    DeclKind::Do(expr)
                } else {
                    DeclKind::Let(binding)
                }
            }
            Token::Open => {
                self.bump();
                match self.long_ident() {
                    Some(path) => DeclKind::Open(path),
                    None => {
                        self.missing("a namespace or module name");
                        DeclKind::Error
                    }
                }
            }
            Token::Module => self.parse_module(col),
            Token::Type => self.parse_type_decl(),
            Token::Directive(raw) => DeclKind::Directive(self.parse_directive(raw)),
            Token::Do => {
                self.bump();
                DeclKind::Do(self.parse_body())
            }
            _ => {
                let expr = self.parse_expr();
                self.skip_stray();
                DeclKind::Do(expr)
            }
        };
        Decl {
            kind,
            span: Span::new(start, self.prev_end().max(start)),
        }
    }

    fn parse_module(&mut self, col: u32) -> DeclKind {
        self.bump();
        let Some(name) = self.ident() else {
            self.missing("a module name");
            return DeclKind::Error;
        };
        if self.expect(Token::Eq, "'='").is_none() {
            return DeclKind::Error;
        }
        let tok = *self.current();
        if tok.token == Token::Eof || !tok.line_start || tok.col <= col {
            self.error(
                ParseErrorKind::Expected("indented declarations".to_string()),
                Span::empty(self.prev_end()),
            );
            return DeclKind::Module {
                name,
                decls: Vec::new(),
            };
        }
        let decls = self.parse_decls(tok.col);
        DeclKind::Module { name, decls }
    }

    fn parse_type_decl(&mut self) -> DeclKind {
        self.bump();
        let Some(name) = self.ident() else {
            self.missing("a type name");
            return DeclKind::Error;
        };
        if self.expect(Token::Eq, "'='").is_none() {
            return DeclKind::Error;
        }
        if self.at(Token::LBrace) {
            DeclKind::Type {
                name,
                repr: TypeRepr::Record(self.parse_field_decls()),
            }
        } else {
            DeclKind::Type {
                name,
                repr: TypeRepr::Abbrev(self.parse_type()),
            }
        }
    }

    fn parse_field_decls(&mut self) -> Vec<FieldDecl> {
        let open = self.bump();
        self.nesting += 1;
        let inner = self.current().col;
        let next = self.offside.max(inner);
        let saved = std::mem::replace(&mut self.offside, next);
        let mut fields = Vec::new();
        loop {
            if self.eat(Token::RBrace).is_some() {
                break;
            }
            if self.before_column(self.offside) {
                self.push_error(
                    ParseError::new(ParseErrorKind::UnclosedDelimiter('{'), open.span)
                        .with_hint("close the record with '}'"),
                );
                break;
            }
            if self.eat(Token::Semicolon).is_some() {
                continue;
            }
            let Some(name) = self.ident() else {
                self.unexpected();
                self.bump();
                continue;
            };
            self.expect(Token::Colon, "':'");
            let ty = self.parse_type();
            fields.push(FieldDecl { name, ty });
        }
        self.offside = saved;
        self.nesting -= 1;
        fields
    }

    fn parse_directive(&mut self, raw: &'src str) -> Directive {
        let tok = self.bump();
        let name = Ident::new(
            raw.trim_start_matches('#'),
            Span::new(tok.span.start + 1, tok.span.end),
        );
        let mut args = Vec::new();
        while !self.current().line_start {
            let arg = *self.current();
            match arg.token {
                Token::String(s) | Token::UnclosedString(s) => {
                    args.push(Ident::new(unquote(s), arg.span));
                }
                Token::Ident(s) | Token::Int(s) => args.push(Ident::new(s, arg.span)),
                _ => {
                    self.error(
                        ParseErrorKind::InvalidDirective(format!("#{}", name.text)),
                        arg.span,
                    );
                }
            }
            self.bump();
        }
        if self.kind == SourceKind::Module && matches!(name.text.as_str(), "r" | "load") {
            self.push_error(
                ParseError::new(ParseErrorKind::InvalidDirective(raw.to_string()), tok.span)
                    .with_hint("only allowed in script files"),
            );
        }
        Directive {
            span: Span::new(tok.span.start, self.prev_end()),
            name,
            args,
        }
    }
}

/// Tokens allowed to sit exactly on the offside column.
const fn is_continuation(token: Token<'_>) -> bool {
    matches!(
        token,
        Token::Then
            | Token::Else
            | Token::PipeRight
            | Token::OrOr
            | Token::AndAnd
            | Token::NotEq
            | Token::LtEq
            | Token::GtEq
            | Token::Eq
            | Token::Lt
            | Token::Gt
            | Token::Plus
            | Token::Star
            | Token::Slash
            | Token::Percent
            | Token::Caret
    )
}
