//! Expressions, bindings and blocks.

use super::Parser;
use crate::ast::{BinaryOp, Binding, Expr, ExprKind, Ident, Literal, Pattern, PatternKind, RecordField};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{unquote, Token};
use glint_core::Span;

/// Binding powers of infix operators: (operator, left, right).
const fn infix(token: Token<'_>) -> Option<(BinaryOp, u8, u8)> {
    let entry = match token {
        Token::PipeRight => (BinaryOp::Pipe, 1, 2),
        Token::OrOr => (BinaryOp::Or, 3, 4),
        Token::AndAnd => (BinaryOp::And, 5, 6),
        Token::Eq => (BinaryOp::Eq, 7, 8),
        Token::NotEq => (BinaryOp::NotEq, 7, 8),
        Token::Lt => (BinaryOp::Lt, 7, 8),
        Token::LtEq => (BinaryOp::LtEq, 7, 8),
        Token::Gt => (BinaryOp::Gt, 7, 8),
        Token::GtEq => (BinaryOp::GtEq, 7, 8),
        // Right associative.
        Token::Caret => (BinaryOp::Concat, 10, 9),
        Token::Plus => (BinaryOp::Add, 11, 12),
        Token::Minus => (BinaryOp::Sub, 11, 12),
        Token::Star => (BinaryOp::Mul, 13, 14),
        Token::Slash => (BinaryOp::Div, 13, 14),
        Token::Percent => (BinaryOp::Rem, 13, 14),
        _ => return None,
    };
    Some(entry)
}

impl Parser<'_> {
    // ===== Bindings and blocks =====

    /// `let [rec] head params [: type] = body`
    pub(super) fn parse_binding(&mut self) -> Binding {
        let let_tok = self.bump();
        let is_rec = self.eat(Token::Rec).is_some();

        let head = match self.peek() {
            Token::Ident(_) | Token::LParen => self.parse_atomic_pattern(),
            _ => {
                self.missing("an identifier or pattern");
                Pattern {
                    kind: PatternKind::Error,
                    span: Span::empty(self.prev_end()),
                }
            }
        };

        let mut params = Vec::new();
        while matches!(self.peek(), Token::Ident(_) | Token::LParen) && !self.is_offside() {
            params.push(self.parse_atomic_pattern());
        }
        if !params.is_empty() && !matches!(head.kind, PatternKind::Named(_)) {
            self.error(ParseErrorKind::InvalidPattern, head.span);
        }

        let ret = if self.eat(Token::Colon).is_some() {
            Some(self.parse_type())
        } else {
            None
        };

        let body = if self.expect(Token::Eq, "'='").is_some() {
            self.parse_body()
        } else {
            Expr::error(Span::empty(self.prev_end()))
        };

        Binding {
            is_rec,
            head,
            params,
            ret,
            body,
            span: Span::new(let_tok.span.start, self.prev_end()),
        }
    }

    /// `in body` after a binding; the current token is `in`.
    pub(super) fn finish_let_in(&mut self, binding: Binding) -> Expr {
        self.bump();
        let body = self.parse_body();
        let span = binding.span.merge(&body.span);
        Expr::new(
            ExprKind::LetIn {
                binding: Box::new(binding),
                body: Box::new(body),
            },
            span,
        )
    }

    /// The expression after `=`, `->`, `then` or `else`: inline, or an
    /// indented block starting on the next line.
    pub(super) fn parse_body(&mut self) -> Expr {
        let tok = *self.current();
        if tok.token == Token::Eof || (tok.line_start && tok.col <= self.offside) {
            let at = Span::empty(self.prev_end());
            self.error(ParseErrorKind::ExpectedExpression, at);
            return Expr::error(at);
        }
        if tok.line_start {
            self.parse_block(tok.col)
        } else {
            self.parse_expr()
        }
    }

    fn parse_block(&mut self, col: u32) -> Expr {
        let saved = std::mem::replace(&mut self.offside, col);
        let expr = self.parse_stmts(col);
        self.offside = saved;
        expr
    }

    fn at_stmt_start(&self, col: u32) -> bool {
        let tok = self.current();
        tok.token != Token::Eof
            && tok.line_start
            && tok.col == col
            && !matches!(tok.token, Token::RParen | Token::RBracket | Token::RBrace)
    }

    /// Statements of a block at `col`. A `let` scopes over the rest.
    pub(super) fn parse_stmts(&mut self, col: u32) -> Expr {
        if self.at(Token::Let) {
            let binding = self.parse_binding();
            if self.at(Token::In) {
                return self.finish_let_in(binding);
            }
            self.skip_stray();
            let body = if self.at_stmt_start(col) {
                self.parse_stmts(col)
            } else {
                let at = binding
                    .name()
                    .map_or(binding.head.span, |name| name.span);
                self.push_error(
                    ParseError::new(ParseErrorKind::IncompleteLet, at)
                        .with_hint("a block must end with an expression"),
                );
                Expr::error(Span::empty(self.prev_end()))
            };
            let span = binding.span.merge(&body.span);
            return Expr::new(
                ExprKind::LetIn {
                    binding: Box::new(binding),
                    body: Box::new(body),
                },
                span,
            );
        }

        let before = self.pos;
        self.anchor = before;
        let first = self.parse_expr();
        if self.pos == before {
            self.bump();
        }
        self.skip_stray();
        if self.at_stmt_start(col) {
            let rest = self.parse_stmts(col);
            let span = first.span.merge(&rest.span);
            Expr::new(ExprKind::Sequential(Box::new(first), Box::new(rest)), span)
        } else {
            first
        }
    }

    // ===== Expressions =====

    /// An expression, including unparenthesized tuples.
    pub(super) fn parse_expr(&mut self) -> Expr {
        let first = self.parse_expr_no_tuple();
        if !self.at(Token::Comma) || self.is_offside() {
            return first;
        }
        let mut items = vec![first];
        while self.at(Token::Comma) && !self.is_offside() {
            self.bump();
            items.push(self.parse_expr_no_tuple());
        }
        let span = items[0].span.merge(&items[items.len() - 1].span);
        Expr::new(ExprKind::Tuple(items), span)
    }

    fn parse_expr_no_tuple(&mut self) -> Expr {
        match self.peek() {
            Token::Let => {
                let binding = self.parse_binding();
                if self.at(Token::In) {
                    self.finish_let_in(binding)
                } else {
                    let at = binding.head.span;
                    self.error(ParseErrorKind::IncompleteLet, at);
                    let span = binding.span;
                    Expr::new(
                        ExprKind::LetIn {
                            binding: Box::new(binding),
                            body: Box::new(Expr::error(Span::empty(span.end))),
                        },
                        span,
                    )
                }
            }
            Token::If => self.parse_if(),
            Token::Fun => self.parse_lambda(),
            _ => self.parse_binary(0),
        }
    }

    fn parse_if(&mut self) -> Expr {
        let if_tok = self.bump();
        let cond = self.parse_expr();

        let then_branch = if !self.before_column(self.offside) && self.eat(Token::Then).is_some() {
            self.parse_body()
        } else {
            self.missing("'then'");
            Expr::error(Span::empty(self.prev_end()))
        };

        let else_branch = if self.at(Token::Else) && !self.before_column(self.offside) {
            self.bump();
            Some(Box::new(self.parse_body()))
        } else {
            None
        };

        Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            Span::new(if_tok.span.start, self.prev_end()),
        )
    }

    fn parse_lambda(&mut self) -> Expr {
        let fun_tok = self.bump();
        let mut params = Vec::new();
        while matches!(self.peek(), Token::Ident(_) | Token::LParen) && !self.is_offside() {
            params.push(self.parse_atomic_pattern());
        }
        if params.is_empty() {
            self.missing("a parameter");
        }
        let body = if self.expect(Token::Arrow, "'->'").is_some() {
            self.parse_body()
        } else {
            Expr::error(Span::empty(self.prev_end()))
        };
        Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            Span::new(fun_tok.span.start, self.prev_end()),
        )
    }

    fn parse_binary(&mut self, min_bp: u8) -> Expr {
        let mut lhs = self.parse_prefix();
        loop {
            let Some((op, l_bp, r_bp)) = infix(self.peek()) else {
                break;
            };
            if l_bp < min_bp || self.is_offside() {
                break;
            }
            let op_span = self.bump().span;
            let rhs = match self.peek() {
                Token::If | Token::Fun | Token::Let => self.parse_expr_no_tuple(),
                _ => self.parse_binary(r_bp),
            };
            let span = lhs.span.merge(&rhs.span).merge(&op_span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    op_span,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        lhs
    }

    fn parse_prefix(&mut self) -> Expr {
        if self.at(Token::Minus) && !self.is_offside() {
            let minus = self.bump();
            let operand = self.parse_prefix();
            let span = minus.span.merge(&operand.span);
            return Expr::new(ExprKind::Neg(Box::new(operand)), span);
        }
        self.parse_app()
    }

    /// Juxtaposition application: `f a b`.
    fn parse_app(&mut self) -> Expr {
        let mut func = self.parse_postfix();
        while self.peek().starts_atom() && !self.is_offside() {
            let arg = self.parse_postfix();
            let span = func.span.merge(&arg.span);
            func = Expr::new(
                ExprKind::App {
                    func: Box::new(func),
                    arg: Box::new(arg),
                },
                span,
            );
        }
        func
    }

    /// Member access and high-precedence calls.
    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_atom();
        loop {
            let tok = *self.current();
            match tok.token {
                Token::Dot if !self.is_offside() => {
                    let dot = self.bump().span;
                    let name_tok = *self.current();
                    let name = match name_tok.token {
                        Token::Ident(text) if !self.is_offside() => {
                            self.bump();
                            Some(Ident::new(text, name_tok.span))
                        }
                        _ => {
                            self.push_error(
                                ParseError::new(ParseErrorKind::ExpectedMemberName, dot)
                                    .with_context("after member access"),
                            );
                            None
                        }
                    };
                    let end = name.as_ref().map_or(dot, |n| n.span);
                    let span = expr.span.merge(&end);
                    expr = Expr::new(
                        ExprKind::Member {
                            target: Box::new(expr),
                            dot,
                            name,
                        },
                        span,
                    );
                }
                Token::LParen if !tok.line_start && tok.span.start == expr.span.end => {
                    let (args, parens) = self.parse_call_args();
                    let span = expr.span.merge(&parens);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            parens,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_call_args(&mut self) -> (Vec<Expr>, Span) {
        let open = self.bump();
        self.nesting += 1;
        let mut args = Vec::new();
        let close = loop {
            if let Some(close) = self.eat(Token::RParen) {
                break Some(close);
            }
            if self.is_offside() {
                break None;
            }
            let before = self.pos;
            args.push(self.parse_expr_no_tuple());
            if self.eat(Token::Comma).is_some() {
                continue;
            }
            if self.pos == before || !self.at(Token::RParen) {
                break None;
            }
        };
        self.nesting -= 1;
        let parens = match close {
            Some(close) => open.span.merge(&close),
            None => {
                self.push_error(
                    ParseError::new(ParseErrorKind::UnclosedDelimiter('('), open.span)
                        .with_hint("close the argument list with ')'"),
                );
                Span::new(open.span.start, self.prev_end())
            }
        };
        (args, parens)
    }

    fn parse_atom(&mut self) -> Expr {
        let tok = *self.current();
        if self.is_offside() {
            let at = Span::empty(self.prev_end());
            self.error(ParseErrorKind::ExpectedExpression, at);
            return Expr::error(at);
        }
        let lit = match tok.token {
            Token::Int(text) => {
                let value = text.parse::<i64>().unwrap_or_else(|_| {
                    self.error(ParseErrorKind::InvalidNumber(text.to_string()), tok.span);
                    0
                });
                Literal::Int(value)
            }
            Token::Float(text) => {
                let value = text.parse::<f64>().unwrap_or_else(|_| {
                    self.error(ParseErrorKind::InvalidNumber(text.to_string()), tok.span);
                    0.0
                });
                Literal::Float(value)
            }
            Token::String(text) | Token::UnclosedString(text) => Literal::String(unquote(text)),
            Token::Char(text) => Literal::Char(unquote(text).chars().next().unwrap_or('\0')),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Ident(text) => {
                self.bump();
                return Expr::new(ExprKind::Ident(Ident::new(text, tok.span)), tok.span);
            }
            Token::LParen => return self.parse_paren(),
            Token::LBracket => return self.parse_list(),
            Token::LBrace => return self.parse_record(),
            Token::If | Token::Fun | Token::Let => return self.parse_expr_no_tuple(),
            _ => {
                self.error(ParseErrorKind::ExpectedExpression, tok.span);
                return Expr::error(Span::empty(tok.span.start));
            }
        };
        self.bump();
        Expr::new(ExprKind::Lit(lit), tok.span)
    }

    fn parse_paren(&mut self) -> Expr {
        let open = self.bump();
        if let Some(close) = self.eat(Token::RParen) {
            return Expr::new(ExprKind::Lit(Literal::Unit), open.span.merge(&close));
        }
        self.nesting += 1;
        let mut inner = self.parse_expr();
        if self.at(Token::Colon) && !self.is_offside() {
            self.bump();
            let ty = self.parse_type();
            let span = inner.span.merge(&ty.span);
            inner = Expr::new(ExprKind::Typed(Box::new(inner), ty), span);
        }
        self.nesting -= 1;
        let end = if let Some(close) = self.eat(Token::RParen) {
            close.end
        } else {
            self.push_error(
                ParseError::new(ParseErrorKind::UnclosedDelimiter('('), open.span)
                    .with_hint("add a matching ')'"),
            );
            self.prev_end()
        };
        Expr::new(
            ExprKind::Paren(Box::new(inner)),
            Span::new(open.span.start, end),
        )
    }

    /// Run `item` for each element of a `;`/newline separated sequence up to
    /// `close`. Elements align on the column of the first one.
    fn parse_sequence<T>(
        &mut self,
        close: Token<'_>,
        delimiter: char,
        mut item: impl FnMut(&mut Self) -> Option<T>,
    ) -> (Vec<T>, usize) {
        let open = self.bump();
        self.nesting += 1;
        let inner = self.current().col;
        let next = self.offside.max(inner);
        let saved = std::mem::replace(&mut self.offside, next);
        let mut items = Vec::new();
        let end = loop {
            if let Some(span) = self.eat(close) {
                break span.end;
            }
            if self.before_column(self.offside) {
                self.push_error(
                    ParseError::new(ParseErrorKind::UnclosedDelimiter(delimiter), open.span)
                        .with_hint(format!("close with '{close}'")),
                );
                break self.prev_end();
            }
            if self.eat(Token::Semicolon).is_some() {
                continue;
            }
            let before = self.pos;
            self.anchor = before;
            if let Some(value) = item(self) {
                items.push(value);
            }
            if self.pos == before {
                self.unexpected();
                self.bump();
            }
        };
        self.offside = saved;
        self.nesting -= 1;
        (items, end)
    }

    fn parse_list(&mut self) -> Expr {
        let start = self.current().span.start;
        let (items, end) = self.parse_sequence(Token::RBracket, '[', |p| Some(p.parse_expr()));
        Expr::new(ExprKind::List(items), Span::new(start, end))
    }

    fn parse_record(&mut self) -> Expr {
        let start = self.current().span.start;
        let (fields, end) = self.parse_sequence(Token::RBrace, '{', |p| {
            let name = p.ident()?;
            let value = if p.expect(Token::Eq, "'='").is_some() {
                p.parse_expr()
            } else {
                Expr::error(Span::empty(p.prev_end()))
            };
            Some(RecordField { name, value })
        });
        Expr::new(ExprKind::Record(fields), Span::new(start, end))
    }
}
