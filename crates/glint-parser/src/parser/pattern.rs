//! Patterns and type annotations.

use super::Parser;
use crate::ast::{Ident, Pattern, PatternKind, TypeExpr, TypeExprKind};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::Token;
use glint_core::Span;

impl Parser<'_> {
    /// `x`, `_`, `()`, `(p: t)` or `(a, b)`.
    pub(super) fn parse_atomic_pattern(&mut self) -> Pattern {
        let tok = *self.current();
        match tok.token {
            Token::Ident("_") => {
                self.bump();
                Pattern {
                    kind: PatternKind::Wildcard,
                    span: tok.span,
                }
            }
            Token::Ident(text) => {
                self.bump();
                Pattern {
                    kind: PatternKind::Named(Ident::new(text, tok.span)),
                    span: tok.span,
                }
            }
            Token::LParen => {
                self.bump();
                if let Some(close) = self.eat(Token::RParen) {
                    return Pattern {
                        kind: PatternKind::Unit,
                        span: tok.span.merge(&close),
                    };
                }
                self.nesting += 1;
                let inner = self.parse_tuple_pattern();
                self.nesting -= 1;
                let end = if let Some(close) = self.eat(Token::RParen) {
                    close.end
                } else {
                    self.push_error(ParseError::new(
                        ParseErrorKind::UnclosedDelimiter('('),
                        tok.span,
                    ));
                    self.prev_end()
                };
                Pattern {
                    span: Span::new(tok.span.start, end),
                    ..inner
                }
            }
            _ => {
                self.error(ParseErrorKind::InvalidPattern, tok.span);
                Pattern {
                    kind: PatternKind::Error,
                    span: Span::empty(tok.span.start),
                }
            }
        }
    }

    fn parse_tuple_pattern(&mut self) -> Pattern {
        let mut items = Vec::new();
        loop {
            let mut item = self.parse_atomic_pattern();
            if self.eat(Token::Colon).is_some() {
                let ty = self.parse_type();
                let span = item.span.merge(&ty.span);
                item = Pattern {
                    kind: PatternKind::Typed(Box::new(item), ty),
                    span,
                };
            }
            let progressed = !matches!(item.kind, PatternKind::Error);
            items.push(item);
            if !progressed || self.eat(Token::Comma).is_none() {
                break;
            }
        }
        if items.len() == 1 {
            return items.remove(0);
        }
        let span = items[0].span.merge(&items[items.len() - 1].span);
        Pattern {
            kind: PatternKind::Tuple(items),
            span,
        }
    }

    /// A type annotation: `a -> b`, `a * b`, `t list`, `t[]`, `'a`.
    pub(super) fn parse_type(&mut self) -> TypeExpr {
        let lhs = self.parse_tuple_type();
        if self.at(Token::Arrow) && !self.is_offside() {
            self.bump();
            let rhs = self.parse_type();
            let span = lhs.span.merge(&rhs.span);
            return TypeExpr {
                kind: TypeExprKind::Fun(Box::new(lhs), Box::new(rhs)),
                span,
            };
        }
        lhs
    }

    fn parse_tuple_type(&mut self) -> TypeExpr {
        let first = self.parse_postfix_type();
        if !self.at(Token::Star) || self.is_offside() {
            return first;
        }
        let mut items = vec![first];
        while self.at(Token::Star) && !self.is_offside() {
            self.bump();
            items.push(self.parse_postfix_type());
        }
        let span = items[0].span.merge(&items[items.len() - 1].span);
        TypeExpr {
            kind: TypeExprKind::Tuple(items),
            span,
        }
    }

    fn parse_postfix_type(&mut self) -> TypeExpr {
        let mut ty = self.parse_atomic_type();
        loop {
            let tok = *self.current();
            if tok.line_start {
                break;
            }
            match tok.token {
                Token::Ident(_) => {
                    let Some(ctor) = self.long_ident() else { break };
                    let span = ty.span.merge(&ctor.span());
                    ty = TypeExpr {
                        kind: TypeExprKind::App {
                            arg: Box::new(ty),
                            ctor,
                        },
                        span,
                    };
                }
                Token::LBracket if self.nth(1) == Token::RBracket => {
                    self.bump();
                    let close = self.bump().span;
                    let span = ty.span.merge(&close);
                    ty = TypeExpr {
                        kind: TypeExprKind::Array(Box::new(ty)),
                        span,
                    };
                }
                _ => break,
            }
        }
        ty
    }

    fn parse_atomic_type(&mut self) -> TypeExpr {
        let tok = *self.current();
        match tok.token {
            Token::Ident(_) if !self.is_offside() => match self.long_ident() {
                Some(name) => TypeExpr {
                    span: name.span(),
                    kind: TypeExprKind::Named(name),
                },
                None => self.type_error(),
            },
            Token::TypeVar(text) if !self.is_offside() => {
                self.bump();
                TypeExpr {
                    kind: TypeExprKind::Var(Ident::new(text, tok.span)),
                    span: tok.span,
                }
            }
            Token::LParen if !self.is_offside() => {
                self.bump();
                self.nesting += 1;
                let inner = self.parse_type();
                self.nesting -= 1;
                let end = if let Some(close) = self.eat(Token::RParen) {
                    close.end
                } else {
                    self.push_error(ParseError::new(
                        ParseErrorKind::UnclosedDelimiter('('),
                        tok.span,
                    ));
                    self.prev_end()
                };
                TypeExpr {
                    span: Span::new(tok.span.start, end),
                    ..inner
                }
            }
            _ => self.type_error(),
        }
    }

    fn type_error(&mut self) -> TypeExpr {
        self.missing("a type");
        TypeExpr {
            kind: TypeExprKind::Error,
            span: Span::empty(self.prev_end()),
        }
    }
}
