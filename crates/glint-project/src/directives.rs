//! Hash directive scanning.
//!
//! Context resolution runs before parsing, so directives are picked out of
//! the raw token stream rather than the syntax tree.

use glint_core::Span;
use glint_parser::lexer::{tokenize, unquote, Token};

/// A `#name args...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDirective {
    /// Name without the hash.
    pub name: String,
    /// From the hash to the end of the last argument.
    pub span: Span,
    pub args: Vec<RawArg>,
}

/// One directive argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawArg {
    /// Unquoted for string literals, verbatim otherwise.
    pub text: String,
    pub quoted: bool,
    pub span: Span,
}

/// Collect every directive that starts a line, in source order.
pub(crate) fn scan(source: &str) -> Vec<RawDirective> {
    let tokens = tokenize(source);
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (token, span) = tokens[i];
        i += 1;
        let Token::Directive(raw) = token else {
            continue;
        };
        if !starts_line(source, span.start) {
            continue;
        }

        let line_end = source[span.end..]
            .find('\n')
            .map_or(source.len(), |n| span.end + n);
        let mut end = span.end;
        let mut args = Vec::new();
        while let Some(&(arg, arg_span)) = tokens.get(i) {
            if arg_span.start >= line_end {
                break;
            }
            i += 1;
            if arg.is_trivia() {
                continue;
            }
            end = arg_span.end;
            let (text, quoted) = match arg {
                Token::String(s) | Token::UnclosedString(s) => (unquote(s), true),
                _ => (arg_span.text(source).to_string(), false),
            };
            args.push(RawArg {
                text,
                quoted,
                span: arg_span,
            });
        }

        out.push(RawDirective {
            name: raw.trim_start_matches('#').to_string(),
            span: Span::new(span.start, end),
            args,
        });
    }
    out
}

fn starts_line(source: &str, offset: usize) -> bool {
    let before = &source[..offset];
    let prefix = before.rsplit_once('\n').map_or(before, |(_, rest)| rest);
    prefix.chars().all(|c| c == ' ' || c == '\t')
}
