//! Error-tolerant parser for glint source files.
//!
//! This crate provides:
//! - A Logos-based lexer with conditional-compilation regions ([`lexer`])
//! - An offside-aware recursive-descent parser that always produces a tree
//! - Token classification at any position ([`classify`])
//!
//! # Example
//!
//! ```
//! use glint_parser::{parse_source, ast::DeclKind};
//!
//! let tree = parse_source("let greet name = \"hi \" ^ name\nprintfn \"%s\" (greet \"x\")");
//! assert!(!tree.has_errors());
//! assert!(matches!(tree.decls[0].kind, DeclKind::Let(_)));
//! assert!(matches!(tree.decls[1].kind, DeclKind::Do(_)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod classify;
pub mod error;
pub mod lexer;
mod parser;

pub use ast::{Decl, DeclKind, Expr, ExprKind, Ident, LongIdent};
pub use classify::{classify, classify_at, token_at, TokenKind};
pub use error::{ParseError, ParseErrorKind};

use glint_core::{Diagnostic, LineIndex, SourceKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Options that influence parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Script or module.
    pub kind: SourceKind,
    /// Conditional compilation symbols for `#if` regions.
    pub defines: Vec<String>,
}

/// The untyped syntax of one file.
///
/// The tree owns its source text so that positions can be mapped back to
/// lines without the caller keeping the text alive.
#[derive(Debug, Clone)]
pub struct UntypedTree {
    file: PathBuf,
    kind: SourceKind,
    index: LineIndex,
    /// `module A.B` header, if present.
    pub header: Option<LongIdent>,
    /// Top-level declarations in source order.
    pub decls: Vec<Decl>,
    errors: Vec<ParseError>,
}

impl UntypedTree {
    /// Path of the parsed file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Script or module.
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// The parsed text.
    pub fn source(&self) -> &str {
        self.index.text()
    }

    /// Shared handle to the parsed text.
    pub fn shared_source(&self) -> Arc<str> {
        self.index.shared_text()
    }

    /// Line index over the parsed text.
    pub const fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Text of a line as it was when parsed.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        self.index.line_text(line)
    }

    /// Syntax errors in source order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Whether any syntax error was recovered from.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Syntax errors as located diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors
            .iter()
            .map(|e| e.to_diagnostic(&self.index))
            .collect()
    }

    /// Name top-level declarations are qualified with.
    ///
    /// The header if present; for module files without one, the capitalized
    /// file stem; scripts have none.
    pub fn module_name(&self) -> Option<String> {
        if let Some(header) = &self.header {
            return Some(header.to_string());
        }
        if self.kind != SourceKind::Module {
            return None;
        }
        let stem = self.file.file_stem()?.to_str()?;
        let mut chars = stem.chars();
        let first = chars.next()?;
        Some(first.to_uppercase().chain(chars).collect())
    }

    /// Expressions whose span touches `offset`, outermost first.
    pub fn exprs_at(&self, offset: usize) -> Vec<&Expr> {
        let mut out = Vec::new();
        ast::walk_decls(&self.decls, &mut |expr| {
            if expr.span.touches(offset) {
                out.push(expr);
            }
        });
        out
    }
}

/// Parse a file. Never fails: syntax errors are recorded on the tree.
pub fn parse(path: &Path, source: &str, options: &ParseOptions) -> UntypedTree {
    let (tokens, lex_errors) = lexer::significant_tokens(source, &options.defines);
    let parsed = parser::Parser::new(tokens, lex_errors, options.kind).parse_file();
    debug!(
        file = %path.display(),
        decls = parsed.decls.len(),
        errors = parsed.errors.len(),
        "parsed"
    );
    UntypedTree {
        file: path.to_path_buf(),
        kind: options.kind,
        index: LineIndex::new(source),
        header: parsed.header,
        decls: parsed.decls,
        errors: parsed.errors,
    }
}

/// Parse text as an untitled script.
pub fn parse_source(source: &str) -> UntypedTree {
    parse(Path::new("untitled.glx"), source, &ParseOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name() {
        let options = ParseOptions {
            kind: SourceKind::Module,
            defines: Vec::new(),
        };
        let tree = parse(Path::new("src/geometry.gl"), "let x = 1", &options);
        assert_eq!(tree.module_name().as_deref(), Some("Geometry"));

        let tree = parse(Path::new("src/geometry.gl"), "module Shapes.Area\nlet x = 1", &options);
        assert_eq!(tree.module_name().as_deref(), Some("Shapes.Area"));

        assert_eq!(parse_source("let x = 1").module_name(), None);
    }

    #[test]
    fn test_diagnostics_are_located() {
        let tree = parse_source("let x =\n");
        let diags = tree.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "P0004");
        assert_eq!(diags[0].range.start.line, 0);
    }

    #[test]
    fn test_exprs_at_outermost_first() {
        let tree = parse_source("let n = (1 + 2) * 3");
        let path = tree.exprs_at(9);
        assert!(path.len() >= 3);
        assert!(path.windows(2).all(|w| w[0].span.contains_span(&w[1].span)));
        assert!(matches!(path.last().unwrap().kind, ExprKind::Lit(_)));
    }
}
