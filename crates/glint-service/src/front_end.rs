//! The boundary between the service and the compiler.
//!
//! The coordinator and query engine only talk to a [`CompilerFrontEnd`], so a
//! test can substitute one that counts, blocks or fails.

use crate::error::CheckerFailure;
use glint_checker::TypedCheckResult;
use glint_core::{LineIndex, Position};
use glint_parser::{classify_at, TokenKind, UntypedTree};
use glint_project::{resolve_with, CompilationContext, ProjectOptions};
use std::path::Path;
use std::sync::Arc;

/// Parse, check and classify for one language.
pub trait CompilerFrontEnd: Send + Sync {
    /// Derive the compilation context of a file from its text.
    fn context(&self, path: &Path, text: &str) -> CompilationContext {
        resolve_with(path, text, &ProjectOptions::default())
    }

    /// Parse a file. Must tolerate arbitrary text.
    fn parse(&self, path: &Path, text: &str, context: &CompilationContext) -> UntypedTree;

    /// Type-check a parsed file.
    ///
    /// Type errors are diagnostics on the result; `Err` is reserved for
    /// faults of the front end itself.
    fn check(
        &self,
        tree: Arc<UntypedTree>,
        context: Arc<CompilationContext>,
    ) -> Result<TypedCheckResult, CheckerFailure>;

    /// Classify the token at a position.
    fn classify(&self, index: &LineIndex, position: Position) -> TokenKind {
        classify_at(index, position)
    }
}

/// The glint parser and checker.
#[derive(Debug, Clone, Default)]
pub struct DefaultFrontEnd {
    options: ProjectOptions,
}

impl DefaultFrontEnd {
    /// Create a front end that layers `options` under each file's directives.
    pub const fn new(options: ProjectOptions) -> Self {
        Self { options }
    }

    /// The project options.
    pub const fn options(&self) -> &ProjectOptions {
        &self.options
    }
}

impl CompilerFrontEnd for DefaultFrontEnd {
    fn context(&self, path: &Path, text: &str) -> CompilationContext {
        resolve_with(path, text, &self.options)
    }

    fn parse(&self, path: &Path, text: &str, context: &CompilationContext) -> UntypedTree {
        glint_parser::parse(path, text, &context.parse_options())
    }

    fn check(
        &self,
        tree: Arc<UntypedTree>,
        context: Arc<CompilationContext>,
    ) -> Result<TypedCheckResult, CheckerFailure> {
        Ok(glint_checker::check(tree, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::SourceKind;

    #[test]
    fn test_default_front_end_pipeline() {
        let front_end = DefaultFrontEnd::default();
        let path = Path::new("demo.glx");
        let text = "let x = 1\nlet y = x + 1";

        let context = front_end.context(path, text);
        assert_eq!(context.kind, SourceKind::Script);

        let tree = front_end.parse(path, text, &context);
        assert!(!tree.has_errors());

        let result = front_end
            .check(Arc::new(tree), Arc::new(context))
            .expect("check");
        assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn test_options_reach_context() {
        let front_end = DefaultFrontEnd::new(ProjectOptions::new().with_define("DEBUG"));
        let context = front_end.context(Path::new("demo.glx"), "let x = 1");
        assert_eq!(context.defines, vec!["DEBUG".to_string()]);
    }

    #[test]
    fn test_classify() {
        let front_end = DefaultFrontEnd::default();
        let index = LineIndex::new("let answer = 42");
        assert_eq!(
            front_end.classify(&index, Position::new(0, 1)),
            TokenKind::Keyword
        );
        assert_eq!(
            front_end.classify(&index, Position::new(0, 5)),
            TokenKind::Identifier
        );
        assert_eq!(
            front_end.classify(&index, Position::new(0, 14)),
            TokenKind::Number
        );
    }
}
