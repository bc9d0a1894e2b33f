//! Type checking and name resolution for glint.
//!
//! [`check`] turns an [`UntypedTree`] and its [`CompilationContext`] into a
//! [`TypedCheckResult`]: inferred types, resolved symbols, diagnostics and
//! the position tables the query layer reads (member sites, call sites and
//! scopes).
//!
//! Inference is Hindley-Milner over a union-find [`TypeStore`](types::TypeStore).
//! Top-level bindings are generalized; local ones stay monomorphic.
//! Library entities come from a built-in catalog filtered by the file's
//! references (see [`LIBRARIES`]).
//!
//! # Error Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | E0001 | Type mismatch, or operator not supported by the operand type |
//! | E0003 | Value is not a function |
//! | E0039 | Value, member, record label, type or namespace not defined |
//! | E0041 | No overload matches the arguments |
//! | E0072 | Member lookup on a value of indeterminate type |
//! | E0084 | Referenced library not found |
//! | W0020 | Expression result implicitly ignored |
//! | W0064 | Top-level binding shadows an earlier one |
//! | W1182 | Unused local binding |
//! | W3353 | Directive recorded but not applied |
//!
//! Syntax errors stay on the tree; [`TypedCheckResult::all_diagnostics`]
//! merges both.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
pub mod error;
mod format;
mod infer;
pub mod result;
pub mod types;
mod world;

pub use catalog::LIBRARIES;
pub use error::{ErrorCode, TypeError};
pub use result::{
    CallSite, CheckStatus, MemberSite, Occurrence, Receiver, ScopeEntry, SymbolTable,
    TypedCheckResult,
};
pub use types::Type;

use glint_parser::UntypedTree;
use glint_project::CompilationContext;
use std::sync::Arc;
use tracing::debug;

/// Checker options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Report unused local bindings (W1182).
    pub warn_unused: bool,
    /// Report shadowed top-level bindings (W0064).
    pub warn_shadowing: bool,
    /// Report every warning as an error.
    pub warnings_as_errors: bool,
    /// Warning codes to drop, e.g. `W0020`.
    pub nowarn: Vec<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            warn_unused: true,
            warn_shadowing: true,
            warnings_as_errors: false,
            nowarn: Vec::new(),
        }
    }
}

impl CheckOptions {
    /// Whether a warning code is suppressed.
    #[must_use]
    pub fn suppresses(&self, code: &str) -> bool {
        self.nowarn.iter().any(|c| c == code)
    }
}

impl From<&CompilationContext> for CheckOptions {
    fn from(context: &CompilationContext) -> Self {
        Self {
            warnings_as_errors: context.warnings_as_errors,
            nowarn: context.nowarn.clone(),
            ..Self::default()
        }
    }
}

/// Check a parsed file with the options its context implies.
pub fn check(tree: Arc<UntypedTree>, context: Arc<CompilationContext>) -> TypedCheckResult {
    let options = CheckOptions::from(context.as_ref());
    check_with_options(tree, context, &options)
}

/// Check a parsed file with explicit options.
///
/// Never fails: problems become diagnostics, and a tree with syntax errors
/// yields a [`CheckStatus::Partial`] result.
pub fn check_with_options(
    tree: Arc<UntypedTree>,
    context: Arc<CompilationContext>,
    options: &CheckOptions,
) -> TypedCheckResult {
    let mut checker = infer::Checker::new(&tree, &context, options);
    checker.check_file();
    let result = checker.finish(Arc::clone(&tree), Arc::clone(&context));
    debug!(
        file = %tree.file().display(),
        symbols = result.symbols().len(),
        diagnostics = result.diagnostics().len(),
        status = ?result.status(),
        "checked"
    );
    result
}
