//! Incremental analysis for glint editor tooling.
//!
//! This crate sits between an editor and the compiler front end:
//!
//! - [`CompilerFrontEnd`] - The parse / check / classify boundary, with
//!   [`DefaultFrontEnd`] wiring in the glint parser and checker
//! - [`Coordinator`] - Per-file state machine with a blocking
//!   ([`Coordinator::check_file`]) and a non-blocking
//!   ([`Coordinator::try_check_file`]) entry point
//! - [`QueryEngine`] - Tooltips, completions and method overloads against a
//!   [`TypedCheckResult`](glint_checker::TypedCheckResult)
//!
//! # Example
//!
//! ```
//! use glint_core::Position;
//! use glint_service::{completion_path, Coordinator, DefaultFrontEnd, QueryEngine};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let coordinator = Coordinator::new(Arc::new(DefaultFrontEnd::default()));
//! let text = "let msg = \"hello\"\nlet n = msg.";
//! let result = coordinator.check_file(Path::new("demo.glx"), text).unwrap();
//!
//! let line = "let n = msg.";
//! let (path, partial) = completion_path(line, 12);
//! let names: Vec<String> = QueryEngine::new(&result)
//!     .completions(Position::new(1, 12), line, &path, &partial, false)
//!     .map(|item| item.name)
//!     .collect();
//! assert!(names.contains(&"ToUpper".to_string()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod front_end;
pub mod query;

pub use coordinator::{Coordinator, FileState, Readiness};
pub use error::CheckerFailure;
pub use front_end::{CompilerFrontEnd, DefaultFrontEnd};
pub use query::{
    completion_path, name_path_at, CompletionItem, MethodGroup, QueryContext, QueryEngine,
    TooltipText,
};
