//! Core types for glint.
//!
//! This crate provides the data shared by every stage of the analysis pipeline:
//!
//! - [`Span`] / [`Spanned`] - Byte ranges into a source text
//! - [`Position`] / [`Range`] - Zero-based line/column addressing used by editors
//! - [`LineIndex`] - Conversion between byte offsets and positions
//! - [`Diagnostic`] - A located message with a [`Severity`]
//! - [`Symbol`] - A resolved entity with its kind, signature and overloads
//! - [`SourceKind`] - Script or module compilation
//!
//! # Example
//!
//! ```
//! use glint_core::{LineIndex, Position};
//!
//! let source = "let x = 1\nlet y = x";
//! let index = LineIndex::new(source);
//!
//! assert_eq!(index.position_of(10), Position::new(1, 0));
//! assert_eq!(index.offset_of(Position::new(1, 4)), Some(14));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod diagnostic;
pub mod position;
pub mod source;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, Severity};
pub use position::{LineIndex, Position, Range};
pub use source::SourceKind;
pub use span::{Span, Spanned};
pub use symbol::{Parameter, Signature, Symbol, SymbolKind};
