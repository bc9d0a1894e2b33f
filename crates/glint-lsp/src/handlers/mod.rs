//! LSP request and notification handlers.
//!
//! Each handler answers one request type against a checked result and the
//! editor's current text.

pub mod utils;

pub mod completion;
pub mod diagnostics;
pub mod hover;
pub mod signature_help;
