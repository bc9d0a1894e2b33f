//! Language Server Protocol implementation for glint.
//!
//! The server keeps diagnostics current as documents change and answers:
//! - Hover with types, overload lists and documentation
//! - Completion of scope names and members after `.`
//! - Signature help inside method calls
//!
//! # Architecture
//!
//! - **Main loop**: Applies document notifications in order and answers
//!   requests from the newest ready analysis
//! - **Analysis worker**: Checks the newest version of each changed document
//!   through a shared [`Coordinator`](glint_service::Coordinator)
//! - **Handlers**: Convert between LSP types and glint queries

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod handlers;
pub mod main_loop;

mod analysis;
mod server;
mod vfs;

pub use analysis::{AnalysisRequest, Analyzed};
pub use main_loop::{run_main_loop, run_main_loop_with};
pub use server::{server_capabilities, start_stdio, Server};
pub use vfs::{Document, Vfs};

/// LSP server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
