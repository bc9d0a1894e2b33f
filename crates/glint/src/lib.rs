//! glint command-line tools.
//!
//! - `glint-check`: Check source files and report diagnostics
//! - `glint-query`: Answer a tooltip, completion or overload query at a
//!   position, as JSON
//!
//! # Example Usage
//!
//! ```bash
//! glint-check script.glx --nowarn W1182
//! glint-check script.glx --format json
//! glint-query script.glx tooltip 3 9
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
pub mod report;
