//! Command implementations for CLI tools.
//!
//! Each module contains the full implementation for a command,
//! which is invoked by a thin wrapper binary.

pub mod check;
pub mod query;

use clap::Args;
use glint_project::ProjectOptions;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

/// Project settings shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Reference a library or assembly path (repeatable)
    #[arg(short = 'r', long = "reference", value_name = "REF")]
    pub references: Vec<String>,

    /// Define a conditional compilation symbol (repeatable)
    #[arg(long = "define", value_name = "SYMBOL")]
    pub defines: Vec<String>,

    /// Suppress a warning code, e.g. `W1182` or `1182` (repeatable)
    #[arg(long = "nowarn", value_name = "CODE")]
    pub nowarn: Vec<String>,

    /// Report warnings as errors
    #[arg(long = "warn-as-error")]
    pub warnings_as_errors: bool,
}

impl ProjectArgs {
    /// Project options for these arguments.
    pub fn options(&self) -> ProjectOptions {
        let options = ProjectOptions::new().with_warnings_as_errors(self.warnings_as_errors);
        let options = self
            .references
            .iter()
            .fold(options, |o, r| o.with_reference(r.as_str()));
        let options = self
            .defines
            .iter()
            .fold(options, |o, d| o.with_define(d.as_str()));
        self.nowarn
            .iter()
            .fold(options, |o, c| o.with_nowarn(c.as_str()))
    }
}

/// Log to stderr at DEBUG when `verbose` is set.
pub(crate) fn init_tracing(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
    }
}
