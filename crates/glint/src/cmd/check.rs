//! Implementation of the `glint-check` command.

use crate::cmd::{init_tracing, ProjectArgs};
use crate::report::{self, JsonDiagnostic, JsonOutput};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glint_core::{Diagnostic, Severity};
use glint_service::{Coordinator, DefaultFrontEnd};
use rayon::prelude::*;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON output for IDE/tooling integration
    Json,
}

/// Check glint source files and report diagnostics.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The files to check
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Show verbose output including timing information
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output (just use exit code)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Diagnostics of one checked file.
struct Checked {
    path: PathBuf,
    source: String,
    diagnostics: Vec<Diagnostic>,
}

fn check_files(args: &Args) -> Result<Vec<Checked>> {
    let sources = args
        .files
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))
                .map(|source| (path.clone(), source))
        })
        .collect::<Result<Vec<_>>>()?;

    let coordinator = Coordinator::new(Arc::new(DefaultFrontEnd::new(args.project.options())));
    sources
        .into_par_iter()
        .map(|(path, source)| {
            let result = coordinator
                .check_file(&path, &source)
                .with_context(|| format!("failed to check {}", path.display()))?;
            Ok(Checked {
                diagnostics: result.all_diagnostics(),
                path,
                source,
            })
        })
        .collect()
}

fn run(args: &Args) -> Result<ExitCode> {
    let mut stdout = io::stdout().lock();
    let start = std::time::Instant::now();

    if args.verbose && !args.quiet {
        eprintln!("Checking {} file(s)...", args.files.len());
    }
    let checked = check_files(args)?;

    let count = |severity: Severity| {
        checked
            .iter()
            .flat_map(|c| &c.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let error_count = count(Severity::Error);
    let warning_count = count(Severity::Warning);

    match args.format {
        OutputFormat::Json => {
            let output = JsonOutput {
                diagnostics: checked
                    .iter()
                    .flat_map(|c| c.diagnostics.iter().map(|d| JsonDiagnostic::new(&c.path, d)))
                    .collect(),
                error_count,
                warning_count,
            };
            writeln!(stdout, "{}", serde_json::to_string_pretty(&output)?)?;
        }
        OutputFormat::Text if args.quiet => {}
        OutputFormat::Text => {
            let color = io::stdout().is_terminal();
            for file in &checked {
                report::report_diagnostics(
                    &file.diagnostics,
                    &file.path,
                    &file.source,
                    color,
                    &mut stdout,
                )?;
            }
            if args.verbose {
                writeln!(
                    stdout,
                    "\nChecked in {:.2}ms",
                    start.elapsed().as_secs_f64() * 1000.0
                )?;
            }
            report::print_summary(error_count, warning_count, color, &mut stdout)?;
        }
    }

    if error_count > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Main entry point for the check command.
pub fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let args = Args::try_parse_from([
            "glint-check",
            "a.glx",
            "b.glx",
            "-r",
            "System.Text",
            "--define",
            "DEBUG",
            "--nowarn",
            "W1182",
            "--warn-as-error",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.files, vec![PathBuf::from("a.glx"), PathBuf::from("b.glx")]);
        assert_eq!(args.project.references, vec!["System.Text"]);
        assert_eq!(args.project.defines, vec!["DEBUG"]);
        assert_eq!(args.project.nowarn, vec!["W1182"]);
        assert!(args.project.warnings_as_errors);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_file_is_required() {
        assert!(Args::try_parse_from(["glint-check"]).is_err());
    }
}
