//! Diagnostic rendering with source context.
//!
//! Uses ariadne for the text format; [`JsonDiagnostic`] is the stable
//! machine-readable form.

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use glint_core::{Diagnostic, Severity};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// A diagnostic in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonDiagnostic {
    /// Source file path
    pub file: String,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
    /// End line number (1-based)
    pub end_line: u32,
    /// End column number (1-based)
    pub end_column: u32,
    /// Severity: "error", "warning" or "info"
    pub severity: Severity,
    /// Diagnostic code (e.g., "P0003", "E0039")
    pub code: String,
    /// Message
    pub message: String,
}

impl JsonDiagnostic {
    /// Convert a diagnostic found in `path`.
    pub fn new(path: &Path, diagnostic: &Diagnostic) -> Self {
        Self {
            file: path.display().to_string(),
            line: diagnostic.range.start.line + 1,
            column: diagnostic.range.start.character + 1,
            end_line: diagnostic.range.end.line + 1,
            end_column: diagnostic.range.end.character + 1,
            severity: diagnostic.severity,
            code: diagnostic.code.clone(),
            message: diagnostic.message.clone(),
        }
    }
}

/// JSON output structure for all diagnostics.
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    /// List of diagnostics
    pub diagnostics: Vec<JsonDiagnostic>,
    /// Total error count
    pub error_count: usize,
    /// Total warning count
    pub warning_count: usize,
}

/// Render diagnostics of one file with source snippets.
pub fn report_diagnostics<W: Write>(
    diagnostics: &[Diagnostic],
    source_path: &Path,
    source: &str,
    color: bool,
    writer: &mut W,
) -> std::io::Result<()> {
    let path_str = source_path.display().to_string();

    for diagnostic in diagnostics {
        let (kind, label_color) = match diagnostic.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
            Severity::Info => (ReportKind::Advice, Color::Blue),
        };
        let span = diagnostic.span.start..diagnostic.span.end.max(diagnostic.span.start);
        let label =
            Label::new((path_str.as_str(), span.clone())).with_message(&diagnostic.message);
        let label = if color {
            label.with_color(label_color)
        } else {
            label
        };

        Report::build(kind, (path_str.as_str(), span))
            .with_code(&diagnostic.code)
            .with_message(&diagnostic.message)
            .with_label(label)
            .with_config(
                Config::default()
                    .with_compact(false)
                    .with_color(color)
                    .with_index_type(IndexType::Byte),
            )
            .finish()
            .write((path_str.as_str(), Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

/// Print a summary of errors and warnings.
pub fn print_summary<W: Write>(
    errors: usize,
    warnings: usize,
    color: bool,
    writer: &mut W,
) -> std::io::Result<()> {
    let paint = |code: &str, mark: char| {
        if color {
            format!("\x1b[{code}m{mark}\x1b[0m")
        } else {
            mark.to_string()
        }
    };

    if errors == 0 && warnings == 0 {
        writeln!(writer, "{} No errors found", paint("32", '\u{2713}'))?;
    } else {
        let error_text = if errors == 1 { "error" } else { "errors" };
        let warning_text = if warnings == 1 { "warning" } else { "warnings" };

        if errors > 0 && warnings > 0 {
            writeln!(
                writer,
                "{} {errors} {error_text}, {warnings} {warning_text}",
                paint("31", '\u{2717}')
            )?;
        } else if errors > 0 {
            writeln!(writer, "{} {errors} {error_text}", paint("31", '\u{2717}'))?;
        } else {
            writeln!(writer, "{} {warnings} {warning_text}", paint("33", '\u{26A0}'))?;
        }
    }
    Ok(())
}
