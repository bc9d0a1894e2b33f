//! Implementation of the `glint-query` command.
//!
//! Positions on the command line are 1-based like compiler output; the JSON
//! answer uses the same shapes the language server sees.

use crate::cmd::{init_tracing, ProjectArgs};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glint_checker::TypedCheckResult;
use glint_core::Position;
use glint_service::{
    completion_path, CompilerFrontEnd, Coordinator, DefaultFrontEnd, QueryContext, QueryEngine,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Answer an editor query at a position in a glint source file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The file to query
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(subcommand)]
    pub query: Query,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// The query to answer.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Describe the entity or literal at a position
    Tooltip {
        /// Line (1-based)
        line: u32,
        /// Column (1-based)
        column: u32,
    },
    /// List completions for the identifier ending at a position
    Complete {
        /// Line (1-based)
        line: u32,
        /// Column (1-based)
        column: u32,
    },
    /// List the overloads of the call enclosing a position
    Overloads {
        /// Line (1-based)
        line: u32,
        /// Column (1-based)
        column: u32,
        /// Look up this dotted method name instead of the enclosing call
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
}

impl Query {
    /// Zero-based position of the query.
    pub fn position(&self) -> Position {
        let (Self::Tooltip { line, column }
        | Self::Complete { line, column }
        | Self::Overloads { line, column, .. }) = *self;
        Position::new(line.saturating_sub(1), column.saturating_sub(1))
    }
}

/// Answer `query` against a checked file, as JSON.
pub fn answer(
    query: &Query,
    result: &TypedCheckResult,
    front_end: &dyn CompilerFrontEnd,
) -> Result<serde_json::Value> {
    let position = query.position();
    let index = result.tree().line_index();
    let line = index.line_text(position.line).unwrap_or_default();
    let engine = QueryEngine::new(result);

    let value = match query {
        Query::Tooltip { .. } => {
            let token = front_end.classify(index, position);
            let context = QueryContext::from_line(line, position.character, token);
            serde_json::to_value(engine.tooltip(position, &context))?
        }
        Query::Complete { .. } => {
            let (path, partial) = completion_path(line, position.character);
            let items: Vec<_> = engine
                .completions(position, line, &path, &partial, false)
                .collect();
            serde_json::to_value(items)?
        }
        Query::Overloads { name, .. } => {
            let path: Option<Vec<String>> =
                name.as_ref().map(|n| n.split('.').map(str::to_string).collect());
            serde_json::to_value(engine.method_overloads(position, line, path.as_deref()))?
        }
    };
    Ok(value)
}

fn run(args: &Args) -> Result<ExitCode> {
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let front_end = Arc::new(DefaultFrontEnd::new(args.project.options()));
    let coordinator = Coordinator::new(Arc::clone(&front_end) as Arc<dyn CompilerFrontEnd>);
    let result = coordinator
        .check_file(&args.file, &source)
        .with_context(|| format!("failed to check {}", args.file.display()))?;

    let value = answer(&args.query, &result, &*front_end)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Main entry point for the query command.
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
