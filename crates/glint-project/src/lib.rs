//! Compilation context resolution for glint.
//!
//! A source file is analyzed on its own: everything the checker needs to
//! know about the surrounding project is folded into a
//! [`CompilationContext`] derived from the file path, its text and optional
//! [`ProjectOptions`].
//!
//! # Features
//!
//! - Script or module mode from the file extension
//! - Implicit `Core` and `System` references
//! - `#r`, `#load`, `#nowarn` and `#define` directives, honoring `#if` regions
//! - Malformed directives recorded, never fatal
//!
//! # Example
//!
//! ```
//! use glint_project::{resolve, Reference};
//! use std::path::Path;
//!
//! let context = resolve(Path::new("demo.glx"), "#r \"System.Text\"\nlet x = 1");
//! assert!(context.is_script());
//! assert!(context.references.contains(&Reference::Library("System.Text".into())));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod directives;
mod options;

pub use options::ProjectOptions;

use directives::RawDirective;
use glint_core::{SourceKind, Span};
use glint_parser::ParseOptions;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Libraries every file references.
pub const IMPLICIT_REFERENCES: &[&str] = &["Core", "System"];

/// A referenced library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum Reference {
    /// A library known by name.
    Library(String),
    /// A library file on disk.
    Path(PathBuf),
}

impl Reference {
    /// Interpret a reference argument.
    ///
    /// Arguments containing a path separator or ending in `.dll` are files,
    /// resolved against `base_dir`; anything else names a library.
    pub fn parse(raw: &str, base_dir: &Path) -> Self {
        let raw = raw.trim();
        let is_file = raw.contains(['/', '\\'])
            || Path::new(raw)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dll"));
        if is_file {
            Self::Path(base_dir.join(raw))
        } else {
            Self::Library(raw.to_string())
        }
    }

    /// The library name this reference provides: the name itself, or the
    /// file stem for paths.
    pub fn library_name(&self) -> Option<&str> {
        match self {
            Self::Library(name) => Some(name),
            Self::Path(path) => path.file_stem().and_then(|s| s.to_str()),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library(name) => f.write_str(name),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Why a directive was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// Not a directive the resolver knows.
    UnknownDirective,
    /// Missing, extra or wrongly quoted arguments.
    MalformedArguments,
    /// A `#nowarn` argument that is not a warning number.
    InvalidWarningCode,
}

/// A directive that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveProblem {
    /// What went wrong.
    pub kind: ProblemKind,
    /// Directive name including the hash.
    pub directive: String,
    /// Human readable detail.
    pub message: String,
    /// Location in the file.
    pub span: Span,
}

impl fmt::Display for DirectiveProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.directive, self.message)
    }
}

/// Everything needed to parse and check one file in isolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationContext {
    /// The analyzed file.
    pub file: PathBuf,
    /// Script or module.
    pub kind: SourceKind,
    /// Referenced libraries, first-seen order, without duplicates.
    pub references: Vec<Reference>,
    /// Conditional compilation symbols.
    pub defines: Vec<String>,
    /// Suppressed warning codes, normalized to `W####`.
    pub nowarn: Vec<String>,
    /// Report warnings as errors.
    pub warnings_as_errors: bool,
    /// `#load` targets.
    pub loads: Vec<PathBuf>,
    /// Directives that were recorded but not applied.
    pub unresolved: Vec<DirectiveProblem>,
}

impl CompilationContext {
    fn new(file: &Path, kind: SourceKind, warnings_as_errors: bool) -> Self {
        Self {
            file: file.to_path_buf(),
            kind,
            references: Vec::new(),
            defines: Vec::new(),
            nowarn: Vec::new(),
            warnings_as_errors,
            loads: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    /// Whether the file is a script.
    pub fn is_script(&self) -> bool {
        self.kind == SourceKind::Script
    }

    /// Whether a warning code is suppressed.
    pub fn suppresses(&self, code: &str) -> bool {
        self.nowarn.iter().any(|c| c == code)
    }

    /// Names of all referenced libraries.
    pub fn library_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.references.iter().filter_map(Reference::library_name)
    }

    /// Parser settings implied by this context.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            kind: self.kind,
            defines: self.defines.clone(),
        }
    }

    fn add_reference(&mut self, reference: Reference) {
        push_unique(&mut self.references, reference);
    }

    fn problem(&mut self, kind: ProblemKind, directive: &RawDirective, span: Span, message: &str) {
        self.unresolved.push(DirectiveProblem {
            kind,
            directive: format!("#{}", directive.name),
            message: message.to_string(),
            span,
        });
    }

    fn apply(&mut self, directive: &RawDirective, base_dir: &Path) {
        match directive.name.as_str() {
            // Rejected by the parser in module files.
            "r" | "load" if self.kind == SourceKind::Module => {}
            "r" => match directive.args.as_slice() {
                [arg] if arg.quoted && !arg.text.trim().is_empty() => {
                    self.add_reference(Reference::parse(&arg.text, base_dir));
                }
                _ => self.problem(
                    ProblemKind::MalformedArguments,
                    directive,
                    directive.span,
                    "expected one quoted library name or path",
                ),
            },
            "load" => {
                if directive.args.is_empty() || directive.args.iter().any(|a| !a.quoted) {
                    self.problem(
                        ProblemKind::MalformedArguments,
                        directive,
                        directive.span,
                        "expected quoted file paths",
                    );
                    return;
                }
                for arg in &directive.args {
                    push_unique(&mut self.loads, base_dir.join(&arg.text));
                }
            }
            "nowarn" => {
                if directive.args.is_empty() {
                    self.problem(
                        ProblemKind::MalformedArguments,
                        directive,
                        directive.span,
                        "expected at least one warning number",
                    );
                }
                for arg in &directive.args {
                    match normalize_warning(&arg.text) {
                        Some(code) => push_unique(&mut self.nowarn, code),
                        None => self.problem(
                            ProblemKind::InvalidWarningCode,
                            directive,
                            arg.span,
                            &format!("'{}' is not a warning number", arg.text),
                        ),
                    }
                }
            }
            "define" => match directive.args.as_slice() {
                [arg] if !arg.quoted && is_symbol(&arg.text) => {
                    push_unique(&mut self.defines, arg.text.clone());
                }
                _ => self.problem(
                    ProblemKind::MalformedArguments,
                    directive,
                    directive.span,
                    "expected one symbol name",
                ),
            },
            _ => self.problem(
                ProblemKind::UnknownDirective,
                directive,
                directive.span,
                "unrecognized directive",
            ),
        }
    }
}

/// Resolve a file with default project options.
pub fn resolve(path: &Path, source: &str) -> CompilationContext {
    resolve_with(path, source, &ProjectOptions::default())
}

/// Resolve a file layered over caller-supplied project options.
///
/// Never fails: directives that cannot be applied are recorded in
/// [`CompilationContext::unresolved`].
pub fn resolve_with(path: &Path, source: &str, options: &ProjectOptions) -> CompilationContext {
    let kind = options.kind.unwrap_or_else(|| SourceKind::from_path(path));
    let base_dir = options
        .base_dir
        .clone()
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let mut context = CompilationContext::new(path, kind, options.warnings_as_errors);
    for name in IMPLICIT_REFERENCES {
        context.add_reference(Reference::Library((*name).to_string()));
    }
    for raw in &options.references {
        context.add_reference(Reference::parse(raw, &base_dir));
    }
    for symbol in &options.defines {
        push_unique(&mut context.defines, symbol.clone());
    }
    for code in &options.nowarn {
        match normalize_warning(code) {
            Some(code) => push_unique(&mut context.nowarn, code),
            None => warn!(code = %code, "ignoring invalid nowarn option"),
        }
    }

    // Active flag per open `#if`.
    let mut regions: Vec<bool> = Vec::new();
    for directive in directives::scan(source) {
        match directive.name.as_str() {
            "if" => {
                let on = directive
                    .args
                    .first()
                    .is_some_and(|arg| context.defines.contains(&arg.text));
                regions.push(on);
            }
            "else" => {
                if let Some(top) = regions.last_mut() {
                    *top = !*top;
                }
            }
            "endif" => {
                regions.pop();
            }
            _ if regions.iter().all(|&on| on) => context.apply(&directive, &base_dir),
            _ => {}
        }
    }

    debug!(
        file = %path.display(),
        kind = %context.kind,
        references = context.references.len(),
        unresolved = context.unresolved.len(),
        "resolved compilation context"
    );
    context
}

/// `"20"`, `"0020"` and `"W0020"` all become `W0020`.
fn normalize_warning(code: &str) -> Option<String> {
    let code = code.trim();
    let digits = code
        .strip_prefix('W')
        .or_else(|| code.strip_prefix('w'))
        .unwrap_or(code);
    if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u16 = digits.parse().ok()?;
    Some(format!("W{number:04}"))
}

fn is_symbol(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
