//! Position-addressed queries against a [`TypedCheckResult`].
//!
//! Every query takes the caller's view of the current line so that a result
//! computed for older text can still be used: when the line no longer
//! matches, the engine logs the staleness and answers from what the result
//! knows. A position that resolves to nothing yields the empty variant, never
//! an error.

use glint_checker::TypedCheckResult;
use glint_core::{Position, Signature, Symbol, SymbolKind};
use glint_parser::{token_at, TokenKind};
use glint_project::Reference;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// What the caller knows about the query site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    /// The line's text as the editor currently has it.
    pub line_text: String,
    /// The dotted name under the cursor, e.g. `["System", "Math", "Max"]`.
    pub name_path: Vec<String>,
    /// Classification of the token under the cursor.
    pub token: TokenKind,
}

impl QueryContext {
    /// Create a context.
    pub fn new(line_text: impl Into<String>, name_path: Vec<String>, token: TokenKind) -> Self {
        Self {
            line_text: line_text.into(),
            name_path,
            token,
        }
    }

    /// Build a context from a line and a cursor column, taking the name path
    /// from the text around the cursor.
    pub fn from_line(line_text: &str, column: u32, token: TokenKind) -> Self {
        Self::new(line_text, name_path_at(line_text, column), token)
    }
}

/// Answer to a tooltip query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TooltipText {
    /// Nothing to show.
    NoInfo,
    /// A single entity.
    Symbol {
        /// Qualified name.
        name: String,
        /// Entity kind.
        symbol_kind: SymbolKind,
        /// Type or declaration display.
        signature: String,
        /// Documentation.
        #[serde(skip_serializing_if = "Option::is_none")]
        doc: Option<String>,
    },
    /// A method with several overloads, in declaration order.
    OverloadGroup {
        /// Qualified name.
        name: String,
        /// Candidate signatures.
        overloads: Vec<Signature>,
        /// Documentation.
        #[serde(skip_serializing_if = "Option::is_none")]
        doc: Option<String>,
    },
    /// A literal constant.
    Literal {
        /// Source text of the literal.
        text: String,
        /// Its type.
        ty: String,
    },
}

impl TooltipText {
    /// Describe a resolved symbol.
    pub fn from_symbol(symbol: Symbol) -> Self {
        if symbol.overloads.len() > 1 {
            Self::OverloadGroup {
                name: symbol.name,
                overloads: symbol.overloads,
                doc: symbol.doc,
            }
        } else {
            Self::Symbol {
                name: symbol.name,
                symbol_kind: symbol.kind,
                signature: symbol.signature,
                doc: symbol.doc,
            }
        }
    }

    /// Whether there is nothing to show.
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::NoInfo)
    }
}

impl fmt::Display for TooltipText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = match self {
            Self::NoInfo => return Ok(()),
            Self::Symbol {
                name,
                symbol_kind,
                signature,
                doc,
            } => {
                match symbol_kind {
                    SymbolKind::Value | SymbolKind::Function => {
                        write!(f, "val {} : {signature}", simple_name(name))?;
                    }
                    SymbolKind::Type | SymbolKind::Module => f.write_str(signature)?,
                }
                doc
            }
            Self::OverloadGroup {
                name,
                overloads,
                doc,
            } => {
                let rendered: Vec<String> = overloads
                    .iter()
                    .map(|o| o.render(simple_name(name)))
                    .collect();
                f.write_str(&rendered.join("\n"))?;
                doc
            }
            Self::Literal { text, ty } => return write!(f, "{text} : {ty}"),
        };
        match doc {
            Some(doc) => write!(f, "\n\n{doc}"),
            None => Ok(()),
        }
    }
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    /// Text to insert.
    pub name: String,
    /// Entity kind.
    pub kind: SymbolKind,
    /// Type or declaration display.
    pub detail: String,
}

impl CompletionItem {
    fn from_symbol(symbol: &Symbol) -> Self {
        let detail = match symbol.overloads.len() {
            0 | 1 => symbol.signature.clone(),
            n => format!("{} (+{} overloads)", symbol.signature, n - 1),
        };
        Self {
            name: symbol.simple_name().to_string(),
            kind: symbol.kind,
            detail,
        }
    }
}

/// The candidate signatures of a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MethodGroup {
    /// Simple name of the method.
    pub name: String,
    /// Overloads in declaration order.
    pub overloads: Vec<Signature>,
}

impl MethodGroup {
    /// Whether no call was found.
    pub fn is_empty(&self) -> bool {
        self.overloads.is_empty()
    }
}

/// Answers tooltip, completion and overload queries for one result.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    result: &'a TypedCheckResult,
}

impl<'a> QueryEngine<'a> {
    /// Query `result`.
    pub const fn new(result: &'a TypedCheckResult) -> Self {
        Self { result }
    }

    /// Whether the caller's text for the line at `position` differs from the
    /// text the result was computed from. A line the result does not have is
    /// stale.
    pub fn is_stale(&self, position: Position, line_text: &str) -> bool {
        self.result.tree().line_text(position.line) != Some(line_text)
    }

    /// Byte offset of `position` in the analyzed text, clamping a column past
    /// the end of its line to the line end and a missing line to the end of
    /// the text.
    fn offset(&self, position: Position) -> usize {
        let index = self.result.tree().line_index();
        if let Some(offset) = index.offset_of(position) {
            return offset;
        }
        match (
            index.line_start(position.line),
            index.line_text(position.line),
        ) {
            (Some(start), Some(line)) => start + line.len(),
            _ => index.text().len(),
        }
    }

    fn note_staleness(&self, query: &str, position: Position, line_text: &str) -> bool {
        let stale = self.is_stale(position, line_text);
        if stale {
            warn!(
                file = %self.result.tree().file().display(),
                line = position.line,
                query,
                "line text differs from analyzed text, answering best-effort"
            );
        }
        stale
    }

    // ===== Tooltip =====

    /// Describe what is under the cursor.
    pub fn tooltip(&self, position: Position, context: &QueryContext) -> TooltipText {
        let stale = self.note_staleness("tooltip", position, &context.line_text);
        let offset = self.offset(position);
        debug!(%position, offset, token = %context.token, path = ?context.name_path, "tooltip");

        match context.token {
            TokenKind::String if is_reference_line(&context.line_text) => {
                self.reference_tooltip(&context.line_text)
            }
            TokenKind::String | TokenKind::Number | TokenKind::Char | TokenKind::Keyword => {
                self.literal_tooltip(offset, context.token)
            }
            TokenKind::Identifier => self.symbol_tooltip(offset, &context.name_path, stale),
            _ => TooltipText::NoInfo,
        }
    }

    fn symbol_tooltip(&self, offset: usize, name_path: &[String], stale: bool) -> TooltipText {
        let by_position = || {
            if stale {
                None
            } else {
                self.result.symbol_at(offset).cloned()
            }
        };
        let segments: Vec<&str> = name_path.iter().map(String::as_str).collect();
        let by_path = || {
            if segments.is_empty() {
                None
            } else {
                self.result.resolve_path(&segments, offset)
            }
        };
        let symbol = if segments.len() > 1 {
            by_path().or_else(by_position)
        } else {
            by_position().or_else(by_path)
        };
        symbol.map_or(TooltipText::NoInfo, TooltipText::from_symbol)
    }

    fn literal_tooltip(&self, offset: usize, expected: TokenKind) -> TooltipText {
        let source = self.result.tree().source();
        let Some((kind, span)) = token_at(source, offset) else {
            return TooltipText::NoInfo;
        };
        if kind != expected {
            return TooltipText::NoInfo;
        }
        let text = span.text(source);
        let ty = match kind {
            TokenKind::String => "string",
            TokenKind::Char => "char",
            TokenKind::Number if text.contains(['.', 'e', 'E']) => "float",
            TokenKind::Number => "int",
            TokenKind::Keyword if text == "true" || text == "false" => "bool",
            _ => return TooltipText::NoInfo,
        };
        TooltipText::Literal {
            text: text.to_string(),
            ty: ty.to_string(),
        }
    }

    /// Describe the reference a `#r "..."` line names.
    fn reference_tooltip(&self, line_text: &str) -> TooltipText {
        let Some(argument) = quoted_argument(line_text) else {
            return TooltipText::NoInfo;
        };
        let context = self.result.context();
        let Some(reference) = context
            .references
            .iter()
            .find(|r| reference_matches(r, argument))
        else {
            return TooltipText::NoInfo;
        };

        let library = reference.library_name().unwrap_or(argument);
        let found = glint_checker::LIBRARIES.contains(&library);
        let signature = match (reference, found) {
            (Reference::Library(_), true) => format!("library {library}"),
            (Reference::Path(path), true) => format!("library {library} ({})", path.display()),
            (_, false) => format!("library {library} (not found)"),
        };
        TooltipText::Symbol {
            name: reference.to_string(),
            symbol_kind: SymbolKind::Module,
            signature,
            doc: None,
        }
    }

    // ===== Completions =====

    /// Candidates for the identifier being typed at `position`.
    ///
    /// With an empty `qualifying_path` these are the names in scope, preceded
    /// by the members of the receiver when the cursor follows a `.`. With a
    /// qualifying path they are the members of what the path resolves to.
    /// Candidates are filtered by a case-insensitive `partial` prefix, each
    /// name appears once, and each group is sorted by name.
    ///
    /// `is_stale` skips the lookups that trust positions in the analyzed text.
    pub fn completions(
        &self,
        position: Position,
        line_text: &str,
        qualifying_path: &[String],
        partial: &str,
        is_stale: bool,
    ) -> impl Iterator<Item = CompletionItem> {
        let stale = self.note_staleness("completions", position, line_text) || is_stale;
        let offset = self.offset(position);
        let segments: Vec<&str> = qualifying_path.iter().map(String::as_str).collect();

        let receiver_members = || {
            if stale {
                return Vec::new();
            }
            self.result
                .member_site_at(offset)
                .map(|site| self.result.members_of_receiver(&site.receiver))
                .unwrap_or_default()
        };
        let (members, scope) = if segments.is_empty() {
            (receiver_members(), self.result.visible_at(offset))
        } else {
            let members = self.result.members_of_path(&segments, offset);
            if members.is_empty() {
                (receiver_members(), Vec::new())
            } else {
                (members, Vec::new())
            }
        };

        let mut seen = HashSet::new();
        let mut items = completion_group(&members, partial, &mut seen);
        items.extend(completion_group(&scope, partial, &mut seen));
        debug!(
            %position,
            offset,
            path = ?qualifying_path,
            partial,
            stale,
            count = items.len(),
            "completions"
        );
        items.into_iter()
    }

    // ===== Method overloads =====

    /// The overloads of the call at `position`, or of `qualified_name` when
    /// the caller knows which method is being called.
    pub fn method_overloads(
        &self,
        position: Position,
        line_text: &str,
        qualified_name: Option<&[String]>,
    ) -> MethodGroup {
        self.note_staleness("method_overloads", position, line_text);
        let offset = self.offset(position);

        if let Some(path) = qualified_name.filter(|p| !p.is_empty()) {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            if let Some(overloads) = self.result.overloads_of_path(&segments, offset) {
                let name = segments.last().copied().unwrap_or_default();
                return MethodGroup {
                    name: name.to_string(),
                    overloads,
                };
            }
        }

        self.result
            .call_site_at(offset)
            .map(|call| MethodGroup {
                name: call.name.clone(),
                overloads: call.overloads.clone(),
            })
            .unwrap_or_default()
    }
}

fn completion_group(
    symbols: &[Symbol],
    partial: &str,
    seen: &mut HashSet<String>,
) -> Vec<CompletionItem> {
    let prefix = partial.to_lowercase();
    let mut items: Vec<CompletionItem> = symbols
        .iter()
        .filter(|s| {
            let name = s.simple_name();
            !name.is_empty() && name.to_lowercase().starts_with(&prefix)
        })
        .filter(|s| seen.insert(s.simple_name().to_string()))
        .map(CompletionItem::from_symbol)
        .collect();
    items.sort_by(|a, b| compare_names(&a.name, &b.name));
    items
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

/// The dotted name ending with the identifier under `column`.
pub fn name_path_at(line: &str, column: u32) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let col = (column as usize).min(chars.len());

    let mut end = col;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    let mut start = col;
    while start > 0 && (is_ident_char(chars[start - 1]) || chars[start - 1] == '.') {
        start -= 1;
    }

    chars[start..end]
        .iter()
        .collect::<String>()
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split the text before `column` into a qualifying path and the partial
/// identifier being typed: `System.Math.Sq` gives `(["System", "Math"], "Sq")`.
pub fn completion_path(line: &str, column: u32) -> (Vec<String>, String) {
    let chars: Vec<char> = line.chars().collect();
    let col = (column as usize).min(chars.len());

    let mut start = col;
    while start > 0 && (is_ident_char(chars[start - 1]) || chars[start - 1] == '.') {
        start -= 1;
    }

    let text: String = chars[start..col].iter().collect();
    let mut segments: Vec<&str> = text.split('.').collect();
    let partial = segments.pop().unwrap_or("").to_string();
    let qualifying = segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (qualifying, partial)
}

fn is_reference_line(line: &str) -> bool {
    line.trim_start()
        .strip_prefix("#r")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

fn quoted_argument(line: &str) -> Option<&str> {
    let start = line.find('"')? + 1;
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}

fn reference_matches(reference: &Reference, argument: &str) -> bool {
    match reference {
        Reference::Library(name) => name == argument.trim(),
        Reference::Path(path) => path.ends_with(argument.trim()),
    }
}
