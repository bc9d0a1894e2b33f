//! The output of a check run and the position-addressed lookups queries
//! are answered from.

use crate::types::Type;
use crate::world::{Entity, MemberKind, World};
use glint_core::{Diagnostic, Signature, Span, Symbol};
use glint_parser::UntypedTree;
use glint_project::CompilationContext;
use std::sync::Arc;

/// Whether checking saw the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// The tree parsed cleanly.
    Complete,
    /// The tree carried syntax errors; results cover the recovered parts.
    Partial,
}

/// Symbols declared in the checked file, keyed by declaration site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<(Span, Symbol)>,
}

impl SymbolTable {
    pub(crate) fn insert(&mut self, site: Span, symbol: Symbol) {
        self.entries.push((site, symbol));
    }

    /// The symbol declared at `site`.
    pub fn get(&self, site: Span) -> Option<&Symbol> {
        self.entries
            .iter()
            .find(|(span, _)| *span == site)
            .map(|(_, symbol)| symbol)
    }

    /// The last symbol declared with this qualified or simple name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.entries
            .iter()
            .rev()
            .map(|(_, symbol)| symbol)
            .find(|s| s.name == name || s.simple_name() == name)
    }

    /// Declarations in source order.
    pub fn iter(&self) -> impl Iterator<Item = (Span, &Symbol)> {
        self.entries.iter().map(|(span, symbol)| (*span, symbol))
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A name in the source resolved to a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Span of the name.
    pub span: Span,
    /// What it refers to.
    pub symbol: Symbol,
    /// The name declares the symbol rather than using it.
    pub definition: bool,
}

/// A binding and the region it is visible in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    /// Offsets at which the binding can be named.
    pub visible: Span,
    /// The bound symbol.
    pub symbol: Symbol,
    /// Its type.
    pub ty: Type,
}

/// An `open` or enclosing module that makes `path` searchable in `region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Region {
    pub span: Span,
    pub path: String,
}

/// What sits to the left of a `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// A value of the given type.
    Value(Type),
    /// A namespace, module or type, by path.
    Entity(String),
}

/// A member access `receiver.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSite {
    /// Span of the `.`.
    pub dot: Span,
    /// Span of the member name, if one was written.
    pub name: Option<Span>,
    /// The whole access.
    pub span: Span,
    /// The receiver.
    pub receiver: Receiver,
}

impl MemberSite {
    /// Whether a cursor at `offset` is completing this member name.
    pub fn covers(&self, offset: usize) -> bool {
        match self.name {
            Some(name) => offset >= self.dot.end && name.touches(offset),
            None => offset == self.dot.end,
        }
    }
}

/// A parenthesized call `callee(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Span of the called expression.
    pub callee: Span,
    /// Span of the argument list, parentheses included.
    pub parens: Span,
    /// Simple name of the callee.
    pub name: String,
    /// Candidate signatures in declaration order.
    pub overloads: Vec<Signature>,
}

/// The typed view of one file.
///
/// Immutable once built; a re-check produces a new result.
#[derive(Debug, Clone)]
pub struct TypedCheckResult {
    pub(crate) tree: Arc<UntypedTree>,
    pub(crate) context: Arc<CompilationContext>,
    pub(crate) symbols: SymbolTable,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) status: CheckStatus,
    pub(crate) occurrences: Vec<Occurrence>,
    pub(crate) scopes: Vec<ScopeEntry>,
    pub(crate) regions: Vec<Region>,
    pub(crate) members: Vec<MemberSite>,
    pub(crate) calls: Vec<CallSite>,
    pub(crate) world: World,
}

impl TypedCheckResult {
    /// The tree this result was derived from.
    pub fn tree(&self) -> &Arc<UntypedTree> {
        &self.tree
    }

    /// The context this result was derived from.
    pub fn context(&self) -> &Arc<CompilationContext> {
        &self.context
    }

    /// Declarations of the file.
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Type-check diagnostics ordered by position. Syntax errors live on the
    /// tree.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Syntax and type diagnostics together, ordered by position.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut all = self.tree.diagnostics();
        all.extend(self.diagnostics.iter().cloned());
        all.sort_by_key(|d| d.span.start);
        all
    }

    /// Whether any diagnostic, syntax included, is an error.
    pub fn has_errors(&self) -> bool {
        self.tree.has_errors() || self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Completion status.
    pub const fn status(&self) -> CheckStatus {
        self.status
    }

    /// Resolved names in source order.
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// The symbol named at `offset`, preferring a name the offset is strictly
    /// inside of over one it ends.
    pub fn symbol_at(&self, offset: usize) -> Option<&Symbol> {
        let inside = self
            .occurrences
            .iter()
            .filter(|o| o.span.start <= offset && offset < o.span.end)
            .min_by_key(|o| o.span.len());
        inside
            .or_else(|| self.occurrences.iter().find(|o| o.span.end == offset))
            .map(|o| &o.symbol)
    }

    /// Bindings visible at `offset`, innermost first, one per name.
    pub fn scope_at(&self, offset: usize) -> Vec<&ScopeEntry> {
        let mut out: Vec<&ScopeEntry> = Vec::new();
        for entry in self.scopes.iter().rev() {
            if entry.visible.touches(offset)
                && !out
                    .iter()
                    .any(|e| e.symbol.simple_name() == entry.symbol.simple_name())
            {
                out.push(entry);
            }
        }
        out
    }

    /// Every name usable without qualification at `offset`: bindings,
    /// contents of opened and auto-opened entities, and top-level entities.
    pub fn visible_at(&self, offset: usize) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = self
            .scope_at(offset)
            .into_iter()
            .map(|e| e.symbol.clone())
            .collect();
        for path in self.search_prefixes(offset) {
            if path.is_empty() {
                out.extend(self.world.children("").into_iter().map(Entity::symbol));
            } else {
                out.extend(self.contents(&path));
            }
        }
        out
    }

    /// The member access a cursor at `offset` is completing.
    pub fn member_site_at(&self, offset: usize) -> Option<&MemberSite> {
        self.members
            .iter()
            .filter(|site| site.covers(offset))
            .min_by_key(|site| site.span.len())
    }

    /// Members of whatever is left of a `.`.
    pub fn members_of_receiver(&self, receiver: &Receiver) -> Vec<Symbol> {
        match receiver {
            Receiver::Value(ty) => self.members_of_type(ty),
            Receiver::Entity(path) => self.contents(path),
        }
    }

    /// Instance members of values of `ty`.
    pub fn members_of_type(&self, ty: &Type) -> Vec<Symbol> {
        self.world
            .members_of_type(ty)
            .into_iter()
            .map(|(owner, member)| member.symbol(&owner))
            .collect()
    }

    /// Members reachable through a dotted path as seen from `offset`: the
    /// contents of an entity, or the instance members of a value.
    pub fn members_of_path(&self, segments: &[&str], offset: usize) -> Vec<Symbol> {
        match self.walk_path(segments, offset) {
            Some(Step::Entity(path)) => self.contents(&path),
            Some(Step::Value(ty, _)) => self.members_of_type(&ty),
            Some(Step::Method(_)) | None => Vec::new(),
        }
    }

    /// The symbol a dotted path names as seen from `offset`.
    pub fn resolve_path(&self, segments: &[&str], offset: usize) -> Option<Symbol> {
        match self.walk_path(segments, offset)? {
            Step::Entity(path) => self.world.entity(&path).map(Entity::symbol),
            Step::Value(_, symbol) | Step::Method(symbol) => Some(symbol),
        }
    }

    /// Overloads of the callable a dotted path names.
    pub fn overloads_of_path(&self, segments: &[&str], offset: usize) -> Option<Vec<Signature>> {
        self.resolve_path(segments, offset)
            .map(|symbol| symbol.overloads)
            .filter(|overloads| !overloads.is_empty())
    }

    /// The innermost call whose argument list contains `offset`.
    pub fn call_site_at(&self, offset: usize) -> Option<&CallSite> {
        self.calls
            .iter()
            .filter(|call| call.parens.start < offset && offset <= call.parens.end)
            .min_by_key(|call| call.parens.len())
    }

    // ===== Path walking =====

    /// Paths searched for unqualified names at `offset`, most specific first.
    fn search_prefixes(&self, offset: usize) -> Vec<String> {
        let mut out: Vec<String> = self
            .regions
            .iter()
            .rev()
            .filter(|r| r.span.touches(offset))
            .map(|r| r.path.clone())
            .collect();
        out.push(String::new());
        out.extend(self.world.auto_opened().into_iter().map(|e| e.path.clone()));
        out
    }

    fn find_entity(&self, segments: &[&str], offset: usize) -> Option<String> {
        let joined = segments.join(".");
        self.search_prefixes(offset)
            .into_iter()
            .map(|prefix| {
                if prefix.is_empty() {
                    joined.clone()
                } else {
                    format!("{prefix}.{joined}")
                }
            })
            .find(|path| self.world.entity(path).is_some())
    }

    /// Static members and child entities of the entity at `path`.
    fn contents(&self, path: &str) -> Vec<Symbol> {
        let mut out = Vec::new();
        if let Some(entity) = self.world.entity(path) {
            out.extend(
                entity
                    .members
                    .iter()
                    .filter(|m| m.is_static())
                    .map(|m| m.symbol(&entity.path)),
            );
        }
        out.extend(self.world.children(path).into_iter().map(Entity::symbol));
        out
    }

    fn walk_path(&self, segments: &[&str], offset: usize) -> Option<Step> {
        let (head, rest) = segments.split_first()?;
        let step = if let Some(entry) = self
            .scope_at(offset)
            .into_iter()
            .find(|e| e.symbol.simple_name() == *head)
        {
            self.walk_value(entry.ty.clone(), entry.symbol.clone(), rest)?
        } else {
            // The longest prefix naming an entity.
            let (count, path) = (1..=segments.len())
                .rev()
                .find_map(|n| self.find_entity(&segments[..n], offset).map(|p| (n, p)))?;
            match segments.get(count) {
                None => Step::Entity(path),
                Some(name) => {
                    let entity = self.world.entity(&path)?;
                    let member = entity.member(name).filter(|m| m.is_static())?;
                    let symbol = member.symbol(&entity.path);
                    let rest = &segments[count + 1..];
                    match &member.kind {
                        MemberKind::Method { .. } if rest.is_empty() => Step::Method(symbol),
                        MemberKind::Method { .. } => return None,
                        MemberKind::Value { scheme, .. } => {
                            self.walk_value(scheme.ty.clone(), symbol, rest)?
                        }
                        MemberKind::Property { ty, .. } | MemberKind::Field { ty } => {
                            self.walk_value(ty.clone(), symbol, rest)?
                        }
                    }
                }
            }
        };
        Some(step)
    }

    fn walk_value(&self, mut ty: Type, mut symbol: Symbol, rest: &[&str]) -> Option<Step> {
        for (i, name) in rest.iter().enumerate() {
            let (owner, member) = self.world.member_of_type(&ty, name)?;
            symbol = member.symbol(&owner);
            match &member.kind {
                MemberKind::Method { .. } => {
                    return (i + 1 == rest.len()).then_some(Step::Method(symbol));
                }
                MemberKind::Property { ty: next, .. } | MemberKind::Field { ty: next } => {
                    ty = next.clone();
                }
                MemberKind::Value { scheme, .. } => ty = scheme.ty.clone(),
            }
        }
        Some(Step::Value(ty, symbol))
    }
}

enum Step {
    Entity(String),
    Value(Type, Symbol),
    Method(Symbol),
}
