//! Named entities visible to a file: namespaces, modules, types and their
//! members, from referenced libraries and from the file itself.

use crate::catalog::{self, Catalog};
use crate::types::{Scheme, Type};
use glint_core::{Parameter, Signature, Span, Symbol, SymbolKind};

/// A method or constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Param {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub variadic: bool,
}

impl Param {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            optional: false,
            variadic: false,
        }
    }

    /// A `params` array parameter; `ty` is the array type.
    pub fn variadic(name: &str, ty: Type) -> Self {
        Self {
            variadic: true,
            ..Self::new(name, ty)
        }
    }

    fn parameter(&self) -> Parameter {
        let parameter = Parameter::new(&self.name, self.ty.to_string());
        match (self.optional, self.variadic) {
            (_, true) => parameter.variadic(),
            (true, false) => parameter.optional(),
            (false, false) => parameter,
        }
    }
}

/// One signature of a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Overload {
    pub params: Vec<Param>,
    pub ret: Type,
}

impl Overload {
    pub const fn new(params: Vec<Param>, ret: Type) -> Self {
        Self { params, ret }
    }

    pub fn signature(&self) -> Signature {
        Signature::new(
            self.params.iter().map(Param::parameter).collect(),
            self.ret.to_string(),
        )
    }

    /// Whether a call with `count` arguments could select this overload.
    pub fn accepts_arity(&self, count: usize) -> bool {
        let required = self.params.iter().filter(|p| !p.optional && !p.variadic).count();
        if self.params.last().is_some_and(|p| p.variadic) {
            count >= required
        } else {
            count >= required && count <= self.params.len()
        }
    }

    /// The overload as a first-class function taking a tuple.
    pub fn as_function(&self) -> Type {
        let param = match self.params.as_slice() {
            [] => Type::unit(),
            [single] => single.ty.clone(),
            many => Type::Tuple(many.iter().map(|p| p.ty.clone()).collect()),
        };
        Type::fun(param, self.ret.clone())
    }
}

/// What a member is.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MemberKind {
    /// A module-level value or function. `params` names curried parameters.
    Value { scheme: Scheme, params: Vec<String> },
    Method { is_static: bool, overloads: Vec<Overload> },
    Property { is_static: bool, ty: Type },
    /// A record field.
    Field { ty: Type },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub doc: Option<String>,
    pub span: Option<Span>,
}

impl Member {
    pub fn new(name: &str, kind: MemberKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            doc: None,
            span: None,
        }
    }

    #[must_use]
    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    /// Accessible through the entity name rather than an instance.
    pub const fn is_static(&self) -> bool {
        match &self.kind {
            MemberKind::Value { .. } => true,
            MemberKind::Method { is_static, .. } | MemberKind::Property { is_static, .. } => {
                *is_static
            }
            MemberKind::Field { .. } => false,
        }
    }

    /// Resolved symbol, qualified by `owner`.
    pub fn symbol(&self, owner: &str) -> Symbol {
        let name = qualify(owner, &self.name);
        let symbol = match &self.kind {
            MemberKind::Value { scheme, params } => {
                let ty = &scheme.ty;
                let signature = function_signature(ty, params);
                match signature {
                    Some(signature) => Symbol::new(name, SymbolKind::Function, ty.to_string())
                        .with_overloads(vec![signature]),
                    None => Symbol::new(name, SymbolKind::Value, ty.to_string()),
                }
            }
            MemberKind::Method { overloads, .. } => {
                let display = overloads
                    .first()
                    .map_or_else(String::new, |o| o.as_function().to_string());
                Symbol::new(name, SymbolKind::Function, display)
                    .with_overloads(overloads.iter().map(Overload::signature).collect())
            }
            MemberKind::Property { ty, .. } | MemberKind::Field { ty } => {
                Symbol::new(name, SymbolKind::Value, ty.to_string())
            }
        };
        let symbol = match self.span {
            Some(span) => symbol.with_span(span),
            None => symbol,
        };
        match &self.doc {
            Some(doc) => symbol.with_doc(doc.clone()),
            None => symbol,
        }
    }
}

/// Signature of a curried function, naming parameters from `names`.
pub(crate) fn function_signature(ty: &Type, names: &[String]) -> Option<Signature> {
    if ty.curried_params().is_empty() {
        return None;
    }
    // Render once so type variables are named consistently across parts.
    let mut parts = split_arrows(&ty.to_string());
    let ret = parts.pop().unwrap_or_default();
    let parameters = parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let name = names.get(i).cloned().unwrap_or_else(|| format!("arg{}", i + 1));
            Parameter::new(name, strip_parens(&part))
        })
        .collect();
    Some(Signature::new(parameters, ret))
}

/// `(a -> b)` becomes `a -> b`; `(a) * (b)` is left alone.
fn strip_parens(text: &str) -> &str {
    let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
        return text;
    };
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return text;
                }
            }
            _ => {}
        }
    }
    inner
}

/// Split a rendered type at its top-level arrows.
fn split_arrows(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with(" -> ") {
            if depth == 0 {
                parts.push(std::mem::take(&mut current));
            } else {
                current.push_str(" -> ");
            }
            rest = &rest[4..];
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(c);
        rest = &rest[c.len_utf8()..];
    }
    parts.push(current);
    parts
}

fn qualify(owner: &str, name: &str) -> String {
    if owner.is_empty() {
        name.to_string()
    } else {
        format!("{owner}.{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntityKind {
    Namespace,
    Module,
    Type,
}

/// A namespace, module or type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entity {
    /// Fully qualified path.
    pub path: String,
    pub kind: EntityKind,
    pub members: Vec<Member>,
    pub constructors: Vec<Overload>,
    /// Contents are visible without qualification.
    pub auto_open: bool,
    pub doc: Option<String>,
    pub span: Option<Span>,
}

impl Entity {
    pub fn new(path: &str, kind: EntityKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
            members: Vec::new(),
            constructors: Vec::new(),
            auto_open: false,
            doc: None,
            span: None,
        }
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Whether this is a record type declared in the analyzed file.
    pub fn is_record(&self) -> bool {
        self.kind == EntityKind::Type
            && self
                .members
                .iter()
                .any(|m| matches!(m.kind, MemberKind::Field { .. }))
    }

    pub fn symbol(&self) -> Symbol {
        let (kind, keyword) = match self.kind {
            EntityKind::Namespace => (SymbolKind::Module, "namespace"),
            EntityKind::Module => (SymbolKind::Module, "module"),
            EntityKind::Type => (SymbolKind::Type, "type"),
        };
        let mut symbol = Symbol::new(&self.path, kind, format!("{keyword} {}", self.path));
        if !self.constructors.is_empty() {
            symbol = symbol.with_overloads(self.constructors.iter().map(Overload::signature).collect());
        }
        if let Some(span) = self.span {
            symbol = symbol.with_span(span);
        }
        if let Some(doc) = &self.doc {
            symbol = symbol.with_doc(doc.clone());
        }
        symbol
    }
}

/// Primitive types and the library types that define their members.
const PRIMITIVES: &[(&str, &str)] = &[
    ("string", "System.String"),
    ("int", "System.Int32"),
    ("float", "System.Double"),
    ("bool", "System.Boolean"),
    ("char", "System.Char"),
    ("obj", "System.Object"),
];

/// Path of the entity that defines members for values of `ty`.
pub(crate) fn type_entity_path(ty: &Type) -> Option<String> {
    match ty {
        Type::Named { name, .. } => Some(
            PRIMITIVES
                .iter()
                .find(|(alias, _)| alias == name)
                .map_or_else(|| name.clone(), |(_, path)| (*path).to_string()),
        ),
        _ => None,
    }
}

/// The type of values of the entity at `path`.
pub(crate) fn entity_type(path: &str) -> Type {
    PRIMITIVES
        .iter()
        .find(|(_, full)| *full == path)
        .map_or_else(|| Type::named(path), |(alias, _)| Type::named(*alias))
}

/// Everything a file can name: enabled libraries plus its own modules and
/// records.
#[derive(Debug, Clone)]
pub(crate) struct World {
    catalog: &'static Catalog,
    libraries: Vec<String>,
    user: Vec<Entity>,
}

impl World {
    /// A world over the catalog libraries among `libraries`.
    pub fn new<'a>(libraries: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            catalog: catalog::get(),
            libraries: libraries.into_iter().map(str::to_string).collect(),
            user: Vec::new(),
        }
    }

    /// Whether the catalog provides a library of this name.
    pub fn knows_library(&self, name: &str) -> bool {
        self.catalog.has_library(name)
    }

    fn enabled(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.catalog
            .entities()
            .filter(|(library, _)| self.libraries.iter().any(|l| l.as_str() == *library))
            .map(|(_, entity)| entity)
    }

    fn all(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.user.iter().rev().chain(self.enabled())
    }

    /// The entity at a fully qualified path.
    pub fn entity(&self, path: &str) -> Option<&Entity> {
        self.all().find(|e| e.path == path)
    }

    /// Register a module or record declared in the file.
    pub fn declare(&mut self, entity: Entity) {
        self.user.push(entity);
    }

    /// A user entity, for adding members as declarations are checked.
    pub fn declared_mut(&mut self, path: &str) -> Option<&mut Entity> {
        self.user.iter_mut().rev().find(|e| e.path == path)
    }

    /// Entities one segment below `path` (`""` for top-level), without
    /// duplicates, user entities first.
    pub fn children(&self, path: &str) -> Vec<&Entity> {
        let mut out: Vec<&Entity> = Vec::new();
        for entity in self.all() {
            let parent = entity.path.rsplit_once('.').map_or("", |(parent, _)| parent);
            if parent == path && !out.iter().any(|e| e.path == entity.path) {
                out.push(entity);
            }
        }
        out
    }

    /// Entities whose contents are visible everywhere.
    pub fn auto_opened(&self) -> Vec<&Entity> {
        self.enabled().filter(|e| e.auto_open).collect()
    }

    /// Instance members available on values of `ty`, with the owning
    /// entity path. Members every object has come last.
    pub fn members_of_type(&self, ty: &Type) -> Vec<(String, &Member)> {
        let Some(path) = type_entity_path(ty) else {
            return Vec::new();
        };
        let mut out: Vec<(String, &Member)> = Vec::new();
        if let Some(entity) = self.entity(&path) {
            for member in entity.members.iter().filter(|m| !m.is_static()) {
                out.push((entity.path.clone(), member));
            }
        }
        if let Some(object) = self.catalog.object() {
            for member in object.members.iter().filter(|m| !m.is_static()) {
                if !out.iter().any(|(_, m)| m.name == member.name) {
                    out.push((object.path.clone(), member));
                }
            }
        }
        out
    }

    /// One instance member of `ty`.
    pub fn member_of_type(&self, ty: &Type, name: &str) -> Option<(String, &Member)> {
        self.members_of_type(ty)
            .into_iter()
            .find(|(_, m)| m.name == name)
    }

    /// The most recently declared record with a field called `field`.
    pub fn record_with_field(&self, field: &str) -> Option<&Entity> {
        self.user
            .iter()
            .rev()
            .find(|e| e.is_record() && e.member(field).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        let fixed = Overload::new(
            vec![Param::new("a", Type::int()), Param::new("b", Type::int())],
            Type::int(),
        );
        assert!(fixed.accepts_arity(2));
        assert!(!fixed.accepts_arity(1));
        assert!(!fixed.accepts_arity(3));

        let variadic = Overload::new(
            vec![
                Param::new("format", Type::string()),
                Param::variadic("args", Type::array(Type::obj())),
            ],
            Type::string(),
        );
        assert!(variadic.accepts_arity(1));
        assert!(variadic.accepts_arity(4));
        assert!(!variadic.accepts_arity(0));
    }

    #[test]
    fn test_function_signature_names_parameters() {
        let ty = Type::curried(
            [Type::fun(Type::Var(0), Type::Var(1)), Type::list(Type::Var(0))],
            Type::list(Type::Var(1)),
        );
        let names = vec!["mapping".to_string()];
        let sig = function_signature(&ty, &names).unwrap();
        assert_eq!(
            sig.render("map"),
            "map(mapping: 'a -> 'b, arg2: 'a list) : 'b list"
        );
        assert!(function_signature(&Type::int(), &[]).is_none());
        assert_eq!(strip_parens("(int * int) list"), "(int * int) list");
        assert_eq!(strip_parens("(a) * (b)"), "(a) * (b)");
    }

    #[test]
    fn test_primitive_entities() {
        assert_eq!(type_entity_path(&Type::string()).as_deref(), Some("System.String"));
        assert_eq!(
            type_entity_path(&Type::named("Geometry.Point")).as_deref(),
            Some("Geometry.Point")
        );
        assert_eq!(type_entity_path(&Type::Var(0)), None);
        assert_eq!(entity_type("System.Int32"), Type::int());
    }

    #[test]
    fn test_world_scoping_by_library() {
        let world = World::new(["Core", "System"]);
        assert!(world.entity("System.String").is_some());
        assert!(world.entity("System.Text.StringBuilder").is_none());
        assert!(world.knows_library("System.Text"));

        let world = World::new(["Core", "System", "System.Text"]);
        assert!(world.entity("System.Text.StringBuilder").is_some());
        let names: Vec<&str> = world.children("System").iter().map(|e| e.name()).collect();
        assert!(names.contains(&"String"));
        assert!(names.contains(&"Text"));
    }

    #[test]
    fn test_string_members_include_object_members_once() {
        let world = World::new(["Core", "System"]);
        let members = world.members_of_type(&Type::string());
        let names: Vec<&str> = members.iter().map(|(_, m)| m.name.as_str()).collect();
        assert!(names.contains(&"Substring"));
        assert!(names.contains(&"Length"));
        assert_eq!(names.iter().filter(|n| **n == "ToString").count(), 1);
        assert!(!names.contains(&"Concat"));
    }
}
