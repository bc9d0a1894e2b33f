//! Type representation and unification.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// A unification variable.
pub type TypeVar = u32;

/// An inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Not yet known.
    Var(TypeVar),
    /// A named type with arguments: `int`, `'a list`, `System.Text.StringBuilder`.
    Named {
        /// Primitive name or fully qualified type path.
        name: String,
        /// Type arguments.
        args: Vec<Type>,
    },
    /// `a -> b`
    Fun(Box<Type>, Box<Type>),
    /// `a * b`
    Tuple(Vec<Type>),
    /// Produced after an error has been reported; unifies with anything.
    Error,
}

impl Type {
    /// A named type without arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// `int`
    pub fn int() -> Self {
        Self::named("int")
    }

    /// `float`
    pub fn float() -> Self {
        Self::named("float")
    }

    /// `string`
    pub fn string() -> Self {
        Self::named("string")
    }

    /// `bool`
    pub fn bool() -> Self {
        Self::named("bool")
    }

    /// `char`
    pub fn char() -> Self {
        Self::named("char")
    }

    /// `unit`
    pub fn unit() -> Self {
        Self::named("unit")
    }

    /// `obj`
    pub fn obj() -> Self {
        Self::named("obj")
    }

    /// `t list`
    pub fn list(element: Self) -> Self {
        Self::Named {
            name: "list".to_string(),
            args: vec![element],
        }
    }

    /// `t[]`
    pub fn array(element: Self) -> Self {
        Self::Named {
            name: "array".to_string(),
            args: vec![element],
        }
    }

    /// `param -> ret`
    pub fn fun(param: Self, ret: Self) -> Self {
        Self::Fun(Box::new(param), Box::new(ret))
    }

    /// `p1 -> p2 -> ... -> ret`
    pub fn curried(params: impl IntoIterator<Item = Self>, ret: Self) -> Self {
        let params: Vec<Self> = params.into_iter().collect();
        params
            .into_iter()
            .rev()
            .fold(ret, |acc, param| Self::fun(param, acc))
    }

    /// Whether this is the error type.
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Whether this is the named type `name` without arguments.
    pub fn is_named(&self, expected: &str) -> bool {
        matches!(self, Self::Named { name, args } if name == expected && args.is_empty())
    }

    /// Element type of `t[]`.
    pub fn array_element(&self) -> Option<&Self> {
        match self {
            Self::Named { name, args } if name == "array" && args.len() == 1 => Some(&args[0]),
            _ => None,
        }
    }

    /// Free variables in first-occurrence order.
    pub fn free_vars(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<TypeVar>) {
        match self {
            Self::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Self::Named { args, .. } | Self::Tuple(args) => {
                for arg in args {
                    arg.collect_vars(out);
                }
            }
            Self::Fun(param, ret) => {
                param.collect_vars(out);
                ret.collect_vars(out);
            }
            Self::Error => {}
        }
    }

    /// Replace variables according to `map`.
    pub fn substitute(&self, map: &HashMap<TypeVar, Self>) -> Self {
        match self {
            Self::Var(v) => map.get(v).cloned().unwrap_or_else(|| self.clone()),
            Self::Named { name, args } => Self::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            Self::Fun(param, ret) => Self::fun(param.substitute(map), ret.substitute(map)),
            Self::Tuple(items) => Self::Tuple(items.iter().map(|t| t.substitute(map)).collect()),
            Self::Error => Self::Error,
        }
    }

    /// Parameter types of a curried function, outermost first.
    pub fn curried_params(&self) -> Vec<&Self> {
        let mut params = Vec::new();
        let mut current = self;
        while let Self::Fun(param, ret) = current {
            params.push(&**param);
            current = ret;
        }
        params
    }

    fn write(&self, names: &mut Vec<TypeVar>, prec: u8, out: &mut String) {
        match self {
            Self::Var(v) => {
                let index = names.iter().position(|n| n == v).unwrap_or_else(|| {
                    names.push(*v);
                    names.len() - 1
                });
                out.push_str(&var_name(index));
            }
            Self::Error => out.push('?'),
            Self::Named { name, args } => match (name.as_str(), args.as_slice()) {
                (_, []) => out.push_str(display_name(name)),
                ("array", [element]) => {
                    element.write(names, 3, out);
                    out.push_str("[]");
                }
                (_, [arg]) => {
                    arg.write(names, 3, out);
                    out.push(' ');
                    out.push_str(display_name(name));
                }
                (_, args) => {
                    out.push_str(display_name(name));
                    out.push('<');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        arg.write(names, 0, out);
                    }
                    out.push('>');
                }
            },
            Self::Fun(param, ret) => {
                let parens = prec >= 1;
                if parens {
                    out.push('(');
                }
                param.write(names, 1, out);
                out.push_str(" -> ");
                ret.write(names, 0, out);
                if parens {
                    out.push(')');
                }
            }
            Self::Tuple(items) => {
                let parens = prec >= 2;
                if parens {
                    out.push('(');
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" * ");
                    }
                    item.write(names, 2, out);
                }
                if parens {
                    out.push(')');
                }
            }
        }
    }
}

/// Last path segment: `System.Text.StringBuilder` shows as `StringBuilder`.
fn display_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn var_name(index: usize) -> String {
    let letter = char::from(b'a' + (index % 26) as u8);
    if index < 26 {
        format!("'{letter}")
    } else {
        format!("'{letter}{}", index / 26)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write(&mut Vec::new(), 0, &mut out);
        f.write_str(&out)
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A possibly polymorphic type: `forall vars. ty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    /// Quantified variables.
    pub vars: Vec<TypeVar>,
    /// The body.
    pub ty: Type,
}

impl Scheme {
    /// A monomorphic scheme.
    pub const fn mono(ty: Type) -> Self {
        Self {
            vars: Vec::new(),
            ty,
        }
    }

    /// Quantify every variable of a closed type.
    pub fn poly(ty: Type) -> Self {
        Self {
            vars: ty.free_vars(),
            ty,
        }
    }
}

/// Two types that failed to unify, as they stood at the point of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// The type required by the context.
    pub expected: Type,
    /// The type the expression has.
    pub found: Type,
}

/// Substitution built up during inference.
#[derive(Debug, Clone, Default)]
pub struct TypeStore {
    bindings: Vec<Option<Type>>,
}

impl TypeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh unbound variable.
    pub fn fresh(&mut self) -> Type {
        let id = self.bindings.len() as TypeVar;
        self.bindings.push(None);
        Type::Var(id)
    }

    fn binding(&self, var: TypeVar) -> Option<&Type> {
        self.bindings.get(var as usize).and_then(Option::as_ref)
    }

    /// Follow bound variables at the head of `ty`.
    pub fn shallow(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        while let Type::Var(v) = current {
            match self.binding(v) {
                Some(bound) => current = bound.clone(),
                None => break,
            }
        }
        current
    }

    /// Apply the substitution everywhere in `ty`.
    pub fn zonk(&self, ty: &Type) -> Type {
        match self.shallow(ty) {
            Type::Named { name, args } => Type::Named {
                name,
                args: args.iter().map(|a| self.zonk(a)).collect(),
            },
            Type::Fun(param, ret) => Type::fun(self.zonk(&param), self.zonk(&ret)),
            Type::Tuple(items) => Type::Tuple(items.iter().map(|t| self.zonk(t)).collect()),
            other => other,
        }
    }

    /// Make `expected` and `found` equal, binding variables as needed.
    pub fn unify(&mut self, expected: &Type, found: &Type) -> Result<(), Mismatch> {
        if self.unify_inner(expected, found) {
            Ok(())
        } else {
            Err(Mismatch {
                expected: self.zonk(expected),
                found: self.zonk(found),
            })
        }
    }

    /// Whether the two types would unify, leaving the store untouched.
    pub fn unifies(&self, expected: &Type, found: &Type) -> bool {
        self.clone().unify_inner(expected, found)
    }

    fn unify_inner(&mut self, a: &Type, b: &Type) -> bool {
        let a = self.shallow(a);
        let b = self.shallow(b);
        match (&a, &b) {
            (Type::Error, _) | (_, Type::Error) => true,
            (Type::Var(x), Type::Var(y)) if x == y => true,
            (Type::Var(v), other) | (other, Type::Var(v)) => {
                if self.occurs(*v, other) {
                    return false;
                }
                self.bindings[*v as usize] = Some(other.clone());
                true
            }
            (
                Type::Named { name: n1, args: a1 },
                Type::Named { name: n2, args: a2 },
            ) => {
                n1 == n2
                    && a1.len() == a2.len()
                    && a1.iter().zip(a2).all(|(x, y)| self.unify_inner(x, y))
            }
            (Type::Fun(p1, r1), Type::Fun(p2, r2)) => {
                self.unify_inner(p1, p2) && self.unify_inner(r1, r2)
            }
            (Type::Tuple(x), Type::Tuple(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(s, t)| self.unify_inner(s, t))
            }
            _ => false,
        }
    }

    fn occurs(&self, var: TypeVar, ty: &Type) -> bool {
        match self.shallow(ty) {
            Type::Var(v) => v == var,
            Type::Named { args, .. } | Type::Tuple(args) => {
                args.iter().any(|a| self.occurs(var, a))
            }
            Type::Fun(param, ret) => self.occurs(var, &param) || self.occurs(var, &ret),
            Type::Error => false,
        }
    }

    /// Replace the quantified variables of `scheme` with fresh ones.
    pub fn instantiate(&mut self, scheme: &Scheme) -> Type {
        if scheme.vars.is_empty() {
            return scheme.ty.clone();
        }
        let map: HashMap<TypeVar, Type> = scheme
            .vars
            .iter()
            .map(|v| (*v, self.fresh()))
            .collect();
        scheme.ty.substitute(&map)
    }

    /// Quantify every variable still free in `ty`.
    pub fn generalize(&self, ty: &Type) -> Scheme {
        Scheme::poly(self.zonk(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let a = Type::Var(7);
        let b = Type::Var(3);
        let map = Type::curried(
            [Type::fun(a.clone(), b.clone()), Type::list(a)],
            Type::list(b),
        );
        assert_eq!(map.to_string(), "('a -> 'b) -> 'a list -> 'b list");

        let pair = Type::Tuple(vec![Type::int(), Type::Tuple(vec![Type::string(), Type::bool()])]);
        assert_eq!(pair.to_string(), "int * (string * bool)");
        assert_eq!(Type::fun(pair, Type::unit()).to_string(), "int * (string * bool) -> unit");
        assert_eq!(Type::array(Type::obj()).to_string(), "obj[]");
        assert_eq!(Type::named("System.Text.StringBuilder").to_string(), "StringBuilder");
        assert_eq!(
            Type::list(Type::Tuple(vec![Type::int(), Type::int()])).to_string(),
            "(int * int) list"
        );
    }

    #[test]
    fn test_unify_binds_and_zonks() {
        let mut store = TypeStore::new();
        let a = store.fresh();
        let b = store.fresh();
        store
            .unify(&Type::fun(a.clone(), Type::int()), &Type::fun(Type::string(), b.clone()))
            .unwrap();
        assert_eq!(store.zonk(&a), Type::string());
        assert_eq!(store.zonk(&b), Type::int());
    }

    #[test]
    fn test_unify_mismatch_reports_outer_types() {
        let mut store = TypeStore::new();
        let err = store
            .unify(&Type::list(Type::int()), &Type::list(Type::string()))
            .unwrap_err();
        assert_eq!(err.expected.to_string(), "int list");
        assert_eq!(err.found.to_string(), "string list");
    }

    #[test]
    fn test_occurs_check() {
        let mut store = TypeStore::new();
        let a = store.fresh();
        assert!(store.unify(&a, &Type::list(a.clone())).is_err());
    }

    #[test]
    fn test_error_absorbs() {
        let mut store = TypeStore::new();
        assert!(store.unify(&Type::Error, &Type::int()).is_ok());
        assert!(store.unify(&Type::string(), &Type::Error).is_ok());
    }

    #[test]
    fn test_unifies_leaves_store_untouched() {
        let mut store = TypeStore::new();
        let a = store.fresh();
        assert!(store.unifies(&a, &Type::int()));
        assert_eq!(store.zonk(&a), a);
        assert!(!store.unifies(&Type::int(), &Type::string()));
    }

    #[test]
    fn test_instantiate_and_generalize() {
        let mut store = TypeStore::new();
        let id = Scheme::poly(Type::fun(Type::Var(0), Type::Var(0)));
        let first = store.instantiate(&id);
        let second = store.instantiate(&id);
        assert_ne!(first, second);
        store
            .unify(&first, &Type::fun(Type::int(), Type::int()))
            .unwrap();
        assert_eq!(store.zonk(&second).to_string(), "'a -> 'a");

        let scheme = store.generalize(&second);
        assert_eq!(scheme.vars.len(), 1);
    }
}
