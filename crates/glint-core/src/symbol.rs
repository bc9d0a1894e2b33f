//! Resolved symbols and their signatures.

use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a resolved entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// A value binding (including parameters and properties).
    Value,
    /// A function or method.
    Function,
    /// A type (record, class-like library type).
    Type,
    /// A module, namespace or referenced library.
    Module,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "val"),
            Self::Function => write!(f, "val"),
            Self::Type => write!(f, "type"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// One parameter of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Display form of the parameter type.
    pub ty: String,
    /// The argument may be omitted.
    pub optional: bool,
    /// The parameter absorbs any number of trailing arguments.
    pub variadic: bool,
}

impl Parameter {
    /// A required parameter.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            optional: false,
            variadic: false,
        }
    }

    /// Mark the parameter optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark the parameter variadic.
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "params ")?;
        }
        if self.optional {
            write!(f, "?")?;
        }
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// A callable signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Ordered parameters.
    pub parameters: Vec<Parameter>,
    /// Display form of the return type.
    pub return_type: String,
}

impl Signature {
    /// Create a signature.
    pub fn new(parameters: Vec<Parameter>, return_type: impl Into<String>) -> Self {
        Self {
            parameters,
            return_type: return_type.into(),
        }
    }

    /// Render as `name(a: t, b: u) : r`.
    pub fn render(&self, name: &str) -> String {
        let params: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
        format!("{name}({}) : {}", params.join(", "), self.return_type)
    }
}

/// A resolved entity owned by a symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Fully qualified name (`Outer.Inner.name`).
    pub name: String,
    /// Kind of entity.
    pub kind: SymbolKind,
    /// Display form of the declared or inferred type.
    pub signature: String,
    /// Overloads in declaration order (empty for non-callables).
    pub overloads: Vec<Signature>,
    /// Declaration site, if the entity is declared in the analyzed file.
    pub span: Option<Span>,
    /// Short documentation.
    pub doc: Option<String>,
}

impl Symbol {
    /// Create a symbol without overloads.
    pub fn new(name: impl Into<String>, kind: SymbolKind, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: signature.into(),
            overloads: Vec::new(),
            span: None,
            doc: None,
        }
    }

    /// The last segment of the qualified name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Attach a declaration site.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach overloads.
    #[must_use]
    pub fn with_overloads(mut self, overloads: Vec<Signature>) -> Self {
        self.overloads = overloads;
        self
    }

    /// Attach documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_render() {
        let sig = Signature::new(
            vec![
                Parameter::new("separator", "string"),
                Parameter::new("values", "string[]").variadic(),
            ],
            "string",
        );
        assert_eq!(
            sig.render("Join"),
            "Join(separator: string, params values: string[]) : string"
        );
    }

    #[test]
    fn test_simple_name() {
        let sym = Symbol::new("Geometry.area", SymbolKind::Function, "float -> float");
        assert_eq!(sym.simple_name(), "area");
        assert_eq!(Symbol::new("x", SymbolKind::Value, "int").simple_name(), "x");
    }
}
