//! Untyped syntax tree nodes.
//!
//! Every node carries the byte [`Span`] it was parsed from. Nodes produced by
//! error recovery are still well-formed: a missing expression becomes
//! [`ExprKind::Error`], a member access with no name keeps its receiver.

use glint_core::Span;
use std::fmt;

/// An identifier with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// The identifier text.
    pub text: String,
    /// Source span.
    pub span: Span,
}

impl Ident {
    /// Create an identifier.
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A dotted name such as `System.Text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongIdent {
    /// Segments in order; never empty.
    pub parts: Vec<Ident>,
}

impl LongIdent {
    /// Source span covering all segments.
    pub fn span(&self) -> Span {
        match (self.parts.first(), self.parts.last()) {
            (Some(first), Some(last)) => first.span.merge(&last.span),
            _ => Span::default(),
        }
    }

    /// Segment texts.
    pub fn segments(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }

    /// Whether this names a single segment equal to `name`.
    pub fn is(&self, name: &str) -> bool {
        self.parts.len() == 1 && self.parts[0].text == name
    }
}

impl fmt::Display for LongIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("."))
    }
}

/// A top-level or module-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// What is declared.
    pub kind: DeclKind,
    /// Source span.
    pub span: Span,
}

/// Declaration variants.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// `let [rec] name params = body`
    Let(Binding),
    /// `open A.B`
    Open(LongIdent),
    /// `module Name =` followed by an indented block.
    Module {
        /// Module name.
        name: Ident,
        /// Nested declarations.
        decls: Vec<Decl>,
    },
    /// `type Name = ...`
    Type {
        /// Type name.
        name: Ident,
        /// Definition.
        repr: TypeRepr,
    },
    /// `#name args`
    Directive(Directive),
    /// A bare expression or `do expr`.
    Do(Expr),
    /// Unparseable input skipped by recovery.
    Error,
}

/// The right-hand side of a type definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRepr {
    /// `{ F: t; ... }`
    Record(Vec<FieldDecl>),
    /// `type Name = t`
    Abbrev(TypeExpr),
}

/// A record field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Field name.
    pub name: Ident,
    /// Field type.
    pub ty: TypeExpr,
}

/// A hash directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive name without the hash (`r`, `load`, ...).
    pub name: Ident,
    /// Arguments: unquoted string literal contents or bare identifiers.
    pub args: Vec<Ident>,
    /// Source span of the whole directive.
    pub span: Span,
}

/// A `let` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// `let rec`.
    pub is_rec: bool,
    /// The bound name or pattern.
    pub head: Pattern,
    /// Parameters for function bindings (empty for values).
    pub params: Vec<Pattern>,
    /// Return type annotation.
    pub ret: Option<TypeExpr>,
    /// The bound expression.
    pub body: Expr,
    /// Span of the whole binding, `let` keyword included.
    pub span: Span,
}

impl Binding {
    /// The bound name when the head is a plain identifier.
    pub fn name(&self) -> Option<&Ident> {
        match &self.head.kind {
            PatternKind::Named(id) => Some(id),
            PatternKind::Typed(inner, _) => match &inner.kind {
                PatternKind::Named(id) => Some(id),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether this binding defines a function.
    pub fn is_function(&self) -> bool {
        !self.params.is_empty()
    }
}

/// A pattern in a binding position.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Pattern variant.
    pub kind: PatternKind,
    /// Source span.
    pub span: Span,
}

/// Pattern variants.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// `x`
    Named(Ident),
    /// `_`
    Wildcard,
    /// `()`
    Unit,
    /// `(a, b)`
    Tuple(Vec<Pattern>),
    /// `(p: t)`
    Typed(Box<Pattern>, TypeExpr),
    /// Recovered from invalid input.
    Error,
}

impl Pattern {
    /// All identifiers bound by the pattern, left to right.
    pub fn bound_names(&self) -> Vec<&Ident> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a Ident>) {
        match &self.kind {
            PatternKind::Named(id) => out.push(id),
            PatternKind::Tuple(items) => {
                for item in items {
                    item.collect_names(out);
                }
            }
            PatternKind::Typed(inner, _) => inner.collect_names(out),
            PatternKind::Wildcard | PatternKind::Unit | PatternKind::Error => {}
        }
    }
}

/// A type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    /// Type variant.
    pub kind: TypeExprKind,
    /// Source span.
    pub span: Span,
}

/// Type annotation variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `int`, `System.String`
    Named(LongIdent),
    /// `'a`
    Var(Ident),
    /// Postfix application: `int list`.
    App {
        /// The argument type.
        arg: Box<TypeExpr>,
        /// The constructor (`list`, `option`, ...).
        ctor: LongIdent,
    },
    /// `t[]`
    Array(Box<TypeExpr>),
    /// `a -> b`
    Fun(Box<TypeExpr>, Box<TypeExpr>),
    /// `a * b`
    Tuple(Vec<TypeExpr>),
    /// Recovered from invalid input.
    Error,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression variant.
    pub kind: ExprKind,
    /// Source span.
    pub span: Span,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal (unescaped contents).
    String(String),
    /// Character literal.
    Char(char),
    /// `true` / `false`.
    Bool(bool),
    /// `()`.
    Unit,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `|>`
    Pipe,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `^`
    Concat,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// Operator text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pipe => "|>",
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Concat => "^",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }

    /// Whether the operator compares its operands.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }
}

/// A record construction field.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    /// Field name.
    pub name: Ident,
    /// Field value.
    pub value: Expr,
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal.
    Lit(Literal),
    /// A simple name.
    Ident(Ident),
    /// `target.name`; `name` is `None` when the member name is still missing.
    Member {
        /// The receiver or qualifier.
        target: Box<Expr>,
        /// Span of the `.` token.
        dot: Span,
        /// Member name.
        name: Option<Ident>,
    },
    /// High-precedence call `f(a, b)`.
    Call {
        /// Called expression.
        callee: Box<Expr>,
        /// Arguments inside the parentheses.
        args: Vec<Expr>,
        /// Span of the parenthesized argument list.
        parens: Span,
    },
    /// Juxtaposition `f x`.
    App {
        /// Function.
        func: Box<Expr>,
        /// Argument.
        arg: Box<Expr>,
    },
    /// Prefix minus.
    Neg(Box<Expr>),
    /// Infix operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Span of the operator token.
        op_span: Span,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `if c then a [else b]`
    If {
        /// Condition.
        cond: Box<Expr>,
        /// Then branch.
        then_branch: Box<Expr>,
        /// Else branch.
        else_branch: Option<Box<Expr>>,
    },
    /// `fun p -> e`
    Lambda {
        /// Parameters.
        params: Vec<Pattern>,
        /// Body.
        body: Box<Expr>,
    },
    /// `let b in e`, or a `let` statement scoping over the rest of a block.
    LetIn {
        /// The binding.
        binding: Box<Binding>,
        /// Scope of the binding.
        body: Box<Expr>,
    },
    /// Two statements of a block.
    Sequential(Box<Expr>, Box<Expr>),
    /// `a, b`
    Tuple(Vec<Expr>),
    /// `[a; b]`
    List(Vec<Expr>),
    /// `{ F = e; ... }`
    Record(Vec<RecordField>),
    /// `(e)`
    Paren(Box<Expr>),
    /// `(e : t)`
    Typed(Box<Expr>, TypeExpr),
    /// Recovered from invalid or missing input.
    Error,
}

impl Expr {
    /// Create an expression node.
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// An error node at `span`.
    pub const fn error(span: Span) -> Self {
        Self::new(ExprKind::Error, span)
    }

    /// Direct sub-expressions in source order.
    pub fn children(&self) -> Vec<&Self> {
        match &self.kind {
            ExprKind::Lit(_) | ExprKind::Ident(_) | ExprKind::Error => Vec::new(),
            ExprKind::Member { target, .. } => vec![&**target],
            ExprKind::Call { callee, args, .. } => {
                let mut out = vec![&**callee];
                out.extend(args);
                out
            }
            ExprKind::App { func, arg } => vec![&**func, &**arg],
            ExprKind::Neg(inner) | ExprKind::Paren(inner) | ExprKind::Typed(inner, _) => {
                vec![&**inner]
            }
            ExprKind::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut out = vec![&**cond, &**then_branch];
                out.extend(else_branch.as_deref());
                out
            }
            ExprKind::Lambda { body, .. } => vec![&**body],
            ExprKind::LetIn { binding, body } => vec![&binding.body, &**body],
            ExprKind::Sequential(first, second) => vec![&**first, &**second],
            ExprKind::Tuple(items) | ExprKind::List(items) => items.iter().collect(),
            ExprKind::Record(fields) => fields.iter().map(|f| &f.value).collect(),
        }
    }

    /// The dotted name this expression spells, if it is an identifier chain
    /// such as `System.String.Concat`.
    pub fn long_name(&self) -> Option<Vec<&Ident>> {
        match &self.kind {
            ExprKind::Ident(id) => Some(vec![id]),
            ExprKind::Member {
                target,
                name: Some(name),
                ..
            } => {
                let mut parts = target.long_name()?;
                parts.push(name);
                Some(parts)
            }
            _ => None,
        }
    }
}

/// Visit every expression in `decls` in pre-order.
pub fn walk_decls<'a>(decls: &'a [Decl], f: &mut impl FnMut(&'a Expr)) {
    for decl in decls {
        match &decl.kind {
            DeclKind::Let(binding) => walk_expr(&binding.body, f),
            DeclKind::Module { decls, .. } => walk_decls(decls, f),
            DeclKind::Do(expr) => walk_expr(expr, f),
            DeclKind::Open(_) | DeclKind::Type { .. } | DeclKind::Directive(_) | DeclKind::Error => {
            }
        }
    }
}

/// Visit `expr` and its descendants in pre-order.
pub fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    for child in expr.children() {
        walk_expr(child, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str, start: usize) -> Expr {
        let span = Span::new(start, start + text.len());
        Expr::new(ExprKind::Ident(Ident::new(text, span)), span)
    }

    #[test]
    fn test_long_name() {
        let target = ident("String", 0);
        let member = Expr::new(
            ExprKind::Member {
                target: Box::new(target),
                dot: Span::new(6, 7),
                name: Some(Ident::new("Concat", Span::new(7, 13))),
            },
            Span::new(0, 13),
        );
        let names: Vec<_> = member
            .long_name()
            .unwrap()
            .iter()
            .map(|i| i.text.as_str())
            .collect();
        assert_eq!(names, vec!["String", "Concat"]);
    }

    #[test]
    fn test_long_name_stops_at_missing_member() {
        let member = Expr::new(
            ExprKind::Member {
                target: Box::new(ident("msg", 0)),
                dot: Span::new(3, 4),
                name: None,
            },
            Span::new(0, 4),
        );
        assert!(member.long_name().is_none());
    }

    #[test]
    fn test_bound_names() {
        let a = Pattern {
            kind: PatternKind::Named(Ident::new("a", Span::new(1, 2))),
            span: Span::new(1, 2),
        };
        let b = Pattern {
            kind: PatternKind::Named(Ident::new("b", Span::new(4, 5))),
            span: Span::new(4, 5),
        };
        let tuple = Pattern {
            kind: PatternKind::Tuple(vec![a, b]),
            span: Span::new(0, 6),
        };
        let names: Vec<_> = tuple.bound_names().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
