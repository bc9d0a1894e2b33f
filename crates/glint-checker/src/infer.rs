//! Elaboration: walks the untyped tree, infers types, resolves names and
//! records what position queries need.

use crate::error::{ErrorCode, TypeError};
use crate::format::{format_arguments, format_function_type, FORMAT_FUNCTIONS};
use crate::result::{
    CallSite, CheckStatus, MemberSite, Occurrence, Receiver, Region, ScopeEntry, SymbolTable,
    TypedCheckResult,
};
use crate::types::{Scheme, Type, TypeStore};
use crate::world::{
    entity_type, function_signature, Entity, EntityKind, Member, MemberKind, Overload, World,
};
use crate::CheckOptions;
use glint_core::{Diagnostic, Severity, Signature, SourceKind, Span, Symbol, SymbolKind};
use glint_parser::ast::{
    BinaryOp, Binding, Decl, DeclKind, Expr, ExprKind, Ident, Literal, LongIdent, Pattern,
    PatternKind, RecordField, TypeExpr, TypeExprKind, TypeRepr,
};
use glint_parser::UntypedTree;
use glint_project::{CompilationContext, Reference};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Where a binding is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindKind {
    /// Module or file level; qualified and generalized.
    Top,
    /// `let` inside an expression.
    Local,
    /// Function or lambda parameter.
    Param,
}

#[derive(Debug)]
struct Binder {
    /// Qualified for top-level bindings.
    name: String,
    simple: String,
    ty: Type,
    scheme: Scheme,
    /// Parameter names for function bindings.
    params: Vec<String>,
    span: Span,
    kind: BindKind,
    used: bool,
}

#[derive(Debug, Clone)]
enum Target {
    Binder(usize),
    Fixed(Symbol),
}

#[derive(Debug)]
struct RawOccurrence {
    span: Span,
    target: Target,
    definition: bool,
}

/// The overloads a method name stands for.
#[derive(Debug, Clone)]
struct Group {
    name: String,
    overloads: Vec<Overload>,
}

/// What an expression in call position resolved to.
#[derive(Debug)]
enum Callee {
    Value {
        ty: Type,
        signatures: Vec<Signature>,
    },
    Group(Group),
}

impl Callee {
    const fn value(ty: Type) -> Self {
        Self::Value {
            ty,
            signatures: Vec::new(),
        }
    }
}

/// The meaning of an unqualified name.
enum Resolved {
    Binder(usize),
    Member { owner: String, member: Member },
    Entity(String),
}

pub(crate) struct Checker<'a> {
    tree: &'a UntypedTree,
    context: &'a CompilationContext,
    options: &'a CheckOptions,
    store: TypeStore,
    world: World,
    binders: Vec<Binder>,
    /// Indices of binders currently in scope, innermost last.
    scope: Vec<usize>,
    /// Path segments of the enclosing module.
    module: Vec<String>,
    /// Opened entity paths, latest last.
    opens: Vec<String>,
    aliases: Vec<(String, Type)>,
    /// `'a` annotations of the current top-level binding.
    type_vars: HashMap<String, Type>,
    errors: Vec<TypeError>,
    occurrences: Vec<RawOccurrence>,
    scopes: Vec<(Span, usize)>,
    regions: Vec<Region>,
    members: Vec<MemberSite>,
    calls: Vec<CallSite>,
    declarations: Vec<(Span, Target)>,
}

impl<'a> Checker<'a> {
    pub fn new(
        tree: &'a UntypedTree,
        context: &'a CompilationContext,
        options: &'a CheckOptions,
    ) -> Self {
        Self {
            tree,
            context,
            options,
            store: TypeStore::new(),
            world: World::new(context.library_names()),
            binders: Vec::new(),
            scope: Vec::new(),
            module: Vec::new(),
            opens: Vec::new(),
            aliases: Vec::new(),
            type_vars: HashMap::new(),
            errors: Vec::new(),
            occurrences: Vec::new(),
            scopes: Vec::new(),
            regions: Vec::new(),
            members: Vec::new(),
            calls: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Check every declaration of the tree.
    pub fn check_file(&mut self) {
        self.check_references();
        self.check_directive_problems();
        let tree = self.tree;
        let end = tree.source().len();
        if let Some(path) = tree.module_name() {
            let span = tree.header.as_ref().map(LongIdent::span);
            self.enter_module(&path, span, Span::new(0, end));
        }
        self.check_decls(&tree.decls, end);
    }

    // ===== Context =====

    fn check_references(&mut self) {
        let context = self.context;
        for reference in &context.references {
            let Some(name) = reference.library_name() else {
                continue;
            };
            if self.world.knows_library(name) {
                continue;
            }
            let span = self.reference_site(name).unwrap_or(Span::empty(0));
            self.error(
                ErrorCode::UnresolvedReference,
                format!("The referenced library '{reference}' could not be found"),
                span,
            );
        }
    }

    /// The `#r` argument that introduced library `name`.
    fn reference_site(&self, name: &str) -> Option<Span> {
        self.tree.decls.iter().find_map(|decl| match &decl.kind {
            DeclKind::Directive(directive) if directive.name.text == "r" => directive
                .args
                .iter()
                .find(|arg| Reference::parse(&arg.text, Path::new("")).library_name() == Some(name))
                .map(|arg| arg.span),
            _ => None,
        })
    }

    fn check_directive_problems(&mut self) {
        let context = self.context;
        for problem in &context.unresolved {
            self.error(
                ErrorCode::DirectiveNotApplied,
                problem.to_string(),
                problem.span,
            );
        }
    }

    // ===== Declarations =====

    fn check_decls(&mut self, decls: &[Decl], end: usize) {
        let scope_mark = self.scope.len();
        let opens_mark = self.opens.len();
        let mut declared: Vec<String> = Vec::new();
        for decl in decls {
            match &decl.kind {
                DeclKind::Let(binding) => self.check_top_binding(binding, end, &mut declared),
                DeclKind::Open(path) => self.check_open(path, decl.span, end),
                DeclKind::Module { name, decls } => self.check_module(name, decls, decl.span),
                DeclKind::Type { name, repr } => self.check_type_decl(name, repr),
                DeclKind::Do(expr) => {
                    let ty = self.infer_expr(expr);
                    if self.tree.kind() == SourceKind::Module {
                        self.warn_ignored(&ty, expr.span);
                    }
                }
                DeclKind::Directive(_) | DeclKind::Error => {}
            }
        }
        self.scope.truncate(scope_mark);
        self.opens.truncate(opens_mark);
    }

    fn check_top_binding(&mut self, binding: &Binding, end: usize, declared: &mut Vec<String>) {
        self.type_vars.clear();
        let bound = self.check_binding(binding, end, BindKind::Top);
        for index in bound {
            let binder = &self.binders[index];
            let (simple, span) = (binder.simple.clone(), binder.span);
            let member = Member {
                span: Some(span),
                ..Member::new(
                    &simple,
                    MemberKind::Value {
                        scheme: binder.scheme.clone(),
                        params: binder.params.clone(),
                    },
                )
            };
            if self.options.warn_shadowing && declared.contains(&simple) {
                self.error(
                    ErrorCode::ShadowedBinding,
                    format!("This definition of '{simple}' shadows an earlier one in the same scope"),
                    span,
                );
            }
            declared.push(simple.clone());
            let path = self.module.join(".");
            if let Some(entity) = self.world.declared_mut(&path) {
                entity.members.retain(|m| m.name != simple);
                entity.members.push(member);
            }
        }
    }

    fn check_open(&mut self, path: &LongIdent, decl: Span, end: usize) {
        let segments = path.segments();
        let Some(resolved) = self.find_entity(&segments) else {
            self.error(
                ErrorCode::NotDefined,
                format!("The namespace or module '{path}' is not defined"),
                path.span(),
            );
            return;
        };
        let parts: Vec<&Ident> = path.parts.iter().collect();
        self.record_entity_path(&parts, &resolved);
        self.opens.push(resolved.clone());
        self.regions.push(Region {
            span: Span::new(decl.end, end),
            path: resolved,
        });
    }

    fn enter_module(&mut self, path: &str, name: Option<Span>, region: Span) {
        let mut prefix = String::new();
        for segment in path.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            if prefix != path && self.world.entity(&prefix).is_none() {
                self.world.declare(Entity::new(&prefix, EntityKind::Namespace));
            }
        }
        let entity = Entity {
            span: name,
            ..Entity::new(path, EntityKind::Module)
        };
        if let Some(span) = name {
            self.declare_fixed(span, entity.symbol());
        }
        self.world.declare(entity);
        self.regions.push(Region {
            span: region,
            path: path.to_string(),
        });
        self.module = path.split('.').map(str::to_string).collect();
    }

    fn check_module(&mut self, name: &Ident, decls: &[Decl], span: Span) {
        let outer = self.module.clone();
        let path = self.qualify(&name.text);
        self.enter_module(&path, Some(name.span), span);
        self.check_decls(decls, span.end);
        self.module = outer;
    }

    fn check_type_decl(&mut self, name: &Ident, repr: &TypeRepr) {
        self.type_vars.clear();
        let path = self.qualify(&name.text);
        match repr {
            TypeRepr::Record(fields) => {
                self.world.declare(Entity {
                    span: Some(name.span),
                    ..Entity::new(&path, EntityKind::Type)
                });
                let mut members = Vec::new();
                for field in fields {
                    let ty = self.resolve_type(&field.ty);
                    let member = Member {
                        span: Some(field.name.span),
                        ..Member::new(&field.name.text, MemberKind::Field { ty })
                    };
                    self.declare_fixed(field.name.span, member.symbol(&path));
                    members.push(member);
                }
                if let Some(entity) = self.world.declared_mut(&path) {
                    entity.members = members;
                }
                if let Some(symbol) = self.world.entity(&path).map(Entity::symbol) {
                    self.declare_fixed(name.span, symbol);
                }
            }
            TypeRepr::Abbrev(target) => {
                let ty = self.resolve_type(target);
                let symbol = Symbol::new(&path, SymbolKind::Type, format!("type {} = {ty}", name.text))
                    .with_span(name.span);
                self.declare_fixed(name.span, symbol);
                self.aliases.push((path, ty));
            }
        }
    }

    // ===== Bindings =====

    /// Check a binding visible up to `end`; returns the binders it adds to
    /// the scope.
    fn check_binding(&mut self, binding: &Binding, end: usize, kind: BindKind) -> Vec<usize> {
        let top = kind == BindKind::Top;
        if binding.is_function() {
            let params: Vec<String> = binding.params.iter().map(param_name).collect();
            let fn_ty = self.store.fresh();
            let rec_index = match (binding.is_rec, binding.name()) {
                (true, Some(id)) => Some(self.push_binder(
                    id,
                    Scheme::mono(fn_ty.clone()),
                    params.clone(),
                    Span::new(binding.span.start, end),
                    kind,
                )),
                _ => None,
            };
            let mark = self.scope.len();
            let mut param_tys = Vec::new();
            for param in &binding.params {
                let ty = self.store.fresh();
                self.bind_pattern(param, &ty, binding.body.span, BindKind::Param);
                param_tys.push(ty);
            }
            let ret = match &binding.ret {
                Some(annotation) => self.resolve_type(annotation),
                None => self.store.fresh(),
            };
            self.check_expr(&binding.body, &ret);
            self.scope.truncate(mark);

            let ty = Type::curried(param_tys, ret);
            let site = binding.name().map_or(binding.span, |id| id.span);
            self.expect(&ty, &fn_ty, site);
            let scheme = if top {
                self.store.generalize(&ty)
            } else {
                Scheme::mono(ty)
            };
            match rec_index {
                Some(index) => {
                    self.binders[index].ty = scheme.ty.clone();
                    self.binders[index].scheme = scheme;
                    vec![index]
                }
                None => binding
                    .name()
                    .map(|id| {
                        self.push_binder(id, scheme, params, Span::new(binding.span.end, end), kind)
                    })
                    .into_iter()
                    .collect(),
            }
        } else {
            let ty = match &binding.ret {
                Some(annotation) => {
                    let ty = self.resolve_type(annotation);
                    self.check_expr(&binding.body, &ty);
                    ty
                }
                None => self.infer_expr(&binding.body),
            };
            let visible = Span::new(binding.span.end, end);
            match &binding.head.kind {
                PatternKind::Named(id)
                    if top && matches!(binding.body.kind, ExprKind::Lambda { .. }) =>
                {
                    let scheme = self.store.generalize(&ty);
                    vec![self.push_binder(id, scheme, Vec::new(), visible, kind)]
                }
                _ => self.bind_pattern(&binding.head, &ty, visible, kind),
            }
        }
    }

    fn bind_pattern(&mut self, pattern: &Pattern, ty: &Type, visible: Span, kind: BindKind) -> Vec<usize> {
        match &pattern.kind {
            PatternKind::Named(id) => {
                vec![self.push_binder(id, Scheme::mono(ty.clone()), Vec::new(), visible, kind)]
            }
            PatternKind::Wildcard | PatternKind::Error => Vec::new(),
            PatternKind::Unit => {
                self.expect(&Type::unit(), ty, pattern.span);
                Vec::new()
            }
            PatternKind::Tuple(items) => {
                let parts: Vec<Type> = items.iter().map(|_| self.store.fresh()).collect();
                self.expect(&Type::Tuple(parts.clone()), ty, pattern.span);
                items
                    .iter()
                    .zip(&parts)
                    .flat_map(|(item, part)| self.bind_pattern(item, part, visible, kind))
                    .collect()
            }
            PatternKind::Typed(inner, annotation) => {
                let annotated = self.resolve_type(annotation);
                self.expect(&annotated, ty, pattern.span);
                self.bind_pattern(inner, &annotated, visible, kind)
            }
        }
    }

    fn push_binder(
        &mut self,
        id: &Ident,
        scheme: Scheme,
        params: Vec<String>,
        visible: Span,
        kind: BindKind,
    ) -> usize {
        let name = if kind == BindKind::Top {
            self.qualify(&id.text)
        } else {
            id.text.clone()
        };
        let index = self.binders.len();
        self.binders.push(Binder {
            name,
            simple: id.text.clone(),
            ty: scheme.ty.clone(),
            scheme,
            params,
            span: id.span,
            kind,
            used: false,
        });
        self.scope.push(index);
        self.declarations.push((id.span, Target::Binder(index)));
        self.occurrences.push(RawOccurrence {
            span: id.span,
            target: Target::Binder(index),
            definition: true,
        });
        self.scopes.push((visible, index));
        index
    }

    fn warn_unused(&mut self, bound: &[usize]) {
        if !self.options.warn_unused {
            return;
        }
        for &index in bound {
            let binder = &self.binders[index];
            if binder.used || binder.kind == BindKind::Param || binder.simple.starts_with('_') {
                continue;
            }
            let (message, span) = (format!("The value '{}' is unused", binder.simple), binder.span);
            self.error(ErrorCode::UnusedBinding, message, span);
        }
    }

    fn warn_ignored(&mut self, ty: &Type, span: Span) {
        let ty = self.store.shallow(ty);
        match ty {
            Type::Var(_) => {
                let _ = self.store.unify(&Type::unit(), &ty);
            }
            Type::Error => {}
            ty if ty.is_named("unit") => {}
            ty => {
                let ty = self.store.zonk(&ty);
                self.error(
                    ErrorCode::IgnoredResult,
                    format!(
                        "The result of this expression has type '{ty}' and is implicitly ignored. Use 'ignore' to discard it explicitly"
                    ),
                    span,
                );
            }
        }
    }

    // ===== Expressions =====

    fn infer_expr(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Lit(lit) => literal_type(lit),
            ExprKind::Ident(_) | ExprKind::Member { .. } => {
                let callee = self.infer_callee(expr);
                self.callee_value(callee, expr.span)
            }
            ExprKind::Call {
                callee,
                args,
                parens,
            } => self.infer_call(callee, args, *parens),
            ExprKind::App { func, arg } => self.infer_app(func, arg, None),
            ExprKind::Neg(inner) => {
                let ty = self.infer_expr(inner);
                self.arithmetic(BinaryOp::Sub, &ty, expr.span)
            }
            ExprKind::Binary {
                op,
                op_span,
                lhs,
                rhs,
            } => self.infer_binary(*op, *op_span, lhs, rhs),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.infer_if(cond, then_branch, else_branch.as_deref(), None),
            ExprKind::Lambda { params, body } => self.infer_lambda(params, body, None),
            ExprKind::LetIn { binding, body } => self.infer_let_in(binding, body, None),
            ExprKind::Sequential(first, second) => {
                let ty = self.infer_expr(first);
                self.warn_ignored(&ty, first.span);
                self.infer_expr(second)
            }
            ExprKind::Tuple(items) => {
                Type::Tuple(items.iter().map(|item| self.infer_expr(item)).collect())
            }
            ExprKind::List(items) => {
                let element = self.store.fresh();
                for item in items {
                    self.check_expr(item, &element);
                }
                Type::list(element)
            }
            ExprKind::Record(fields) => self.infer_record(fields, expr.span),
            ExprKind::Paren(inner) => self.infer_expr(inner),
            ExprKind::Typed(inner, annotation) => {
                let ty = self.resolve_type(annotation);
                self.check_expr(inner, &ty);
                ty
            }
            ExprKind::Error => Type::Error,
        }
    }

    /// Check `expr` against a known type, pushing it into lambdas and
    /// application heads.
    fn check_expr(&mut self, expr: &Expr, expected: &Type) {
        let found = match &expr.kind {
            ExprKind::Paren(inner) => return self.check_expr(inner, expected),
            ExprKind::Lambda { params, body } => self.infer_lambda(params, body, Some(expected)),
            ExprKind::App { func, arg } => self.infer_app(func, arg, Some(expected)),
            ExprKind::LetIn { binding, body } => self.infer_let_in(binding, body, Some(expected)),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.infer_if(cond, then_branch, else_branch.as_deref(), Some(expected)),
            ExprKind::Sequential(first, second) => {
                let ty = self.infer_expr(first);
                self.warn_ignored(&ty, first.span);
                return self.check_expr(second, expected);
            }
            _ => self.infer_expr(expr),
        };
        self.expect(expected, &found, expr.span);
    }

    fn expect(&mut self, expected: &Type, found: &Type, span: Span) {
        if let Err(mismatch) = self.store.unify(expected, found) {
            self.error(
                ErrorCode::TypeMismatch,
                format!(
                    "This expression was expected to have type '{}' but here has type '{}'",
                    mismatch.expected, mismatch.found
                ),
                span,
            );
        }
    }

    fn infer_lambda(&mut self, params: &[Pattern], body: &Expr, expected: Option<&Type>) -> Type {
        let mark = self.scope.len();
        let mut expected = expected.map(|e| self.store.shallow(e));
        let mut param_tys = Vec::new();
        for param in params {
            let ty = match expected.take() {
                Some(Type::Fun(param_ty, ret)) => {
                    expected = Some(self.store.shallow(&ret));
                    *param_ty
                }
                _ => self.store.fresh(),
            };
            self.bind_pattern(param, &ty, body.span, BindKind::Param);
            param_tys.push(ty);
        }
        let ret = expected.unwrap_or_else(|| self.store.fresh());
        self.check_expr(body, &ret);
        self.scope.truncate(mark);
        Type::curried(param_tys, ret)
    }

    fn infer_let_in(&mut self, binding: &Binding, body: &Expr, expected: Option<&Type>) -> Type {
        let mark = self.scope.len();
        let bound = self.check_binding(binding, body.span.end, BindKind::Local);
        let ty = match expected {
            Some(expected) => {
                self.check_expr(body, expected);
                expected.clone()
            }
            None => self.infer_expr(body),
        };
        self.warn_unused(&bound);
        self.scope.truncate(mark);
        ty
    }

    fn infer_if(
        &mut self,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
        expected: Option<&Type>,
    ) -> Type {
        self.check_expr(cond, &Type::bool());
        match else_branch {
            Some(else_branch) => {
                let ty = expected.cloned().unwrap_or_else(|| self.store.fresh());
                self.check_expr(then_branch, &ty);
                self.check_expr(else_branch, &ty);
                ty
            }
            None => {
                self.check_expr(then_branch, &Type::unit());
                Type::unit()
            }
        }
    }

    fn infer_record(&mut self, fields: &[RecordField], span: Span) -> Type {
        let record = fields
            .first()
            .and_then(|first| self.world.record_with_field(&first.name.text))
            .cloned();
        let Some(record) = record else {
            let at = fields.first().map_or(span, |f| f.name.span);
            let label = fields.first().map_or("", |f| f.name.text.as_str());
            self.error(
                ErrorCode::NotDefined,
                format!("The record label '{label}' is not defined"),
                at,
            );
            for field in fields {
                self.infer_expr(&field.value);
            }
            return Type::Error;
        };
        for field in fields {
            let label = record.member(&field.name.text).and_then(|m| match &m.kind {
                MemberKind::Field { ty } => Some((m.symbol(&record.path), ty.clone())),
                _ => None,
            });
            match label {
                Some((symbol, ty)) => {
                    self.occur(field.name.span, Target::Fixed(symbol));
                    self.check_expr(&field.value, &ty);
                }
                None => {
                    self.error(
                        ErrorCode::NotDefined,
                        format!(
                            "The record label '{}' is not defined in '{}'",
                            field.name.text,
                            record.name()
                        ),
                        field.name.span,
                    );
                    self.infer_expr(&field.value);
                }
            }
        }
        entity_type(&record.path)
    }

    fn infer_binary(&mut self, op: BinaryOp, op_span: Span, lhs: &Expr, rhs: &Expr) -> Type {
        match op {
            BinaryOp::Pipe => {
                let arg = self.infer_expr(lhs);
                self.infer_pipe(arg, lhs.span, rhs)
            }
            BinaryOp::Or | BinaryOp::And => {
                self.check_expr(lhs, &Type::bool());
                self.check_expr(rhs, &Type::bool());
                Type::bool()
            }
            BinaryOp::Concat => {
                self.check_expr(lhs, &Type::string());
                self.check_expr(rhs, &Type::string());
                Type::string()
            }
            op if op.is_comparison() => {
                let ty = self.infer_expr(lhs);
                self.check_expr(rhs, &ty);
                Type::bool()
            }
            _ => {
                let ty = self.infer_expr(lhs);
                self.check_expr(rhs, &ty);
                self.arithmetic(op, &ty, op_span)
            }
        }
    }

    /// Result type of arithmetic on `ty`; unconstrained operands default to
    /// `int`.
    fn arithmetic(&mut self, op: BinaryOp, ty: &Type, span: Span) -> Type {
        match self.store.shallow(ty) {
            Type::Var(_) => {
                let _ = self.store.unify(ty, &Type::int());
                Type::int()
            }
            Type::Error => Type::Error,
            ty if ty.is_named("int") || ty.is_named("float") => ty,
            ty if op == BinaryOp::Add && ty.is_named("string") => ty,
            ty => {
                let ty = self.store.zonk(&ty);
                self.error(
                    ErrorCode::TypeMismatch,
                    format!("The type '{ty}' does not support the operator '{}'", op.as_str()),
                    span,
                );
                Type::Error
            }
        }
    }

    fn infer_pipe(&mut self, arg: Type, arg_span: Span, func: &Expr) -> Type {
        match &func.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } => match self.infer_callee(func) {
                Callee::Group(group) => self.resolve_group(&group, &[(arg, arg_span)], func.span),
                Callee::Value { ty, .. } => self.apply_type(&ty, &arg, func.span, arg_span),
            },
            _ => {
                let ret = self.store.fresh();
                self.check_expr(func, &Type::fun(arg, ret.clone()));
                ret
            }
        }
    }

    // ===== Application =====

    fn infer_app(&mut self, func: &Expr, arg: &Expr, expected: Option<&Type>) -> Type {
        if let Some(ty) = self.format_application(func, arg) {
            return ty;
        }
        match self.infer_callee(func) {
            Callee::Group(group) => {
                let args = self.group_args(arg);
                self.resolve_group(&group, &args, arg.span)
            }
            Callee::Value { ty, .. } => self.apply(&ty, arg, func.span, expected),
        }
    }

    fn infer_call(&mut self, callee: &Expr, args: &[Expr], parens: Span) -> Type {
        let target = self.infer_callee(callee);
        let overloads = match &target {
            Callee::Group(group) => group.overloads.iter().map(Overload::signature).collect(),
            Callee::Value { signatures, .. } => signatures.clone(),
        };
        self.calls.push(CallSite {
            callee: callee.span,
            parens,
            name: callee_name(callee),
            overloads,
        });
        match target {
            Callee::Group(group) => {
                let args: Vec<(Type, Span)> = args
                    .iter()
                    .map(|arg| (self.infer_expr(arg), arg.span))
                    .collect();
                self.resolve_group(&group, &args, parens)
            }
            Callee::Value { ty, .. } => match args {
                [] => self.apply_type(&ty, &Type::unit(), callee.span, parens),
                [single] => self.apply(&ty, single, callee.span, None),
                many => {
                    let arg = Type::Tuple(many.iter().map(|a| self.infer_expr(a)).collect());
                    self.apply_type(&ty, &arg, callee.span, parens)
                }
            },
        }
    }

    /// Apply a function to an argument expression, checking the argument
    /// against the parameter type when it is known.
    fn apply(&mut self, func: &Type, arg: &Expr, func_span: Span, expected: Option<&Type>) -> Type {
        match self.store.shallow(func) {
            Type::Fun(param, ret) => {
                if let Some(expected) = expected {
                    if self.store.unifies(expected, &ret) {
                        let _ = self.store.unify(expected, &ret);
                    }
                }
                self.check_expr(arg, &param);
                *ret
            }
            Type::Error => {
                self.infer_expr(arg);
                Type::Error
            }
            Type::Var(_) => {
                let arg_ty = self.infer_expr(arg);
                self.apply_type(func, &arg_ty, func_span, arg.span)
            }
            _ => {
                self.infer_expr(arg);
                self.not_a_function(func_span)
            }
        }
    }

    fn apply_type(&mut self, func: &Type, arg: &Type, func_span: Span, arg_span: Span) -> Type {
        match self.store.shallow(func) {
            Type::Fun(param, ret) => {
                self.expect(&param, arg, arg_span);
                *ret
            }
            Type::Error => Type::Error,
            Type::Var(_) => {
                let ret = self.store.fresh();
                self.expect(func, &Type::fun(arg.clone(), ret.clone()), func_span);
                ret
            }
            _ => self.not_a_function(func_span),
        }
    }

    fn not_a_function(&mut self, span: Span) -> Type {
        self.error(
            ErrorCode::NotAFunction,
            "This value is not a function and cannot be applied",
            span,
        );
        Type::Error
    }

    /// Arguments of a method applied by juxtaposition: `M (a, b)`, `M ()`
    /// or `M a`.
    fn group_args(&mut self, arg: &Expr) -> Vec<(Type, Span)> {
        let inner = match &arg.kind {
            ExprKind::Paren(inner) => inner.as_ref(),
            _ => arg,
        };
        match &inner.kind {
            ExprKind::Lit(Literal::Unit) => Vec::new(),
            ExprKind::Tuple(items) => items
                .iter()
                .map(|item| (self.infer_expr(item), item.span))
                .collect(),
            _ => vec![(self.infer_expr(inner), inner.span)],
        }
    }

    /// Pick the first overload, in declaration order, whose arity and
    /// parameter types accept `args`.
    fn resolve_group(&mut self, group: &Group, args: &[(Type, Span)], span: Span) -> Type {
        for overload in group.overloads.iter().filter(|o| o.accepts_arity(args.len())) {
            let mut trial = self.store.clone();
            if overload_accepts(&mut trial, overload, args) {
                self.store = trial;
                return overload.ret.clone();
            }
        }
        let found: Vec<String> = args
            .iter()
            .map(|(ty, _)| self.store.zonk(ty).to_string())
            .collect();
        let message = if found.is_empty() {
            format!("No overloads match for method '{}' with no arguments", group.name)
        } else {
            format!(
                "No overloads match for method '{}' with arguments of type {}",
                group.name,
                found.join(" * ")
            )
        };
        self.error(ErrorCode::NoOverloadMatch, message, span);
        // A return type shared by every overload still types the call.
        let mut rets = group.overloads.iter().map(|o| &o.ret);
        match rets.next() {
            Some(first) if rets.all(|r| r == first) => first.clone(),
            _ => Type::Error,
        }
    }

    /// `printfn "..."` and friends, typed from the format literal.
    fn format_application(&mut self, func: &Expr, arg: &Expr) -> Option<Type> {
        let ExprKind::Ident(id) = &func.kind else {
            return None;
        };
        let ExprKind::Lit(Literal::String(format)) = &arg.kind else {
            return None;
        };
        if !FORMAT_FUNCTIONS.contains(&id.text.as_str()) || self.lookup_binder(&id.text).is_some() {
            return None;
        }
        let Some(Resolved::Member { owner, member }) = self.lookup_value(&id.text) else {
            return None;
        };
        self.occur(id.span, Target::Fixed(member.symbol(&owner)));
        match format_arguments(format, &mut self.store) {
            Ok(args) => Some(format_function_type(&id.text, args, &mut self.store)),
            Err(bad) => {
                // Skip the opening quote.
                let start = (arg.span.start + 1 + bad.offset).min(arg.span.end);
                let end = (start + 2).min(arg.span.end);
                let message = if bad.specifier == '%' {
                    "The format string ends with an incomplete placeholder".to_string()
                } else {
                    format!("Unknown format placeholder '%{}'", bad.specifier)
                };
                self.error(ErrorCode::TypeMismatch, message, Span::new(start, end));
                Some(Type::Error)
            }
        }
    }

    // ===== Names =====

    fn infer_callee(&mut self, expr: &Expr) -> Callee {
        match &expr.kind {
            ExprKind::Ident(id) => self.callee_of_ident(id),
            ExprKind::Member { target, dot, name } => {
                self.callee_of_member(expr.span, target, *dot, name.as_ref())
            }
            ExprKind::Paren(inner) => self.infer_callee(inner),
            _ => Callee::value(self.infer_expr(expr)),
        }
    }

    /// The value of a callee in a non-call position.
    fn callee_value(&mut self, callee: Callee, span: Span) -> Type {
        match callee {
            Callee::Value { ty, .. } => ty,
            Callee::Group(group) => match group.overloads.as_slice() {
                [single] => single.as_function(),
                _ => {
                    self.error(
                        ErrorCode::NoOverloadMatch,
                        format!(
                            "The method '{}' is overloaded; call it with arguments to select an overload",
                            group.name
                        ),
                        span,
                    );
                    Type::Error
                }
            },
        }
    }

    fn callee_of_ident(&mut self, id: &Ident) -> Callee {
        match self.lookup_value(&id.text) {
            Some(Resolved::Binder(index)) => {
                self.binders[index].used = true;
                self.occur(id.span, Target::Binder(index));
                let scheme = self.binders[index].scheme.clone();
                let signatures = binder_signature(&self.store.zonk(&scheme.ty), &self.binders[index].params)
                    .into_iter()
                    .collect();
                Callee::Value {
                    ty: self.store.instantiate(&scheme),
                    signatures,
                }
            }
            Some(Resolved::Member { owner, member }) => {
                self.occur(id.span, Target::Fixed(member.symbol(&owner)));
                self.member_callee(&member, &owner)
            }
            Some(Resolved::Entity(path)) => self.entity_callee(&path, id),
            None => {
                self.error(
                    ErrorCode::NotDefined,
                    format!("The value or constructor '{}' is not defined", id.text),
                    id.span,
                );
                Callee::value(Type::Error)
            }
        }
    }

    fn callee_of_member(
        &mut self,
        span: Span,
        target: &Expr,
        dot: Span,
        name: Option<&Ident>,
    ) -> Callee {
        if let Some(path) = self.entity_of(target) {
            self.members.push(MemberSite {
                dot,
                name: name.map(|n| n.span),
                span,
                receiver: Receiver::Entity(path.clone()),
            });
            let Some(name) = name else {
                return Callee::value(Type::Error);
            };
            let child = format!("{path}.{}", name.text);
            if self.world.entity(&child).is_some() {
                return self.entity_callee(&child, name);
            }
            let member = self
                .world
                .entity(&path)
                .and_then(|e| e.member(&name.text))
                .filter(|m| m.is_static())
                .cloned();
            return match member {
                Some(member) => {
                    self.occur(name.span, Target::Fixed(member.symbol(&path)));
                    self.member_callee(&member, &path)
                }
                None => {
                    self.error(
                        ErrorCode::NotDefined,
                        format!("The value, constructor, namespace or type '{}' is not defined in '{path}'", name.text),
                        name.span,
                    );
                    Callee::value(Type::Error)
                }
            };
        }

        let receiver = self.infer_expr(target);
        let receiver = self.store.shallow(&receiver);
        self.members.push(MemberSite {
            dot,
            name: name.map(|n| n.span),
            span,
            receiver: Receiver::Value(receiver.clone()),
        });
        let Some(name) = name else {
            return Callee::value(Type::Error);
        };
        match receiver {
            Type::Error => Callee::value(Type::Error),
            Type::Var(_) => {
                self.error(
                    ErrorCode::IndeterminateLookup,
                    "Lookup on object of indeterminate type based on information prior to this program point. A type annotation may be needed",
                    span,
                );
                Callee::value(Type::Error)
            }
            ty => {
                let found = self
                    .world
                    .member_of_type(&ty, &name.text)
                    .map(|(owner, member)| (owner, member.clone()));
                match found {
                    Some((owner, member)) => {
                        self.occur(name.span, Target::Fixed(member.symbol(&owner)));
                        self.member_callee(&member, &owner)
                    }
                    None => {
                        let ty = self.store.zonk(&ty);
                        self.error(
                            ErrorCode::NotDefined,
                            format!(
                                "The type '{ty}' does not define the field, constructor or member '{}'",
                                name.text
                            ),
                            name.span,
                        );
                        Callee::value(Type::Error)
                    }
                }
            }
        }
    }

    fn member_callee(&mut self, member: &Member, owner: &str) -> Callee {
        match &member.kind {
            MemberKind::Value { scheme, .. } => Callee::Value {
                ty: self.store.instantiate(scheme),
                signatures: member.symbol(owner).overloads,
            },
            MemberKind::Property { ty, .. } | MemberKind::Field { ty } => Callee::value(ty.clone()),
            MemberKind::Method { overloads, .. } => Callee::Group(Group {
                name: member.name.clone(),
                overloads: overloads.clone(),
            }),
        }
    }

    /// An entity named in value position: types with constructors are
    /// callable, anything else is an error.
    fn entity_callee(&mut self, path: &str, id: &Ident) -> Callee {
        let Some(entity) = self.world.entity(path).cloned() else {
            return Callee::value(Type::Error);
        };
        self.occur(id.span, Target::Fixed(entity.symbol()));
        if entity.constructors.is_empty() {
            let keyword = match entity.kind {
                EntityKind::Namespace => "namespace",
                EntityKind::Module => "module",
                EntityKind::Type => "type",
            };
            self.error(
                ErrorCode::NotDefined,
                format!("The value or constructor '{}' is not defined; '{path}' is a {keyword}", id.text),
                id.span,
            );
            return Callee::value(Type::Error);
        }
        Callee::Group(Group {
            name: entity.name().to_string(),
            overloads: entity.constructors,
        })
    }

    fn lookup_binder(&self, name: &str) -> Option<usize> {
        self.scope
            .iter()
            .rev()
            .copied()
            .find(|&index| self.binders[index].simple == name)
    }

    fn lookup_value(&self, name: &str) -> Option<Resolved> {
        if let Some(index) = self.lookup_binder(name) {
            return Some(Resolved::Binder(index));
        }
        for container in self.value_containers() {
            let member = self
                .world
                .entity(&container)
                .and_then(|e| e.member(name))
                .filter(|m| m.is_static());
            if let Some(member) = member {
                return Some(Resolved::Member {
                    owner: container,
                    member: member.clone(),
                });
            }
        }
        self.find_entity(&[name]).map(Resolved::Entity)
    }

    /// Enclosing modules, innermost first.
    fn module_prefixes(&self) -> Vec<String> {
        (1..=self.module.len())
            .rev()
            .map(|n| self.module[..n].join("."))
            .collect()
    }

    /// Entities whose members are in scope unqualified.
    fn value_containers(&self) -> Vec<String> {
        let mut out = self.module_prefixes();
        out.extend(self.opens.iter().rev().cloned());
        out.extend(self.world.auto_opened().into_iter().map(|e| e.path.clone()));
        out
    }

    /// Prefixes tried when resolving an entity path.
    fn entity_prefixes(&self) -> Vec<String> {
        let mut out = self.module_prefixes();
        out.extend(self.opens.iter().rev().cloned());
        out.push(String::new());
        out.extend(self.world.auto_opened().into_iter().map(|e| e.path.clone()));
        out
    }

    fn find_entity(&self, segments: &[&str]) -> Option<String> {
        let joined = segments.join(".");
        self.entity_prefixes()
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

    /// The entity a dotted expression names, unless its head is a value.
    fn entity_of(&mut self, expr: &Expr) -> Option<String> {
        let parts = expr.long_name()?;
        if self.lookup_binder(&parts.first()?.text).is_some() {
            return None;
        }
        let segments: Vec<&str> = parts.iter().map(|p| p.text.as_str()).collect();
        let path = self.find_entity(&segments)?;
        self.record_entity_path(&parts, &path);
        Some(path)
    }

    /// Record an occurrence for each segment of a resolved entity path.
    fn record_entity_path(&mut self, parts: &[&Ident], path: &str) {
        let written: Vec<&str> = parts.iter().map(|p| p.text.as_str()).collect();
        let written = written.join(".");
        let mut current = path
            .strip_suffix(written.as_str())
            .unwrap_or("")
            .trim_end_matches('.')
            .to_string();
        for part in parts {
            if !current.is_empty() {
                current.push('.');
            }
            current.push_str(&part.text);
            if let Some(symbol) = self.world.entity(&current).map(Entity::symbol) {
                self.occur(part.span, Target::Fixed(symbol));
            }
        }
    }

    fn qualify(&self, name: &str) -> String {
        if self.module.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.module.join("."))
        }
    }

    // ===== Types =====

    fn resolve_type(&mut self, annotation: &TypeExpr) -> Type {
        match &annotation.kind {
            TypeExprKind::Named(name) => self.resolve_type_name(name),
            TypeExprKind::Var(id) => {
                if let Some(ty) = self.type_vars.get(&id.text) {
                    return ty.clone();
                }
                let ty = self.store.fresh();
                self.type_vars.insert(id.text.clone(), ty.clone());
                ty
            }
            TypeExprKind::App { arg, ctor } => {
                let arg = self.resolve_type(arg);
                if ctor.is("list") {
                    Type::list(arg)
                } else if ctor.is("array") {
                    Type::array(arg)
                } else {
                    self.error(
                        ErrorCode::NotDefined,
                        format!("The type '{ctor}' is not defined"),
                        ctor.span(),
                    );
                    Type::Error
                }
            }
            TypeExprKind::Array(element) => Type::array(self.resolve_type(element)),
            TypeExprKind::Fun(param, ret) => {
                let param = self.resolve_type(param);
                Type::fun(param, self.resolve_type(ret))
            }
            TypeExprKind::Tuple(items) => {
                Type::Tuple(items.iter().map(|item| self.resolve_type(item)).collect())
            }
            TypeExprKind::Error => Type::Error,
        }
    }

    fn resolve_type_name(&mut self, name: &LongIdent) -> Type {
        if let [single] = name.parts.as_slice() {
            match single.text.as_str() {
                "int" | "float" | "string" | "bool" | "char" | "unit" | "obj" => {
                    return Type::named(single.text.as_str());
                }
                "list" => return Type::list(self.store.fresh()),
                _ => {}
            }
        }
        let written = name.to_string();
        let mut candidates = self.module_prefixes();
        candidates.push(String::new());
        for prefix in candidates {
            let path = if prefix.is_empty() {
                written.clone()
            } else {
                format!("{prefix}.{written}")
            };
            if let Some((_, ty)) = self.aliases.iter().rev().find(|(p, _)| *p == path) {
                return ty.clone();
            }
        }
        let segments = name.segments();
        let found = self
            .find_entity(&segments)
            .filter(|path| self.world.entity(path).is_some_and(|e| e.kind == EntityKind::Type));
        match found {
            Some(path) => {
                let parts: Vec<&Ident> = name.parts.iter().collect();
                self.record_entity_path(&parts, &path);
                entity_type(&path)
            }
            None => {
                self.error(
                    ErrorCode::NotDefined,
                    format!("The type '{written}' is not defined"),
                    name.span(),
                );
                Type::Error
            }
        }
    }

    // ===== Recording =====

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.errors.push(TypeError::new(code, message, span));
    }

    fn occur(&mut self, span: Span, target: Target) {
        self.occurrences.push(RawOccurrence {
            span,
            target,
            definition: false,
        });
    }

    fn declare_fixed(&mut self, span: Span, symbol: Symbol) {
        self.declarations.push((span, Target::Fixed(symbol.clone())));
        self.occurrences.push(RawOccurrence {
            span,
            target: Target::Fixed(symbol),
            definition: true,
        });
    }

    fn binder_symbol(&self, binder: &Binder) -> Symbol {
        let ty = self.store.zonk(&binder.ty);
        let symbol = match binder_signature(&ty, &binder.params) {
            Some(signature) => Symbol::new(&binder.name, SymbolKind::Function, ty.to_string())
                .with_overloads(vec![signature]),
            None => Symbol::new(&binder.name, SymbolKind::Value, ty.to_string()),
        };
        symbol.with_span(binder.span)
    }

    fn target_symbol(&self, target: &Target) -> Symbol {
        match target {
            Target::Binder(index) => self.binder_symbol(&self.binders[*index]),
            Target::Fixed(symbol) => symbol.clone(),
        }
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        let index = self.tree.line_index();
        let mut diagnostics: Vec<Diagnostic> = self
            .errors
            .iter()
            .filter_map(|error| {
                let warning = error.code.is_warning();
                if warning && self.options.suppresses(error.code.code()) {
                    return None;
                }
                let severity = if warning && self.options.warnings_as_errors {
                    Severity::Error
                } else {
                    error.code.severity()
                };
                Some(error.to_diagnostic(severity, index))
            })
            .collect();
        diagnostics.sort_by_key(|d| d.span.start);
        diagnostics
    }

    /// Freeze everything recorded into a result.
    pub fn finish(
        mut self,
        tree: Arc<UntypedTree>,
        context: Arc<CompilationContext>,
    ) -> TypedCheckResult {
        let mut symbols = SymbolTable::default();
        for (span, target) in &self.declarations {
            symbols.insert(*span, self.target_symbol(target));
        }
        let occurrences = self
            .occurrences
            .iter()
            .map(|o| Occurrence {
                span: o.span,
                symbol: self.target_symbol(&o.target),
                definition: o.definition,
            })
            .collect();
        let scopes = self
            .scopes
            .iter()
            .map(|(visible, index)| {
                let binder = &self.binders[*index];
                ScopeEntry {
                    visible: *visible,
                    symbol: self.binder_symbol(binder),
                    ty: self.store.zonk(&binder.ty),
                }
            })
            .collect();
        for site in &mut self.members {
            if let Receiver::Value(ty) = &site.receiver {
                site.receiver = Receiver::Value(self.store.zonk(ty));
            }
        }
        let diagnostics = self.diagnostics();
        let status = if tree.has_errors() {
            CheckStatus::Partial
        } else {
            CheckStatus::Complete
        };
        TypedCheckResult {
            tree,
            context,
            symbols,
            diagnostics,
            status,
            occurrences,
            scopes,
            regions: self.regions,
            members: self.members,
            calls: self.calls,
            world: self.world,
        }
    }
}

/// Whether `overload` accepts arguments of the given types, binding
/// variables in `store` as it goes. `obj` parameters accept anything.
fn overload_accepts(store: &mut TypeStore, overload: &Overload, args: &[(Type, Span)]) -> bool {
    let fixed = overload.params.iter().take_while(|p| !p.variadic).count();
    let variadic = overload.params.last().filter(|p| p.variadic);
    for (i, (arg, _)) in args.iter().enumerate() {
        let param = if i < fixed {
            &overload.params[i].ty
        } else if let Some(variadic) = variadic {
            // A single trailing argument may be the array itself.
            if args.len() == overload.params.len() && store.unifies(&variadic.ty, arg) {
                &variadic.ty
            } else {
                variadic.ty.array_element().unwrap_or(&variadic.ty)
            }
        } else {
            return false;
        };
        if param.is_named("obj") {
            continue;
        }
        if store.unify(param, arg).is_err() {
            return false;
        }
    }
    true
}

const fn literal_type_name(lit: &Literal) -> &'static str {
    match lit {
        Literal::Int(_) => "int",
        Literal::Float(_) => "float",
        Literal::String(_) => "string",
        Literal::Char(_) => "char",
        Literal::Bool(_) => "bool",
        Literal::Unit => "unit",
    }
}

fn literal_type(lit: &Literal) -> Type {
    Type::named(literal_type_name(lit))
}

/// Name shown for a parameter pattern in signatures.
fn param_name(pattern: &Pattern) -> String {
    match &pattern.kind {
        PatternKind::Named(id) => id.text.clone(),
        PatternKind::Typed(inner, _) => param_name(inner),
        PatternKind::Unit => "()".to_string(),
        PatternKind::Tuple(_) => "tuple".to_string(),
        PatternKind::Wildcard | PatternKind::Error => "_".to_string(),
    }
}

/// Signature of a let-bound function; `()` parameters are left out so
/// `let f () = 1` shows as `f() : int`.
fn binder_signature(ty: &Type, params: &[String]) -> Option<Signature> {
    let mut signature = function_signature(ty, params)?;
    signature.parameters.retain(|p| p.name != "()");
    Some(signature)
}

fn callee_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(id) => id.text.clone(),
        ExprKind::Member { name: Some(name), .. } => name.text.clone(),
        ExprKind::Paren(inner) => callee_name(inner),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Param;

    fn args(types: &[Type]) -> Vec<(Type, Span)> {
        types.iter().map(|t| (t.clone(), Span::default())).collect()
    }

    #[test]
    fn test_overload_accepts_obj_and_variadic() {
        let mut store = TypeStore::new();
        let format = Overload::new(
            vec![
                Param::new("format", Type::string()),
                Param::variadic("args", Type::array(Type::obj())),
            ],
            Type::string(),
        );
        assert!(overload_accepts(&mut store, &format, &args(&[Type::string()])));
        assert!(overload_accepts(
            &mut store,
            &format,
            &args(&[Type::string(), Type::int(), Type::bool()])
        ));
        assert!(!overload_accepts(&mut store, &format, &args(&[Type::int()])));

        let join = Overload::new(
            vec![
                Param::new("separator", Type::string()),
                Param::variadic("values", Type::array(Type::string())),
            ],
            Type::string(),
        );
        let array = Type::array(Type::string());
        assert!(overload_accepts(&mut store, &join, &args(&[Type::string(), array])));
        assert!(!overload_accepts(
            &mut store,
            &join,
            &args(&[Type::string(), Type::int()])
        ));
    }

    #[test]
    fn test_binder_signature_drops_unit_parameters() {
        let ty = Type::fun(Type::unit(), Type::int());
        let signature = binder_signature(&ty, &["()".to_string()]).unwrap();
        assert_eq!(signature.render("foo"), "foo() : int");
        assert!(binder_signature(&Type::int(), &[]).is_none());
    }

    #[test]
    fn test_param_names() {
        let span = Span::new(0, 1);
        let named = Pattern {
            kind: PatternKind::Named(Ident::new("x", span)),
            span,
        };
        assert_eq!(param_name(&named), "x");
        let unit = Pattern {
            kind: PatternKind::Unit,
            span,
        };
        assert_eq!(param_name(&unit), "()");
    }
}
