//! Builders for module tables and predicates used across the
//! integration tests.

#![allow(dead_code)]

use quill_common::span::Span;
use quill_common::sym::SymName;
use quill_typeck::check::{Clause, PredInput};
use quill_typeck::goal::{Goal, ProgVar, VarTable};
use quill_typeck::tables::{CtorDefn, CtorField, ModuleTables, PredId, PredInfo, TypeBody, TypeDefn};
use quill_typeck::ty::{PredOrFunc, Ty, TyVarSet, TypeCtor};
use quill_typeck::TypeckOptions;

pub fn sym(name: &str) -> SymName {
    SymName::unqualified(name)
}

pub fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

/// `name`, a type with no parameters.
pub fn ty(name: &str) -> Ty {
    Ty::defined(sym(name), Vec::new())
}

/// A type whose constructors all have arity zero.
pub fn enum_type(tables: &mut ModuleTables, name: &str, ctors: &[&str], supertype: Option<&str>) {
    tables.add_type(TypeDefn {
        ctor: TypeCtor::new(sym(name), 0),
        tvarset: TyVarSet::new(),
        params: Vec::new(),
        body: TypeBody::Du(ctors.iter().map(|c| CtorDefn::new(sym(c), Vec::new())).collect()),
        supertype: supertype.map(ty),
    });
}

/// `list(T) ---> [] ; [T | list(T)]`.
pub fn list_type(tables: &mut ModuleTables) {
    let mut tvarset = TyVarSet::new();
    let t = tvarset.fresh_named("T");
    tables.add_type(TypeDefn {
        ctor: TypeCtor::new(sym("list"), 1),
        tvarset,
        params: vec![t],
        body: TypeBody::Du(vec![
            CtorDefn::new(sym("[]"), Vec::new()),
            CtorDefn::new(
                sym("[|]"),
                vec![CtorField::anon(Ty::Var(t)), CtorField::anon(list_of(Ty::Var(t)))],
            ),
        ]),
        supertype: None,
    });
}

/// `handler(T) ---> handler(pred(T))`, invariant in `T`.
pub fn handler_type(tables: &mut ModuleTables) {
    let mut tvarset = TyVarSet::new();
    let t = tvarset.fresh_named("T");
    tables.add_type(TypeDefn {
        ctor: TypeCtor::new(sym("handler"), 1),
        tvarset,
        params: vec![t],
        body: TypeBody::Du(vec![CtorDefn::new(
            sym("handler"),
            vec![CtorField::anon(Ty::pred(vec![Ty::Var(t)]))],
        )]),
        supertype: None,
    });
}

pub fn list_of(elem: Ty) -> Ty {
    Ty::defined(sym("list"), vec![elem])
}

/// A monomorphic predicate declaration.
pub fn pred(tables: &mut ModuleTables, name: &str, arg_types: Vec<Ty>) -> PredId {
    tables.add_pred(PredInfo::new(sym(name), PredOrFunc::Pred, TyVarSet::new(), arg_types))
}

/// A monomorphic function declaration; the result type comes last.
pub fn func(tables: &mut ModuleTables, name: &str, arg_types: Vec<Ty>, result: Ty) -> PredId {
    let mut types = arg_types;
    types.push(result);
    tables.add_pred(PredInfo::new(sym(name), PredOrFunc::Func, TyVarSet::new(), types))
}

/// An undeclared predicate with one clause per body.
pub fn undeclared(name: &str, vars: VarTable, head: Vec<ProgVar>, bodies: Vec<Goal>) -> PredInput {
    PredInput {
        pred_id: None,
        name: sym(name),
        head_vars: head,
        var_table: vars,
        clauses: bodies
            .into_iter()
            .map(|body| Clause { span: body.span, body })
            .collect(),
        span: sp(0),
    }
}

pub fn declared(id: PredId, name: &str, vars: VarTable, head: Vec<ProgVar>, bodies: Vec<Goal>) -> PredInput {
    PredInput {
        pred_id: Some(id),
        ..undeclared(name, vars, head, bodies)
    }
}

pub fn thresholds(warn: usize, error: usize) -> TypeckOptions {
    TypeckOptions {
        warn_threshold: warn,
        error_threshold: error,
        ..TypeckOptions::default()
    }
}
