//! Candidate schemes for overloaded names and functors.
//!
//! Each candidate describes one possible meaning of a call or of the
//! functor in `X = f(A1, ..., An)`, in its own type variable namespace.
//! Candidates are produced in a fixed order (constructors, tuples, field
//! access, function application, partial application, `apply`), and the
//! order is preserved through overload resolution.

use std::fmt;

use quill_common::sym::SymName;
use rustc_hash::FxHashMap;

use crate::classes::Constraint;
use crate::tables::{ConsRef, ModuleTables, PredId, PredInfo};
use crate::ty::{PredOrFunc, Ty, TyVar, TyVarSet};

/// Where a candidate came from.
#[derive(Clone, Debug, PartialEq)]
pub enum CandidateSource {
    /// A predicate called as a predicate.
    Pred(PredId),
    /// A function called in predicate form, with its result as the last
    /// argument.
    FuncAsPred(PredId),
    /// A function applied in a functor position: `X = f(Args)`.
    Func(PredId),
    Constructor(ConsRef),
    Tuple(usize),
    FieldGet { cons: ConsRef, field: String },
    FieldSet { cons: ConsRef, field: String },
    /// Partial application building a closure: `X = p(A1, ..., Ak)`.
    PredAsFunctor { pred: PredId, supplied: usize },
    /// `apply(F, A1, ..., An)`.
    Apply(usize),
}

impl CandidateSource {
    pub fn pred_id(&self) -> Option<PredId> {
        match self {
            CandidateSource::Pred(id)
            | CandidateSource::FuncAsPred(id)
            | CandidateSource::Func(id)
            | CandidateSource::PredAsFunctor { pred: id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Human-readable description, used when listing the candidates of an
    /// overloaded symbol.
    pub fn describe(&self, tables: &ModuleTables) -> String {
        match self {
            CandidateSource::Pred(id)
            | CandidateSource::FuncAsPred(id)
            | CandidateSource::Func(id) => tables.preds.get(*id).display_name(),
            CandidateSource::PredAsFunctor { pred, supplied } => format!(
                "{} applied to {} argument(s)",
                tables.preds.get(*pred).display_name(),
                supplied
            ),
            CandidateSource::Constructor(cons) => match tables.types.get(&cons.type_ctor) {
                Some(defn) => format!(
                    "constructor `{}/{}` of type `{}`",
                    defn.ctors()[cons.index].name,
                    defn.ctors()[cons.index].fields.len(),
                    defn.ctor
                ),
                None => format!("constructor of type `{}`", cons.type_ctor),
            },
            CandidateSource::Tuple(n) => format!("tuple constructor `{{}}/{}`", n),
            CandidateSource::FieldGet { cons, field } => {
                format!("field access function `{}` of type `{}`", field, cons.type_ctor)
            }
            CandidateSource::FieldSet { cons, field } => {
                format!("field update function `{} :=` of type `{}`", field, cons.type_ctor)
            }
            CandidateSource::Apply(n) => format!("builtin `apply/{}`", n),
        }
    }
}

/// One candidate meaning of a name or functor.
#[derive(Clone, Debug)]
pub struct ConsTypeInfo {
    pub tvarset: TyVarSet,
    pub existq_tvars: Vec<TyVar>,
    /// Whether unification against this candidate's own arguments may
    /// instantiate `existq_tvars` (constructors), or whether they are
    /// rigid to the caller (predicates).
    pub owns_existq: bool,
    /// Type of the functor term, for functor candidates.
    pub result: Option<Ty>,
    pub args: Vec<Ty>,
    /// Constraints the caller must prove.
    pub unproven: Vec<Constraint>,
    /// Constraints the caller may assume.
    pub assumed: Vec<Constraint>,
    pub source: CandidateSource,
}

impl ConsTypeInfo {
    /// The types expected at each position: the result (if any) followed
    /// by the arguments.
    pub fn expected_types(&self) -> Vec<Ty> {
        self.result.iter().chain(&self.args).cloned().collect()
    }

    fn from_pred(info: &PredInfo, source: CandidateSource) -> Self {
        ConsTypeInfo {
            tvarset: info.tvarset.clone(),
            existq_tvars: info.existq_tvars.clone(),
            owns_existq: false,
            result: None,
            args: info.arg_types.clone(),
            unproven: info.class_context.universal.clone(),
            assumed: info.class_context.existential.clone(),
            source,
        }
    }

    fn generic(tvarset: TyVarSet, result: Ty, args: Vec<Ty>, source: CandidateSource) -> Self {
        ConsTypeInfo {
            tvarset,
            existq_tvars: Vec::new(),
            owns_existq: false,
            result: Some(result),
            args,
            unproven: Vec::new(),
            assumed: Vec::new(),
            source,
        }
    }
}

/// A field update that would change the type of an existential variable
/// shared with another field of the same constructor.
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidFieldUpdate {
    pub field: String,
    pub cons: SymName,
}

/// Candidates for a call `name(A1, ..., An)`.
pub fn pred_call_candidates(tables: &ModuleTables, name: &SymName, arity: usize) -> Vec<ConsTypeInfo> {
    tables
        .preds
        .lookup_call(name, arity)
        .into_iter()
        .map(|id| pred_candidate(tables, id))
        .collect()
}

/// The candidate for a predicate-form call to `id`.
pub fn pred_candidate(tables: &ModuleTables, id: PredId) -> ConsTypeInfo {
    let info = tables.preds.get(id);
    let source = match info.kind {
        PredOrFunc::Pred => CandidateSource::Pred(id),
        PredOrFunc::Func => CandidateSource::FuncAsPred(id),
    };
    ConsTypeInfo::from_pred(info, source)
}

/// Candidates for the switched-on variable of a case labelled `name`:
/// every constructor of that name, with only its result type.
pub fn case_candidates(tables: &ModuleTables, name: &SymName) -> Vec<ConsTypeInfo> {
    tables
        .conses
        .lookup_any_arity(&tables.types, name)
        .iter()
        .filter_map(|cons| constructor_info(tables, cons))
        .map(|info| ConsTypeInfo {
            args: Vec::new(),
            unproven: Vec::new(),
            ..info
        })
        .collect()
}

/// Candidates for the functor of `X = name(A1, ..., An)`, plus the field
/// updates rejected because they would change a shared existential type.
pub fn functor_candidates(
    tables: &ModuleTables,
    name: &SymName,
    arity: usize,
) -> (Vec<ConsTypeInfo>, Vec<InvalidFieldUpdate>) {
    let mut out = Vec::new();
    let mut invalid = Vec::new();

    for cons in tables.conses.lookup(&tables.types, name, arity) {
        if let Some(info) = constructor_info(tables, &cons) {
            out.push(info);
        }
    }

    if name.name == "{}" && !name.is_qualified() {
        out.push(tuple_info(arity));
    }

    if arity == 1 && !name.is_qualified() {
        for field in tables.conses.field(&name.name) {
            if let Some(info) = field_get_info(tables, &field.cons, field.field, &name.name) {
                out.push(info);
            }
        }
    }

    if let Some(field_name) = name.name.strip_suffix(" :=") {
        if arity == 2 && !name.is_qualified() {
            for field in tables.conses.field(field_name) {
                match field_set_info(tables, &field.cons, field.field, field_name) {
                    Some(Ok(info)) => out.push(info),
                    Some(Err(bad)) => invalid.push(bad),
                    None => {}
                }
            }
        }
    }

    for id in tables.preds.matching(name) {
        let info = tables.preds.get(id);
        if info.kind == PredOrFunc::Func && info.user_arity() == arity {
            out.push(func_call_info(info, id));
        }
    }

    for id in tables.preds.matching(name) {
        let info = tables.preds.get(id);
        let curryable = match info.kind {
            PredOrFunc::Pred => arity <= info.user_arity(),
            PredOrFunc::Func => arity < info.user_arity(),
        };
        if curryable {
            out.push(partial_application_info(info, id, arity));
        }
    }

    if name.name == "apply" && !name.is_qualified() && arity >= 1 {
        out.push(apply_info(arity));
    }

    (out, invalid)
}

fn constructor_info(tables: &ModuleTables, cons: &ConsRef) -> Option<ConsTypeInfo> {
    let defn = tables.types.get(&cons.type_ctor)?;
    let ctor = defn.ctors().get(cons.index)?;
    Some(ConsTypeInfo {
        tvarset: defn.tvarset.clone(),
        existq_tvars: ctor.existq_tvars.clone(),
        owns_existq: true,
        result: Some(defn.self_type()),
        args: ctor.fields.iter().map(|f| f.ty.clone()).collect(),
        unproven: ctor.constraints.clone(),
        assumed: Vec::new(),
        source: CandidateSource::Constructor(cons.clone()),
    })
}

fn tuple_info(arity: usize) -> ConsTypeInfo {
    let mut tvarset = TyVarSet::new();
    let args: Vec<Ty> = (0..arity).map(|_| Ty::Var(tvarset.fresh())).collect();
    ConsTypeInfo::generic(tvarset, Ty::Tuple(args.clone()), args, CandidateSource::Tuple(arity))
}

fn field_get_info(
    tables: &ModuleTables,
    cons: &ConsRef,
    field: usize,
    field_name: &str,
) -> Option<ConsTypeInfo> {
    let defn = tables.types.get(&cons.type_ctor)?;
    let ctor = defn.ctors().get(cons.index)?;
    let field_ty = ctor.fields.get(field)?.ty.clone();
    Some(ConsTypeInfo {
        tvarset: defn.tvarset.clone(),
        existq_tvars: ctor.existq_tvars.clone(),
        owns_existq: true,
        result: Some(field_ty),
        args: vec![defn.self_type()],
        unproven: Vec::new(),
        assumed: Vec::new(),
        source: CandidateSource::FieldGet {
            cons: cons.clone(),
            field: field_name.to_string(),
        },
    })
}

/// `'field :='(Term0, Value) = Term`. Type parameters occurring only in
/// the updated field may change type.
fn field_set_info(
    tables: &ModuleTables,
    cons: &ConsRef,
    field: usize,
    field_name: &str,
) -> Option<Result<ConsTypeInfo, InvalidFieldUpdate>> {
    let defn = tables.types.get(&cons.type_ctor)?;
    let ctor = defn.ctors().get(cons.index)?;
    let field_ty = ctor.fields.get(field)?.ty.clone();

    let mut other_vars = Vec::new();
    for (i, f) in ctor.fields.iter().enumerate() {
        if i != field {
            f.ty.collect_vars(&mut other_vars);
        }
    }
    let field_vars = field_ty.vars();

    if field_vars
        .iter()
        .any(|v| ctor.existq_tvars.contains(v) && other_vars.contains(v))
    {
        return Some(Err(InvalidFieldUpdate {
            field: field_name.to_string(),
            cons: ctor.name.clone(),
        }));
    }

    let mut tvarset = defn.tvarset.clone();
    let mut changed: FxHashMap<TyVar, Ty> = FxHashMap::default();
    for v in &field_vars {
        if defn.params.contains(v) && !other_vars.contains(v) {
            let name = format!("{}1", defn.tvarset.name(*v).unwrap_or("T"));
            changed.insert(*v, Ty::Var(tvarset.fresh_named(name)));
        }
    }

    let old_term = defn.self_type();
    let new_term = old_term.substitute(&changed);
    let new_value = field_ty.substitute(&changed);
    Some(Ok(ConsTypeInfo {
        tvarset,
        existq_tvars: ctor.existq_tvars.clone(),
        owns_existq: true,
        result: Some(new_term),
        args: vec![old_term, new_value],
        unproven: Vec::new(),
        assumed: Vec::new(),
        source: CandidateSource::FieldSet {
            cons: cons.clone(),
            field: field_name.to_string(),
        },
    }))
}

fn func_call_info(info: &PredInfo, id: PredId) -> ConsTypeInfo {
    let mut args = info.arg_types.clone();
    let result = args.pop();
    ConsTypeInfo {
        result,
        args,
        ..ConsTypeInfo::from_pred(info, CandidateSource::Func(id))
    }
}

/// A closure over the first `supplied` arguments of `info`.
fn partial_application_info(info: &PredInfo, id: PredId, supplied: usize) -> ConsTypeInfo {
    let (given, rest) = info.arg_types.split_at(supplied);
    let closure = Ty::HigherOrder {
        kind: info.kind,
        purity: info.purity,
        args: rest.to_vec(),
    };
    ConsTypeInfo {
        result: Some(closure),
        args: given.to_vec(),
        ..ConsTypeInfo::from_pred(info, CandidateSource::PredAsFunctor { pred: id, supplied })
    }
}

/// `apply(F, A1, ..., An) = R` where `F :: func(A1, ..., An) = R`.
fn apply_info(arity: usize) -> ConsTypeInfo {
    let mut tvarset = TyVarSet::new();
    let params: Vec<Ty> = (1..arity).map(|_| Ty::Var(tvarset.fresh())).collect();
    let result = Ty::Var(tvarset.fresh());
    let func = Ty::func(params.clone(), result.clone());
    let mut args = vec![func];
    args.extend(params);
    ConsTypeInfo::generic(tvarset, result, args, CandidateSource::Apply(arity))
}

impl fmt::Display for ConsTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.tvarset.names();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.display_with(names).to_string())
            .collect();
        write!(f, "({})", args.join(", "))?;
        if let Some(result) = &self.result {
            write!(f, " = {}", result.display_with(names))?;
        }
        Ok(())
    }
}
