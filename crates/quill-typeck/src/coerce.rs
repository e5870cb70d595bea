//! Subtype coercion: `To = coerce(From)`.
//!
//! A coercion holds when `From` reaches `To`'s type constructor by
//! following declared supertypes, and the arguments then agree: exactly
//! for invariant parameters, and by the same relation (in either
//! direction) for covariant ones. Coercions between types that still
//! contain type variables are deferred as constraints on the hypothesis.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::assign::{CoerceConstraint, CoerceStatus, TypeAssignment, TypeAssignmentSet};
use crate::tables::{TypeBody, TypeTable};
use crate::ty::{Ty, TyVar, TypeCtor};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variance {
    Covariant,
    Invariant,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoerceOutcome {
    Satisfied,
    Unsatisfiable,
    /// Not decidable yet; the operands still contain type variables.
    Deferred,
}

/// Variance of every parameter of every type in `types`.
pub(crate) fn compute_variances(types: &TypeTable) -> FxHashMap<TypeCtor, Vec<Variance>> {
    let mut memo = FxHashMap::default();
    let mut in_progress = FxHashSet::default();
    for defn in types.iter() {
        variance_of(&defn.ctor, types, &mut memo, &mut in_progress);
    }
    memo
}

fn variance_of(
    ctor: &TypeCtor,
    types: &TypeTable,
    memo: &mut FxHashMap<TypeCtor, Vec<Variance>>,
    in_progress: &mut FxHashSet<TypeCtor>,
) -> Option<Vec<Variance>> {
    if let Some(v) = memo.get(ctor) {
        return Some(v.clone());
    }
    if in_progress.contains(ctor) {
        return None;
    }
    let defn = types.get(ctor)?;
    let mut variances = vec![Variance::Covariant; defn.params.len()];
    match &defn.body {
        TypeBody::Abstract | TypeBody::Foreign => {
            variances.fill(Variance::Invariant);
        }
        TypeBody::Du(ctors) => {
            in_progress.insert(ctor.clone());
            let mut scan = VarianceScan {
                ctor,
                params: &defn.params,
                variances: &mut variances,
                types,
                memo: &mut *memo,
                in_progress: &mut *in_progress,
            };
            for c in ctors {
                for field in &c.fields {
                    scan.walk(&field.ty, false);
                }
            }
            in_progress.remove(ctor);
        }
    }
    memo.insert(ctor.clone(), variances.clone());
    Some(variances)
}

struct VarianceScan<'a> {
    ctor: &'a TypeCtor,
    params: &'a [TyVar],
    variances: &'a mut Vec<Variance>,
    types: &'a TypeTable,
    memo: &'a mut FxHashMap<TypeCtor, Vec<Variance>>,
    in_progress: &'a mut FxHashSet<TypeCtor>,
}

impl VarianceScan<'_> {
    fn walk(&mut self, ty: &Ty, invariant: bool) {
        match ty {
            Ty::Var(v) => {
                if invariant {
                    if let Some(i) = self.params.iter().position(|p| p == v) {
                        self.variances[i] = Variance::Invariant;
                    }
                }
            }
            Ty::Builtin(_) => {}
            Ty::Tuple(args) => {
                for a in args {
                    self.walk(a, invariant);
                }
            }
            Ty::HigherOrder { args, .. } => {
                for a in args {
                    self.walk(a, true);
                }
            }
            Ty::Kinded(inner, _) => self.walk(inner, invariant),
            Ty::Defined(c, args) if c == self.ctor => {
                let uniform = args.len() == self.params.len()
                    && args
                        .iter()
                        .zip(self.params)
                        .all(|(a, p)| matches!(a, Ty::Var(v) if v == p));
                if !uniform {
                    for a in args {
                        self.walk(a, true);
                    }
                }
            }
            Ty::Defined(c, args) => {
                let nested = variance_of(c, self.types, self.memo, self.in_progress);
                for (i, a) in args.iter().enumerate() {
                    let covariant = matches!(
                        nested.as_ref().and_then(|v| v.get(i)),
                        Some(Variance::Covariant)
                    );
                    self.walk(a, invariant || !covariant);
                }
            }
        }
    }
}

/// Decide `from =< to` under the bindings of `hyp`.
pub fn check_coerce(hyp: &mut TypeAssignment, from: &Ty, to: &Ty, types: &TypeTable) -> CoerceOutcome {
    let from = hyp.resolve(from);
    let to = hyp.resolve(to);
    if from == to {
        return CoerceOutcome::Satisfied;
    }
    if !from.is_ground() || !to.is_ground() {
        if heads_disjoint(&from, &to, types) {
            return CoerceOutcome::Unsatisfiable;
        }
        return CoerceOutcome::Deferred;
    }
    if compare_equal_lt(&from, &to, types) {
        CoerceOutcome::Satisfied
    } else {
        CoerceOutcome::Unsatisfiable
    }
}

/// Whether the outermost constructors of `from` and `to` already rule
/// out `from =< to`, however their variables are bound later.
fn heads_disjoint(from: &Ty, to: &Ty, types: &TypeTable) -> bool {
    match (from.unkinded(), to.unkinded()) {
        (Ty::Var(_), _) | (_, Ty::Var(_)) => false,
        (Ty::Builtin(a), Ty::Builtin(b)) => a != b,
        (Ty::Tuple(xs), Ty::Tuple(ys)) => xs.len() != ys.len(),
        (
            Ty::HigherOrder { kind, purity, args },
            Ty::HigherOrder {
                kind: to_kind,
                purity: to_purity,
                args: to_args,
            },
        ) => kind != to_kind || purity != to_purity || args.len() != to_args.len(),
        (Ty::Defined(..), Ty::Defined(target, _)) => !reaches_ctor(from, target, types),
        _ => true,
    }
}

/// Whether following declared supertypes from `ty` can arrive at `target`.
fn reaches_ctor(ty: &Ty, target: &TypeCtor, types: &TypeTable) -> bool {
    let mut current = ty.unkinded().clone();
    let mut seen = FxHashSet::default();
    loop {
        let ctor = match &current {
            Ty::Defined(ctor, _) => ctor,
            Ty::Var(_) => return true,
            _ => return false,
        };
        if ctor == target {
            return true;
        }
        if !seen.insert(ctor.clone()) {
            return false;
        }
        match types.supertype_of(&current) {
            Some(sup) => current = sup.unkinded().clone(),
            None => return false,
        }
    }
}

/// Whether ground type `a` is equal to, or coerces up to, ground type `b`.
pub fn compare_equal_lt(a: &Ty, b: &Ty, types: &TypeTable) -> bool {
    let (a, b) = (a.unkinded(), b.unkinded());
    if a == b {
        return true;
    }
    match (a, b) {
        (Ty::Tuple(xs), Ty::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| related(x, y, types))
        }
        (Ty::Defined(..), Ty::Defined(target, target_args)) => {
            let mut current = a.clone();
            let mut seen = FxHashSet::default();
            loop {
                let Ty::Defined(ctor, args) = &current else {
                    return false;
                };
                if ctor == target {
                    return args_agree(ctor, args, target_args, types);
                }
                if !seen.insert(ctor.clone()) {
                    return false;
                }
                match types.supertype_of(&current) {
                    Some(sup) => current = sup.unkinded().clone(),
                    None => return false,
                }
            }
        }
        _ => false,
    }
}

/// Equal, or coercible in one direction or the other.
fn related(a: &Ty, b: &Ty, types: &TypeTable) -> bool {
    compare_equal_lt(a, b, types) || compare_equal_lt(b, a, types)
}

fn args_agree(ctor: &TypeCtor, xs: &[Ty], ys: &[Ty], types: &TypeTable) -> bool {
    let variances = types.variance(ctor);
    xs.len() == ys.len()
        && xs.iter().zip(ys).enumerate().all(|(i, (x, y))| {
            match variances.and_then(|v| v.get(i)) {
                Some(Variance::Covariant) => related(x, y, types),
                _ => x.unkinded() == y.unkinded(),
            }
        })
}

/// Re-check the pending coercions of every hypothesis now that more is
/// known. If some hypothesis has no coercion left outstanding, only such
/// hypotheses are kept.
pub fn prune_coerce_constraints(set: TypeAssignmentSet, types: &TypeTable) -> TypeAssignmentSet {
    let mut checked = Vec::with_capacity(set.len());
    for mut hyp in set {
        let pending = std::mem::take(&mut hyp.coerce_constraints);
        let mut remaining = Vec::new();
        for c in pending {
            if c.status == CoerceStatus::Unsatisfiable {
                remaining.push(c);
                continue;
            }
            match check_coerce(&mut hyp, &c.from, &c.to, types) {
                CoerceOutcome::Satisfied => {}
                CoerceOutcome::Deferred => remaining.push(c),
                CoerceOutcome::Unsatisfiable => remaining.push(CoerceConstraint {
                    status: CoerceStatus::Unsatisfiable,
                    ..c
                }),
            }
        }
        hyp.coerce_constraints = remaining;
        checked.push(hyp);
    }
    if checked.iter().any(|h| h.coerce_constraints.is_empty()) {
        checked
            .into_iter()
            .filter(|h| h.coerce_constraints.is_empty())
            .collect()
    } else {
        checked.into_iter().collect()
    }
}
