//! End-of-clause and end-of-predicate checks.
//!
//! Once a clause (or a whole predicate) has been traversed, the surviving
//! hypotheses are narrowed by their coercions and checked for ambiguity.
//! When a single hypothesis is finally chosen, overloaded calls are
//! resolved against it and its leftover constraints are reported.

use quill_common::span::Span;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::assign::{push_unique, CoerceStatus, TypeAssignment, TypeAssignmentSet};
use crate::classes::{match_ty, Constraint};
use crate::cons_info::pred_call_candidates;
use crate::error::{AmbiguousVar, TypeError};
use crate::goal::{Callee, Goal, GoalKind, ProgVar, VarTable};
use crate::tables::ModuleTables;
use crate::ty::VariantMatcher;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AmbiguityScope {
    /// After one clause; later clauses may still disambiguate.
    Clause,
    /// After all clauses of the predicate.
    WholePred,
}

/// What the ambiguity report refers to.
#[derive(Clone, Copy, Debug)]
pub struct AmbiguityContext<'a> {
    /// Display name of the predicate, as in `predicate `p/1``.
    pub pred: &'a str,
    pub head_vars: &'a [ProgVar],
    pub var_table: &'a VarTable,
    pub span: Span,
}

/// Decide whether the hypotheses in `set` are an ambiguity worth
/// reporting, and report it if so. A reported ambiguity is settled by
/// keeping the first hypothesis.
///
/// # Panics
///
/// Panics if `set` is empty and no error has been reported: every path
/// that drops hypotheses keeps at least one or reports why.
pub fn check_ambiguity(
    mut set: TypeAssignmentSet,
    scope: AmbiguityScope,
    had_errors: bool,
    cx: AmbiguityContext<'_>,
    errors: &mut Vec<TypeError>,
) -> TypeAssignmentSet {
    match set.len() {
        0 => {
            assert!(
                had_errors,
                "no type assignment survived for {} and no error was reported",
                cx.pred
            );
            set
        }
        1 => set,
        n => {
            if had_errors {
                return set;
            }
            if scope == AmbiguityScope::Clause && !head_types_agree(&mut set, cx.head_vars) {
                debug!(pred = cx.pred, hypotheses = n, "ambiguity deferred to later clauses");
                return set;
            }
            debug!(pred = cx.pred, hypotheses = n, ?scope, "reporting ambiguity");
            let vars = ambiguous_vars(&mut set, cx.var_table);
            errors.push(TypeError::Ambiguity {
                pred: cx.pred.to_string(),
                vars,
                span: cx.span,
            });
            set.into_iter().take(1).collect()
        }
    }
}

/// Whether the head variables have the same types, up to renaming, in
/// every hypothesis.
fn head_types_agree(set: &mut TypeAssignmentSet, head_vars: &[ProgVar]) -> bool {
    let mut hyps = set.iter_mut();
    let Some(first) = hyps.next() else {
        return true;
    };
    let base: Vec<_> = head_vars.iter().map(|v| first.resolved_var_type(*v)).collect();
    hyps.all(|hyp| {
        let mut m = VariantMatcher::new();
        head_vars
            .iter()
            .zip(&base)
            .all(|(v, want)| match (want, hyp.resolved_var_type(*v)) {
                (Some(want), Some(have)) => m.matches(want, &have),
                (None, None) => true,
                _ => false,
            })
    })
}

/// The variables whose types differ between hypotheses, with each
/// distinct type they take.
fn ambiguous_vars(set: &mut TypeAssignmentSet, var_table: &VarTable) -> Vec<AmbiguousVar> {
    let mut vars: Vec<ProgVar> = set.iter().flat_map(|h| h.typed_vars()).collect();
    vars.sort();
    vars.dedup();

    let mut out = Vec::new();
    for var in vars {
        let mut base = None;
        let mut differs = false;
        let mut types = Vec::new();
        for hyp in set.iter_mut() {
            let Some(ty) = hyp.resolved_var_type(var) else {
                continue;
            };
            push_unique(&mut types, hyp.type_to_string(&ty));
            match &base {
                None => base = Some(ty),
                Some(b) => differs |= !VariantMatcher::new().matches(b, &ty),
            }
        }
        if differs {
            out.push(AmbiguousVar {
                name: var_table.name(var),
                types,
            });
        }
    }
    out
}

/// Resolve the calls left overloaded by traversal, now that `hyp` is the
/// final typing of the clause. A call is resolved only when exactly one
/// candidate's declared argument types match the final argument types.
pub fn resolve_calls(goal: &mut Goal, hyp: &mut TypeAssignment, tables: &ModuleTables) {
    goal.walk_mut(&mut |g| {
        let GoalKind::Call {
            name,
            args,
            callee: callee @ Callee::Unresolved,
        } = &mut g.kind
        else {
            return;
        };
        let actual: Vec<_> = args.iter().map(|a| hyp.resolved_var_type(*a)).collect();
        let Some(actual) = actual.into_iter().collect::<Option<Vec<_>>>() else {
            return;
        };
        let matching: Vec<_> = pred_call_candidates(tables, name, args.len())
            .into_iter()
            .filter(|cand| {
                let mut subst = FxHashMap::default();
                cand.args
                    .iter()
                    .zip(&actual)
                    .all(|(pat, ty)| match_ty(pat, ty, &mut subst))
            })
            .filter_map(|cand| cand.source.pred_id())
            .collect();
        if let [id] = matching.as_slice() {
            *callee = Callee::Resolved(*id);
        }
    });
}

/// Report the class constraints `hyp` has not discharged. For a
/// predicate without a declared type, constraints that still mention
/// type variables are not errors but part of the inferred context; they
/// are returned rendered.
pub fn constraint_errors(
    hyp: &mut TypeAssignment,
    declared: bool,
    span: Span,
    errors: &mut Vec<TypeError>,
) -> Vec<String> {
    let mut inferred = Vec::new();
    let unproven = hyp.constraints.unproven.clone();
    for c in unproven {
        let args = c.args.iter().map(|a| hyp.resolve(a)).collect();
        let c = Constraint::new(c.class, args);
        let text = c.display_with(hyp.names());
        if declared || c.is_ground() {
            errors.push(TypeError::UnsatisfiedConstraint {
                constraint: text,
                span,
            });
        } else {
            push_unique(&mut inferred, text);
        }
    }
    inferred
}

/// Report the coercions `hyp` could not discharge.
pub fn coercion_errors(hyp: &mut TypeAssignment, errors: &mut Vec<TypeError>) {
    let pending = hyp.coerce_constraints.clone();
    for c in pending {
        let from = hyp.type_to_string(&c.from);
        let to = hyp.type_to_string(&c.to);
        errors.push(match c.status {
            CoerceStatus::Unsatisfiable => TypeError::UnsatisfiableCoercion {
                from,
                to,
                span: c.span,
            },
            CoerceStatus::NeedToCheck => TypeError::UndeterminedCoercion {
                from,
                to,
                span: c.span,
            },
        });
    }
}
