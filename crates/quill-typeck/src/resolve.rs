//! Overload resolution.
//!
//! Each live hypothesis is paired with each candidate scheme (renamed
//! apart into that hypothesis), the call's arguments are unified
//! positionally against the candidate's expected types, and the
//! survivors are folded back into plain hypotheses.

use indexmap::IndexMap;
use tracing::trace;

use crate::assign::{require_vars_types, ArgsTypeAssignment, Hypothesis, Mismatch, TypeAssignmentSet};
use crate::classes::{ContextReducer, Constraint};
use crate::cons_info::ConsTypeInfo;
use crate::goal::ProgVar;
use crate::tables::ClassTable;

/// Overloaded symbols seen in a predicate (`name/arity`), with a
/// description of each candidate tried. Used only for diagnostic text.
pub type OverloadedSymbols = IndexMap<String, Vec<String>>;

/// Pair every hypothesis with every candidate. Produces
/// `set.len() * candidates.len()` args-hypotheses, hypothesis-major.
pub fn cross_product(set: &TypeAssignmentSet, candidates: &[ConsTypeInfo]) -> Vec<Hypothesis> {
    let mut out = Vec::with_capacity(set.len() * candidates.len());
    for hyp in set.iter() {
        for cand in candidates {
            let mut assignment = hyp.clone();
            let renaming = assignment.rename_apart(&cand.tvarset);
            let existq: Vec<_> = cand
                .existq_tvars
                .iter()
                .map(|v| renaming.get(v).copied().unwrap_or(*v))
                .collect();
            assignment.protect(existq.iter().copied());
            let rename_all = |cs: &[Constraint]| -> Vec<Constraint> {
                cs.iter().map(|c| c.rename(&renaming)).collect()
            };
            out.push(Hypothesis::Args(ArgsTypeAssignment {
                expected: cand
                    .expected_types()
                    .iter()
                    .map(|t| t.rename(&renaming))
                    .collect(),
                unproven: rename_all(&cand.unproven),
                assumed: rename_all(&cand.assumed),
                owned_existq: if cand.owns_existq { existq } else { Vec::new() },
                source: cand.source.clone(),
                assignment,
            }));
        }
    }
    out
}

/// Resolve a call or functor with argument variables `vars` against
/// `candidates`. On failure the position of the first argument that no
/// hypothesis could accept is returned with the mismatch; `set` itself
/// is untouched and remains the fallback.
pub fn resolve_overloaded(
    set: &TypeAssignmentSet,
    candidates: &[ConsTypeInfo],
    vars: &[ProgVar],
    reducer: &dyn ContextReducer,
    classes: &ClassTable,
) -> Result<TypeAssignmentSet, (usize, Mismatch)> {
    let hyps = cross_product(set, candidates);
    trace!(
        hypotheses = set.len(),
        candidates = candidates.len(),
        combined = hyps.len(),
        "overload cross product"
    );
    let hyps = require_vars_types(hyps, vars, vars.len(), |h, i| h.expected(i))?;
    let mut resolved = TypeAssignmentSet::from_hypotheses(hyps);
    for hyp in resolved.iter_mut() {
        reducer.reduce(hyp, classes);
    }
    Ok(resolved)
}
