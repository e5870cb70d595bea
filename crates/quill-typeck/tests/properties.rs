//! Property tests for unification, hypothesis pruning, overload
//! resolution and coercion.
//!
//! 1. Unifying a type with itself always succeeds and binds nothing
//! 2. A failed unification leaves the hypothesis untouched
//! 3. Repeating a successful unification binds nothing more
//! 4. Requiring a type keeps exactly the hypotheses that allow it
//! 5. Overload resolution keeps exactly the matching pairs
//! 6. Every ground type coerces to itself
//! 7. An open coercion is deferred only while its outer constructors
//!    could still meet
//! 8. A variable the binding scheme does not own is bindable exactly
//!    when it is not protected, whatever it is bound to

mod common;

use common::*;
use proptest::prelude::*;
use quill_common::sym::SymName;
use quill_typeck::assign::{TypeAssignment, TypeAssignmentSet};
use quill_typeck::classes::BasicReducer;
use quill_typeck::coerce::{check_coerce, CoerceOutcome};
use quill_typeck::cons_info::pred_call_candidates;
use quill_typeck::goal::ProgVar;
use quill_typeck::resolve::resolve_overloaded;
use quill_typeck::tables::ModuleTables;
use quill_typeck::ty::{Ty, TyVar};
use quill_typeck::unify::may_bind;
use rustc_hash::FxHashSet;

const VARS: u32 = 4;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_builtin() -> impl Strategy<Value = Ty> {
    prop_oneof![
        Just(Ty::int()),
        Just(Ty::float()),
        Just(Ty::string()),
        Just(Ty::char()),
    ]
}

fn arb_compound(leaf: BoxedStrategy<Ty>) -> impl Strategy<Value = Ty> {
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(list_of),
            prop::collection::vec(inner, 0..3).prop_map(Ty::Tuple),
        ]
    })
}

fn arb_ground() -> impl Strategy<Value = Ty> {
    arb_compound(arb_builtin().boxed())
}

/// Types over the variables `TyVar(0)` to `TyVar(VARS - 1)`.
fn arb_open() -> impl Strategy<Value = Ty> {
    let leaf = prop_oneof![
        arb_builtin(),
        (0..VARS).prop_map(|i| Ty::Var(TyVar(i))),
    ];
    arb_compound(leaf.boxed())
}

/// A hypothesis owning `VARS` variables, the first `protected` of them
/// rigid.
fn hypothesis(protected: u32) -> TypeAssignment {
    let mut hyp = TypeAssignment::new();
    let vars: Vec<TyVar> = (0..VARS).map(|_| hyp.fresh_var()).collect();
    hyp.protect(vars.into_iter().take(protected as usize));
    hyp
}

fn snapshot(hyp: &mut TypeAssignment) -> Vec<Ty> {
    (0..VARS).map(|i| hyp.resolve(&Ty::Var(TyVar(i)))).collect()
}

// ---------------------------------------------------------------------------
// Unification
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unify_reflexive(t in arb_open(), protected in 0..=VARS) {
        let mut hyp = hypothesis(protected);
        prop_assert!(hyp.unify(&t, &t).is_ok());
        prop_assert_eq!(hyp.bound_count(), 0);
    }

    #[test]
    fn failed_unify_is_transactional(
        a in arb_open(),
        b in arb_open(),
        c in arb_open(),
        protected in 0..=VARS,
    ) {
        let mut hyp = hypothesis(protected);
        // Some prior bindings, when they unify at all.
        let _ = hyp.unify(&Ty::Var(TyVar(VARS - 1)), &c);
        let before = snapshot(&mut hyp);
        let bound = hyp.bound_count();

        if hyp.unify(&a, &b).is_err() {
            prop_assert_eq!(hyp.bound_count(), bound);
            prop_assert_eq!(snapshot(&mut hyp), before);
        }
    }

    #[test]
    fn successful_unify_is_idempotent(a in arb_open(), b in arb_open()) {
        let mut hyp = hypothesis(0);
        if hyp.unify(&a, &b).is_ok() {
            let bound = hyp.bound_count();
            prop_assert!(hyp.unify(&a, &b).is_ok());
            prop_assert_eq!(hyp.bound_count(), bound);
        }
    }

    #[test]
    fn unowned_binding_ignores_its_target(
        var in 0..VARS,
        targets in prop::collection::vec(0..VARS, 0..4),
        protected in prop::collection::vec(0..VARS, 0..4),
    ) {
        let protected: FxHashSet<TyVar> = protected.into_iter().map(TyVar).collect();
        let targets: Vec<TyVar> = targets.into_iter().map(TyVar).collect();
        let var = TyVar(var);
        prop_assert_eq!(may_bind(var, &targets, &protected, &[]), !protected.contains(&var));
    }
}

// ---------------------------------------------------------------------------
// Hypothesis sets
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn require_keeps_exactly_the_agreeing_hypotheses(
        types in prop::collection::vec(arb_builtin(), 1..6),
        target in arb_builtin(),
    ) {
        let x = ProgVar(0);
        let set: TypeAssignmentSet = types
            .iter()
            .map(|ty| {
                let mut hyp = TypeAssignment::new();
                hyp.set_var_type(x, ty.clone());
                hyp
            })
            .collect();
        let agreeing = types.iter().filter(|ty| **ty == target).count();

        match set.require_var_type(x, |_| target.clone()) {
            Ok(set) => {
                prop_assert!(agreeing > 0);
                prop_assert_eq!(set.len(), agreeing);
            }
            Err(mismatch) => {
                prop_assert_eq!(agreeing, 0);
                prop_assert_eq!(mismatch.hyps.len(), types.len());
            }
        }
    }

    #[test]
    fn resolution_keeps_matching_pairs(
        types in prop::collection::vec(arb_builtin(), 1..6),
        decls in prop::sample::subsequence(vec![Ty::int(), Ty::float(), Ty::string(), Ty::char()], 1..=4),
    ) {
        let mut tables = ModuleTables::new();
        for ty in &decls {
            pred(&mut tables, "q", vec![ty.clone()]);
        }
        let cands = pred_call_candidates(&tables, &SymName::unqualified("q"), 1);
        let x = ProgVar(0);
        let set: TypeAssignmentSet = types
            .iter()
            .map(|ty| {
                let mut hyp = TypeAssignment::new();
                hyp.set_var_type(x, ty.clone());
                hyp
            })
            .collect();
        let matching = types.iter().filter(|ty| decls.contains(ty)).count();

        match resolve_overloaded(&set, &cands, &[x], &BasicReducer, &tables.classes) {
            Ok(out) => {
                prop_assert!(out.len() <= types.len() * decls.len());
                prop_assert_eq!(out.len(), matching);
            }
            Err((arg, _)) => {
                prop_assert_eq!(matching, 0);
                prop_assert_eq!(arg, 0);
            }
        }
    }

    #[test]
    fn untyped_argument_takes_every_candidate(
        hyps in 1usize..5,
        decls in prop::sample::subsequence(vec![Ty::int(), Ty::float(), Ty::string(), Ty::char()], 1..=4),
    ) {
        let mut tables = ModuleTables::new();
        for ty in &decls {
            pred(&mut tables, "q", vec![ty.clone()]);
        }
        let cands = pred_call_candidates(&tables, &SymName::unqualified("q"), 1);
        let set: TypeAssignmentSet = vec![TypeAssignment::new(); hyps].into_iter().collect();

        let out = resolve_overloaded(&set, &cands, &[ProgVar(0)], &BasicReducer, &tables.classes);
        prop_assert_eq!(out.map(|s| s.len()).ok(), Some(hyps * decls.len()));
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn ground_types_coerce_to_themselves(t in arb_ground()) {
        let mut tables = ModuleTables::new();
        list_type(&mut tables);
        let mut hyp = TypeAssignment::new();
        prop_assert_eq!(check_coerce(&mut hyp, &t, &t, &tables.types), CoerceOutcome::Satisfied);
    }

    #[test]
    fn open_types_with_matching_heads_are_deferred(t in arb_ground(), v in 0..VARS) {
        let mut tables = ModuleTables::new();
        list_type(&mut tables);
        let mut hyp = hypothesis(0);
        let open = list_of(Ty::Var(TyVar(v)));
        prop_assert_eq!(check_coerce(&mut hyp, &list_of(t), &open, &tables.types), CoerceOutcome::Deferred);
    }

    #[test]
    fn open_types_with_unrelated_heads_fail(b in arb_builtin(), v in 0..VARS) {
        let mut tables = ModuleTables::new();
        list_type(&mut tables);
        let mut hyp = hypothesis(0);
        let open = list_of(Ty::Var(TyVar(v)));
        prop_assert_eq!(check_coerce(&mut hyp, &open, &b, &tables.types), CoerceOutcome::Unsatisfiable);
        prop_assert_eq!(check_coerce(&mut hyp, &b, &open, &tables.types), CoerceOutcome::Unsatisfiable);
    }
}

/// Without an occurs check a variable may be bound to a term containing
/// itself, and resolution stops at the inner occurrence.
#[test]
fn cyclic_binding_is_accepted() {
    let mut hyp = hypothesis(0);
    let a = Ty::Var(TyVar(0));
    assert!(hyp.unify(&a, &list_of(a.clone())).is_ok());
    assert_eq!(hyp.resolve(&a), list_of(a.clone()));
    assert!(hyp.unify(&a, &list_of(list_of(a.clone()))).is_ok());
}
