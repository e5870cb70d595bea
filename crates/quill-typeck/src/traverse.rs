//! Goal traversal.
//!
//! Walks a clause body once, left to right, threading the hypothesis set
//! through every goal. Each goal either narrows the set (unifications,
//! single-candidate calls), multiplies it (overloaded calls and
//! functors), or joins the sets of alternative branches. Failures are
//! reported and checking resumes from the set the failing goal started
//! with.

use quill_common::span::Span;
use quill_common::sym::SymName;
use tracing::trace;

use crate::assign::{union_branches, TypeAssignment, TypeAssignmentSet};
use crate::assign::{CoerceConstraint, CoerceStatus};
use crate::builtins::{io_state, literal_type, stm};
use crate::classes::ContextReducer;
use crate::coerce::{check_coerce, CoerceOutcome};
use crate::config::TypeckOptions;
use crate::cons_info::{case_candidates, functor_candidates, pred_call_candidates, pred_candidate};
use crate::cons_info::ConsTypeInfo;
use crate::error::TypeError;
use crate::goal::{AtomicOuter, Callee, ConsId, Goal, GoalKind, ProgVar, ScopeReason, Shorthand, UnifyRhs, VarTable};
use crate::guard::{AmbiguityGuard, Verdict};
use crate::resolve::{resolve_overloaded, OverloadedSymbols};
use crate::tables::ModuleTables;
use crate::ty::{PredOrFunc, Purity, Ty};

/// Checks the clauses of one predicate.
///
/// Holds everything that accumulates across the clauses of a predicate:
/// diagnostics, the overloaded-symbol map and the ambiguity guard.
pub struct ClauseChecker<'a> {
    tables: &'a ModuleTables,
    reducer: &'a dyn ContextReducer,
    var_table: &'a VarTable,
    guard: AmbiguityGuard,
    pub errors: Vec<TypeError>,
    pub overloaded: OverloadedSymbols,
}

impl<'a> ClauseChecker<'a> {
    pub fn new(
        tables: &'a ModuleTables,
        reducer: &'a dyn ContextReducer,
        var_table: &'a VarTable,
        opts: &TypeckOptions,
    ) -> Self {
        ClauseChecker {
            tables,
            reducer,
            var_table,
            guard: AmbiguityGuard::new(opts),
            errors: Vec::new(),
            overloaded: OverloadedSymbols::new(),
        }
    }

    /// Whether an error (not just a warning) has been reported.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(TypeError::is_error)
    }

    /// Check `goal` against `set`, returning the set that holds after it.
    /// Calls in `goal` with a single candidate are marked resolved.
    pub fn check_goal(&mut self, goal: &mut Goal, set: TypeAssignmentSet) -> TypeAssignmentSet {
        if self.guard.check(set.len(), goal.span, &self.overloaded, &mut self.errors) == Verdict::Skip {
            return set;
        }
        trace!(hypotheses = set.len(), "checking goal");
        let span = goal.span;
        match &mut goal.kind {
            GoalKind::Conj(goals) | GoalKind::ParConj(goals) => {
                let mut set = set;
                for g in goals.iter_mut() {
                    set = self.check_goal(g, set);
                }
                set
            }
            GoalKind::Disj(goals) => {
                if goals.is_empty() {
                    return set;
                }
                let branches = goals
                    .iter_mut()
                    .map(|g| self.check_goal(g, set.clone()))
                    .collect();
                union_branches(branches)
            }
            GoalKind::Switch { var, cases } => {
                let var = *var;
                if cases.is_empty() {
                    return set;
                }
                let mut branches = Vec::with_capacity(cases.len());
                for case in cases.iter_mut() {
                    let entry = self.require_case(set.clone(), var, &case.cons, span);
                    branches.push(self.check_goal(&mut case.goal, entry));
                }
                union_branches(branches)
            }
            GoalKind::IfThenElse {
                vars,
                cond,
                then,
                else_,
            } => {
                let after_cond = self.check_goal(cond, set.clone());
                let after_then = self.check_goal(then, after_cond);
                let after_else = self.check_goal(else_, set);
                let mut set = union_branches(vec![after_then, after_else]);
                set.ensure_vars_have_a_type(vars);
                set
            }
            GoalKind::Not(inner) => self.check_goal(inner, set),
            GoalKind::Scope { reason, goal: inner } => {
                let mut set = self.check_goal(inner, set);
                match reason {
                    ScopeReason::Exist(vars) => set.ensure_vars_have_a_type(vars),
                    ScopeReason::RequireCompleteSwitch(var) => set.ensure_vars_have_a_type(&[*var]),
                    ScopeReason::LoopControl { lc, lcs } => set.ensure_vars_have_a_type(&[*lc, *lcs]),
                    ScopeReason::Barrier | ScopeReason::Commit | ScopeReason::Promise => {}
                }
                set
            }
            GoalKind::Call { name, args, callee } => {
                let (set, resolved) = self.check_call(name, args, set, span);
                *callee = resolved;
                set
            }
            GoalKind::HigherOrderCall {
                closure,
                kind,
                purity,
                args,
            } => {
                let (kind, purity) = (*kind, *purity);
                let args = args.clone();
                self.require_var(set, *closure, span, |h| higher_order_type(h, kind, purity, &args))
            }
            GoalKind::EventCall { name, args } => self.check_event(name, args, set, span),
            GoalKind::ForeignCall { pred, args } => {
                let cands = vec![pred_candidate(self.tables, *pred)];
                let callee = cands[0].source.describe(self.tables);
                self.resolve_args(set, &cands, args, span, |_| callee)
            }
            GoalKind::Unify { lhs, rhs } => {
                let lhs = *lhs;
                match rhs {
                    UnifyRhs::Var(rhs) => {
                        let rhs = *rhs;
                        self.require_var(set, lhs, span, |h| h.ensure_var_type(rhs))
                    }
                    UnifyRhs::Functor { cons, args } => self.check_functor(lhs, cons, args, set, span),
                    UnifyRhs::Lambda {
                        kind,
                        purity,
                        params,
                        body,
                    } => {
                        let (kind, purity) = (*kind, *purity);
                        let params = params.clone();
                        let set =
                            self.require_var(set, lhs, span, |h| higher_order_type(h, kind, purity, &params));
                        self.check_goal(body, set)
                    }
                }
            }
            GoalKind::Coerce { from, to } => self.check_coerce_goal(*from, *to, set, span),
            GoalKind::Shorthand(shorthand) => self.check_shorthand(shorthand, set, span),
        }
    }

    fn check_call(
        &mut self,
        name: &SymName,
        args: &[ProgVar],
        set: TypeAssignmentSet,
        span: Span,
    ) -> (TypeAssignmentSet, Callee) {
        let arity = args.len();
        let cands = pred_call_candidates(self.tables, name, arity);
        trace!(%name, arity, candidates = cands.len(), "call");
        if cands.is_empty() {
            self.errors.push(TypeError::UndefinedPred {
                name: name.clone(),
                arity,
                span,
            });
            return (set, Callee::Unresolved);
        }
        let callee = match cands.as_slice() {
            [only] => only
                .source
                .pred_id()
                .map_or(Callee::Unresolved, Callee::Resolved),
            _ => {
                self.note_overloaded(format!("{}/{}", name, arity), &cands);
                Callee::Unresolved
            }
        };
        let tables = self.tables;
        let describe = |cands: &[ConsTypeInfo]| match cands {
            [only] => only.source.describe(tables),
            _ => format!("overloaded `{}/{}`", name, arity),
        };
        let set = self.resolve_args(set, &cands, args, span, describe);
        (set, callee)
    }

    /// Resolve an argument list against `cands`, reporting the first
    /// argument no hypothesis accepts. `callee` names the call in that
    /// report.
    fn resolve_args(
        &mut self,
        set: TypeAssignmentSet,
        cands: &[ConsTypeInfo],
        args: &[ProgVar],
        span: Span,
        callee: impl FnOnce(&[ConsTypeInfo]) -> String,
    ) -> TypeAssignmentSet {
        match resolve_overloaded(&set, cands, args, self.reducer, &self.tables.classes) {
            Ok(resolved) => resolved,
            Err((i, m)) => {
                self.errors.push(TypeError::WrongArgType {
                    callee: callee(cands),
                    arg: i + 1,
                    var: self.var_table.name(args[i]),
                    actual: m.actual,
                    expected: m.expected,
                    span,
                });
                set
            }
        }
    }

    fn check_event(
        &mut self,
        name: &str,
        args: &[ProgVar],
        set: TypeAssignmentSet,
        span: Span,
    ) -> TypeAssignmentSet {
        let tables = self.tables;
        let Some(arg_types) = tables.events.get(name) else {
            self.errors.push(TypeError::UndefinedEvent {
                name: name.to_string(),
                span,
            });
            return set;
        };
        if arg_types.len() != args.len() {
            self.errors.push(TypeError::EventArity {
                name: name.to_string(),
                expected: arg_types.len(),
                found: args.len(),
                span,
            });
            return set;
        }
        let mut set = set;
        for (i, (var, ty)) in args.iter().zip(arg_types).enumerate() {
            let fallback = set.clone();
            set = match set.require_var_type(*var, |_| ty.clone()) {
                Ok(set) => set,
                Err(m) => {
                    self.errors.push(TypeError::WrongArgType {
                        callee: format!("event `{}`", name),
                        arg: i + 1,
                        var: self.var_table.name(*var),
                        actual: m.actual,
                        expected: m.expected,
                        span,
                    });
                    fallback
                }
            };
        }
        set
    }

    fn check_functor(
        &mut self,
        lhs: ProgVar,
        cons: &ConsId,
        args: &[ProgVar],
        set: TypeAssignmentSet,
        span: Span,
    ) -> TypeAssignmentSet {
        let functor = functor_text(cons, args, self.var_table);
        let name = match cons {
            ConsId::Named(name) => name,
            literal => {
                let Some(ty) = literal_type(literal) else {
                    return set;
                };
                return match set.require_var_type(lhs, |_| ty.clone()) {
                    Ok(set) => set,
                    Err(m) => {
                        self.functor_mismatch(lhs, functor, m.actual, m.expected, span);
                        TypeAssignmentSet::from_hypotheses(m.hyps)
                    }
                };
            }
        };

        let arity = args.len();
        let (cands, invalid) = functor_candidates(self.tables, name, arity);
        trace!(%name, arity, candidates = cands.len(), "functor");
        if cands.is_empty() {
            match invalid.into_iter().next() {
                Some(update) => self.errors.push(TypeError::InvalidFieldUpdate {
                    field: update.field,
                    cons: update.cons,
                    span,
                }),
                None => self.errors.push(TypeError::UndefinedFunctor {
                    name: name.clone(),
                    arity,
                    span,
                }),
            }
            return set;
        }
        if cands.len() > 1 {
            self.note_overloaded(format!("{}/{}", name, arity), &cands);
        }

        let mut vars = Vec::with_capacity(arity + 1);
        vars.push(lhs);
        vars.extend_from_slice(args);
        match resolve_overloaded(&set, &cands, &vars, self.reducer, &self.tables.classes) {
            Ok(resolved) => resolved,
            Err((0, m)) => {
                self.functor_mismatch(lhs, functor, m.actual, m.expected, span);
                set
            }
            Err((i, m)) => {
                self.errors.push(TypeError::WrongArgType {
                    callee: format!("functor `{}/{}`", name, arity),
                    arg: i,
                    var: self.var_table.name(vars[i]),
                    actual: m.actual,
                    expected: m.expected,
                    span,
                });
                set
            }
        }
    }

    fn functor_mismatch(
        &mut self,
        lhs: ProgVar,
        functor: String,
        var_types: Vec<String>,
        functor_types: Vec<String>,
        span: Span,
    ) {
        self.errors.push(TypeError::WrongFunctorType {
            var: self.var_table.name(lhs),
            functor,
            var_types,
            functor_types,
            span,
        });
    }

    /// The set on entry to a switch case: `var` has the type of the
    /// case's constructor.
    fn require_case(&mut self, set: TypeAssignmentSet, var: ProgVar, cons: &ConsId, span: Span) -> TypeAssignmentSet {
        let functor = functor_text(cons, &[], self.var_table);
        let name = match cons {
            ConsId::Named(name) => name,
            literal => {
                let Some(ty) = literal_type(literal) else {
                    return set;
                };
                return match set.require_var_type(var, |_| ty.clone()) {
                    Ok(set) => set,
                    Err(m) => {
                        self.functor_mismatch(var, functor, m.actual, m.expected, span);
                        TypeAssignmentSet::from_hypotheses(m.hyps)
                    }
                };
            }
        };
        let cands = case_candidates(self.tables, name);
        if cands.is_empty() {
            self.errors.push(TypeError::UndefinedFunctor {
                name: name.clone(),
                arity: 0,
                span,
            });
            return set;
        }
        // Labels match constructors of any arity, so the name alone is the key.
        if cands.len() > 1 {
            self.note_overloaded(name.to_string(), &cands);
        }
        match resolve_overloaded(&set, &cands, &[var], self.reducer, &self.tables.classes) {
            Ok(resolved) => resolved,
            Err((_, m)) => {
                self.functor_mismatch(var, functor, m.actual, m.expected, span);
                set
            }
        }
    }

    fn check_coerce_goal(
        &mut self,
        from: ProgVar,
        to: ProgVar,
        mut set: TypeAssignmentSet,
        span: Span,
    ) -> TypeAssignmentSet {
        let types = &self.tables.types;
        for hyp in set.iter_mut() {
            let from_ty = hyp.ensure_var_type(from);
            let to_ty = hyp.ensure_var_type(to);
            let status = match check_coerce(hyp, &from_ty, &to_ty, types) {
                CoerceOutcome::Satisfied => continue,
                CoerceOutcome::Deferred => CoerceStatus::NeedToCheck,
                CoerceOutcome::Unsatisfiable => CoerceStatus::Unsatisfiable,
            };
            hyp.coerce_constraints.push(CoerceConstraint {
                from: from_ty,
                to: to_ty,
                span,
                status,
            });
        }
        set
    }

    fn check_shorthand(&mut self, shorthand: &mut Shorthand, set: TypeAssignmentSet, span: Span) -> TypeAssignmentSet {
        match shorthand {
            Shorthand::BiImplication(a, b) => {
                let set = self.check_goal(a, set);
                self.check_goal(b, set)
            }
            Shorthand::Atomic {
                outer_kind,
                outer,
                inner,
                main,
                orelse,
            } => {
                let outer_ty = match outer_kind {
                    AtomicOuter::Io => io_state(),
                    AtomicOuter::Stm => stm(),
                };
                let mut set = set;
                for var in [outer.0, outer.1] {
                    set = self.require_var(set, var, span, |_| outer_ty.clone());
                }
                for var in [inner.0, inner.1] {
                    set = self.require_var(set, var, span, |_| stm());
                }
                set = self.check_goal(main, set);
                for g in orelse.iter_mut() {
                    set = self.check_goal(g, set);
                }
                set
            }
            Shorthand::Try { io, goal } => {
                let mut set = set;
                if let Some((io0, io)) = io {
                    for var in [*io0, *io] {
                        set = self.require_var(set, var, span, |_| io_state());
                    }
                }
                self.check_goal(goal, set)
            }
        }
    }

    /// Require `var` to have the type `ty` builds in each hypothesis,
    /// reporting a wrong-type error and keeping `set` if none can.
    fn require_var(
        &mut self,
        set: TypeAssignmentSet,
        var: ProgVar,
        span: Span,
        ty: impl FnMut(&mut TypeAssignment) -> Ty,
    ) -> TypeAssignmentSet {
        match set.require_var_type(var, ty) {
            Ok(set) => set,
            Err(m) => {
                self.errors.push(TypeError::WrongVarType {
                    var: self.var_table.name(var),
                    actual: m.actual,
                    expected: m.expected,
                    span,
                });
                TypeAssignmentSet::from_hypotheses(m.hyps)
            }
        }
    }

    fn note_overloaded(&mut self, symbol: String, cands: &[ConsTypeInfo]) {
        let tables = self.tables;
        self.overloaded
            .entry(symbol)
            .or_insert_with(|| cands.iter().map(|c| c.source.describe(tables)).collect());
    }
}

/// `pred(T1, ..., Tn)` or `func(T1, ..., Tn-1) = Tn` over the types of
/// `vars` in `hyp`.
fn higher_order_type(hyp: &mut TypeAssignment, kind: PredOrFunc, purity: Purity, vars: &[ProgVar]) -> Ty {
    Ty::HigherOrder {
        kind,
        purity,
        args: vars.iter().map(|v| hyp.ensure_var_type(*v)).collect(),
    }
}

/// The right-hand side of `X = f(...)` as written, for diagnostics.
fn functor_text(cons: &ConsId, args: &[ProgVar], var_table: &VarTable) -> String {
    let head = match cons {
        ConsId::Int(_, n) => n.to_string(),
        ConsId::Float(x) => format!("{:?}", x),
        ConsId::String(s) => format!("{:?}", s),
        ConsId::Char(c) => format!("{:?}", c),
        ConsId::Named(name) => name.to_string(),
    };
    if args.is_empty() {
        return head;
    }
    let args: Vec<String> = args.iter().map(|a| var_table.name(*a)).collect();
    format!("{}({})", head, args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::BasicReducer;
    use crate::goal::Case;
    use crate::tables::{CtorDefn, CtorField, PredInfo, TypeBody, TypeDefn};
    use crate::ty::{TyVarSet, TypeCtor};

    fn sym(name: &str) -> SymName {
        SymName::unqualified(name)
    }

    fn enum_type(tables: &mut ModuleTables, name: &str, ctors: &[&str]) {
        tables.add_type(TypeDefn {
            ctor: TypeCtor::new(sym(name), 0),
            tvarset: TyVarSet::new(),
            params: Vec::new(),
            body: TypeBody::Du(ctors.iter().map(|c| CtorDefn::new(sym(c), Vec::new())).collect()),
            supertype: None,
        });
    }

    fn overloaded_q(tables: &mut ModuleTables) {
        for ty in [Ty::int(), Ty::float()] {
            tables.add_pred(PredInfo::new(sym("q"), PredOrFunc::Pred, TyVarSet::new(), vec![ty]));
        }
    }

    fn run(tables: &ModuleTables, vars: &VarTable, goal: &mut Goal) -> (TypeAssignmentSet, Vec<TypeError>) {
        let opts = TypeckOptions::default();
        let mut checker = ClauseChecker::new(tables, &BasicReducer, vars, &opts);
        let set = checker.check_goal(goal, TypeAssignmentSet::singleton(TypeAssignment::new()));
        (set, checker.errors)
    }

    fn sp(n: u32) -> Span {
        Span::new(n, n + 1)
    }

    #[test]
    fn literal_unification_types_variable() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::unify_functor(x, ConsId::Int(crate::ty::IntWidth::Int, 1), Vec::new(), sp(0));
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        assert_eq!(set.len(), 1);
        assert_eq!(set.first_mut().unwrap().resolved_var_type(x), Some(Ty::int()));
    }

    #[test]
    fn single_candidate_call_is_resolved() {
        let mut tables = ModuleTables::new();
        let id = tables.add_pred(PredInfo::new(sym("r"), PredOrFunc::Pred, TyVarSet::new(), vec![Ty::string()]));
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::call("r", vec![x], sp(0));
        let (_, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        assert!(matches!(goal.kind, GoalKind::Call { callee: Callee::Resolved(r), .. } if r == id));
    }

    #[test]
    fn overloaded_call_stays_unresolved() {
        let mut tables = ModuleTables::new();
        overloaded_q(&mut tables);
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::call("q", vec![x], sp(0));
        let opts = TypeckOptions::default();
        let mut checker = ClauseChecker::new(&tables, &BasicReducer, &vars, &opts);
        let set = checker.check_goal(&mut goal, TypeAssignmentSet::singleton(TypeAssignment::new()));
        assert_eq!(set.len(), 2);
        assert!(matches!(goal.kind, GoalKind::Call { callee: Callee::Unresolved, .. }));
        assert_eq!(checker.overloaded["q/1"].len(), 2);
    }

    #[test]
    fn undefined_call_keeps_set() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::call("nope", vec![x], sp(3));
        let (set, errors) = run(&tables, &vars, &mut goal);
        assert_eq!(set.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "undefined predicate or function `nope/1`");
    }

    #[test]
    fn disjunction_keeps_distinct_branches() {
        let mut tables = ModuleTables::new();
        enum_type(&mut tables, "colour", &["red"]);
        enum_type(&mut tables, "shape", &["square"]);
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::disj(
            vec![
                Goal::unify_functor(x, ConsId::named("red"), Vec::new(), sp(0)),
                Goal::unify_functor(x, ConsId::named("square"), Vec::new(), sp(1)),
            ],
            sp(0),
        );
        let (set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn disjunction_folds_agreeing_branches() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let one = || ConsId::Int(crate::ty::IntWidth::Int, 1);
        let mut goal = Goal::disj(
            vec![
                Goal::unify_functor(x, one(), Vec::new(), sp(0)),
                Goal::unify_functor(x, one(), Vec::new(), sp(1)),
            ],
            sp(0),
        );
        let (set, _) = run(&tables, &vars, &mut goal);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn if_then_else_types_quantified_vars() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let local = vars.new_var("L");
        let mut goal = Goal::if_then_else(
            vec![local],
            Goal::true_goal(sp(0)),
            Goal::unify_functor(x, ConsId::String("a".into()), Vec::new(), sp(1)),
            Goal::unify_functor(x, ConsId::String("b".into()), Vec::new(), sp(2)),
            sp(0),
        );
        let (set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        assert_eq!(set.len(), 1);
        assert!(set.iter().all(|h| h.var_type(local).is_some()));
    }

    #[test]
    fn switch_case_fixes_type_of_switched_var() {
        let mut tables = ModuleTables::new();
        enum_type(&mut tables, "colour", &["red", "green"]);
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::new(
            GoalKind::Switch {
                var: x,
                cases: vec![
                    Case {
                        cons: ConsId::named("red"),
                        goal: Goal::true_goal(sp(1)),
                    },
                    Case {
                        cons: ConsId::named("green"),
                        goal: Goal::true_goal(sp(2)),
                    },
                ],
            },
            sp(0),
        );
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        assert_eq!(set.len(), 1);
        let hyp = set.first_mut().unwrap();
        let ty = hyp.resolved_var_type(x).unwrap();
        assert_eq!(hyp.type_to_string(&ty), "colour");
    }

    #[test]
    fn label_shared_by_two_types_is_recorded_as_overloaded() {
        let mut tables = ModuleTables::new();
        enum_type(&mut tables, "colour", &["red", "green"]);
        enum_type(&mut tables, "alert", &["red", "amber"]);
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::new(
            GoalKind::Switch {
                var: x,
                cases: vec![
                    Case {
                        cons: ConsId::named("red"),
                        goal: Goal::true_goal(sp(1)),
                    },
                    Case {
                        cons: ConsId::named("green"),
                        goal: Goal::true_goal(sp(2)),
                    },
                ],
            },
            sp(0),
        );
        let opts = TypeckOptions::default();
        let mut checker = ClauseChecker::new(&tables, &BasicReducer, &vars, &opts);
        checker.check_goal(&mut goal, TypeAssignmentSet::singleton(TypeAssignment::new()));
        assert!(checker.errors.is_empty(), "{:?}", checker.errors);
        let keys: Vec<&str> = checker.overloaded.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["red"]);
        assert_eq!(checker.overloaded["red"].len(), 2);
    }

    #[test]
    fn negation_checks_its_goal() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let y = vars.new_var("Y");
        let inner = Goal::unify_functor(x, ConsId::Int(crate::ty::IntWidth::Int, 1), Vec::new(), sp(1));
        let mut goal = Goal::new(GoalKind::Not(Box::new(inner)), sp(0));
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        assert_eq!(set.first_mut().unwrap().resolved_var_type(x), Some(Ty::int()));

        let mut goal = Goal::new(GoalKind::Not(Box::new(Goal::call("nope", vec![y], sp(2)))), sp(0));
        let (_, errors) = run(&tables, &vars, &mut goal);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "E0001");
    }

    #[test]
    fn quantifying_scopes_give_untyped_variables_one_shared_type() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let y = vars.new_var("Y");
        let lc = vars.new_var("LC");
        let lcs = vars.new_var("LCS");
        let scoped = |reason| Goal::new(GoalKind::Scope { reason, goal: Box::new(Goal::true_goal(sp(1))) }, sp(0));

        let mut goal = scoped(ScopeReason::Exist(vec![x, y]));
        let (mut set, _) = run(&tables, &vars, &mut goal);
        let hyp = set.first_mut().unwrap();
        let x_ty = hyp.resolved_var_type(x);
        assert!(matches!(x_ty, Some(Ty::Var(_))));
        assert_eq!(hyp.resolved_var_type(y), x_ty);

        let mut goal = scoped(ScopeReason::RequireCompleteSwitch(x));
        let (mut set, _) = run(&tables, &vars, &mut goal);
        let hyp = set.first_mut().unwrap();
        assert!(hyp.resolved_var_type(x).is_some());
        assert_eq!(hyp.resolved_var_type(y), None);

        let mut goal = scoped(ScopeReason::LoopControl { lc, lcs });
        let (mut set, _) = run(&tables, &vars, &mut goal);
        let hyp = set.first_mut().unwrap();
        assert!(hyp.resolved_var_type(lc).is_some());
        assert_eq!(hyp.resolved_var_type(lc), hyp.resolved_var_type(lcs));

        let mut goal = scoped(ScopeReason::Commit);
        let (mut set, _) = run(&tables, &vars, &mut goal);
        assert_eq!(set.first_mut().unwrap().resolved_var_type(x), None);
    }

    #[test]
    fn foreign_call_uses_the_declared_argument_types() {
        let mut tables = ModuleTables::new();
        let id = tables.add_pred(PredInfo::new(sym("ext"), PredOrFunc::Pred, TyVarSet::new(), vec![Ty::int()]));
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let mut goal = Goal::new(GoalKind::ForeignCall { pred: id, args: vec![x] }, sp(0));
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        assert_eq!(set.first_mut().unwrap().resolved_var_type(x), Some(Ty::int()));

        let mut goal = Goal::conj(
            vec![
                Goal::unify_functor(x, ConsId::String("s".into()), Vec::new(), sp(1)),
                Goal::new(GoalKind::ForeignCall { pred: id, args: vec![x] }, sp(2)),
            ],
            sp(0),
        );
        let (_, errors) = run(&tables, &vars, &mut goal);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "E0007");
    }

    #[test]
    fn higher_order_call_types_closure() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let p = vars.new_var("P");
        let a = vars.new_var("A");
        let mut goal = Goal::conj(
            vec![
                Goal::unify_functor(a, ConsId::Char('c'), Vec::new(), sp(0)),
                Goal::new(
                    GoalKind::HigherOrderCall {
                        closure: p,
                        kind: PredOrFunc::Pred,
                        purity: Purity::Pure,
                        args: vec![a],
                    },
                    sp(1),
                ),
            ],
            sp(0),
        );
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        let hyp = set.first_mut().unwrap();
        assert_eq!(hyp.resolved_var_type(p), Some(Ty::pred(vec![Ty::char()])));
    }

    #[test]
    fn lambda_body_sees_parameter_types() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let f = vars.new_var("F");
        let a = vars.new_var("A");
        let mut goal = Goal::new(
            GoalKind::Unify {
                lhs: f,
                rhs: UnifyRhs::Lambda {
                    kind: PredOrFunc::Pred,
                    purity: Purity::Pure,
                    params: vec![a],
                    body: Box::new(Goal::unify_functor(a, ConsId::Float(1.5), Vec::new(), sp(1))),
                },
            },
            sp(0),
        );
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        let hyp = set.first_mut().unwrap();
        assert_eq!(hyp.resolved_var_type(f), Some(Ty::pred(vec![Ty::float()])));
    }

    #[test]
    fn events_check_arity_and_types() {
        let mut tables = ModuleTables::new();
        tables.add_event("tick", vec![Ty::int()]);
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let y = vars.new_var("Y");
        let mut goal = Goal::conj(
            vec![
                Goal::new(
                    GoalKind::EventCall {
                        name: "tick".into(),
                        args: vec![x, y],
                    },
                    sp(0),
                ),
                Goal::new(
                    GoalKind::EventCall {
                        name: "tock".into(),
                        args: vec![x],
                    },
                    sp(1),
                ),
                Goal::new(
                    GoalKind::EventCall {
                        name: "tick".into(),
                        args: vec![x],
                    },
                    sp(2),
                ),
            ],
            sp(0),
        );
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        let codes: Vec<_> = errors.iter().map(TypeError::code).collect();
        assert_eq!(codes, vec!["E0004", "E0003"]);
        assert_eq!(set.first_mut().unwrap().resolved_var_type(x), Some(Ty::int()));
    }

    #[test]
    fn atomic_goal_fixes_state_types() {
        let tables = ModuleTables::new();
        let mut vars = VarTable::new();
        let io0 = vars.new_var("IO0");
        let io = vars.new_var("IO");
        let s0 = vars.new_var("STM0");
        let s = vars.new_var("STM");
        let mut goal = Goal::new(
            GoalKind::Shorthand(Shorthand::Atomic {
                outer_kind: AtomicOuter::Io,
                outer: (io0, io),
                inner: (s0, s),
                main: Box::new(Goal::true_goal(sp(1))),
                orelse: Vec::new(),
            }),
            sp(0),
        );
        let (mut set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        let hyp = set.first_mut().unwrap();
        assert_eq!(hyp.resolved_var_type(io), Some(io_state()));
        assert_eq!(hyp.resolved_var_type(s0), Some(stm()));
    }

    #[test]
    fn coercion_between_unrelated_types_is_recorded() {
        let mut tables = ModuleTables::new();
        enum_type(&mut tables, "colour", &["red"]);
        enum_type(&mut tables, "shape", &["square"]);
        let mut vars = VarTable::new();
        let x = vars.new_var("X");
        let y = vars.new_var("Y");
        let mut goal = Goal::conj(
            vec![
                Goal::unify_functor(x, ConsId::named("red"), Vec::new(), sp(0)),
                Goal::unify_functor(y, ConsId::named("square"), Vec::new(), sp(1)),
                Goal::new(GoalKind::Coerce { from: x, to: y }, sp(2)),
            ],
            sp(0),
        );
        let (set, errors) = run(&tables, &vars, &mut goal);
        assert!(errors.is_empty());
        let hyp = set.iter().next().unwrap();
        assert_eq!(hyp.coerce_constraints.len(), 1);
        assert_eq!(hyp.coerce_constraints[0].status, CoerceStatus::Unsatisfiable);
    }

    #[test]
    fn field_access_with_missing_field_is_undefined() {
        let mut tables = ModuleTables::new();
        tables.add_type(TypeDefn {
            ctor: TypeCtor::new(sym("point"), 0),
            tvarset: TyVarSet::new(),
            params: Vec::new(),
            body: TypeBody::Du(vec![CtorDefn::new(
                sym("point"),
                vec![CtorField::named("x", Ty::int())],
            )]),
            supertype: None,
        });
        let mut vars = VarTable::new();
        let p = vars.new_var("P");
        let v = vars.new_var("V");
        let mut goal = Goal::unify_functor(v, ConsId::named("y"), vec![p], sp(0));
        let (_, errors) = run(&tables, &vars, &mut goal);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "E0002");
    }

    #[test]
    fn functor_text_shows_arguments() {
        let mut vars = VarTable::new();
        let a = vars.new_var("A");
        let b = vars.new_var("B");
        assert_eq!(functor_text(&ConsId::named("f"), &[a, b], &vars), "f(A, B)");
        assert_eq!(functor_text(&ConsId::String("s".into()), &[], &vars), "\"s\"");
        assert_eq!(functor_text(&ConsId::Float(2.0), &[], &vars), "2.0");
    }
}
