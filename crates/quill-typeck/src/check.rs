//! Per-predicate and per-module entry points.
//!
//! A predicate is checked clause by clause with one hypothesis set
//! flowing through all of its clauses, so a later clause can settle
//! what an earlier one left open. Predicates are independent of each
//! other and are checked in parallel by [`check_module`].

use crossbeam_deque::{Injector, Steal, Worker};
use quill_common::span::Span;
use quill_common::sym::SymName;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::assign::{TypeAssignment, TypeAssignmentSet};
use crate::classes::{BasicReducer, ContextReducer};
use crate::coerce::prune_coerce_constraints;
use crate::config::TypeckOptions;
use crate::error::TypeError;
use crate::finalize::{check_ambiguity, coercion_errors, constraint_errors, resolve_calls};
use crate::finalize::{AmbiguityContext, AmbiguityScope};
use crate::goal::{Goal, ProgVar, VarTable};
use crate::resolve::OverloadedSymbols;
use crate::tables::{ModuleTables, PredId};
use crate::traverse::ClauseChecker;
use crate::ty::{Ty, TyVar};

/// One clause: the head has been unified into the body, so the head
/// arguments are the predicate's `head_vars`.
#[derive(Clone, Debug)]
pub struct Clause {
    pub body: Goal,
    pub span: Span,
}

/// A predicate to check.
#[derive(Clone, Debug)]
pub struct PredInput {
    /// The declaration in the predicate table, if the predicate has a
    /// declared type. Without one its argument types are inferred.
    pub pred_id: Option<PredId>,
    pub name: SymName,
    pub head_vars: Vec<ProgVar>,
    pub var_table: VarTable,
    pub clauses: Vec<Clause>,
    pub span: Span,
}

/// The outcome of checking one predicate.
#[derive(Clone, Debug)]
pub struct CheckedPred {
    pub name: SymName,
    /// Clause bodies, with calls resolved where possible.
    pub clauses: Vec<Goal>,
    pub var_types: FxHashMap<ProgVar, Ty>,
    pub head_types: Vec<Ty>,
    pub tvar_names: FxHashMap<TyVar, String>,
    /// Class constraints of an undeclared predicate that remain on its
    /// type variables.
    pub inferred_constraints: Vec<String>,
    pub errors: Vec<TypeError>,
    pub overloaded: OverloadedSymbols,
    /// Hypotheses left after the last clause, before a whole-predicate
    /// ambiguity was settled.
    pub surviving: usize,
}

impl CheckedPred {
    /// The final type of `var`, rendered.
    pub fn type_of(&self, var: ProgVar) -> Option<String> {
        self.var_types
            .get(&var)
            .map(|ty| ty.display_with(&self.tvar_names).to_string())
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(TypeError::is_error)
    }
}

/// Check one predicate with the default context reducer.
pub fn check_pred(tables: &ModuleTables, input: PredInput, opts: &TypeckOptions) -> CheckedPred {
    check_pred_with(tables, &BasicReducer, input, opts)
}

#[instrument(skip_all, fields(pred = %input.name, clauses = input.clauses.len()))]
pub fn check_pred_with(
    tables: &ModuleTables,
    reducer: &dyn ContextReducer,
    input: PredInput,
    opts: &TypeckOptions,
) -> CheckedPred {
    let PredInput {
        pred_id,
        name,
        head_vars,
        var_table,
        clauses,
        span,
    } = input;
    let declared = pred_id.map(|id| tables.preds.get(id));
    let pred_name = match declared {
        Some(info) => info.display_name(),
        None => format!("predicate `{}/{}`", name, head_vars.len()),
    };

    let mut set = TypeAssignmentSet::singleton(match declared {
        Some(info) => {
            assert_eq!(
                head_vars.len(),
                info.arg_types.len(),
                "head of {} does not match its declared arity",
                pred_name
            );
            let mut hyp = TypeAssignment::from_tvarset(&info.tvarset);
            hyp.protect(info.universal_tvars());
            for (var, ty) in head_vars.iter().zip(&info.arg_types) {
                hyp.set_var_type(*var, ty.clone());
            }
            hyp.constraints.assumed = info.class_context.universal.clone();
            hyp.constraints.unproven = info.class_context.existential.clone();
            hyp
        }
        None => TypeAssignment::new(),
    });

    let mut checker = ClauseChecker::new(tables, reducer, &var_table, opts);
    let mut bodies = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let mut body = clause.body;
        let before = checker.errors.len();
        set = checker.check_goal(&mut body, set);
        set = prune_coerce_constraints(set, &tables.types);
        let had_errors = checker.errors[before..].iter().any(TypeError::is_error);
        let cx = AmbiguityContext {
            pred: &pred_name,
            head_vars: &head_vars,
            var_table: &var_table,
            span: clause.span,
        };
        set = check_ambiguity(set, AmbiguityScope::Clause, had_errors, cx, &mut checker.errors);
        bodies.push(body);
    }

    let surviving = set.len();
    if opts.whole_pred_ambiguity {
        let had_errors = checker.has_errors();
        let cx = AmbiguityContext {
            pred: &pred_name,
            head_vars: &head_vars,
            var_table: &var_table,
            span,
        };
        set = check_ambiguity(set, AmbiguityScope::WholePred, had_errors, cx, &mut checker.errors);
    }

    let ClauseChecker {
        mut errors,
        overloaded,
        ..
    } = checker;
    let mut chosen = set.into_vec().into_iter().next().unwrap_or_default();
    for body in bodies.iter_mut() {
        resolve_calls(body, &mut chosen, tables);
    }
    coercion_errors(&mut chosen, &mut errors);
    reducer.reduce(&mut chosen, &tables.classes);
    let inferred_constraints = constraint_errors(&mut chosen, declared.is_some(), span, &mut errors);

    let var_types = chosen.resolved_var_types();
    let head_types = head_vars
        .iter()
        .map(|v| match var_types.get(v) {
            Some(ty) => ty.clone(),
            None => Ty::Var(chosen.fresh_var()),
        })
        .collect();
    debug!(
        pred = %pred_name,
        surviving,
        errors = errors.len(),
        "checked predicate"
    );
    CheckedPred {
        name,
        clauses: bodies,
        var_types,
        head_types,
        tvar_names: chosen.names().clone(),
        inferred_constraints,
        errors,
        overloaded,
        surviving,
    }
}

/// The outcome of checking a module.
#[derive(Clone, Debug)]
pub struct ModuleResult {
    /// In the order the predicates were given.
    pub preds: Vec<CheckedPred>,
    /// Every predicate's diagnostics, stably sorted by location.
    pub diagnostics: Vec<TypeError>,
}

impl ModuleResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(TypeError::is_error)
    }
}

/// Check every predicate of a module, one task per predicate, on
/// `opts.worker_count()` threads.
pub fn check_module(tables: &ModuleTables, preds: Vec<PredInput>, opts: &TypeckOptions) -> ModuleResult {
    check_module_with(tables, &BasicReducer, preds, opts)
}

pub fn check_module_with(
    tables: &ModuleTables,
    reducer: &dyn ContextReducer,
    preds: Vec<PredInput>,
    opts: &TypeckOptions,
) -> ModuleResult {
    let count = preds.len();
    let num_threads = opts.worker_count().min(count.max(1));
    debug!(preds = count, workers = num_threads, "checking module");

    let injector = Injector::new();
    for task in preds.into_iter().enumerate() {
        injector.push(task);
    }
    let (tx, rx) = crossbeam_channel::unbounded();

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..num_threads {
            let tx = tx.clone();
            let injector = &injector;
            scope.spawn(move |_| {
                let local = Worker::new_fifo();
                while let Some((index, input)) = next_task(&local, injector) {
                    let checked = check_pred_with(tables, reducer, input, opts);
                    if tx.send((index, checked)).is_err() {
                        break;
                    }
                }
            });
        }
    })
    .expect("type checking workers panicked");
    drop(tx);

    let mut slots: Vec<Option<CheckedPred>> = vec![None; count];
    for (index, checked) in rx {
        slots[index] = Some(checked);
    }
    let preds: Vec<CheckedPred> = slots
        .into_iter()
        .map(|slot| slot.expect("every predicate is checked exactly once"))
        .collect();

    let mut diagnostics: Vec<TypeError> = preds.iter().flat_map(|p| p.errors.iter().cloned()).collect();
    diagnostics.sort_by_key(|e| {
        let span = e.span();
        (span.start, span.end)
    });
    ModuleResult { preds, diagnostics }
}

fn next_task<T>(local: &Worker<T>, injector: &Injector<T>) -> Option<T> {
    if let Some(task) = local.pop() {
        return Some(task);
    }
    loop {
        match injector.steal_batch_and_pop(local) {
            Steal::Success(task) => return Some(task),
            Steal::Empty => return None,
            Steal::Retry => continue,
        }
    }
}
