//! Quill type checker: multi-hypothesis type assignment for clauses.
//!
//! Quill allows overloading of predicates, functions and constructors,
//! so a clause can have several consistent typings at once. The checker
//! keeps all of them as a set of hypotheses, threads the set through the
//! clause body, and prunes it as unifications rule typings out. Whatever
//! survives the predicate's last clause is either its typing or an
//! ambiguity.
//!
//! # Architecture
//!
//! - [`ty`]: types, type variables, and their rendering
//! - [`goal`]: clause bodies as goal trees over program variables
//! - [`tables`]: read-only predicate, type, constructor, class and event tables
//! - [`assign`]: hypotheses and hypothesis sets, with the pruning primitives
//! - [`unify`]: unification inside one hypothesis, with capture checks for
//!   existential type variables
//! - [`coerce`]: subtype coercion and type parameter variance
//! - [`classes`]: typeclass constraints and context reduction
//! - [`cons_info`]: candidate schemes for overloaded names and functors
//! - [`resolve`]: the overload cross product
//! - [`traverse`]: the goal traversal
//! - [`guard`]: the bound on live hypotheses
//! - [`finalize`]: ambiguity checks and post-typecheck call resolution
//! - [`check`]: per-predicate and parallel per-module entry points
//! - [`error`], [`diagnostics`]: type errors and their rendering
//! - [`config`]: `[typecheck]` options

pub mod assign;
pub mod builtins;
pub mod check;
pub mod classes;
pub mod coerce;
pub mod config;
pub mod cons_info;
pub mod diagnostics;
pub mod error;
pub mod finalize;
pub mod goal;
pub mod guard;
pub mod resolve;
pub mod tables;
pub mod traverse;
pub mod ty;
pub mod unify;

pub use check::{check_module, check_pred, CheckedPred, Clause, ModuleResult, PredInput};
pub use config::TypeckOptions;
pub use error::TypeError;
