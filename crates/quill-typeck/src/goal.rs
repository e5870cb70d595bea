//! Clause bodies as produced by name resolution.
//!
//! A clause body is a tree of goals over program variables. The type
//! checker consumes a goal and hands back the same tree with overloaded
//! calls annotated (`Callee::Resolved`) where a single candidate applied.

use quill_common::span::Span;
use quill_common::sym::SymName;

use crate::tables::PredId;
use crate::ty::{IntWidth, PredOrFunc, Purity};

/// A program variable, indexing the clause's `VarTable`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgVar(pub u32);

/// Names of the program variables of one predicate (shared by all of
/// its clauses).
#[derive(Clone, Debug, Default)]
pub struct VarTable {
    names: Vec<String>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_var(&mut self, name: impl Into<String>) -> ProgVar {
        let var = ProgVar(self.names.len() as u32);
        self.names.push(name.into());
        var
    }

    pub fn name(&self, var: ProgVar) -> String {
        self.names
            .get(var.0 as usize)
            .cloned()
            .unwrap_or_else(|| format!("V_{}", var.0))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The functor on the right of `X = f(...)`.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsId {
    Int(IntWidth, i128),
    Float(f64),
    String(String),
    Char(char),
    Named(SymName),
}

impl ConsId {
    pub fn named(name: &str) -> Self {
        ConsId::Named(SymName::unqualified(name))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    /// Not yet resolved; either never looked up or still overloaded.
    Unresolved,
    Resolved(PredId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScopeReason {
    /// `some [Vars] Goal`.
    Exist(Vec<ProgVar>),
    /// `require_complete_switch [Var] Goal`.
    RequireCompleteSwitch(ProgVar),
    /// Variables introduced by loop-control parallelisation.
    LoopControl { lc: ProgVar, lcs: ProgVar },
    Barrier,
    Commit,
    Promise,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UnifyRhs {
    Var(ProgVar),
    Functor {
        cons: ConsId,
        args: Vec<ProgVar>,
    },
    Lambda {
        kind: PredOrFunc,
        purity: Purity,
        /// For functions the last parameter is the result.
        params: Vec<ProgVar>,
        body: Box<Goal>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AtomicOuter {
    Io,
    Stm,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shorthand {
    /// `A <=> B`.
    BiImplication(Box<Goal>, Box<Goal>),
    Atomic {
        outer_kind: AtomicOuter,
        outer: (ProgVar, ProgVar),
        inner: (ProgVar, ProgVar),
        main: Box<Goal>,
        orelse: Vec<Goal>,
    },
    Try {
        io: Option<(ProgVar, ProgVar)>,
        goal: Box<Goal>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    pub cons: ConsId,
    pub goal: Goal,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GoalKind {
    Conj(Vec<Goal>),
    ParConj(Vec<Goal>),
    Disj(Vec<Goal>),
    Switch {
        var: ProgVar,
        cases: Vec<Case>,
    },
    IfThenElse {
        /// Variables quantified over condition and then-branch.
        vars: Vec<ProgVar>,
        cond: Box<Goal>,
        then: Box<Goal>,
        else_: Box<Goal>,
    },
    Not(Box<Goal>),
    Scope {
        reason: ScopeReason,
        goal: Box<Goal>,
    },
    Call {
        name: SymName,
        args: Vec<ProgVar>,
        callee: Callee,
    },
    HigherOrderCall {
        closure: ProgVar,
        kind: PredOrFunc,
        purity: Purity,
        args: Vec<ProgVar>,
    },
    EventCall {
        name: String,
        args: Vec<ProgVar>,
    },
    ForeignCall {
        pred: PredId,
        args: Vec<ProgVar>,
    },
    Unify {
        lhs: ProgVar,
        rhs: UnifyRhs,
    },
    Coerce {
        from: ProgVar,
        to: ProgVar,
    },
    Shorthand(Shorthand),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Goal {
    pub kind: GoalKind,
    pub span: Span,
}

impl Goal {
    pub fn new(kind: GoalKind, span: Span) -> Self {
        Goal { kind, span }
    }

    pub fn conj(goals: Vec<Goal>, span: Span) -> Self {
        Goal::new(GoalKind::Conj(goals), span)
    }

    pub fn disj(goals: Vec<Goal>, span: Span) -> Self {
        Goal::new(GoalKind::Disj(goals), span)
    }

    pub fn call(name: &str, args: Vec<ProgVar>, span: Span) -> Self {
        Goal::new(
            GoalKind::Call {
                name: SymName::unqualified(name),
                args,
                callee: Callee::Unresolved,
            },
            span,
        )
    }

    pub fn unify_var(lhs: ProgVar, rhs: ProgVar, span: Span) -> Self {
        Goal::new(
            GoalKind::Unify {
                lhs,
                rhs: UnifyRhs::Var(rhs),
            },
            span,
        )
    }

    pub fn unify_functor(lhs: ProgVar, cons: ConsId, args: Vec<ProgVar>, span: Span) -> Self {
        Goal::new(
            GoalKind::Unify {
                lhs,
                rhs: UnifyRhs::Functor { cons, args },
            },
            span,
        )
    }

    pub fn if_then_else(vars: Vec<ProgVar>, cond: Goal, then: Goal, else_: Goal, span: Span) -> Self {
        Goal::new(
            GoalKind::IfThenElse {
                vars,
                cond: Box::new(cond),
                then: Box::new(then),
                else_: Box::new(else_),
            },
            span,
        )
    }

    /// `true`, the empty conjunction.
    pub fn true_goal(span: Span) -> Self {
        Goal::conj(Vec::new(), span)
    }

    /// Visit this goal and every goal nested inside it, including
    /// lambda bodies, in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Goal)) {
        visit(self);
        match &self.kind {
            GoalKind::Conj(goals) | GoalKind::ParConj(goals) | GoalKind::Disj(goals) => {
                for g in goals {
                    g.walk(visit);
                }
            }
            GoalKind::Switch { cases, .. } => {
                for case in cases {
                    case.goal.walk(visit);
                }
            }
            GoalKind::IfThenElse {
                cond, then, else_, ..
            } => {
                cond.walk(visit);
                then.walk(visit);
                else_.walk(visit);
            }
            GoalKind::Not(goal) | GoalKind::Scope { goal, .. } => goal.walk(visit),
            GoalKind::Unify {
                rhs: UnifyRhs::Lambda { body, .. },
                ..
            } => body.walk(visit),
            GoalKind::Shorthand(Shorthand::BiImplication(a, b)) => {
                a.walk(visit);
                b.walk(visit);
            }
            GoalKind::Shorthand(Shorthand::Atomic { main, orelse, .. }) => {
                main.walk(visit);
                for g in orelse {
                    g.walk(visit);
                }
            }
            GoalKind::Shorthand(Shorthand::Try { goal, .. }) => goal.walk(visit),
            GoalKind::Call { .. }
            | GoalKind::HigherOrderCall { .. }
            | GoalKind::EventCall { .. }
            | GoalKind::ForeignCall { .. }
            | GoalKind::Unify { .. }
            | GoalKind::Coerce { .. } => {}
        }
    }

    /// Mutable counterpart of [`Goal::walk`].
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Goal)) {
        visit(self);
        match &mut self.kind {
            GoalKind::Conj(goals) | GoalKind::ParConj(goals) | GoalKind::Disj(goals) => {
                for g in goals {
                    g.walk_mut(visit);
                }
            }
            GoalKind::Switch { cases, .. } => {
                for case in cases {
                    case.goal.walk_mut(visit);
                }
            }
            GoalKind::IfThenElse {
                cond, then, else_, ..
            } => {
                cond.walk_mut(visit);
                then.walk_mut(visit);
                else_.walk_mut(visit);
            }
            GoalKind::Not(goal) | GoalKind::Scope { goal, .. } => goal.walk_mut(visit),
            GoalKind::Unify {
                rhs: UnifyRhs::Lambda { body, .. },
                ..
            } => body.walk_mut(visit),
            GoalKind::Shorthand(Shorthand::BiImplication(a, b)) => {
                a.walk_mut(visit);
                b.walk_mut(visit);
            }
            GoalKind::Shorthand(Shorthand::Atomic { main, orelse, .. }) => {
                main.walk_mut(visit);
                for g in orelse {
                    g.walk_mut(visit);
                }
            }
            GoalKind::Shorthand(Shorthand::Try { goal, .. }) => goal.walk_mut(visit),
            GoalKind::Call { .. }
            | GoalKind::HigherOrderCall { .. }
            | GoalKind::EventCall { .. }
            | GoalKind::ForeignCall { .. }
            | GoalKind::Unify { .. }
            | GoalKind::Coerce { .. } => {}
        }
    }
}
