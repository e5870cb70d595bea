//! Typeclass constraints carried by each hypothesis, and context reduction.
//!
//! Every call site adds the callee's constraints to the hypotheses that
//! survive it. Context reduction then simplifies the accumulated set:
//! constraints implied by what the enclosing context already assumes are
//! moved to the redundant cache, and ground constraints with a matching
//! instance are discharged in favour of the instance's own constraints.

use std::fmt;

use quill_common::sym::SymName;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::assign::TypeAssignment;
use crate::tables::ClassTable;
use crate::ty::{Renaming, Ty, TyVar};

/// `class(T1, ..., Tn)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub class: SymName,
    pub args: Vec<Ty>,
}

impl Constraint {
    pub fn new(class: SymName, args: Vec<Ty>) -> Self {
        Constraint { class, args }
    }

    pub fn rename(&self, renaming: &Renaming) -> Constraint {
        Constraint {
            class: self.class.clone(),
            args: self.args.iter().map(|a| a.rename(renaming)).collect(),
        }
    }

    pub fn substitute(&self, subst: &FxHashMap<TyVar, Ty>) -> Constraint {
        Constraint {
            class: self.class.clone(),
            args: self.args.iter().map(|a| a.substitute(subst)).collect(),
        }
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Ty::is_ground)
    }

    pub fn display_with<'a>(&'a self, names: &'a FxHashMap<TyVar, String>) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.display_with(names).to_string())
            .collect();
        format!("{}({})", self.class, args.join(", "))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with(&FxHashMap::default()))
    }
}

/// The typeclass constraints of one hypothesis.
#[derive(Clone, Debug, Default)]
pub struct ClassConstraints {
    /// Constraints that must still be proven.
    pub unproven: Vec<Constraint>,
    /// Constraints the enclosing context makes available.
    pub assumed: Vec<Constraint>,
    /// Proven constraints, by class, kept so later duplicates are
    /// recognised without redoing the proof.
    pub redundant: FxHashMap<SymName, Vec<Constraint>>,
    /// Superclass constraints implied by an assumed constraint, mapped to
    /// the chain of constraints they were derived through.
    pub ancestors: FxHashMap<Constraint, Vec<Constraint>>,
}

impl ClassConstraints {
    pub fn is_empty(&self) -> bool {
        self.unproven.is_empty() && self.assumed.is_empty()
    }

    pub fn extend(&mut self, unproven: &[Constraint], assumed: &[Constraint]) {
        self.unproven.extend_from_slice(unproven);
        self.assumed.extend_from_slice(assumed);
    }

    fn is_redundant(&self, c: &Constraint) -> bool {
        self.redundant
            .get(&c.class)
            .map(|cs| cs.contains(c))
            .unwrap_or(false)
    }
}

/// Simplifies the typeclass constraints of a hypothesis after each call
/// site. Implementations must be shareable between worker threads.
pub trait ContextReducer: Sync {
    fn reduce(&self, hyp: &mut TypeAssignment, classes: &ClassTable);
}

/// The default reducer: resolves bindings, removes duplicates, discharges
/// constraints implied by assumptions or by instances.
#[derive(Copy, Clone, Debug, Default)]
pub struct BasicReducer;

impl ContextReducer for BasicReducer {
    fn reduce(&self, hyp: &mut TypeAssignment, classes: &ClassTable) {
        let mut constraints = std::mem::take(&mut hyp.constraints);

        let assumed: Vec<Constraint> = constraints
            .assumed
            .iter()
            .map(|c| resolve_constraint(hyp, c))
            .collect();
        constraints.assumed = dedup(assumed);
        constraints.ancestors = ancestors_of(&constraints.assumed, classes);

        let mut worklist: Vec<Constraint> = constraints
            .unproven
            .iter()
            .rev()
            .map(|c| resolve_constraint(hyp, c))
            .collect();
        let mut seen: FxHashSet<Constraint> = FxHashSet::default();
        let mut unproven = Vec::new();

        while let Some(c) = worklist.pop() {
            if !seen.insert(c.clone()) {
                continue;
            }
            if constraints.is_redundant(&c)
                || constraints.assumed.contains(&c)
                || constraints.ancestors.contains_key(&c)
            {
                constraints
                    .redundant
                    .entry(c.class.clone())
                    .or_default()
                    .push(c);
                continue;
            }
            match find_instance(&c, classes) {
                Some(implied) => {
                    constraints
                        .redundant
                        .entry(c.class.clone())
                        .or_default()
                        .push(c);
                    worklist.extend(implied.into_iter().rev());
                }
                None => unproven.push(c),
            }
        }

        constraints.unproven = unproven;
        hyp.constraints = constraints;
    }
}

fn resolve_constraint(hyp: &mut TypeAssignment, c: &Constraint) -> Constraint {
    Constraint {
        class: c.class.clone(),
        args: c.args.iter().map(|a| hyp.resolve(a)).collect(),
    }
}

fn dedup(cs: Vec<Constraint>) -> Vec<Constraint> {
    let mut seen = FxHashSet::default();
    cs.into_iter().filter(|c| seen.insert(c.clone())).collect()
}

/// Transitive superclasses of the assumed constraints.
fn ancestors_of(
    assumed: &[Constraint],
    classes: &ClassTable,
) -> FxHashMap<Constraint, Vec<Constraint>> {
    let mut ancestors: FxHashMap<Constraint, Vec<Constraint>> = FxHashMap::default();
    let mut stack: Vec<(Constraint, Vec<Constraint>)> =
        assumed.iter().map(|c| (c.clone(), Vec::new())).collect();
    while let Some((c, path)) = stack.pop() {
        let Some(defn) = classes.class(&c.class) else {
            continue;
        };
        let subst: FxHashMap<TyVar, Ty> = defn
            .params
            .iter()
            .copied()
            .zip(c.args.iter().cloned())
            .collect();
        for sup in &defn.superclasses {
            let sup = sup.substitute(&subst);
            if ancestors.contains_key(&sup) || assumed.contains(&sup) {
                continue;
            }
            let mut chain = path.clone();
            chain.push(c.clone());
            ancestors.insert(sup.clone(), chain.clone());
            stack.push((sup, chain));
        }
    }
    ancestors
}

/// The constraints an instance matching `c` requires, if one exists.
fn find_instance(c: &Constraint, classes: &ClassTable) -> Option<Vec<Constraint>> {
    classes.instances(&c.class).iter().find_map(|inst| {
        if inst.types.len() != c.args.len() {
            return None;
        }
        let mut subst = FxHashMap::default();
        let matched = inst
            .types
            .iter()
            .zip(&c.args)
            .all(|(pat, actual)| match_ty(pat, actual, &mut subst));
        matched.then(|| {
            inst.constraints
                .iter()
                .map(|ic| ic.substitute(&subst))
                .collect()
        })
    })
}

/// One-way matching of an instance head against a constraint argument.
/// Variables in `actual` are treated as constants.
pub(crate) fn match_ty(pattern: &Ty, actual: &Ty, subst: &mut FxHashMap<TyVar, Ty>) -> bool {
    match (pattern.unkinded(), actual.unkinded()) {
        (Ty::Var(v), actual) => match subst.get(v) {
            Some(bound) => bound == actual,
            None => {
                subst.insert(*v, actual.clone());
                true
            }
        },
        (Ty::Builtin(a), Ty::Builtin(b)) => a == b,
        (Ty::Defined(c1, a1), Ty::Defined(c2, a2)) => {
            c1 == c2 && match_list(a1, a2, subst)
        }
        (Ty::Tuple(a1), Ty::Tuple(a2)) => match_list(a1, a2, subst),
        (
            Ty::HigherOrder {
                kind: k1,
                purity: p1,
                args: a1,
            },
            Ty::HigherOrder {
                kind: k2,
                purity: p2,
                args: a2,
            },
        ) => k1 == k2 && p1 == p2 && match_list(a1, a2, subst),
        _ => false,
    }
}

fn match_list(pats: &[Ty], actuals: &[Ty], subst: &mut FxHashMap<TyVar, Ty>) -> bool {
    pats.len() == actuals.len()
        && pats
            .iter()
            .zip(actuals)
            .all(|(p, a)| match_ty(p, a, subst))
}
