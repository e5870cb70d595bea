//! Hypotheses ("type assignments") and the sets they are threaded in.
//!
//! A `TypeAssignment` is one consistent guess at the types of a clause's
//! variables. Overloading makes several guesses live at once, so the
//! checker threads a `TypeAssignmentSet` through the clause and replaces
//! it goal by goal. During overload resolution each hypothesis is briefly
//! paired with the argument types one candidate expects
//! (`ArgsTypeAssignment`); `Hypothesis` is the tagged union of the two.

use ena::unify::InPlaceUnificationTable;
use quill_common::span::Span;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::classes::{ClassConstraints, Constraint};
use crate::cons_info::CandidateSource;
use crate::goal::ProgVar;
use crate::ty::{Renaming, Ty, TyVar, TyVarSet, VariantMatcher};
use crate::unify::{self, UnifyFailure};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoerceStatus {
    NeedToCheck,
    Unsatisfiable,
}

/// A pending `From =< To` obligation.
#[derive(Clone, Debug, PartialEq)]
pub struct CoerceConstraint {
    pub from: Ty,
    pub to: Ty,
    pub span: Span,
    pub status: CoerceStatus,
}

/// One hypothesis about the types of a clause's variables.
#[derive(Clone, Debug)]
pub struct TypeAssignment {
    var_types: FxHashMap<ProgVar, Ty>,
    /// Type variable bindings. Keys are never unioned with each other;
    /// each key holds at most one (lazily substituted) value.
    bindings: InPlaceUnificationTable<TyVar>,
    tvar_names: FxHashMap<TyVar, String>,
    /// Type variables this clause may not bind: its own universally
    /// quantified head variables and the existential variables of the
    /// predicates it calls.
    protected: FxHashSet<TyVar>,
    pub constraints: ClassConstraints,
    pub coerce_constraints: Vec<CoerceConstraint>,
}

impl TypeAssignment {
    pub fn new() -> Self {
        TypeAssignment {
            var_types: FxHashMap::default(),
            bindings: InPlaceUnificationTable::new(),
            tvar_names: FxHashMap::default(),
            protected: FxHashSet::default(),
            constraints: ClassConstraints::default(),
            coerce_constraints: Vec::new(),
        }
    }

    /// A hypothesis whose type variables are exactly those of `tvarset`,
    /// keeping their indices.
    pub fn from_tvarset(tvarset: &TyVarSet) -> Self {
        let mut hyp = TypeAssignment::new();
        for var in tvarset.vars() {
            let key = hyp.bindings.new_key(None);
            debug_assert_eq!(key, var);
        }
        hyp.tvar_names = tvarset.names().clone();
        hyp
    }

    pub fn fresh_var(&mut self) -> TyVar {
        self.bindings.new_key(None)
    }

    pub fn fresh_named(&mut self, name: &str) -> TyVar {
        let var = self.fresh_var();
        self.tvar_names.insert(var, name.to_string());
        var
    }

    /// Number of type variables allocated in this hypothesis.
    pub fn tvar_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of type variables currently bound.
    pub fn bound_count(&mut self) -> usize {
        (0..self.bindings.len() as u32)
            .filter(|i| self.bindings.probe_value(TyVar(*i)).is_some())
            .count()
    }

    pub fn names(&self) -> &FxHashMap<TyVar, String> {
        &self.tvar_names
    }

    // ── Program variables ───────────────────────────────────────────

    pub fn var_type(&self, var: ProgVar) -> Option<&Ty> {
        self.var_types.get(&var)
    }

    pub fn set_var_type(&mut self, var: ProgVar, ty: Ty) {
        self.var_types.insert(var, ty);
    }

    /// Program variables with a recorded type, in index order.
    pub fn typed_vars(&self) -> Vec<ProgVar> {
        let mut vars: Vec<ProgVar> = self.var_types.keys().copied().collect();
        vars.sort();
        vars
    }

    /// The fully substituted type of `var`, if it has one.
    pub fn resolved_var_type(&mut self, var: ProgVar) -> Option<Ty> {
        let ty = self.var_types.get(&var)?.clone();
        Some(self.resolve(&ty))
    }

    /// Give `var` a type if it has none. Returns its type either way.
    pub fn ensure_var_type(&mut self, var: ProgVar) -> Ty {
        if let Some(ty) = self.var_types.get(&var) {
            return ty.clone();
        }
        let ty = Ty::Var(self.fresh_var());
        self.var_types.insert(var, ty.clone());
        ty
    }

    // ── Type variables ──────────────────────────────────────────────

    pub fn protect(&mut self, vars: impl IntoIterator<Item = TyVar>) {
        self.protected.extend(vars);
    }

    pub fn is_protected(&self, var: TyVar) -> bool {
        self.protected.contains(&var)
    }

    pub fn protected(&self) -> &FxHashSet<TyVar> {
        &self.protected
    }

    pub(crate) fn probe(&mut self, var: TyVar) -> Option<Ty> {
        self.bindings.probe_value(var)
    }

    /// # Panics
    ///
    /// Panics if `var` is already bound; callers bind only after
    /// resolving to an unbound variable.
    pub(crate) fn bind(&mut self, var: TyVar, ty: Ty) {
        debug_assert!(self.probe(var).is_none(), "rebinding {:?}", var);
        self.bindings
            .unify_var_value(var, Some(ty))
            .expect("binding an unbound type variable cannot conflict");
    }

    /// Follow bindings at the top of `ty` only, stripping kind annotations.
    pub fn shallow_resolve(&mut self, ty: &Ty) -> Ty {
        let mut current = ty.unkinded().clone();
        while let Ty::Var(v) = current {
            match self.probe(v) {
                Some(next) => current = next.unkinded().clone(),
                None => break,
            }
        }
        current
    }

    /// Apply the bindings of this hypothesis to `ty` recursively.
    ///
    /// A variable bound (possibly indirectly) to a term containing itself
    /// is left unexpanded at its inner occurrence.
    pub fn resolve(&mut self, ty: &Ty) -> Ty {
        let mut expanding = Vec::new();
        self.resolve_inner(ty, &mut expanding)
    }

    fn resolve_inner(&mut self, ty: &Ty, expanding: &mut Vec<TyVar>) -> Ty {
        match ty {
            Ty::Var(v) => {
                if expanding.contains(v) {
                    return ty.clone();
                }
                match self.probe(*v) {
                    Some(bound) => {
                        expanding.push(*v);
                        let out = self.resolve_inner(&bound, expanding);
                        expanding.pop();
                        out
                    }
                    None => ty.clone(),
                }
            }
            Ty::Builtin(_) => ty.clone(),
            Ty::Defined(ctor, args) => Ty::Defined(
                ctor.clone(),
                args.iter()
                    .map(|a| self.resolve_inner(a, expanding))
                    .collect(),
            ),
            Ty::Tuple(args) => Ty::Tuple(
                args.iter()
                    .map(|a| self.resolve_inner(a, expanding))
                    .collect(),
            ),
            Ty::HigherOrder { kind, purity, args } => Ty::HigherOrder {
                kind: *kind,
                purity: *purity,
                args: args
                    .iter()
                    .map(|a| self.resolve_inner(a, expanding))
                    .collect(),
            },
            Ty::Kinded(inner, kind) => {
                Ty::Kinded(Box::new(self.resolve_inner(inner, expanding)), kind.clone())
            }
        }
    }

    /// Merge the type variables of a scheme into this hypothesis. Returns
    /// the renaming from the scheme's variables to the new ones.
    pub fn rename_apart(&mut self, tvarset: &TyVarSet) -> Renaming {
        let mut renaming = Renaming::default();
        for var in tvarset.vars() {
            let new = self.fresh_var();
            if let Some(name) = tvarset.name(var) {
                let taken = self.tvar_names.values().any(|n| n == name);
                let name = if taken {
                    format!("{}_{}", name, new.0)
                } else {
                    name.to_string()
                };
                self.tvar_names.insert(new, name);
            }
            renaming.insert(var, new);
        }
        renaming
    }

    // ── Unification ─────────────────────────────────────────────────

    /// Unify `a` and `b`. On failure the hypothesis is left unchanged.
    pub fn unify(&mut self, a: &Ty, b: &Ty) -> Result<(), UnifyFailure> {
        self.unify_owned(a, b, &[])
    }

    /// Unify `a` and `b` on behalf of a scheme that owns the existential
    /// variables `owned`. On failure the hypothesis is left unchanged.
    pub fn unify_owned(&mut self, a: &Ty, b: &Ty, owned: &[TyVar]) -> Result<(), UnifyFailure> {
        let snapshot = self.bindings.snapshot();
        match unify::unify_types(self, a, b, owned) {
            Ok(()) => {
                self.bindings.commit(snapshot);
                Ok(())
            }
            Err(failure) => {
                self.bindings.rollback_to(snapshot);
                Err(failure)
            }
        }
    }

    /// Whether `other` says the same as `self` about every variable both
    /// have typed, and carries the same pending constraints, up to a
    /// renaming of type variables. Returns that renaming, from `other`'s
    /// variables to `self`'s.
    pub fn agrees_with(&mut self, other: &mut TypeAssignment) -> Option<Renaming> {
        if self.constraints.unproven.len() != other.constraints.unproven.len()
            || self.coerce_constraints.len() != other.coerce_constraints.len()
        {
            return None;
        }
        let mut m = VariantMatcher::new();
        for var in self.typed_vars() {
            if other.var_type(var).is_none() {
                continue;
            }
            let (Some(mine), Some(theirs)) =
                (self.resolved_var_type(var), other.resolved_var_type(var))
            else {
                continue;
            };
            if !m.matches(&mine, &theirs) {
                return None;
            }
        }
        let mine = self.constraints.unproven.clone();
        let theirs = other.constraints.unproven.clone();
        for (c1, c2) in mine.iter().zip(&theirs) {
            let a1: Vec<Ty> = c1.args.iter().map(|a| self.resolve(a)).collect();
            let a2: Vec<Ty> = c2.args.iter().map(|a| other.resolve(a)).collect();
            if c1.class != c2.class || !m.matches_all(&a1, &a2) {
                return None;
            }
        }
        let mine = self.coerce_constraints.clone();
        let theirs = other.coerce_constraints.clone();
        for (c1, c2) in mine.iter().zip(&theirs) {
            let (f1, t1) = (self.resolve(&c1.from), self.resolve(&c1.to));
            let (f2, t2) = (other.resolve(&c2.from), other.resolve(&c2.to));
            if c1.status != c2.status || !m.matches(&f1, &f2) || !m.matches(&t1, &t2) {
                return None;
            }
        }
        Some(m.into_reverse())
    }

    /// Copy the types of variables that `other` has typed and `self` has
    /// not. `renaming` maps `other`'s type variables to `self`'s; any
    /// other type variable becomes a fresh one here.
    pub fn absorb(&mut self, other: &mut TypeAssignment, renaming: &Renaming) {
        let mut imported: FxHashMap<TyVar, Ty> = renaming
            .iter()
            .map(|(theirs, mine)| (*theirs, Ty::Var(*mine)))
            .collect();
        for var in other.typed_vars() {
            if self.var_type(var).is_some() {
                continue;
            }
            let Some(ty) = other.resolved_var_type(var) else {
                continue;
            };
            for v in ty.vars() {
                if !imported.contains_key(&v) {
                    let fresh = self.fresh_var();
                    imported.insert(v, Ty::Var(fresh));
                }
            }
            self.set_var_type(var, ty.substitute(&imported));
        }
    }

    /// Render `ty` under this hypothesis's bindings and variable names.
    pub fn type_to_string(&mut self, ty: &Ty) -> String {
        let resolved = self.resolve(ty);
        resolved.display_with(&self.tvar_names).to_string()
    }

    /// Resolve every recorded variable type. Used once a hypothesis has
    /// been chosen.
    pub fn resolved_var_types(&mut self) -> FxHashMap<ProgVar, Ty> {
        let vars = self.typed_vars();
        vars.into_iter()
            .filter_map(|v| self.resolved_var_type(v).map(|t| (v, t)))
            .collect()
    }
}

impl Default for TypeAssignment {
    fn default() -> Self {
        Self::new()
    }
}

/// The hypotheses live at one point of a clause.
///
/// An empty set means no hypothesis survives; see `require_var_type` for
/// how that is kept from happening silently.
#[derive(Clone, Debug, Default)]
pub struct TypeAssignmentSet(Vec<TypeAssignment>);

impl TypeAssignmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(hyp: TypeAssignment) -> Self {
        TypeAssignmentSet(vec![hyp])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeAssignment> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TypeAssignment> {
        self.0.iter_mut()
    }

    pub fn push(&mut self, hyp: TypeAssignment) {
        self.0.push(hyp);
    }

    /// Concatenate another set onto this one.
    pub fn append(&mut self, mut other: TypeAssignmentSet) {
        self.0.append(&mut other.0);
    }

    pub fn first_mut(&mut self) -> Option<&mut TypeAssignment> {
        self.0.first_mut()
    }

    pub fn into_vec(self) -> Vec<TypeAssignment> {
        self.0
    }

    pub fn into_hypotheses(self) -> Vec<Hypothesis> {
        self.0.into_iter().map(Hypothesis::Assigned).collect()
    }

    /// Fold hypotheses back into plain assignments, merging any pending
    /// candidate constraints.
    pub fn from_hypotheses(hyps: Vec<Hypothesis>) -> Self {
        TypeAssignmentSet(hyps.into_iter().map(Hypothesis::into_assignment).collect())
    }

    /// Require `var` to have type `ty` in every hypothesis. `ty` is built
    /// per hypothesis so it may mention fresh variables.
    pub fn require_var_type(
        self,
        var: ProgVar,
        ty: impl FnMut(&mut TypeAssignment) -> Ty,
    ) -> Result<TypeAssignmentSet, Mismatch> {
        let mut ty = ty;
        require_var_type(self.into_hypotheses(), var, |h| ty(h.assignment_mut()))
            .map(TypeAssignmentSet::from_hypotheses)
    }

    /// Give each of `vars` a type where it has none. Within a hypothesis
    /// all such variables share one fresh type variable.
    pub fn ensure_vars_have_a_type(&mut self, vars: &[ProgVar]) {
        for hyp in self.iter_mut() {
            let untyped: Vec<ProgVar> = vars
                .iter()
                .copied()
                .filter(|v| hyp.var_type(*v).is_none())
                .collect();
            if untyped.is_empty() {
                continue;
            }
            let shared = Ty::Var(hyp.fresh_var());
            for v in untyped {
                hyp.set_var_type(v, shared.clone());
            }
        }
    }
}

/// Union of the hypothesis sets reached by alternative branches.
///
/// A hypothesis that agrees with one already kept (see
/// [`TypeAssignment::agrees_with`]) is folded into it rather than kept
/// as a separate alternative.
pub fn union_branches(branches: Vec<TypeAssignmentSet>) -> TypeAssignmentSet {
    let mut kept: Vec<TypeAssignment> = Vec::new();
    for branch in branches {
        'hyps: for mut hyp in branch {
            for k in kept.iter_mut() {
                if let Some(renaming) = k.agrees_with(&mut hyp) {
                    k.absorb(&mut hyp, &renaming);
                    continue 'hyps;
                }
            }
            kept.push(hyp);
        }
    }
    TypeAssignmentSet(kept)
}

impl IntoIterator for TypeAssignmentSet {
    type Item = TypeAssignment;
    type IntoIter = std::vec::IntoIter<TypeAssignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<TypeAssignment> for TypeAssignmentSet {
    fn from_iter<I: IntoIterator<Item = TypeAssignment>>(iter: I) -> Self {
        TypeAssignmentSet(iter.into_iter().collect())
    }
}

/// A hypothesis paired with the argument types one overload candidate
/// expects, and the constraints that candidate brings along.
#[derive(Clone, Debug)]
pub struct ArgsTypeAssignment {
    pub assignment: TypeAssignment,
    pub expected: Vec<Ty>,
    pub unproven: Vec<Constraint>,
    pub assumed: Vec<Constraint>,
    /// Existential variables of the candidate that unification against
    /// its own arguments may instantiate.
    pub owned_existq: Vec<TyVar>,
    pub source: CandidateSource,
}

#[derive(Clone, Debug)]
pub enum Hypothesis {
    Assigned(TypeAssignment),
    Args(ArgsTypeAssignment),
}

impl Hypothesis {
    pub fn assignment(&self) -> &TypeAssignment {
        match self {
            Hypothesis::Assigned(a) => a,
            Hypothesis::Args(args) => &args.assignment,
        }
    }

    pub fn assignment_mut(&mut self) -> &mut TypeAssignment {
        match self {
            Hypothesis::Assigned(a) => a,
            Hypothesis::Args(args) => &mut args.assignment,
        }
    }

    /// The type the candidate expects at argument `index`.
    ///
    /// # Panics
    ///
    /// Panics on a plain assignment or an out-of-range index; argument
    /// lists are checked for arity before resolution starts.
    pub fn expected(&self, index: usize) -> Ty {
        match self {
            Hypothesis::Args(args) => args.expected[index].clone(),
            Hypothesis::Assigned(_) => panic!("plain assignment has no expected argument types"),
        }
    }

    pub fn owned_existq(&self) -> &[TyVar] {
        match self {
            Hypothesis::Assigned(_) => &[],
            Hypothesis::Args(args) => &args.owned_existq,
        }
    }

    pub fn source(&self) -> Option<&CandidateSource> {
        match self {
            Hypothesis::Assigned(_) => None,
            Hypothesis::Args(args) => Some(&args.source),
        }
    }

    /// Drop the expected types, merging the candidate's constraints.
    pub fn into_assignment(self) -> TypeAssignment {
        match self {
            Hypothesis::Assigned(a) => a,
            Hypothesis::Args(args) => {
                let mut a = args.assignment;
                a.constraints.extend(&args.unproven, &args.assumed);
                a
            }
        }
    }
}

/// Every hypothesis failed a type requirement.
///
/// `hyps` holds the input hypotheses unchanged so checking can continue
/// from them after the error is reported. `actual` and `expected` are the
/// distinct types that clashed, rendered in their own hypotheses.
#[derive(Debug)]
pub struct Mismatch {
    pub hyps: Vec<Hypothesis>,
    pub actual: Vec<String>,
    pub expected: Vec<String>,
}

/// Require `var` to have type `expected(h)` in every hypothesis `h`,
/// dropping the hypotheses where it cannot.
///
/// Never turns a non-empty list into an empty one: if no hypothesis
/// survives, all of them are handed back (unchanged) in the error.
pub fn require_var_type(
    hyps: Vec<Hypothesis>,
    var: ProgVar,
    mut expected: impl FnMut(&mut Hypothesis) -> Ty,
) -> Result<Vec<Hypothesis>, Mismatch> {
    if hyps.is_empty() {
        return Ok(hyps);
    }
    let mut survivors = Vec::with_capacity(hyps.len());
    let mut failed = Vec::new();
    for mut h in hyps {
        let want = expected(&mut h);
        let owned = h.owned_existq().to_vec();
        let a = h.assignment_mut();
        match a.var_type(var).cloned() {
            None => {
                a.set_var_type(var, want);
                survivors.push(h);
            }
            Some(have) => match a.unify_owned(&have, &want, &owned) {
                Ok(()) => survivors.push(h),
                Err(_) => failed.push((h, have, want)),
            },
        }
    }
    if !survivors.is_empty() {
        return Ok(survivors);
    }

    let mut actual = Vec::new();
    let mut expected_strs = Vec::new();
    let mut restored = Vec::with_capacity(failed.len());
    for (mut h, have, want) in failed {
        let a = h.assignment_mut();
        push_unique(&mut actual, a.type_to_string(&have));
        push_unique(&mut expected_strs, a.type_to_string(&want));
        restored.push(h);
    }
    Err(Mismatch {
        hyps: restored,
        actual,
        expected: expected_strs,
    })
}

/// Positional `require_var_type`, matching `vars[i]` against the type
/// built for position `i`.
///
/// # Panics
///
/// Panics if `vars` and the expected types differ in length: arities are
/// fixed before this is called.
pub fn require_vars_types(
    hyps: Vec<Hypothesis>,
    vars: &[ProgVar],
    arity: usize,
    mut expected: impl FnMut(&mut Hypothesis, usize) -> Ty,
) -> Result<Vec<Hypothesis>, (usize, Mismatch)> {
    assert_eq!(
        vars.len(),
        arity,
        "argument list length does not match expected arity"
    );
    let mut hyps = hyps;
    for (i, var) in vars.iter().enumerate() {
        hyps = require_var_type(hyps, *var, |h| expected(h, i)).map_err(|m| (i, m))?;
    }
    Ok(hyps)
}

pub(crate) fn push_unique(out: &mut Vec<String>, s: String) {
    if !out.contains(&s) {
        out.push(s);
    }
}
