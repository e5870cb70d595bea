//! Unification within a single hypothesis.
//!
//! There is deliberately no occurs check: a variable may be bound to a
//! term that contains it. The only restriction on binding is
//! [`may_bind`], which keeps protected variables rigid and stops an
//! existential variable from capturing another scheme's existential.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::assign::TypeAssignment;
use crate::ty::{Ty, TyVar};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnifyFailure {
    /// Head constructors (or arities) differ.
    Mismatch(Ty, Ty),
    /// Binding would instantiate a rigid variable or capture an
    /// unrelated existential.
    Rigid(TyVar, Ty),
}

impl fmt::Display for UnifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnifyFailure::Mismatch(a, b) => write!(f, "cannot unify `{}` with `{}`", a, b),
            UnifyFailure::Rigid(v, t) => {
                write!(f, "cannot bind rigid type variable ?{} to `{}`", v.0, t)
            }
        }
    }
}

/// Whether `var` may be bound to a term whose variables are `target_vars`.
///
/// `protected` is the hypothesis's set of rigid variables; `owned` are the
/// existential variables of the scheme on whose behalf the binding is
/// made. A protected variable may only be bound by the scheme that owns
/// it, and an owned variable may not capture a protected variable it
/// does not also own.
pub fn may_bind(
    var: TyVar,
    target_vars: &[TyVar],
    protected: &FxHashSet<TyVar>,
    owned: &[TyVar],
) -> bool {
    if owned.contains(&var) {
        target_vars
            .iter()
            .all(|t| owned.contains(t) || !protected.contains(t))
    } else {
        !protected.contains(&var)
    }
}

/// Unify `a` and `b` inside `hyp`. May leave partial bindings on failure;
/// use [`TypeAssignment::unify_owned`] for the transactional version.
pub(crate) fn unify_types(
    hyp: &mut TypeAssignment,
    a: &Ty,
    b: &Ty,
    owned: &[TyVar],
) -> Result<(), UnifyFailure> {
    let mut unifier = Unifier {
        hyp,
        owned,
        assumed: Vec::new(),
    };
    unifier.unify(a, b)
}

struct Unifier<'a> {
    hyp: &'a mut TypeAssignment,
    owned: &'a [TyVar],
    /// Pairs already being unified further up, where one side is a bound
    /// variable. Meeting one again means a cyclic binding was unrolled.
    assumed: Vec<(Ty, Ty)>,
}

impl Unifier<'_> {
    fn unify(&mut self, a: &Ty, b: &Ty) -> Result<(), UnifyFailure> {
        if self.is_bound_var(a) || self.is_bound_var(b) {
            let pair = (a.clone(), b.clone());
            if self.assumed.contains(&pair) {
                return Ok(());
            }
            self.assumed.push(pair);
        }

        let a = self.hyp.shallow_resolve(a);
        let b = self.hyp.shallow_resolve(b);
        match (&a, &b) {
            (Ty::Var(v), Ty::Var(w)) if v == w => Ok(()),
            (Ty::Var(v), Ty::Var(w)) => self.bind_var_var(*v, *w),
            (Ty::Var(v), t) | (t, Ty::Var(v)) => self.bind(*v, t),
            (Ty::Builtin(x), Ty::Builtin(y)) if x == y => Ok(()),
            (Ty::Defined(c1, a1), Ty::Defined(c2, a2)) if c1 == c2 && a1.len() == a2.len() => {
                self.unify_all(a1, a2)
            }
            (Ty::Tuple(a1), Ty::Tuple(a2)) if a1.len() == a2.len() => self.unify_all(a1, a2),
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
            ) if k1 == k2 && p1 == p2 && a1.len() == a2.len() => self.unify_all(a1, a2),
            _ => Err(UnifyFailure::Mismatch(a.clone(), b.clone())),
        }
    }

    fn unify_all(&mut self, xs: &[Ty], ys: &[Ty]) -> Result<(), UnifyFailure> {
        for (x, y) in xs.iter().zip(ys) {
            self.unify(x, y)?;
        }
        Ok(())
    }

    fn is_bound_var(&mut self, ty: &Ty) -> bool {
        match ty.unkinded() {
            Ty::Var(v) => self.hyp.probe(*v).is_some(),
            _ => false,
        }
    }

    fn bind(&mut self, var: TyVar, ty: &Ty) -> Result<(), UnifyFailure> {
        let target_vars = self.hyp.resolve(ty).vars();
        if !may_bind(var, &target_vars, self.hyp.protected(), self.owned) {
            return Err(UnifyFailure::Rigid(var, ty.clone()));
        }
        self.hyp.bind(var, ty.clone());
        Ok(())
    }

    fn bind_var_var(&mut self, v: TyVar, w: TyVar) -> Result<(), UnifyFailure> {
        // Prefer binding the side that is not rigid.
        let order = if self.hyp.is_protected(v) && !self.hyp.is_protected(w) {
            [(w, v), (v, w)]
        } else {
            [(v, w), (w, v)]
        };
        for (from, to) in order {
            if may_bind(from, &[to], self.hyp.protected(), self.owned) {
                self.hyp.bind(from, Ty::Var(to));
                return Ok(());
            }
        }
        Err(UnifyFailure::Rigid(v, Ty::Var(w)))
    }
}
