//! Type representation for the Quill type checker.
//!
//! Defines the `Ty` term, type constructors, type variables and the
//! per-scheme type variable set (`TyVarSet`) that every candidate scheme
//! carries so it can be renamed apart from the hypotheses it joins.

use std::fmt;

use quill_common::sym::SymName;
use rustc_hash::FxHashMap;

/// A type variable, identified by a `u32` index.
///
/// Inside a type assignment the index is a key into that assignment's
/// unification table. Inside a scheme it indexes the scheme's own
/// `TyVarSet`; the two namespaces only meet through renaming.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVar(pub u32);

/// A renaming from one type variable namespace into another.
pub type Renaming = FxHashMap<TyVar, TyVar>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Star,
    Arrow(Box<Kind>, Box<Kind>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntWidth {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl IntWidth {
    pub fn name(self) -> &'static str {
        match self {
            IntWidth::Int => "int",
            IntWidth::Int8 => "int8",
            IntWidth::Int16 => "int16",
            IntWidth::Int32 => "int32",
            IntWidth::Int64 => "int64",
            IntWidth::Uint => "uint",
            IntWidth::Uint8 => "uint8",
            IntWidth::Uint16 => "uint16",
            IntWidth::Uint32 => "uint32",
            IntWidth::Uint64 => "uint64",
        }
    }
}

/// Types built into the language rather than declared by the user.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Int(IntWidth),
    Float,
    String,
    Char,
}

/// A user-declared (or library-declared) type constructor, e.g. `list/1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCtor {
    pub name: SymName,
    pub arity: usize,
}

impl TypeCtor {
    pub fn new(name: SymName, arity: usize) -> Self {
        TypeCtor { name, arity }
    }
}

impl fmt::Display for TypeCtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PredOrFunc {
    Pred,
    Func,
}

impl fmt::Display for PredOrFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredOrFunc::Pred => write!(f, "predicate"),
            PredOrFunc::Func => write!(f, "function"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Purity {
    #[default]
    Pure,
    Semipure,
    Impure,
}

/// A Quill type.
///
/// - `Builtin`: atomic types known to the compiler (`int`, `float`, ...)
/// - `Var`: a type variable
/// - `Defined`: a declared type constructor applied to arguments
/// - `Tuple`: `{A, B, C}`
/// - `HigherOrder`: `pred(A, B)` or `func(A) = R`; for functions the
///   result type is the last element of `args`
/// - `Kinded`: a type annotated with an explicit kind
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Builtin(BuiltinType),
    Var(TyVar),
    Defined(TypeCtor, Vec<Ty>),
    Tuple(Vec<Ty>),
    HigherOrder {
        kind: PredOrFunc,
        purity: Purity,
        args: Vec<Ty>,
    },
    Kinded(Box<Ty>, Kind),
}

impl Ty {
    pub fn int() -> Ty {
        Ty::Builtin(BuiltinType::Int(IntWidth::Int))
    }

    pub fn float() -> Ty {
        Ty::Builtin(BuiltinType::Float)
    }

    pub fn string() -> Ty {
        Ty::Builtin(BuiltinType::String)
    }

    pub fn char() -> Ty {
        Ty::Builtin(BuiltinType::Char)
    }

    /// `name(args...)` for a constructor whose arity is the argument count.
    pub fn defined(name: SymName, args: Vec<Ty>) -> Ty {
        Ty::Defined(TypeCtor::new(name, args.len()), args)
    }

    pub fn pred(args: Vec<Ty>) -> Ty {
        Ty::HigherOrder {
            kind: PredOrFunc::Pred,
            purity: Purity::Pure,
            args,
        }
    }

    pub fn func(mut args: Vec<Ty>, result: Ty) -> Ty {
        args.push(result);
        Ty::HigherOrder {
            kind: PredOrFunc::Func,
            purity: Purity::Pure,
            args,
        }
    }

    /// The principal type constructor, looking through kind annotations.
    pub fn ctor(&self) -> Option<&TypeCtor> {
        match self {
            Ty::Defined(ctor, _) => Some(ctor),
            Ty::Kinded(inner, _) => inner.ctor(),
            _ => None,
        }
    }

    /// Strip any number of kind annotations.
    pub fn unkinded(&self) -> &Ty {
        match self {
            Ty::Kinded(inner, _) => inner.unkinded(),
            other => other,
        }
    }

    /// Append the type variables of `self` to `out`, in order of first
    /// occurrence, without duplicates.
    pub fn collect_vars(&self, out: &mut Vec<TyVar>) {
        match self {
            Ty::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Ty::Builtin(_) => {}
            Ty::Defined(_, args) | Ty::Tuple(args) | Ty::HigherOrder { args, .. } => {
                for a in args {
                    a.collect_vars(out);
                }
            }
            Ty::Kinded(inner, _) => inner.collect_vars(out),
        }
    }

    pub fn vars(&self) -> Vec<TyVar> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Ty::Var(_) => false,
            Ty::Builtin(_) => true,
            Ty::Defined(_, args) | Ty::Tuple(args) | Ty::HigherOrder { args, .. } => {
                args.iter().all(Ty::is_ground)
            }
            Ty::Kinded(inner, _) => inner.is_ground(),
        }
    }

    /// Rename type variables through `renaming`; unmapped variables are kept.
    pub fn rename(&self, renaming: &Renaming) -> Ty {
        self.map_vars(&mut |v| Ty::Var(renaming.get(&v).copied().unwrap_or(v)))
    }

    /// Replace type variables by the types `subst` maps them to.
    pub fn substitute(&self, subst: &FxHashMap<TyVar, Ty>) -> Ty {
        self.map_vars(&mut |v| subst.get(&v).cloned().unwrap_or(Ty::Var(v)))
    }

    fn map_vars(&self, f: &mut impl FnMut(TyVar) -> Ty) -> Ty {
        match self {
            Ty::Var(v) => f(*v),
            Ty::Builtin(_) => self.clone(),
            Ty::Defined(ctor, args) => {
                Ty::Defined(ctor.clone(), args.iter().map(|a| a.map_vars(f)).collect())
            }
            Ty::Tuple(args) => Ty::Tuple(args.iter().map(|a| a.map_vars(f)).collect()),
            Ty::HigherOrder { kind, purity, args } => Ty::HigherOrder {
                kind: *kind,
                purity: *purity,
                args: args.iter().map(|a| a.map_vars(f)).collect(),
            },
            Ty::Kinded(inner, kind) => Ty::Kinded(Box::new(inner.map_vars(f)), kind.clone()),
        }
    }

    /// Display with type variable names taken from `names`; unnamed
    /// variables print as `?N`.
    pub fn display_with<'a>(&'a self, names: &'a FxHashMap<TyVar, String>) -> NamedTy<'a> {
        NamedTy { ty: self, names }
    }
}

/// A `Ty` paired with the display names of its type variables.
pub struct NamedTy<'a> {
    ty: &'a Ty,
    names: &'a FxHashMap<TyVar, String>,
}

impl NamedTy<'_> {
    fn child<'b>(&'b self, ty: &'b Ty) -> NamedTy<'b> {
        NamedTy {
            ty,
            names: self.names,
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter<'_>, tys: &[Ty]) -> fmt::Result {
        for (i, t) in tys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.child(t))?;
        }
        Ok(())
    }
}

impl fmt::Display for NamedTy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Ty::Var(v) => match self.names.get(v) {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "?{}", v.0),
            },
            Ty::Builtin(BuiltinType::Int(w)) => write!(f, "{}", w.name()),
            Ty::Builtin(BuiltinType::Float) => write!(f, "float"),
            Ty::Builtin(BuiltinType::String) => write!(f, "string"),
            Ty::Builtin(BuiltinType::Char) => write!(f, "char"),
            Ty::Defined(ctor, args) => {
                write!(f, "{}", ctor.name)?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    self.write_list(f, args)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
            Ty::Tuple(args) => {
                write!(f, "{{")?;
                self.write_list(f, args)?;
                write!(f, "}}")
            }
            Ty::HigherOrder { kind, purity, args } => {
                match purity {
                    Purity::Pure => {}
                    Purity::Semipure => write!(f, "semipure ")?,
                    Purity::Impure => write!(f, "impure ")?,
                }
                match kind {
                    PredOrFunc::Pred => {
                        write!(f, "pred")?;
                        if !args.is_empty() {
                            write!(f, "(")?;
                            self.write_list(f, args)?;
                            write!(f, ")")?;
                        }
                        Ok(())
                    }
                    PredOrFunc::Func => {
                        let (ret, params) = match args.split_last() {
                            Some(split) => split,
                            None => return write!(f, "func"),
                        };
                        if params.is_empty() {
                            write!(f, "(func)")?;
                        } else {
                            write!(f, "func(")?;
                            self.write_list(f, params)?;
                            write!(f, ")")?;
                        }
                        write!(f, " = {}", self.child(ret))
                    }
                }
            }
            Ty::Kinded(inner, _) => write!(f, "{}", self.child(inner)),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = FxHashMap::default();
        write!(f, "{}", self.display_with(&names))
    }
}

/// The type variables of one scheme or declaration, with display names.
///
/// Variables are allocated densely from zero, so a set of size `n` owns
/// exactly `TyVar(0)..TyVar(n)`.
#[derive(Clone, Debug, Default)]
pub struct TyVarSet {
    next: u32,
    names: FxHashMap<TyVar, String>,
}

impl TyVarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> TyVar {
        let var = TyVar(self.next);
        self.next += 1;
        var
    }

    pub fn fresh_named(&mut self, name: impl Into<String>) -> TyVar {
        let var = self.fresh();
        self.names.insert(var, name.into());
        var
    }

    pub fn len(&self) -> usize {
        self.next as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    pub fn vars(&self) -> impl Iterator<Item = TyVar> {
        (0..self.next).map(TyVar)
    }

    pub fn name(&self, var: TyVar) -> Option<&str> {
        self.names.get(&var).map(String::as_str)
    }

    pub fn names(&self) -> &FxHashMap<TyVar, String> {
        &self.names
    }
}

/// Checks that pairs of types are equal up to a consistent renaming of
/// type variables. The renaming is shared across calls, so a sequence of
/// checks succeeds only if one bijection explains all of them.
#[derive(Debug, Default)]
pub struct VariantMatcher {
    fwd: FxHashMap<TyVar, TyVar>,
    bwd: FxHashMap<TyVar, TyVar>,
}

impl VariantMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&mut self, a: &Ty, b: &Ty) -> bool {
        match (a.unkinded(), b.unkinded()) {
            (Ty::Var(x), Ty::Var(y)) => match (self.fwd.get(x), self.bwd.get(y)) {
                (None, None) => {
                    self.fwd.insert(*x, *y);
                    self.bwd.insert(*y, *x);
                    true
                }
                (Some(fx), Some(by)) => fx == y && by == x,
                _ => false,
            },
            (Ty::Builtin(x), Ty::Builtin(y)) => x == y,
            (Ty::Defined(c1, a1), Ty::Defined(c2, a2)) => c1 == c2 && self.matches_all(a1, a2),
            (Ty::Tuple(a1), Ty::Tuple(a2)) => self.matches_all(a1, a2),
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
            ) => k1 == k2 && p1 == p2 && self.matches_all(a1, a2),
            _ => false,
        }
    }

    pub fn matches_all(&mut self, xs: &[Ty], ys: &[Ty]) -> bool {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.matches(x, y))
    }

    /// The renaming found so far, from the right-hand variables to the
    /// left-hand ones.
    pub fn into_reverse(self) -> Renaming {
        self.bwd
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(elem: Ty) -> Ty {
        Ty::defined(SymName::unqualified("list"), vec![elem])
    }

    #[test]
    fn display_builtin_and_defined() {
        assert_eq!(Ty::int().to_string(), "int");
        assert_eq!(list(Ty::string()).to_string(), "list(string)");
        assert_eq!(
            Ty::Tuple(vec![Ty::int(), Ty::char()]).to_string(),
            "{int, char}"
        );
    }

    #[test]
    fn display_higher_order() {
        assert_eq!(Ty::pred(vec![Ty::int(), Ty::float()]).to_string(), "pred(int, float)");
        assert_eq!(Ty::func(vec![Ty::int()], Ty::string()).to_string(), "func(int) = string");
        assert_eq!(Ty::func(vec![], Ty::int()).to_string(), "(func) = int");
        let impure = Ty::HigherOrder {
            kind: PredOrFunc::Pred,
            purity: Purity::Impure,
            args: vec![],
        };
        assert_eq!(impure.to_string(), "impure pred");
    }

    #[test]
    fn display_uses_variable_names() {
        let mut set = TyVarSet::new();
        let t = set.fresh_named("T");
        let u = set.fresh();
        let ty = Ty::Tuple(vec![Ty::Var(t), Ty::Var(u)]);
        assert_eq!(ty.display_with(set.names()).to_string(), "{T, ?1}");
    }

    #[test]
    fn rename_keeps_unmapped_vars() {
        let mut renaming = Renaming::default();
        renaming.insert(TyVar(0), TyVar(7));
        let ty = Ty::pred(vec![Ty::Var(TyVar(0)), Ty::Var(TyVar(1))]);
        assert_eq!(
            ty.rename(&renaming),
            Ty::pred(vec![Ty::Var(TyVar(7)), Ty::Var(TyVar(1))])
        );
    }

    #[test]
    fn collect_vars_dedups_in_order() {
        let ty = Ty::Tuple(vec![
            Ty::Var(TyVar(2)),
            list(Ty::Var(TyVar(0))),
            Ty::Var(TyVar(2)),
        ]);
        assert_eq!(ty.vars(), vec![TyVar(2), TyVar(0)]);
        assert!(!ty.is_ground());
        assert!(list(Ty::int()).is_ground());
    }

    #[test]
    fn variants_need_one_consistent_renaming() {
        let (a, b, c) = (Ty::Var(TyVar(0)), Ty::Var(TyVar(1)), Ty::Var(TyVar(2)));
        let mut m = VariantMatcher::new();
        assert!(m.matches(&list(a.clone()), &list(b.clone())));
        assert!(m.matches(&a, &b));
        assert!(!m.matches(&a, &c));

        let mut m = VariantMatcher::new();
        let pair = |x: &Ty, y: &Ty| Ty::Tuple(vec![x.clone(), y.clone()]);
        assert!(!m.matches(&pair(&a, &a), &pair(&b, &c)));
        assert!(!VariantMatcher::new().matches(&a, &Ty::int()));
    }

    #[test]
    fn tvarset_allocates_densely() {
        let mut set = TyVarSet::new();
        assert!(set.is_empty());
        let a = set.fresh();
        let b = set.fresh_named("B");
        assert_eq!((a, b), (TyVar(0), TyVar(1)));
        assert_eq!(set.vars().collect::<Vec<_>>(), vec![TyVar(0), TyVar(1)]);
        assert_eq!(set.name(b), Some("B"));
        assert_eq!(set.name(a), None);
    }
}
