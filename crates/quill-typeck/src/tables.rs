//! Read-only symbol tables consulted during type checking.
//!
//! The tables are built once per module (by earlier compiler passes, or by
//! hand in tests) and then shared immutably by every predicate check, so
//! everything here is `Sync` and nothing is mutated after construction.

use std::sync::OnceLock;

use indexmap::IndexMap;
use quill_common::span::Span;
use quill_common::sym::SymName;
use rustc_hash::FxHashMap;

use crate::builtins;
use crate::classes::Constraint;
use crate::coerce::{self, Variance};
use crate::ty::{PredOrFunc, Purity, Ty, TyVar, TyVarSet, TypeCtor};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredId(pub u32);

/// Typeclass constraints on a predicate declaration.
///
/// Universal constraints must be proven by callers; existential ones are
/// proven by the callee and may be assumed by callers.
#[derive(Clone, Debug, Default)]
pub struct ClassContext {
    pub universal: Vec<Constraint>,
    pub existential: Vec<Constraint>,
}

// ── Predicates ─────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct PredInfo {
    pub name: SymName,
    pub kind: PredOrFunc,
    pub purity: Purity,
    pub tvarset: TyVarSet,
    pub existq_tvars: Vec<TyVar>,
    /// Argument types; for functions the result type is last.
    pub arg_types: Vec<Ty>,
    pub class_context: ClassContext,
    pub span: Span,
}

impl PredInfo {
    pub fn new(name: SymName, kind: PredOrFunc, tvarset: TyVarSet, arg_types: Vec<Ty>) -> Self {
        PredInfo {
            name,
            kind,
            purity: Purity::Pure,
            tvarset,
            existq_tvars: Vec::new(),
            arg_types,
            class_context: ClassContext::default(),
            span: Span::default(),
        }
    }

    pub fn with_existq(mut self, vars: Vec<TyVar>) -> Self {
        self.existq_tvars = vars;
        self
    }

    pub fn with_context(mut self, context: ClassContext) -> Self {
        self.class_context = context;
        self
    }

    pub fn with_purity(mut self, purity: Purity) -> Self {
        self.purity = purity;
        self
    }

    /// Number of arguments when called as a predicate.
    pub fn pred_form_arity(&self) -> usize {
        self.arg_types.len()
    }

    /// Number of arguments as written by the user (excludes a function's result).
    pub fn user_arity(&self) -> usize {
        match self.kind {
            PredOrFunc::Pred => self.arg_types.len(),
            PredOrFunc::Func => self.arg_types.len().saturating_sub(1),
        }
    }

    /// Declared type variables that are not existentially quantified.
    pub fn universal_tvars(&self) -> Vec<TyVar> {
        self.tvarset
            .vars()
            .filter(|v| !self.existq_tvars.contains(v))
            .collect()
    }

    pub fn display_name(&self) -> String {
        format!("{} `{}/{}`", self.kind, self.name, self.user_arity())
    }
}

#[derive(Debug, Default)]
pub struct PredTable {
    preds: Vec<PredInfo>,
    by_name: FxHashMap<String, Vec<PredId>>,
}

impl PredTable {
    pub fn insert(&mut self, info: PredInfo) -> PredId {
        let id = PredId(self.preds.len() as u32);
        self.by_name.entry(info.name.name.clone()).or_default().push(id);
        self.preds.push(info);
        id
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    pub fn get(&self, id: PredId) -> &PredInfo {
        &self.preds[id.0 as usize]
    }

    /// Every predicate or function a reference to `name` may denote, in
    /// declaration order.
    pub fn matching(&self, name: &SymName) -> Vec<PredId> {
        self.by_name
            .get(&name.name)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.get(*id).name.matches(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Candidates for a call `name(A1, ..., An)` in predicate form: preds
    /// of arity n and functions of arity n-1 called with their result.
    pub fn lookup_call(&self, name: &SymName, arity: usize) -> Vec<PredId> {
        self.matching(name)
            .into_iter()
            .filter(|id| self.get(*id).pred_form_arity() == arity)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }
}

// ── Types & constructors ───────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct CtorField {
    pub name: Option<String>,
    pub ty: Ty,
}

impl CtorField {
    pub fn anon(ty: Ty) -> Self {
        CtorField { name: None, ty }
    }

    pub fn named(name: &str, ty: Ty) -> Self {
        CtorField {
            name: Some(name.to_string()),
            ty,
        }
    }
}

/// One data constructor of a discriminated-union type. Types are written
/// in terms of the owning `TypeDefn`'s type variable set.
#[derive(Clone, Debug)]
pub struct CtorDefn {
    pub name: SymName,
    pub existq_tvars: Vec<TyVar>,
    pub constraints: Vec<Constraint>,
    pub fields: Vec<CtorField>,
}

impl CtorDefn {
    pub fn new(name: SymName, fields: Vec<CtorField>) -> Self {
        CtorDefn {
            name,
            existq_tvars: Vec::new(),
            constraints: Vec::new(),
            fields,
        }
    }
}

#[derive(Clone, Debug)]
pub enum TypeBody {
    Du(Vec<CtorDefn>),
    Abstract,
    Foreign,
}

#[derive(Clone, Debug)]
pub struct TypeDefn {
    pub ctor: TypeCtor,
    pub tvarset: TyVarSet,
    pub params: Vec<TyVar>,
    pub body: TypeBody,
    /// Declared supertype (`type sub(T) =< super(T)`), over `params`.
    pub supertype: Option<Ty>,
}

impl TypeDefn {
    /// The type this definition describes, over its own parameters.
    pub fn self_type(&self) -> Ty {
        Ty::Defined(
            self.ctor.clone(),
            self.params.iter().map(|v| Ty::Var(*v)).collect(),
        )
    }

    pub fn ctors(&self) -> &[CtorDefn] {
        match &self.body {
            TypeBody::Du(ctors) => ctors,
            TypeBody::Abstract | TypeBody::Foreign => &[],
        }
    }
}

#[derive(Debug, Default)]
pub struct TypeTable {
    defns: IndexMap<TypeCtor, TypeDefn>,
    variances: OnceLock<FxHashMap<TypeCtor, Vec<Variance>>>,
}

impl TypeTable {
    pub fn get(&self, ctor: &TypeCtor) -> Option<&TypeDefn> {
        self.defns.get(ctor)
    }

    fn insert(&mut self, defn: TypeDefn) {
        self.defns.insert(defn.ctor.clone(), defn);
        self.variances = OnceLock::new();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefn> {
        self.defns.values()
    }

    /// Variance of each parameter of `ctor`. Computed for every type the
    /// first time any variance is requested.
    pub fn variance(&self, ctor: &TypeCtor) -> Option<&[Variance]> {
        self.variances
            .get_or_init(|| coerce::compute_variances(self))
            .get(ctor)
            .map(Vec::as_slice)
    }

    /// The declared supertype of `ty`, instantiated with `ty`'s arguments.
    pub fn supertype_of(&self, ty: &Ty) -> Option<Ty> {
        let (ctor, args) = match ty.unkinded() {
            Ty::Defined(ctor, args) => (ctor, args),
            _ => return None,
        };
        let defn = self.get(ctor)?;
        let sup = defn.supertype.as_ref()?;
        let subst = defn
            .params
            .iter()
            .copied()
            .zip(args.iter().cloned())
            .collect();
        Some(sup.substitute(&subst))
    }
}

/// Reference to a constructor inside the type table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsRef {
    pub type_ctor: TypeCtor,
    pub index: usize,
}

/// Reference to a named field of a constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub cons: ConsRef,
    pub field: usize,
}

#[derive(Debug, Default)]
pub struct ConsTable {
    by_name: FxHashMap<(String, usize), Vec<ConsRef>>,
    fields: FxHashMap<String, Vec<FieldRef>>,
}

impl ConsTable {
    fn register(&mut self, defn: &TypeDefn) {
        for (index, ctor) in defn.ctors().iter().enumerate() {
            let cons = ConsRef {
                type_ctor: defn.ctor.clone(),
                index,
            };
            self.by_name
                .entry((ctor.name.name.clone(), ctor.fields.len()))
                .or_default()
                .push(cons.clone());
            for (field, f) in ctor.fields.iter().enumerate() {
                if let Some(name) = &f.name {
                    self.fields.entry(name.clone()).or_default().push(FieldRef {
                        cons: cons.clone(),
                        field,
                    });
                }
            }
        }
    }

    /// Constructors named `name` (partially qualified) with `arity` fields.
    pub fn lookup(&self, types: &TypeTable, name: &SymName, arity: usize) -> Vec<ConsRef> {
        self.by_name
            .get(&(name.name.clone(), arity))
            .map(|refs| {
                refs.iter()
                    .filter(|r| {
                        types
                            .get(&r.type_ctor)
                            .map(|d| d.ctors()[r.index].name.matches(name))
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Constructors named `name`, of any arity.
    pub fn lookup_any_arity(&self, types: &TypeTable, name: &SymName) -> Vec<ConsRef> {
        let mut arities: Vec<usize> = self
            .by_name
            .keys()
            .filter(|(n, _)| *n == name.name)
            .map(|(_, a)| *a)
            .collect();
        arities.sort_unstable();
        arities
            .into_iter()
            .flat_map(|arity| self.lookup(types, name, arity))
            .collect()
    }

    pub fn field(&self, name: &str) -> &[FieldRef] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ── Typeclasses ────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct ClassDefn {
    pub name: SymName,
    pub tvarset: TyVarSet,
    pub params: Vec<TyVar>,
    /// Superclass constraints over `params`.
    pub superclasses: Vec<Constraint>,
}

#[derive(Clone, Debug)]
pub struct InstanceDefn {
    pub class: SymName,
    pub tvarset: TyVarSet,
    pub types: Vec<Ty>,
    /// Constraints the instance itself requires, over `tvarset`.
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Default)]
pub struct ClassTable {
    classes: IndexMap<SymName, ClassDefn>,
    instances: FxHashMap<SymName, Vec<InstanceDefn>>,
}

impl ClassTable {
    pub fn class(&self, name: &SymName) -> Option<&ClassDefn> {
        self.classes.get(name)
    }

    pub fn instances(&self, class: &SymName) -> &[InstanceDefn] {
        self.instances.get(class).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ── Events ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct EventTable {
    events: IndexMap<String, Vec<Ty>>,
}

impl EventTable {
    pub fn get(&self, name: &str) -> Option<&[Ty]> {
        self.events.get(name).map(Vec::as_slice)
    }
}

// ── Module tables ──────────────────────────────────────────────────────

/// Every table the type checker reads, for one module.
#[derive(Debug)]
pub struct ModuleTables {
    pub preds: PredTable,
    pub types: TypeTable,
    pub conses: ConsTable,
    pub classes: ClassTable,
    pub events: EventTable,
}

impl ModuleTables {
    /// Tables holding only the builtin types.
    pub fn new() -> Self {
        let mut tables = ModuleTables {
            preds: PredTable::default(),
            types: TypeTable::default(),
            conses: ConsTable::default(),
            classes: ClassTable::default(),
            events: EventTable::default(),
        };
        builtins::register_builtin_types(&mut tables);
        tables
    }

    pub fn add_pred(&mut self, info: PredInfo) -> PredId {
        self.preds.insert(info)
    }

    /// Register a type and, for discriminated unions, its constructors
    /// and field names.
    pub fn add_type(&mut self, defn: TypeDefn) {
        self.conses.register(&defn);
        self.types.insert(defn);
    }

    pub fn add_class(&mut self, defn: ClassDefn) {
        self.classes.classes.insert(defn.name.clone(), defn);
    }

    pub fn add_instance(&mut self, defn: InstanceDefn) {
        self.classes
            .instances
            .entry(defn.class.clone())
            .or_default()
            .push(defn);
    }

    pub fn add_event(&mut self, name: &str, arg_types: Vec<Ty>) {
        self.events.events.insert(name.to_string(), arg_types);
    }
}

impl Default for ModuleTables {
    fn default() -> Self {
        Self::new()
    }
}
