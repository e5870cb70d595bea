//! Built-in types.
//!
//! Registers the types the checker itself refers to (`io.state` for I/O
//! state threading, `stm.stm` for transaction state) and gives the types
//! of literal constants.

use quill_common::sym::SymName;

use crate::goal::ConsId;
use crate::tables::{ModuleTables, TypeBody, TypeDefn};
use crate::ty::{BuiltinType, Ty, TyVarSet, TypeCtor};

/// `io.state`, the type of the I/O state pair.
pub fn io_state() -> Ty {
    Ty::Defined(io_state_ctor(), Vec::new())
}

/// `stm.stm`, the type of transaction state inside an atomic goal.
pub fn stm() -> Ty {
    Ty::Defined(stm_ctor(), Vec::new())
}

fn io_state_ctor() -> TypeCtor {
    TypeCtor::new(SymName::qualified("io", "state"), 0)
}

fn stm_ctor() -> TypeCtor {
    TypeCtor::new(SymName::qualified("stm", "stm"), 0)
}

/// Register the built-in abstract types.
pub fn register_builtin_types(tables: &mut ModuleTables) {
    for ctor in [io_state_ctor(), stm_ctor()] {
        tables.add_type(TypeDefn {
            ctor,
            tvarset: TyVarSet::new(),
            params: Vec::new(),
            body: TypeBody::Abstract,
            supertype: None,
        });
    }
}

/// The type of a literal constant, or `None` for a named functor.
pub fn literal_type(cons: &ConsId) -> Option<Ty> {
    match cons {
        ConsId::Int(width, _) => Some(Ty::Builtin(BuiltinType::Int(*width))),
        ConsId::Float(_) => Some(Ty::float()),
        ConsId::String(_) => Some(Ty::string()),
        ConsId::Char(_) => Some(Ty::char()),
        ConsId::Named(_) => None,
    }
}
