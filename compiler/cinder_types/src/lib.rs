//! Bound type graph for Cinder.
//!
//! The extension subsystem works on already-bound declarations. This crate
//! holds the pieces of that bound world it needs:
//! - `Pool`/`Idx`: every type interned once, compared in O(1)
//! - `TypeRegistry`/`DefId`: named type definitions with their members
//! - attribute applications, constraint clauses and parameter modes
//! - the implicit conversions and inference used for receiver matching
//!
//! # Type Interning
//!
//! Structural data (`TypeData`) is interned into the `Pool`, so two equal
//! types always share an `Idx`. Nullable reference annotations and tuple
//! element names are part of the interned data; use
//! `Pool::identical_erased` for identity modulo those.

mod attributes;
mod constraints;
mod data;
mod idx;
mod members;
mod pool;
mod registry;

pub mod conversions;
pub mod infer;
pub mod value_category;

pub use attributes::{AttributeData, ConstantValue, NamedArg, NamedArgKind, TypedConstant};
pub use constraints::{ConstraintClause, ConstraintFlags, TypeParamDecl};
pub use data::{FnPtrParam, FnPtrSig, TypeData, TypeParamOwner, TypeParamRef};
pub use idx::Idx;
pub use members::{
    Accessibility, OrdinaryMember, OrdinaryMemberKind, ParamInfo, RefKind, ScopedKind,
};
pub use pool::{push_rank, Pool};
pub use registry::{DefId, TypeDef, TypeKind, TypeRegistry, WellKnown};

pub use conversions::ConversionKind;
pub use infer::Substitution;
pub use value_category::{GenericEnv, ValueCategory};

// Size assertions to prevent accidental regressions.
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{DefId, Idx, TypeParamRef};
    cinder_ir::static_assert_size!(Idx, 4);
    cinder_ir::static_assert_size!(DefId, 4);
    // owner (1, padded to 4) + ordinal (4) + name (4)
    cinder_ir::static_assert_size!(TypeParamRef, 12);
}
