//! Type parameter declarations and constraint clauses.

use bitflags::bitflags;
use cinder_ir::Name;

use crate::{AttributeData, Idx};

bitflags! {
    /// Special constraints on a type parameter.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ConstraintFlags: u8 {
        /// `class` or `class?`
        const CLASS = 1 << 0;
        /// `struct`
        const STRUCT = 1 << 1;
        /// `unmanaged` (implies `struct`)
        const UNMANAGED = 1 << 2;
        /// `notnull`
        const NOTNULL = 1 << 3;
        /// `new()`
        const NEW = 1 << 4;
        /// `allows ref struct`
        const ALLOWS_REF_STRUCT = 1 << 5;
    }
}

/// A `where T : ...` clause.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ConstraintClause {
    pub flags: ConstraintFlags,
    /// `class?` rather than `class`. Only meaningful with `CLASS`.
    pub class_nullable: bool,
    /// Constraint types (base class and interfaces) in source order.
    pub types: Vec<Idx>,
}

impl ConstraintClause {
    /// Whether no constraint of any kind was written.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.types.is_empty()
    }

    /// `struct` or `unmanaged`.
    pub fn is_value_type_constraint(&self) -> bool {
        self.flags
            .intersects(ConstraintFlags::STRUCT | ConstraintFlags::UNMANAGED)
    }

    pub fn is_reference_type_constraint(&self) -> bool {
        self.flags.contains(ConstraintFlags::CLASS)
    }
}

/// A declared type parameter.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeParamDecl {
    pub name: Name,
    pub constraints: ConstraintClause,
    pub attributes: Vec<AttributeData>,
}

impl TypeParamDecl {
    /// An unconstrained type parameter.
    pub fn new(name: Name) -> Self {
        TypeParamDecl {
            name,
            constraints: ConstraintClause::default(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ConstraintFlags) -> Self {
        self.constraints.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_constraint_type(mut self, ty: Idx) -> Self {
        self.constraints.types.push(ty);
        self
    }
}
