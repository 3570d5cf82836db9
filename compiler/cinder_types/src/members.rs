//! Parameter passing modes, accessibility, and member signatures.

use cinder_ir::{Name, SourceLoc};
use std::fmt;

use crate::{AttributeData, Idx, TypeParamDecl};

/// How an argument is passed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub enum RefKind {
    /// By value.
    #[default]
    None,
    /// `ref`
    Ref,
    /// `in`
    In,
    /// `ref readonly`
    RefReadOnly,
}

impl RefKind {
    /// Any by-reference mode.
    #[inline]
    pub const fn is_by_ref(self) -> bool {
        !matches!(self, RefKind::None)
    }

    /// `in` and `ref readonly` pass a read-only reference.
    #[inline]
    pub const fn is_readonly_ref(self) -> bool {
        matches!(self, RefKind::In | RefKind::RefReadOnly)
    }

    /// Source keyword, empty for by-value.
    pub const fn keyword(self) -> &'static str {
        match self {
            RefKind::None => "",
            RefKind::Ref => "ref",
            RefKind::In => "in",
            RefKind::RefReadOnly => "ref readonly",
        }
    }
}

/// `scoped` modifier on a parameter.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ScopedKind {
    #[default]
    None,
    /// `scoped ref T x`
    ScopedRef,
    /// `scoped T x` where `T` is a ref struct.
    ScopedValue,
}

/// Declared accessibility, ordered from least to most accessible.
///
/// `Protected` and `Internal` are not comparable in the language; the
/// total order here places `Protected` below `Internal`, which is what
/// "least accessible" computations use.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub enum Accessibility {
    Private,
    ProtectedAndInternal,
    Protected,
    #[default]
    Internal,
    ProtectedOrInternal,
    Public,
}

impl Accessibility {
    pub const fn keyword(self) -> &'static str {
        match self {
            Accessibility::Private => "private",
            Accessibility::ProtectedAndInternal => "private protected",
            Accessibility::Protected => "protected",
            Accessibility::Internal => "internal",
            Accessibility::ProtectedOrInternal => "protected internal",
            Accessibility::Public => "public",
        }
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A bound parameter.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParamInfo {
    pub name: Name,
    pub ty: Idx,
    pub ref_kind: RefKind,
    pub scoped: ScopedKind,
    pub attributes: Vec<AttributeData>,
    /// Whether a default value was written.
    pub has_default: bool,
}

impl ParamInfo {
    /// A plain by-value parameter.
    pub fn new(name: Name, ty: Idx) -> Self {
        ParamInfo {
            name,
            ty,
            ref_kind: RefKind::None,
            scoped: ScopedKind::None,
            attributes: Vec::new(),
            has_default: false,
        }
    }

    #[must_use]
    pub fn with_ref_kind(mut self, ref_kind: RefKind) -> Self {
        self.ref_kind = ref_kind;
        self
    }
}

/// Kind of an ordinary (non-extension) member of a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum OrdinaryMemberKind {
    Method,
    Property,
    Field,
}

/// An ordinary member of a named type, as far as extension resolution needs it.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct OrdinaryMember {
    pub name: Name,
    pub kind: OrdinaryMemberKind,
    pub is_static: bool,
    pub accessibility: Accessibility,
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<ParamInfo>,
    /// Return type for methods, value type for properties and fields.
    pub ret: Idx,
    pub loc: SourceLoc,
}

impl OrdinaryMember {
    /// A public instance method.
    pub fn method(name: Name, params: Vec<ParamInfo>, ret: Idx) -> Self {
        OrdinaryMember {
            name,
            kind: OrdinaryMemberKind::Method,
            is_static: false,
            accessibility: Accessibility::Public,
            type_params: Vec::new(),
            params,
            ret,
            loc: SourceLoc::SYNTHESIZED,
        }
    }

    /// A public instance property.
    pub fn property(name: Name, ty: Idx) -> Self {
        OrdinaryMember {
            name,
            kind: OrdinaryMemberKind::Property,
            is_static: false,
            accessibility: Accessibility::Public,
            type_params: Vec::new(),
            params: Vec::new(),
            ret: ty,
            loc: SourceLoc::SYNTHESIZED,
        }
    }
}
