//! Structural type data stored in the pool.

use cinder_ir::Name;
use smallvec::SmallVec;

use crate::{DefId, Idx, RefKind};

/// What declares a type parameter.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum TypeParamOwner {
    /// A generic named type (`List<T>`).
    Type,
    /// An extension block (`extension<T>(List<T> list)`).
    Block,
    /// A generic method, including extension members.
    Method,
}

/// A reference to a type parameter.
///
/// Two references with the same owner and ordinal denote the same
/// parameter position; `name` only matters for display.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeParamRef {
    pub owner: TypeParamOwner,
    pub ordinal: u32,
    pub name: Name,
}

/// One parameter or the return of a function pointer signature.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FnPtrParam {
    pub ty: Idx,
    pub ref_kind: RefKind,
}

/// `delegate* unmanaged[Cdecl, SuppressGCTransition]<int, void>`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FnPtrSig {
    /// `unmanaged` calling convention family.
    pub unmanaged: bool,
    /// Calling-convention identifiers in declaration order (`Cdecl`, ...).
    pub conventions: SmallVec<[Name; 2]>,
    pub params: Vec<FnPtrParam>,
    pub ret: FnPtrParam,
}

/// Structural description of an interned type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    /// A predefined type, identified by its fixed index.
    Predefined(Idx),
    /// Failed binding.
    Error,
    /// A (possibly constructed) named type.
    Named { def: DefId, args: SmallVec<[Idx; 2]> },
    TypeParam(TypeParamRef),
    /// `elem[]` (rank 1) or `elem[,]` (rank 2) ...
    Array { elem: Idx, rank: u32 },
    /// `elem*`
    Pointer(Idx),
    FunctionPointer(FnPtrSig),
    /// `(int a, string b)`; `names` has one entry per element.
    Tuple {
        elems: SmallVec<[Idx; 4]>,
        names: SmallVec<[Option<Name>; 4]>,
    },
    /// Nullable reference annotation `T?` on a reference type or
    /// type parameter. Erased for identity and grouping purposes.
    NullableRef(Idx),
}

impl TypeData {
    /// Short tag for tracing output.
    pub fn tag_name(&self) -> &'static str {
        match self {
            TypeData::Predefined(_) => "predefined",
            TypeData::Error => "error",
            TypeData::Named { .. } => "named",
            TypeData::TypeParam(_) => "type-param",
            TypeData::Array { .. } => "array",
            TypeData::Pointer(_) => "pointer",
            TypeData::FunctionPointer(_) => "function-pointer",
            TypeData::Tuple { .. } => "tuple",
            TypeData::NullableRef(_) => "nullable-ref",
        }
    }
}
