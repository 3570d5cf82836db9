//! Unified type pool.
//!
//! Every type in a compilation lives here exactly once; structurally equal
//! `TypeData` always interns to the same `Idx`.
//!
//! The pool is mutated while declarations are bound and metadata is
//! imported. Encoding and validation only read it, so worker threads share
//! it through `&Pool`.

mod format;

pub use format::push_rank;

use cinder_ir::Name;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{DefId, FnPtrParam, FnPtrSig, Idx, TypeData, TypeParamOwner, TypeParamRef};

/// The type pool.
#[derive(Clone, Debug)]
pub struct Pool {
    items: Vec<TypeData>,
    dedup: FxHashMap<TypeData, Idx>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Create a pool with the predefined types at their fixed indices.
    pub fn new() -> Self {
        let mut pool = Pool {
            items: Vec::with_capacity(256),
            dedup: FxHashMap::default(),
        };
        for raw in 0..Idx::PRIMITIVE_COUNT {
            let idx = Idx::from_raw(raw);
            let data = if idx.is_error() {
                TypeData::Error
            } else {
                TypeData::Predefined(idx)
            };
            let interned = pool.intern(data);
            debug_assert_eq!(interned, idx);
        }
        pool
    }

    /// Intern structural data, returning the canonical index.
    pub fn intern(&mut self, data: TypeData) -> Idx {
        if let Some(&idx) = self.dedup.get(&data) {
            return idx;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "more than u32::MAX distinct types is not a realistic compilation"
        )]
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(data.clone());
        self.dedup.insert(data, idx);
        idx
    }

    /// Get the structural data of a type.
    #[inline]
    pub fn get(&self, idx: Idx) -> &TypeData {
        &self.items[idx.raw() as usize]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // === Constructors ===

    /// A (possibly constructed) named type.
    pub fn named(&mut self, def: DefId, args: &[Idx]) -> Idx {
        self.intern(TypeData::Named {
            def,
            args: SmallVec::from_slice(args),
        })
    }

    pub fn type_param(&mut self, owner: TypeParamOwner, ordinal: u32, name: Name) -> Idx {
        self.intern(TypeData::TypeParam(TypeParamRef {
            owner,
            ordinal,
            name,
        }))
    }

    /// `elem[]` for rank 1, `elem[,]` for rank 2, ...
    pub fn array(&mut self, elem: Idx, rank: u32) -> Idx {
        self.intern(TypeData::Array {
            elem,
            rank: rank.max(1),
        })
    }

    pub fn pointer(&mut self, elem: Idx) -> Idx {
        self.intern(TypeData::Pointer(elem))
    }

    pub fn function_pointer(&mut self, sig: FnPtrSig) -> Idx {
        self.intern(TypeData::FunctionPointer(sig))
    }

    /// A managed function pointer with by-value parameters.
    pub fn managed_function_pointer(&mut self, params: &[Idx], ret: Idx) -> Idx {
        self.function_pointer(FnPtrSig {
            unmanaged: false,
            conventions: SmallVec::new(),
            params: params
                .iter()
                .map(|&ty| FnPtrParam {
                    ty,
                    ref_kind: crate::RefKind::None,
                })
                .collect(),
            ret: FnPtrParam {
                ty: ret,
                ref_kind: crate::RefKind::None,
            },
        })
    }

    /// A tuple; `names` may be empty for an unnamed tuple.
    pub fn tuple(&mut self, elems: &[Idx], names: &[Option<Name>]) -> Idx {
        let mut all_names: SmallVec<[Option<Name>; 4]> = SmallVec::from_slice(names);
        all_names.resize(elems.len(), None);
        self.intern(TypeData::Tuple {
            elems: SmallVec::from_slice(elems),
            names: all_names,
        })
    }

    /// Nullable reference annotation `inner?`. Idempotent.
    pub fn nullable_ref(&mut self, inner: Idx) -> Idx {
        match self.get(inner) {
            TypeData::NullableRef(_) | TypeData::Error => inner,
            _ => self.intern(TypeData::NullableRef(inner)),
        }
    }

    // === Queries ===

    /// Remove a top-level nullable reference annotation.
    pub fn strip_nullable_ref(&self, idx: Idx) -> Idx {
        match self.get(idx) {
            TypeData::NullableRef(inner) => *inner,
            _ => idx,
        }
    }

    /// Identity modulo nullable annotations and tuple element names.
    pub fn identical_erased(&self, a: Idx, b: Idx) -> bool {
        if a == b {
            return true;
        }
        let a = self.strip_nullable_ref(a);
        let b = self.strip_nullable_ref(b);
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (
                TypeData::Named { def: da, args: aa },
                TypeData::Named { def: db, args: ab },
            ) => da == db && self.all_identical(aa, ab),
            (TypeData::TypeParam(pa), TypeData::TypeParam(pb)) => {
                pa.owner == pb.owner && pa.ordinal == pb.ordinal
            }
            (
                TypeData::Array { elem: ea, rank: ra },
                TypeData::Array { elem: eb, rank: rb },
            ) => ra == rb && self.identical_erased(*ea, *eb),
            (TypeData::Pointer(ea), TypeData::Pointer(eb)) => self.identical_erased(*ea, *eb),
            (TypeData::FunctionPointer(fa), TypeData::FunctionPointer(fb)) => {
                fa.unmanaged == fb.unmanaged
                    && fa.conventions == fb.conventions
                    && fa.params.len() == fb.params.len()
                    && fa.ret.ref_kind == fb.ret.ref_kind
                    && self.identical_erased(fa.ret.ty, fb.ret.ty)
                    && fa.params.iter().zip(&fb.params).all(|(pa, pb)| {
                        pa.ref_kind == pb.ref_kind && self.identical_erased(pa.ty, pb.ty)
                    })
            }
            (TypeData::Tuple { elems: ea, .. }, TypeData::Tuple { elems: eb, .. }) => {
                self.all_identical(ea, eb)
            }
            _ => false,
        }
    }

    fn all_identical(&self, a: &[Idx], b: &[Idx]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| self.identical_erased(x, y))
    }

    /// Whether `idx` mentions any type parameter matching `pred`.
    pub fn mentions_type_param(&self, idx: Idx, pred: &impl Fn(TypeParamRef) -> bool) -> bool {
        match self.get(idx) {
            TypeData::Predefined(_) | TypeData::Error => false,
            TypeData::TypeParam(p) => pred(*p),
            TypeData::Named { args, .. } => args.iter().any(|&a| self.mentions_type_param(a, pred)),
            TypeData::Array { elem, .. } | TypeData::Pointer(elem) | TypeData::NullableRef(elem) => {
                self.mentions_type_param(*elem, pred)
            }
            TypeData::FunctionPointer(sig) => {
                self.mentions_type_param(sig.ret.ty, pred)
                    || sig
                        .params
                        .iter()
                        .any(|p| self.mentions_type_param(p.ty, pred))
            }
            TypeData::Tuple { elems, .. } => {
                elems.iter().any(|&e| self.mentions_type_param(e, pred))
            }
        }
    }

    /// Whether `idx` is or contains the error type.
    pub fn contains_error(&self, idx: Idx) -> bool {
        match self.get(idx) {
            TypeData::Error => true,
            TypeData::Predefined(_) | TypeData::TypeParam(_) => false,
            TypeData::Named { args, .. } => args.iter().any(|&a| self.contains_error(a)),
            TypeData::Array { elem, .. } | TypeData::Pointer(elem) | TypeData::NullableRef(elem) => {
                self.contains_error(*elem)
            }
            TypeData::FunctionPointer(sig) => {
                self.contains_error(sig.ret.ty) || sig.params.iter().any(|p| self.contains_error(p.ty))
            }
            TypeData::Tuple { elems, .. } => elems.iter().any(|&e| self.contains_error(e)),
        }
    }

    /// The type parameter behind `idx`, looking through `T?`.
    pub fn as_type_param(&self, idx: Idx) -> Option<TypeParamRef> {
        match self.get(self.strip_nullable_ref(idx)) {
            TypeData::TypeParam(p) => Some(*p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
