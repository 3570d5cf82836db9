//! Type-argument inference and substitution.
//!
//! Inference here is the part extension resolution needs: binding the
//! type parameters of one owner (an extension block from the receiver, or
//! a method from its arguments) by exact and lower-bound matching.
//! Nullable annotations are ignored while matching.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::conversions::supertypes;
use crate::{FnPtrParam, FnPtrSig, GenericEnv, Idx, Pool, TypeData, TypeParamOwner, TypeRegistry};

/// A mapping from type parameters to types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution {
    map: FxHashMap<(TypeParamOwner, u32), Idx>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map parameters `0..args.len()` of `owner` to `args`.
    pub fn from_args(owner: TypeParamOwner, args: &[Idx]) -> Self {
        let mut subst = Self::new();
        for (ordinal, &arg) in (0u32..).zip(args) {
            subst.map.insert((owner, ordinal), arg);
        }
        subst
    }

    pub fn get(&self, owner: TypeParamOwner, ordinal: u32) -> Option<Idx> {
        self.map.get(&(owner, ordinal)).copied()
    }

    pub fn insert(&mut self, owner: TypeParamOwner, ordinal: u32, ty: Idx) {
        self.map.insert((owner, ordinal), ty);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Merge another substitution in, keeping existing bindings.
    pub fn extend(&mut self, other: &Substitution) {
        for (&key, &ty) in &other.map {
            self.map.entry(key).or_insert(ty);
        }
    }

    /// Inferred arguments for `count` parameters of `owner`, or `None` if
    /// any is unbound.
    pub fn args(&self, owner: TypeParamOwner, count: usize) -> Option<Vec<Idx>> {
        (0u32..)
            .take(count)
            .map(|ordinal| self.get(owner, ordinal))
            .collect()
    }
}

impl Pool {
    /// Apply a substitution, interning any new types.
    pub fn substitute(&mut self, idx: Idx, subst: &Substitution) -> Idx {
        if subst.is_empty() {
            return idx;
        }
        match self.get(idx).clone() {
            TypeData::Predefined(_) | TypeData::Error => idx,
            TypeData::TypeParam(p) => subst.get(p.owner, p.ordinal).unwrap_or(idx),
            TypeData::Named { def, args } => {
                let args: SmallVec<[Idx; 2]> =
                    args.iter().map(|&a| self.substitute(a, subst)).collect();
                self.intern(TypeData::Named { def, args })
            }
            TypeData::Array { elem, rank } => {
                let elem = self.substitute(elem, subst);
                self.array(elem, rank)
            }
            TypeData::Pointer(elem) => {
                let elem = self.substitute(elem, subst);
                self.pointer(elem)
            }
            TypeData::NullableRef(inner) => {
                let inner = self.substitute(inner, subst);
                self.nullable_ref(inner)
            }
            TypeData::Tuple { elems, names } => {
                let elems: SmallVec<[Idx; 4]> =
                    elems.iter().map(|&e| self.substitute(e, subst)).collect();
                self.intern(TypeData::Tuple { elems, names })
            }
            TypeData::FunctionPointer(sig) => {
                let params = sig
                    .params
                    .iter()
                    .map(|p| FnPtrParam {
                        ty: self.substitute(p.ty, subst),
                        ref_kind: p.ref_kind,
                    })
                    .collect();
                let ret = FnPtrParam {
                    ty: self.substitute(sig.ret.ty, subst),
                    ref_kind: sig.ret.ref_kind,
                };
                self.function_pointer(FnPtrSig {
                    unmanaged: sig.unmanaged,
                    conventions: sig.conventions,
                    params,
                    ret,
                })
            }
        }
    }
}

/// Bind a parameter, or check an existing binding agrees.
fn bind(pool: &Pool, subst: &mut Substitution, owner: TypeParamOwner, ordinal: u32, ty: Idx) -> bool {
    let ty = pool.strip_nullable_ref(ty);
    match subst.get(owner, ordinal) {
        Some(existing) => pool.identical_erased(existing, ty),
        None => {
            subst.insert(owner, ordinal, ty);
            true
        }
    }
}

/// Exact inference: `pattern` must equal `actual` once `owner`'s
/// parameters are bound.
pub fn infer_exact(
    pool: &Pool,
    owner: TypeParamOwner,
    pattern: Idx,
    actual: Idx,
    subst: &mut Substitution,
) -> bool {
    let pattern = pool.strip_nullable_ref(pattern);
    let actual = pool.strip_nullable_ref(actual);
    match (pool.get(pattern), pool.get(actual)) {
        (TypeData::TypeParam(p), _) if p.owner == owner => {
            bind(pool, subst, owner, p.ordinal, actual)
        }
        (TypeData::Named { def: dp, args: ap }, TypeData::Named { def: da, args: aa }) => {
            dp == da && all_exact(pool, owner, ap, aa, subst)
        }
        (TypeData::Array { elem: ep, rank: rp }, TypeData::Array { elem: ea, rank: ra }) => {
            rp == ra && infer_exact(pool, owner, *ep, *ea, subst)
        }
        (TypeData::Pointer(ep), TypeData::Pointer(ea)) => infer_exact(pool, owner, *ep, *ea, subst),
        (TypeData::Tuple { elems: ep, .. }, TypeData::Tuple { elems: ea, .. }) => {
            all_exact(pool, owner, ep, ea, subst)
        }
        (TypeData::FunctionPointer(fp), TypeData::FunctionPointer(fa)) => {
            fp.unmanaged == fa.unmanaged
                && fp.conventions == fa.conventions
                && fp.params.len() == fa.params.len()
                && fp.ret.ref_kind == fa.ret.ref_kind
                && infer_exact(pool, owner, fp.ret.ty, fa.ret.ty, subst)
                && fp.params.iter().zip(&fa.params).all(|(p, a)| {
                    p.ref_kind == a.ref_kind && infer_exact(pool, owner, p.ty, a.ty, subst)
                })
        }
        _ => pool.identical_erased(pattern, actual),
    }
}

fn all_exact(
    pool: &Pool,
    owner: TypeParamOwner,
    pattern: &[Idx],
    actual: &[Idx],
    subst: &mut Substitution,
) -> bool {
    pattern.len() == actual.len()
        && pattern
            .iter()
            .zip(actual)
            .all(|(&p, &a)| infer_exact(pool, owner, p, a, subst))
}

/// Lower-bound inference: `actual` must convert to `pattern` once bound.
///
/// Tries an exact match first, then matches `pattern` against every
/// supertype of `actual` (base classes and interfaces, substituted).
/// Bindings are only committed when a candidate matches.
pub fn infer_lower_bound(
    pool: &mut Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    owner: TypeParamOwner,
    pattern: Idx,
    actual: Idx,
    subst: &mut Substitution,
) -> bool {
    let stripped = pool.strip_nullable_ref(pattern);
    if let TypeData::TypeParam(p) = pool.get(stripped) {
        if p.owner == owner {
            let ordinal = p.ordinal;
            return bind(pool, subst, owner, ordinal, actual);
        }
    }

    let mut attempt = subst.clone();
    if infer_exact(pool, owner, pattern, actual, &mut attempt) {
        *subst = attempt;
        return true;
    }

    // Array element covariance.
    if let (TypeData::Array { elem: ep, rank: rp }, TypeData::Array { elem: ea, rank: ra }) =
        (pool.get(stripped).clone(), pool.get(pool.strip_nullable_ref(actual)).clone())
    {
        if rp == ra {
            let mut attempt = subst.clone();
            if infer_lower_bound(pool, registry, env, owner, ep, ea, &mut attempt) {
                *subst = attempt;
                return true;
            }
        }
    }

    let TypeData::Named { def: target, .. } = pool.get(stripped).clone() else {
        return false;
    };
    for sup in supertypes(pool, registry, env, actual) {
        let is_target = matches!(pool.get(sup), TypeData::Named { def, .. } if *def == target);
        if !is_target {
            continue;
        }
        let mut attempt = subst.clone();
        if infer_exact(pool, owner, pattern, sup, &mut attempt) {
            *subst = attempt;
            return true;
        }
    }
    false
}
