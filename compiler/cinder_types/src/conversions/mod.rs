//! Implicit conversions used by extension applicability and betterness.
//!
//! Receivers only ever use identity, implicit reference and boxing
//! conversions. Arguments may additionally use implicit numeric and
//! implicit nullable conversions.

use crate::value_category::{value_category, ValueCategory};
use crate::{GenericEnv, Idx, Pool, Substitution, TypeData, TypeKind, TypeParamOwner, TypeRegistry};

/// Kind of an implicit conversion.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConversionKind {
    Identity,
    ImplicitNumeric,
    /// `S` to `Nullable<T>` where `S` converts to `T`.
    ImplicitNullable,
    ImplicitReference,
    Boxing,
}

impl ConversionKind {
    /// Conversions allowed between a receiver and an extension's receiver type.
    #[inline]
    pub const fn is_receiver_conversion(self) -> bool {
        matches!(
            self,
            Self::Identity | Self::ImplicitReference | Self::Boxing
        )
    }
}

/// Classify the implicit conversion from `from` to `to`, if any.
pub fn classify(
    pool: &mut Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    from: Idx,
    to: Idx,
) -> Option<ConversionKind> {
    if pool.identical_erased(from, to) {
        return Some(ConversionKind::Identity);
    }
    if from.is_error() || to.is_error() {
        return None;
    }
    let from = pool.strip_nullable_ref(from);
    let to = pool.strip_nullable_ref(to);

    if is_implicit_numeric(from, to) {
        return Some(ConversionKind::ImplicitNumeric);
    }

    if let Some(underlying) = nullable_underlying(pool, registry, to) {
        if pool.identical_erased(from, underlying) || is_implicit_numeric(from, underlying) {
            return Some(ConversionKind::ImplicitNullable);
        }
    }

    let category = value_category(pool, registry, env, from);
    let to_supertype = to == Idx::OBJECT
        || supertypes(pool, registry, env, from)
            .into_iter()
            .any(|sup| pool.identical_erased(sup, to));
    if !to_supertype {
        return None;
    }
    match category {
        ValueCategory::Reference => Some(ConversionKind::ImplicitReference),
        ValueCategory::Value | ValueCategory::Unknown => Some(ConversionKind::Boxing),
    }
}

/// Whether `from` converts to `to` by some implicit conversion.
pub fn converts(
    pool: &mut Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    from: Idx,
    to: Idx,
) -> bool {
    classify(pool, registry, env, from, to).is_some()
}

/// Better conversion target: `t1` is better than `t2` when `t1` converts
/// to `t2` and not the reverse, or when `t1` is signed and `t2` unsigned.
pub fn is_better_target(
    pool: &mut Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    t1: Idx,
    t2: Idx,
) -> bool {
    if pool.identical_erased(t1, t2) {
        return false;
    }
    let forward = converts(pool, registry, env, t1, t2);
    let backward = converts(pool, registry, env, t2, t1);
    if forward && !backward {
        return true;
    }
    is_signed_integral(t1) && is_unsigned_integral(t2)
}

/// `T` when `ty` is `Nullable<T>`.
pub fn nullable_underlying(pool: &Pool, registry: &TypeRegistry, ty: Idx) -> Option<Idx> {
    match pool.get(ty) {
        TypeData::Named { def, args }
            if *def == registry.well_known().nullable && args.len() == 1 =>
        {
            Some(args[0])
        }
        _ => None,
    }
}

/// All proper supertypes of `ty`: base chain, implemented interfaces
/// (transitively), and constraint types for type parameters. Generic
/// bases are substituted with `ty`'s type arguments.
///
/// Order is deterministic: base chain first, then interfaces in
/// declaration order, without duplicates.
pub fn supertypes(
    pool: &mut Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    ty: Idx,
) -> Vec<Idx> {
    let mut out: Vec<Idx> = Vec::new();
    let mut work = direct_supertypes(pool, registry, env, ty);
    work.reverse();
    while let Some(next) = work.pop() {
        if out.contains(&next) || next == ty {
            continue;
        }
        out.push(next);
        let mut more = direct_supertypes(pool, registry, env, next);
        more.reverse();
        work.extend(more);
    }
    out
}

fn direct_supertypes(
    pool: &mut Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    ty: Idx,
) -> Vec<Idx> {
    let ty = pool.strip_nullable_ref(ty);
    let wk = *registry.well_known();
    match pool.get(ty).clone() {
        TypeData::Predefined(p) => {
            if p.is_primitive_value_type() {
                let value_type = pool.named(wk.value_type, &[]);
                vec![value_type]
            } else if p == Idx::OBJECT || p == Idx::VOID {
                Vec::new()
            } else {
                vec![Idx::OBJECT]
            }
        }
        TypeData::Named { def, args } => {
            let def_data = registry.get(def);
            let subst = Substitution::from_args(TypeParamOwner::Type, &args);
            let mut direct = Vec::new();
            match (def_data.base, def_data.kind) {
                (Some(base), _) => direct.push(pool.substitute(base, &subst)),
                (None, TypeKind::Struct) => direct.push(pool.named(wk.value_type, &[])),
                (None, TypeKind::Enum) => direct.push(pool.named(wk.enum_base, &[])),
                (None, TypeKind::Class | TypeKind::Delegate) if def == wk.enum_base => {
                    direct.push(pool.named(wk.value_type, &[]));
                }
                (None, TypeKind::Class | TypeKind::Delegate) => direct.push(Idx::OBJECT),
                (None, TypeKind::Interface) => direct.push(Idx::OBJECT),
            }
            for &iface in &def_data.interfaces {
                direct.push(pool.substitute(iface, &subst));
            }
            direct
        }
        TypeData::TypeParam(p) => {
            let mut direct: Vec<Idx> = env
                .constraints(p)
                .map(|c| c.types.clone())
                .unwrap_or_default();
            direct.push(Idx::OBJECT);
            direct
        }
        TypeData::Array { .. } | TypeData::FunctionPointer(_) => vec![Idx::OBJECT],
        TypeData::Tuple { .. } => {
            let value_type = pool.named(wk.value_type, &[]);
            vec![value_type]
        }
        TypeData::Pointer(_) | TypeData::Error | TypeData::NullableRef(_) => Vec::new(),
    }
}

fn is_signed_integral(ty: Idx) -> bool {
    [Idx::SBYTE, Idx::SHORT, Idx::INT, Idx::LONG, Idx::NINT].contains(&ty)
}

fn is_unsigned_integral(ty: Idx) -> bool {
    [Idx::BYTE, Idx::USHORT, Idx::UINT, Idx::ULONG, Idx::NUINT].contains(&ty)
}

/// The implicit numeric conversion table.
pub fn is_implicit_numeric(from: Idx, to: Idx) -> bool {
    const FLOATING: [Idx; 3] = [Idx::FLOAT, Idx::DOUBLE, Idx::DECIMAL];
    let targets: &[Idx] = match from {
        Idx::SBYTE => &[Idx::SHORT, Idx::INT, Idx::LONG, Idx::NINT],
        Idx::BYTE => &[
            Idx::SHORT,
            Idx::USHORT,
            Idx::INT,
            Idx::UINT,
            Idx::LONG,
            Idx::ULONG,
            Idx::NINT,
            Idx::NUINT,
        ],
        Idx::SHORT => &[Idx::INT, Idx::LONG, Idx::NINT],
        Idx::CHAR => &[
            Idx::USHORT,
            Idx::INT,
            Idx::UINT,
            Idx::LONG,
            Idx::ULONG,
            Idx::NINT,
            Idx::NUINT,
        ],
        Idx::USHORT => &[
            Idx::INT,
            Idx::UINT,
            Idx::LONG,
            Idx::ULONG,
            Idx::NINT,
            Idx::NUINT,
        ],
        Idx::INT => &[Idx::LONG, Idx::NINT],
        Idx::UINT => &[Idx::LONG, Idx::ULONG, Idx::NUINT],
        Idx::LONG | Idx::ULONG | Idx::NINT | Idx::NUINT => &[],
        Idx::FLOAT => return to == Idx::DOUBLE,
        _ => return false,
    };
    if targets.contains(&to) {
        return true;
    }
    // Every integral converts to every floating type.
    FLOATING.contains(&to)
}
