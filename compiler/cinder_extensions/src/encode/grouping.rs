//! Erased grouping keys.
//!
//! Format: ``extension`N(ref System.Collections.Generic.List`1<!0>) where !0 : class, App.IShape``
//!
//! - arrays print the element first, then ranks innermost-first:
//!   `System.Int32[,][]` is a single-dimensional array of `int[,]`
//! - tuples print as their `System.ValueTuple` construction; more than
//!   seven elements nest the rest in the eighth argument
//! - function pointer calling conventions print as a modifier stack,
//!   nearest to the return type first, in reverse declaration order

use cinder_ir::StringInterner;
use cinder_types::{
    ConstraintFlags, FnPtrParam, Idx, Pool, RefKind, TypeData, TypeParamDecl, TypeParamOwner,
    TypeRegistry,
};

use super::GroupingKey;
use crate::decl::ReceiverDescriptor;

/// Namespace of the calling-convention modifier types.
pub(crate) const CALL_CONV_NAMESPACE: &str = "System.Runtime.CompilerServices";

pub(super) fn grouping_key(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    receiver: &ReceiverDescriptor,
    type_params: &[TypeParamDecl],
) -> GroupingKey {
    let mut key = receiver_part(
        pool,
        registry,
        interner,
        receiver.ref_kind,
        receiver.ty,
        type_params.len(),
    );
    for (ordinal, param) in type_params.iter().enumerate() {
        let parts = erased_constraints(pool, registry, interner, param);
        if parts.is_empty() {
            continue;
        }
        key.push_str(" where !");
        key.push_str(&ordinal.to_string());
        key.push_str(" : ");
        key.push_str(&parts.join(", "));
    }
    GroupingKey(key.into())
}

pub(super) fn receiver_part(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    ref_kind: RefKind,
    ty: Idx,
    arity: usize,
) -> String {
    let mut key = String::from("extension");
    if arity > 0 {
        key.push('`');
        key.push_str(&arity.to_string());
    }
    key.push('(');
    push_ref_kind(&mut key, ref_kind);
    push_erased_type(pool, registry, interner, ty, &mut key);
    key.push(')');
    key
}

/// Constraints in normalized order: primary, constraint types sorted by
/// erased name, `new()`, `allows ref struct`. `notnull` and the `?` of
/// `class?` are nullability and do not participate.
fn erased_constraints(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    param: &TypeParamDecl,
) -> Vec<String> {
    let clause = &param.constraints;
    let mut parts = Vec::new();
    if clause.flags.contains(ConstraintFlags::UNMANAGED) {
        parts.push("unmanaged".to_owned());
    } else if clause.flags.contains(ConstraintFlags::STRUCT) {
        parts.push("struct".to_owned());
    } else if clause.flags.contains(ConstraintFlags::CLASS) {
        parts.push("class".to_owned());
    }
    let mut types: Vec<String> = clause
        .types
        .iter()
        .map(|&ty| {
            let mut buf = String::new();
            push_erased_type(pool, registry, interner, ty, &mut buf);
            buf
        })
        .collect();
    types.sort();
    types.dedup();
    parts.extend(types);
    if clause.flags.contains(ConstraintFlags::NEW) {
        parts.push("new()".to_owned());
    }
    if clause.flags.contains(ConstraintFlags::ALLOWS_REF_STRUCT) {
        parts.push("allows ref struct".to_owned());
    }
    parts
}

fn push_ref_kind(buf: &mut String, ref_kind: RefKind) {
    if ref_kind.is_by_ref() {
        buf.push_str(ref_kind.keyword());
        buf.push(' ');
    }
}

/// Append the erased form of `idx`.
pub fn push_erased_type(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    idx: Idx,
    buf: &mut String,
) {
    match pool.get(idx) {
        TypeData::Predefined(p) => buf.push_str(p.metadata_name().unwrap_or("<error>")),
        TypeData::Error => buf.push_str("<error>"),
        TypeData::Named { def, args } => {
            buf.push_str(&registry.metadata_name(*def, interner));
            push_erased_args(pool, registry, interner, args, buf);
        }
        TypeData::TypeParam(p) => {
            buf.push_str(match p.owner {
                TypeParamOwner::Type => "!T",
                TypeParamOwner::Block => "!",
                TypeParamOwner::Method => "!!",
            });
            buf.push_str(&p.ordinal.to_string());
        }
        TypeData::Array { elem, rank } => {
            push_erased_type(pool, registry, interner, *elem, buf);
            cinder_types::push_rank(buf, *rank);
        }
        TypeData::Pointer(elem) => {
            push_erased_type(pool, registry, interner, *elem, buf);
            buf.push('*');
        }
        TypeData::FunctionPointer(sig) => {
            buf.push_str("method ");
            if sig.unmanaged {
                buf.push_str("unmanaged ");
            }
            push_erased_fnptr_param(pool, registry, interner, &sig.ret, buf);
            for conv in sig.conventions.iter().rev() {
                buf.push_str(" modopt(");
                buf.push_str(CALL_CONV_NAMESPACE);
                buf.push_str(".CallConv");
                buf.push_str(interner.lookup(*conv));
                buf.push(')');
            }
            buf.push_str(" *(");
            for (i, param) in sig.params.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                push_erased_fnptr_param(pool, registry, interner, param, buf);
            }
            buf.push(')');
        }
        TypeData::Tuple { elems, .. } => push_erased_tuple(pool, registry, interner, elems, buf),
        TypeData::NullableRef(inner) => push_erased_type(pool, registry, interner, *inner, buf),
    }
}

fn push_erased_args(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    args: &[Idx],
    buf: &mut String,
) {
    if args.is_empty() {
        return;
    }
    buf.push('<');
    for (i, &arg) in args.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        push_erased_type(pool, registry, interner, arg, buf);
    }
    buf.push('>');
}

/// `System.ValueTuple`N<...>`, nesting after the seventh element. The
/// empty tuple is the non-generic `System.ValueTuple`.
fn push_erased_tuple(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    elems: &[Idx],
    buf: &mut String,
) {
    let wk = registry.well_known();
    let Some(last) = elems.len().checked_sub(1) else {
        buf.push_str("System.ValueTuple");
        return;
    };
    if elems.len() <= 7 {
        let def = wk.value_tuple[last];
        buf.push_str(&registry.metadata_name(def, interner));
        push_erased_args(pool, registry, interner, elems, buf);
        return;
    }
    buf.push_str(&registry.metadata_name(wk.value_tuple[7], interner));
    buf.push('<');
    for &elem in &elems[..7] {
        push_erased_type(pool, registry, interner, elem, buf);
        buf.push(',');
    }
    push_erased_tuple(pool, registry, interner, &elems[7..], buf);
    buf.push('>');
}

fn push_erased_fnptr_param(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    param: &FnPtrParam,
    buf: &mut String,
) {
    push_ref_kind(buf, param.ref_kind);
    push_erased_type(pool, registry, interner, param.ty, buf);
}
