//! Full marker signatures.
//!
//! Format: `extension<[Attr] T>([Attr] ref readonly scoped List<T?> name) where T : class, IShape, new()`

use cinder_ir::StringInterner;
use cinder_types::{ConstraintFlags, Pool, ScopedKind, TypeParamDecl, TypeRegistry};

use super::constants::encode_attributes;
use super::MarkerSignature;
use crate::decl::ReceiverDescriptor;

pub(super) fn marker_signature(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    receiver: &ReceiverDescriptor,
    type_params: &[TypeParamDecl],
) -> MarkerSignature {
    let mut buf = String::from("extension");
    if !type_params.is_empty() {
        buf.push('<');
        for (i, param) in type_params.iter().enumerate() {
            if i > 0 {
                buf.push_str(", ");
            }
            push_attributes(pool, registry, interner, &param.attributes, &mut buf);
            buf.push_str(interner.lookup(param.name));
        }
        buf.push('>');
    }

    buf.push('(');
    push_attributes(pool, registry, interner, &receiver.attributes, &mut buf);
    if receiver.ref_kind.is_by_ref() {
        buf.push_str(receiver.ref_kind.keyword());
        buf.push(' ');
    }
    if receiver.scoped != ScopedKind::None {
        buf.push_str("scoped ");
    }
    pool.display_into(receiver.ty, registry, interner, &mut buf);
    if let Some(name) = receiver.name {
        buf.push(' ');
        buf.push_str(interner.lookup(name));
    }
    buf.push(')');

    for param in type_params {
        let parts = source_constraints(pool, registry, interner, param);
        if parts.is_empty() {
            continue;
        }
        buf.push_str(" where ");
        buf.push_str(interner.lookup(param.name));
        buf.push_str(" : ");
        buf.push_str(&parts.join(", "));
    }
    MarkerSignature(buf)
}

fn push_attributes(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    attrs: &[cinder_types::AttributeData],
    buf: &mut String,
) {
    if attrs.is_empty() {
        return;
    }
    buf.push_str(&encode_attributes(pool, registry, interner, attrs));
    buf.push(' ');
}

/// Constraints in source-compatible order: primary constraint, types as
/// written, `new()`, `allows ref struct`.
fn source_constraints(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    param: &TypeParamDecl,
) -> Vec<String> {
    let clause = &param.constraints;
    let flags = clause.flags;
    let mut parts = Vec::new();
    if flags.contains(ConstraintFlags::UNMANAGED) {
        parts.push("unmanaged".to_owned());
    } else if flags.contains(ConstraintFlags::STRUCT) {
        parts.push("struct".to_owned());
    } else if flags.contains(ConstraintFlags::CLASS) {
        parts.push(if clause.class_nullable { "class?" } else { "class" }.to_owned());
    } else if flags.contains(ConstraintFlags::NOTNULL) {
        parts.push("notnull".to_owned());
    }
    parts.extend(
        clause
            .types
            .iter()
            .map(|&ty| pool.display(ty, registry, interner)),
    );
    if flags.contains(ConstraintFlags::NEW) {
        parts.push("new()".to_owned());
    }
    if flags.contains(ConstraintFlags::ALLOWS_REF_STRUCT) {
        parts.push("allows ref struct".to_owned());
    }
    parts
}
