//! Canonical text of attribute applications and typed constants.
//!
//! Values are spelled by their underlying representation so that equal
//! constants always print identically: floating point values by bit
//! pattern, enum values by their integral value with the enum type as a
//! cast, `typeof` by the written type.

use cinder_ir::StringInterner;
use cinder_types::{AttributeData, ConstantValue, Idx, Pool, TypeRegistry, TypedConstant};

/// `[Ns.Attr(1, "x", Name = true)]`, named arguments sorted by name.
pub fn encode_attribute(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    attr: &AttributeData,
) -> String {
    let mut buf = String::from("[");
    pool.display_into(attr.class, registry, interner, &mut buf);
    if attr.positional.is_empty() && attr.named.is_empty() {
        buf.push(']');
        return buf;
    }
    buf.push('(');
    let mut args: Vec<String> = attr
        .positional
        .iter()
        .map(|c| encode_constant(pool, registry, interner, c))
        .collect();
    let mut named: Vec<(&str, String)> = attr
        .named
        .iter()
        .map(|n| {
            (
                interner.lookup(n.name),
                encode_constant(pool, registry, interner, &n.value),
            )
        })
        .collect();
    named.sort();
    args.extend(named.into_iter().map(|(name, value)| format!("{name} = {value}")));
    buf.push_str(&args.join(", "));
    buf.push_str(")]");
    buf
}

/// Encode a list of attributes in canonical order: by attribute name, then
/// by argument text.
pub(super) fn encode_attributes(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    attrs: &[AttributeData],
) -> String {
    let mut encoded: Vec<(String, String)> = attrs
        .iter()
        .map(|attr| {
            let name = pool.display(attr.class, registry, interner);
            (name, encode_attribute(pool, registry, interner, attr))
        })
        .collect();
    encoded.sort();
    encoded.into_iter().map(|(_, text)| text).collect()
}

/// Canonical text of a typed constant.
pub fn encode_constant(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    constant: &TypedConstant,
) -> String {
    if constant.has_error() {
        return "<error>".to_owned();
    }
    let cast = |buf: &mut String| {
        buf.push('(');
        pool.display_into(constant.ty, registry, interner, buf);
        buf.push(')');
    };
    let mut buf = String::new();
    match &constant.value {
        ConstantValue::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        ConstantValue::Char(c) => {
            buf.push('\'');
            buf.extend(c.escape_default());
            buf.push('\'');
        }
        ConstantValue::Int(v) => {
            if constant.ty != Idx::INT {
                cast(&mut buf);
            }
            buf.push_str(&v.to_string());
        }
        ConstantValue::UInt(v) => {
            cast(&mut buf);
            buf.push_str(&v.to_string());
        }
        ConstantValue::Single(bits) => {
            cast(&mut buf);
            buf.push_str(&format!("0x{bits:08X}"));
        }
        ConstantValue::Double(bits) => {
            cast(&mut buf);
            buf.push_str(&format!("0x{bits:016X}"));
        }
        ConstantValue::String(s) => {
            buf.push('"');
            buf.extend(s.chars().flat_map(char::escape_default));
            buf.push('"');
        }
        ConstantValue::Null => buf.push_str("null"),
        ConstantValue::Type(ty) => {
            buf.push_str("typeof(");
            pool.display_into(*ty, registry, interner, &mut buf);
            buf.push(')');
        }
        ConstantValue::Array(items) => {
            buf.push_str("new ");
            pool.display_into(constant.ty, registry, interner, &mut buf);
            buf.push_str(" { ");
            let items: Vec<String> = items
                .iter()
                .map(|item| encode_constant(pool, registry, interner, item))
                .collect();
            buf.push_str(&items.join(", "));
            buf.push_str(" }");
        }
        ConstantValue::Error => buf.push_str("<error>"),
    }
    buf
}
