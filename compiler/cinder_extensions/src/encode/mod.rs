//! Canonical Signature Encoder.
//!
//! Pure functions from a bound receiver, its block's type parameters and
//! their constraints to two strings:
//!
//! - the **grouping key**: erased identity deciding which blocks share a
//!   synthesized container. Nullability, attributes, `scoped`, parameter
//!   and type-parameter names are stripped; type parameters become
//!   positional (`!0`); every type is spelled by its metadata name.
//! - the **marker signature**: full source-form signature used for display,
//!   documentation cross-references and metadata identity. Nothing is
//!   erased; attributes and named arguments are sorted so equal
//!   declarations always print identically.
//!
//! The encoder reads the type graph but never mutates it, so blocks can be
//! encoded on any thread.

mod constants;
mod grouping;
mod marker;

use std::fmt;

use cinder_ir::StringInterner;
use cinder_types::{Idx, Pool, RefKind, TypeParamDecl, TypeRegistry};

use crate::decl::{ExtensionBlockDecl, ReceiverDescriptor};

pub use constants::{encode_attribute, encode_constant};
pub use grouping::push_erased_type;

/// Erased identity of an extension receiver shape.
#[derive(Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct GroupingKey(Box<str>);

impl GroupingKey {
    const ERROR_TEXT: &'static str = "<error>";

    /// The key shared by all malformed blocks. Error-keyed blocks never
    /// merge with anything.
    pub fn error() -> Self {
        GroupingKey(Self::ERROR_TEXT.into())
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        &*self.0 == Self::ERROR_TEXT
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full, non-erased receiver signature.
#[derive(Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct MarkerSignature(String);

impl MarkerSignature {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Both encodings of one receiver shape.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EncodedSignature {
    pub grouping_key: GroupingKey,
    pub marker: MarkerSignature,
}

impl EncodedSignature {
    fn error() -> Self {
        EncodedSignature {
            grouping_key: GroupingKey::error(),
            marker: MarkerSignature("extension(<error>)".to_owned()),
        }
    }
}

/// Encode an extension block.
///
/// Blocks without exactly one receiver, or whose receiver failed to bind,
/// get the error key.
pub fn encode_block(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    block: &ExtensionBlockDecl,
) -> EncodedSignature {
    match block.receiver() {
        Some(receiver) => encode_receiver(pool, registry, interner, receiver, &block.type_params),
        None => EncodedSignature::error(),
    }
}

/// Encode a receiver together with the type parameters it may mention.
pub fn encode_receiver(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    receiver: &ReceiverDescriptor,
    type_params: &[TypeParamDecl],
) -> EncodedSignature {
    if pool.contains_error(receiver.ty) {
        return EncodedSignature::error();
    }
    let encoded = EncodedSignature {
        grouping_key: grouping::grouping_key(pool, registry, interner, receiver, type_params),
        marker: marker::marker_signature(pool, registry, interner, receiver, type_params),
    };
    tracing::trace!(key = %encoded.grouping_key, marker = %encoded.marker, "encoded receiver");
    encoded
}

/// Grouping key of a bare receiver shape, ignoring constraints.
///
/// Documentation cross-references cannot spell constraints, so they match
/// containers on this weaker key.
pub fn shape_key(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    ref_kind: RefKind,
    ty: Idx,
    arity: usize,
) -> GroupingKey {
    if pool.contains_error(ty) {
        return GroupingKey::error();
    }
    GroupingKey(grouping::receiver_part(pool, registry, interner, ref_kind, ty, arity).into())
}

/// The error marker, for containers whose receiver could not be decoded.
pub fn error_signature() -> EncodedSignature {
    EncodedSignature::error()
}
