//! Metadata writing, persistence and validated import.
//!
//! The writer lowers an [`ExtensionTable`](crate::ExtensionTable) into
//! name-based records; receiver details that metadata cannot spell
//! directly travel as well-known attributes and required modifiers. The
//! reader decodes records back into the type graph and treats nothing as
//! trusted: container-ness is re-derived from structure, and every
//! skeleton is cross-checked against its forwarder before it is usable.

mod cache;
mod error;
mod read;
mod records;
mod validate;
mod write;

use cinder_types::TypeParamOwner;

pub use cache::MetadataCache;
pub use error::MetadataError;
pub use read::{import_module, ImportedModule};
pub use records::{
    AccessRecord, AttributeRecord, ConstantRecord, ConstantValueRecord, ConstraintRecord,
    FnPtrParamRecord, GenericParamRecord, KindRecord, MetadataModule, MethodRecord,
    NamedArgRecord, ParamRecord, PropertyRecord, TypeDefRecord, TypeRecord, FORMAT_VERSION,
};
pub use write::write_module;

pub(crate) const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";
pub(crate) const INTEROP_SERVICES: &str = "System.Runtime.InteropServices";

/// Marks a type as declaring extensions.
pub(crate) const EXTENSION_ATTRIBUTE: &str = "ExtensionAttribute";
pub(crate) const NULLABLE_ATTRIBUTE: &str = "NullableAttribute";
pub(crate) const TUPLE_NAMES_ATTRIBUTE: &str = "TupleElementNamesAttribute";
pub(crate) const SCOPED_REF_ATTRIBUTE: &str = "ScopedRefAttribute";
pub(crate) const REQUIRES_LOCATION_ATTRIBUTE: &str = "RequiresLocationAttribute";
pub(crate) const IS_UNMANAGED_ATTRIBUTE: &str = "IsUnmanagedAttribute";
pub(crate) const PRIORITY_ATTRIBUTE: &str = "OverloadResolutionPriorityAttribute";
/// `in` parameters and `ref readonly` returns, as a required modifier.
pub(crate) const IN_ATTRIBUTE: &str = "InAttribute";

/// Nullable annotation bytes.
pub(crate) const NOT_ANNOTATED: u8 = 1;
pub(crate) const ANNOTATED: u8 = 2;

pub(crate) fn compiler_services(name: &str) -> TypeRecord {
    TypeRecord::class(COMPILER_SERVICES, name)
}

pub(crate) fn in_modifier() -> TypeRecord {
    TypeRecord::class(INTEROP_SERVICES, IN_ATTRIBUTE)
}

pub(crate) fn full_name(name: &str) -> String {
    format!("{COMPILER_SERVICES}.{name}")
}

/// Attributes the writer synthesizes; never surfaced as user attributes.
pub(crate) fn is_synthesized_attribute(attr: &AttributeRecord) -> bool {
    [
        NULLABLE_ATTRIBUTE,
        TUPLE_NAMES_ATTRIBUTE,
        SCOPED_REF_ATTRIBUTE,
        REQUIRES_LOCATION_ATTRIBUTE,
        IS_UNMANAGED_ATTRIBUTE,
        PRIORITY_ATTRIBUTE,
        EXTENSION_ATTRIBUTE,
    ]
    .iter()
    .any(|name| attr.is(&full_name(name)))
}

/// How type parameter references are numbered in a given record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ParamSpace {
    /// Ordinary types and methods: `!i` type, `!!j` method.
    Plain,
    /// Container and its members: `!i` block, `!!j` member.
    Container,
    /// Forwarders on the declaring type: `!!i` block, `!!(arity + j)` member.
    Forwarder { block_arity: u32 },
}

impl ParamSpace {
    /// `(is_method_param, ordinal)` for a reference.
    pub(crate) fn encode(self, owner: TypeParamOwner, ordinal: u32) -> (bool, u32) {
        match (self, owner) {
            (_, TypeParamOwner::Type) => (false, ordinal),
            (ParamSpace::Forwarder { .. }, TypeParamOwner::Block) => (true, ordinal),
            (ParamSpace::Forwarder { block_arity }, TypeParamOwner::Method) => {
                (true, block_arity + ordinal)
            }
            (_, TypeParamOwner::Block) => (false, ordinal),
            (_, TypeParamOwner::Method) => (true, ordinal),
        }
    }

    pub(crate) fn decode(self, method: bool, ordinal: u32) -> (TypeParamOwner, u32) {
        match (self, method) {
            (ParamSpace::Plain, false) => (TypeParamOwner::Type, ordinal),
            (ParamSpace::Container, false) => (TypeParamOwner::Block, ordinal),
            (ParamSpace::Forwarder { .. }, false) => (TypeParamOwner::Type, ordinal),
            (ParamSpace::Forwarder { block_arity }, true) if ordinal < block_arity => {
                (TypeParamOwner::Block, ordinal)
            }
            (ParamSpace::Forwarder { block_arity }, true) => {
                (TypeParamOwner::Method, ordinal - block_arity)
            }
            (_, true) => (TypeParamOwner::Method, ordinal),
        }
    }
}
