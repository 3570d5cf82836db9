//! Persistence errors.

use thiserror::Error;

/// Failure to turn bytes into a [`super::MetadataModule`] or back.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not a metadata module (bad magic)")]
    BadMagic,
    #[error("metadata module is truncated")]
    Truncated,
    #[error("metadata format version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("failed to decode metadata: {0}")]
    Decode(#[from] bincode::Error),
    #[error("failed to encode metadata")]
    Encode(#[source] bincode::Error),
}

/// A record that does not describe a valid type.
#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("unknown primitive type `{0}`")]
    UnknownPrimitive(String),
    #[error("type parameter !{0} is out of range")]
    TypeParamOutOfRange(u32),
    #[error("method type parameter !!{0} is out of range")]
    MethodParamOutOfRange(u32),
    #[error("named type reference has no name")]
    EmptyPath,
}
