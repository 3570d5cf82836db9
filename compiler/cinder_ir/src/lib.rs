//! Cinder IR - shared identifiers and source locations.
//!
//! This crate contains the leaf data structures every other Cinder crate
//! builds on:
//! - `Name` for interned identifiers, backed by a sharded `StringInterner`
//! - `Span` for byte ranges within one file
//! - `FileId` and `SourceLoc` for totally ordered positions across files
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → Name(u32)
//! - **Order Everything**: source positions compare deterministically so that
//!   passes which must be reproducible (container ordinals, diagnostic order)
//!   never depend on hash or thread scheduling order.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod interner;
mod name;
mod span;

pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use name::Name;
pub use span::{FileId, SourceLoc, Span, SpanError};
