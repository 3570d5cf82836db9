//! Interned identifiers.
//!
//! Every identifier the extension pipeline touches (type names, member
//! names, namespaces, calling conventions) is interned once and handled as
//! a `Name` afterwards.

use std::fmt;

const SHARD_BITS: u32 = 4;
const LOCAL_BITS: u32 = u32::BITS - SHARD_BITS;

/// An interned string, packed as `shard:4 | local:28`.
///
/// Two names are equal exactly when they were interned from equal text by
/// the same interner. `Ord` follows interning order, not text, so anything
/// that must sort by spelling sorts looked-up strings.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The empty string, pre-interned in shard 0. Stands for "no name" on
    /// unnamed receivers and parameters.
    pub const EMPTY: Name = Name(0);

    /// Largest index a shard can hand out.
    pub const MAX_LOCAL: u32 = (1 << LOCAL_BITS) - 1;

    pub const NUM_SHARDS: usize = 1 << SHARD_BITS;

    #[inline]
    pub(crate) const fn new(shard: u32, local: u32) -> Self {
        debug_assert!(shard < (1 << SHARD_BITS));
        debug_assert!(local <= Self::MAX_LOCAL);
        Name((shard << LOCAL_BITS) | local)
    }

    #[inline]
    pub(crate) const fn shard(self) -> usize {
        (self.0 >> LOCAL_BITS) as usize
    }

    #[inline]
    pub(crate) const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Name(<empty>)")
        } else {
            write!(f, "Name({}:{})", self.shard(), self.local())
        }
    }
}

#[cfg(test)]
mod tests;
