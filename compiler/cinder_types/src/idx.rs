//! Unified type index handle.
//!
//! `Idx` is THE canonical type representation.
//! All types are stored in a unified pool and referenced by their 32-bit index.
//!
//! # Design
//!
//! - 32-bit indices, `Copy`, O(1) equality
//! - Predefined types have fixed indices (0-18) for O(1) lookup
//! - Everything else (named, generic, array, tuple, pointer) is interned

use std::fmt;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    // === Predefined Types (indices 0-18) ===
    // Pre-interned at pool creation, in keyword order.

    /// `object` (`System.Object`).
    pub const OBJECT: Self = Self(0);
    /// `string` (`System.String`).
    pub const STRING: Self = Self(1);
    /// `bool` (`System.Boolean`).
    pub const BOOL: Self = Self(2);
    /// `char` (`System.Char`).
    pub const CHAR: Self = Self(3);
    /// `sbyte` (`System.SByte`).
    pub const SBYTE: Self = Self(4);
    /// `byte` (`System.Byte`).
    pub const BYTE: Self = Self(5);
    /// `short` (`System.Int16`).
    pub const SHORT: Self = Self(6);
    /// `ushort` (`System.UInt16`).
    pub const USHORT: Self = Self(7);
    /// `int` (`System.Int32`).
    pub const INT: Self = Self(8);
    /// `uint` (`System.UInt32`).
    pub const UINT: Self = Self(9);
    /// `long` (`System.Int64`).
    pub const LONG: Self = Self(10);
    /// `ulong` (`System.UInt64`).
    pub const ULONG: Self = Self(11);
    /// `float` (`System.Single`).
    pub const FLOAT: Self = Self(12);
    /// `double` (`System.Double`).
    pub const DOUBLE: Self = Self(13);
    /// `decimal` (`System.Decimal`).
    pub const DECIMAL: Self = Self(14);
    /// `nint` (`System.IntPtr`).
    pub const NINT: Self = Self(15);
    /// `nuint` (`System.UIntPtr`).
    pub const NUINT: Self = Self(16);
    /// `void` (`System.Void`).
    pub const VOID: Self = Self(17);
    /// The error type (placeholder for bind errors, propagates silently).
    pub const ERROR: Self = Self(18);

    /// Number of pre-interned types.
    pub const PRIMITIVE_COUNT: u32 = 19;

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is a predefined type (pre-interned).
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT && self.0 != Self::ERROR.0
    }

    /// Check if this is the ERROR type.
    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }

    /// Language keyword for predefined types (`int`, `string`, ...).
    #[inline]
    pub const fn keyword(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("object"),
            1 => Some("string"),
            2 => Some("bool"),
            3 => Some("char"),
            4 => Some("sbyte"),
            5 => Some("byte"),
            6 => Some("short"),
            7 => Some("ushort"),
            8 => Some("int"),
            9 => Some("uint"),
            10 => Some("long"),
            11 => Some("ulong"),
            12 => Some("float"),
            13 => Some("double"),
            14 => Some("decimal"),
            15 => Some("nint"),
            16 => Some("nuint"),
            17 => Some("void"),
            _ => None,
        }
    }

    /// Fully qualified metadata name for predefined types.
    #[inline]
    pub const fn metadata_name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("System.Object"),
            1 => Some("System.String"),
            2 => Some("System.Boolean"),
            3 => Some("System.Char"),
            4 => Some("System.SByte"),
            5 => Some("System.Byte"),
            6 => Some("System.Int16"),
            7 => Some("System.UInt16"),
            8 => Some("System.Int32"),
            9 => Some("System.UInt32"),
            10 => Some("System.Int64"),
            11 => Some("System.UInt64"),
            12 => Some("System.Single"),
            13 => Some("System.Double"),
            14 => Some("System.Decimal"),
            15 => Some("System.IntPtr"),
            16 => Some("System.UIntPtr"),
            17 => Some("System.Void"),
            _ => None,
        }
    }

    /// Look a predefined type up by its metadata name.
    pub fn from_metadata_name(name: &str) -> Option<Self> {
        (0..Self::PRIMITIVE_COUNT)
            .map(Self)
            .find(|idx| idx.metadata_name() == Some(name))
    }

    /// Look a predefined type up by its keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        (0..Self::PRIMITIVE_COUNT)
            .map(Self)
            .find(|idx| idx.keyword() == Some(keyword))
    }

    /// Predefined value types (everything except `object`, `string`, `void`).
    #[inline]
    pub const fn is_primitive_value_type(self) -> bool {
        self.0 >= Self::BOOL.0 && self.0 <= Self::NUINT.0
    }

    /// Integral predefined types, including `char`.
    #[inline]
    pub const fn is_integral(self) -> bool {
        (self.0 >= Self::CHAR.0 && self.0 <= Self::ULONG.0)
            || self.0 == Self::NINT.0
            || self.0 == Self::NUINT.0
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keyword() {
            Some(kw) => write!(f, "Idx::{kw}"),
            None if self.is_error() => write!(f, "Idx::ERROR"),
            None => write!(f, "Idx({})", self.0),
        }
    }
}

impl fmt::Display for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keyword() {
            Some(kw) => f.write_str(kw),
            None if self.is_error() => f.write_str("<error>"),
            None => write!(f, "type#{}", self.0),
        }
    }
}

// Idx must be exactly 4 bytes
const _: () = assert!(std::mem::size_of::<Idx>() == 4);
