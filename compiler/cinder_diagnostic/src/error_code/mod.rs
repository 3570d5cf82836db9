//! Error codes for extension-member diagnostics.
//!
//! Each error code is a unique identifier (e.g., `E3001`) with the second
//! digit indicating the stage that reports it.

use std::fmt;

/// Error codes for extension-member diagnostics.
///
/// Format: E#### where the second digit indicates the stage:
/// - E30xx: Extension block declaration shape
/// - E31xx: Extension member resolution and lowering
/// - E32xx: Documentation cross-references (warnings)
/// - E33xx: Imported metadata
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ErrorCode {
    // Declaration shape (E30xx)
    /// Extension block has no receiver parameter
    E3001,
    /// Extension block has more than one receiver parameter
    E3002,
    /// Receiver type cannot be extended
    E3003,
    /// `ref` receiver on a type not known to be a value type
    E3004,
    /// `in` or `ref readonly` receiver on a type parameter
    E3005,
    /// Block type parameter not referenced by the receiver
    E3006,
    /// Member kind not allowed in an extension block
    E3007,
    /// Receiver parameter has a default value
    E3008,
    /// Instance member requires a named receiver
    E3009,
    /// Extension blocks must be declared in a non-generic, top-level static class
    E3010,

    // Resolution (E31xx)
    /// No member with this name exists
    E3101,
    /// Members exist but none applies to the receiver
    E3102,
    /// Call is ambiguous between extension members
    E3103,
    /// Member is not supported by this compiler
    E3104,
    /// Receiver expression is not assignable
    E3105,

    // Documentation cross-references (E32xx)
    /// Cross-reference could not be resolved
    E3201,
    /// Cross-reference is malformed
    E3202,
    /// Cross-reference matches more than one member
    E3203,

    // Metadata (E33xx)
    /// Referenced metadata could not be decoded
    E3301,
}

impl ErrorCode {
    /// All defined error codes.
    pub const ALL: &[ErrorCode] = &[
        ErrorCode::E3001,
        ErrorCode::E3002,
        ErrorCode::E3003,
        ErrorCode::E3004,
        ErrorCode::E3005,
        ErrorCode::E3006,
        ErrorCode::E3007,
        ErrorCode::E3008,
        ErrorCode::E3009,
        ErrorCode::E3010,
        ErrorCode::E3101,
        ErrorCode::E3102,
        ErrorCode::E3103,
        ErrorCode::E3104,
        ErrorCode::E3105,
        ErrorCode::E3201,
        ErrorCode::E3202,
        ErrorCode::E3203,
        ErrorCode::E3301,
    ];

    /// Get the error code as a string (e.g., `"E3001"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E3006 => "E3006",
            ErrorCode::E3007 => "E3007",
            ErrorCode::E3008 => "E3008",
            ErrorCode::E3009 => "E3009",
            ErrorCode::E3010 => "E3010",
            ErrorCode::E3101 => "E3101",
            ErrorCode::E3102 => "E3102",
            ErrorCode::E3103 => "E3103",
            ErrorCode::E3104 => "E3104",
            ErrorCode::E3105 => "E3105",
            ErrorCode::E3201 => "E3201",
            ErrorCode::E3202 => "E3202",
            ErrorCode::E3203 => "E3203",
            ErrorCode::E3301 => "E3301",
        }
    }

    /// Short human-readable description of the code.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E3001 => "extension block has no receiver parameter",
            ErrorCode::E3002 => "extension block has more than one receiver parameter",
            ErrorCode::E3003 => "receiver type cannot be extended",
            ErrorCode::E3004 => "`ref` receiver must be a value type",
            ErrorCode::E3005 => "`in` or `ref readonly` receiver cannot be a type parameter",
            ErrorCode::E3006 => "type parameter is not referenced by the receiver",
            ErrorCode::E3007 => "member kind is not allowed in an extension block",
            ErrorCode::E3008 => "receiver parameter cannot have a default value",
            ErrorCode::E3009 => "instance member requires a named receiver",
            ErrorCode::E3010 => "invalid declaring type for extension blocks",
            ErrorCode::E3101 => "member not found",
            ErrorCode::E3102 => "no applicable member",
            ErrorCode::E3103 => "ambiguous member",
            ErrorCode::E3104 => "member is not supported",
            ErrorCode::E3105 => "receiver is not assignable",
            ErrorCode::E3201 => "unresolved cross-reference",
            ErrorCode::E3202 => "malformed cross-reference",
            ErrorCode::E3203 => "ambiguous cross-reference",
            ErrorCode::E3301 => "invalid metadata",
        }
    }

    /// Check if this is a declaration-shape error (E30xx range).
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E3001
                | ErrorCode::E3002
                | ErrorCode::E3003
                | ErrorCode::E3004
                | ErrorCode::E3005
                | ErrorCode::E3006
                | ErrorCode::E3007
                | ErrorCode::E3008
                | ErrorCode::E3009
                | ErrorCode::E3010
        )
    }

    /// Check if this is a resolution error (E31xx range).
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E3101
                | ErrorCode::E3102
                | ErrorCode::E3103
                | ErrorCode::E3104
                | ErrorCode::E3105
        )
    }

    /// Check if this is a cross-reference warning code (E32xx range).
    pub fn is_cref_warning(&self) -> bool {
        matches!(self, ErrorCode::E3201 | ErrorCode::E3202 | ErrorCode::E3203)
    }

    /// Check if this is a metadata error (E33xx range).
    pub fn is_metadata_error(&self) -> bool {
        matches!(self, ErrorCode::E3301)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an error code string like `"E3101"`.
///
/// Case-insensitive. Derived from [`ErrorCode::ALL`] and [`ErrorCode::as_str()`].
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or(())
    }
}
