//! Source location spans.
//!
//! `Span` is a compact byte range within one file. `SourceLoc` pairs a span
//! with its `FileId` and is totally ordered, which is what deterministic
//! passes sort on.

use std::fmt;

/// Error when creating a span from a range that exceeds `u32::MAX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanError {
    /// Span start position exceeds `u32::MAX`.
    StartTooLarge(usize),
    /// Span end position exceeds `u32::MAX`.
    EndTooLarge(usize),
}

impl std::fmt::Display for SpanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanError::StartTooLarge(v) => write!(f, "span start {v} exceeds u32::MAX"),
            SpanError::EndTooLarge(v) => write!(f, "span end {v} exceeds u32::MAX"),
        }
    }
}

impl std::error::Error for SpanError {}

/// Source location span.
///
/// Layout: 8 bytes total
/// - start: u32 - byte offset from file start
/// - end: u32 - byte offset (exclusive)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
#[repr(C)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Dummy span for generated code.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    /// Create a new span.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Try to create a span from a byte range.
    #[inline]
    pub fn try_from_range(range: std::ops::Range<usize>) -> Result<Self, SpanError> {
        let start =
            u32::try_from(range.start).map_err(|_| SpanError::StartTooLarge(range.start))?;
        let end = u32::try_from(range.end).map_err(|_| SpanError::EndTooLarge(range.end))?;
        Ok(Span { start, end })
    }

    /// Length of the span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans to create one covering both.
    #[inline]
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Identifies one source file in a compilation.
///
/// Assigned by the driver in a stable order (command-line order), so
/// comparing `FileId`s is meaningful for reproducible output.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct FileId(pub u32);

/// A position in the whole compilation: file, then byte range.
///
/// Derived `Ord` compares file first, then span start, then span end,
/// which is exactly "declaration order" across a multi-file compilation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord, Debug)]
pub struct SourceLoc {
    pub file: FileId,
    pub span: Span,
}

impl SourceLoc {
    /// Location used for compiler-synthesized and imported symbols.
    pub const SYNTHESIZED: SourceLoc = SourceLoc {
        file: FileId(u32::MAX),
        span: Span::DUMMY,
    };

    /// Create a location.
    #[inline]
    pub const fn new(file: FileId, span: Span) -> Self {
        SourceLoc { file, span }
    }
}

// Size assertions to prevent accidental regressions
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{SourceLoc, Span};
    crate::static_assert_size!(Span, 8);
    crate::static_assert_size!(SourceLoc, 12);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basic() {
        let span = Span::new(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
    }

    #[test]
    fn span_merge() {
        let merged = Span::new(10, 20).merge(Span::new(15, 30));
        assert_eq!(merged, Span::new(10, 30));
    }

    #[test]
    fn span_try_from_range_rejects_overflow() {
        let too_big = (u32::MAX as usize) + 1;
        assert_eq!(
            Span::try_from_range(0..too_big),
            Err(SpanError::EndTooLarge(too_big))
        );
    }

    #[test]
    fn source_loc_orders_by_file_then_offset() {
        let a = SourceLoc::new(FileId(0), Span::new(50, 60));
        let b = SourceLoc::new(FileId(1), Span::new(0, 10));
        let c = SourceLoc::new(FileId(1), Span::new(20, 30));
        let mut locs = vec![c, a, b];
        locs.sort();
        assert_eq!(locs, vec![a, b, c]);
    }
}
