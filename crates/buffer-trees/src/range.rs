//! Byte-range and point geometry.
//!
//! All ranges in this crate are half-open byte intervals (`start..end`) into UTF-8 source text.
//! Points are `(row, column)` pairs where `column` counts bytes from the start of the row, which
//! is the coordinate system used by incremental parsers.

use std::fmt;
use std::ops::Range;

/// A half-open byte interval (`start..end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteRange {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl ByteRange {
    /// Create a new range.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width range at `offset` (a caret).
    pub const fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Length in bytes (`0` for inverted ranges).
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the range is zero-width.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns `true` if `start <= end`.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Returns `true` if `other` lies entirely inside `self` (boundaries included).
    pub fn contains(&self, other: ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if `offset` lies inside `self`, treating both ends as inclusive.
    ///
    /// This is the containment test used for carets: a caret sitting right after the last byte
    /// of a node is still "in" that node.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Returns `true` if the ranges share at least one byte.
    pub fn overlaps(&self, other: ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns `true` if `self` is strictly larger than `other` and contains it.
    pub fn strictly_contains(&self, other: ByteRange) -> bool {
        self.contains(other) && self.len() > other.len()
    }

    /// Convert to a `Range<usize>` for slicing.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for ByteRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<ByteRange> for Range<usize> {
    fn from(range: ByteRange) -> Self {
        range.start..range.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A `(row, column)` position; `column` is a byte offset within the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based byte column.
    pub column: usize,
}

impl Point {
    /// Create a new point.
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// The point reached after writing `text` starting at `self`.
    pub fn advance(mut self, text: &str) -> Self {
        let mut parts = text.split('\n');
        let Some(first) = parts.next() else {
            return self;
        };

        self.column = self.column.saturating_add(first.len());
        for part in parts {
            self.row = self.row.saturating_add(1);
            self.column = part.len();
        }

        self
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Point of byte `offset` in `text`, computed by a linear scan.
///
/// Offsets past the end clamp to the end of `text`. For repeated conversions over the same text
/// prefer [`crate::SourceIndex`].
pub fn point_at(text: &str, offset: usize) -> Point {
    let offset = offset.min(text.len());
    let prefix = &text.as_bytes()[..offset];
    let row = prefix.iter().filter(|b| **b == b'\n').count();
    let line_start = prefix
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |idx| idx + 1);
    Point::new(row, offset - line_start)
}
