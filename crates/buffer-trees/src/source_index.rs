//! Rope-backed coordinate conversion for one buffer's source text.
//!
//! Editors usually report changes in character offsets while incremental parsers want byte
//! offsets and `(row, byte column)` points. [`SourceIndex`] converts between the three in
//! `O(log N)` and can be updated in place while a sequence of changes is replayed.

use crate::range::Point;
use ropey::Rope;

/// Coordinate index over UTF-8 source text.
///
/// Rows break on `\n` only, matching the points produced by the parser.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    rope: Rope,
}

impl SourceIndex {
    /// Create an index over empty text.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Build an index from text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Total byte count.
    pub fn byte_count(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Total character count.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Total row count (an empty text has one row).
    pub fn row_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Byte offset of a character offset (clamped to the end of the text).
    pub fn char_to_byte(&self, char_offset: usize) -> usize {
        self.rope.char_to_byte(char_offset.min(self.rope.len_chars()))
    }

    /// Character offset of a byte offset (clamped, rounded down to a char boundary).
    pub fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.rope.byte_to_char(byte_offset.min(self.rope.len_bytes()))
    }

    /// Point of a byte offset.
    pub fn byte_to_point(&self, byte_offset: usize) -> Point {
        let byte_offset = byte_offset.min(self.rope.len_bytes());
        let row = self.rope.byte_to_line(byte_offset);
        let row_start = self.rope.line_to_byte(row);
        Point::new(row, byte_offset - row_start)
    }

    /// Point of a character offset.
    pub fn char_to_point(&self, char_offset: usize) -> Point {
        self.byte_to_point(self.char_to_byte(char_offset))
    }

    /// Byte offset of a point; columns past the end of the row clamp to the row end.
    pub fn point_to_byte(&self, point: Point) -> usize {
        if point.row >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }

        let row_start = self.rope.line_to_byte(point.row);
        let row_end = if point.row + 1 < self.rope.len_lines() {
            // Exclude the `\n` terminating this row.
            self.rope.line_to_byte(point.row + 1) - 1
        } else {
            self.rope.len_bytes()
        };

        row_start + point.column.min(row_end - row_start)
    }

    /// Insert text at a character offset.
    pub fn insert(&mut self, char_offset: usize, text: &str) {
        let char_offset = char_offset.min(self.rope.len_chars());
        self.rope.insert(char_offset, text);
    }

    /// Delete `len_chars` characters starting at a character offset.
    pub fn delete(&mut self, start_char: usize, len_chars: usize) {
        let start_char = start_char.min(self.rope.len_chars());
        let end_char = start_char.saturating_add(len_chars).min(self.rope.len_chars());

        if start_char < end_char {
            self.rope.remove(start_char..end_char);
        }
    }

    /// Text between two byte offsets, if both are in bounds and on char boundaries.
    pub fn byte_slice(&self, start: usize, end: usize) -> Option<String> {
        let slice = self.rope.get_byte_slice(start..end)?;
        Some(slice.to_string())
    }

    /// The complete text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}
