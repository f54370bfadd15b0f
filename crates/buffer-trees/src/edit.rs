//! Text mutation descriptors.
//!
//! Two formats exist:
//!
//! - [`TextChange`]: what an editor reports, in **character** offsets (Unicode scalar values),
//!   carrying the exact deleted and inserted text.
//! - [`Edit`]: what an incremental parser consumes, in **bytes** plus `(row, byte column)`
//!   points, measured against the text before (`old_end_*`) and after (`new_end_*`) the change.
//!
//! [`Edit::from_change`] converts the former into the latter against the pre-change source.

use crate::range::{ByteRange, Point};
use crate::source_index::SourceIndex;
use thiserror::Error;

/// Reasons an [`Edit`] or [`TextChange`] cannot be applied to a source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// `start` is past `old_end` or `new_end`.
    #[error("edit start {start} is past old end {old_end} or new end {new_end}")]
    Inverted {
        /// Start byte.
        start: usize,
        /// Old end byte.
        old_end: usize,
        /// New end byte.
        new_end: usize,
    },
    /// The replaced range does not fit in the pre-edit source.
    #[error("edit range {range} exceeds source length {source_len}")]
    OutOfRange {
        /// Replaced byte range in the pre-edit source.
        range: ByteRange,
        /// Pre-edit source length.
        source_len: usize,
    },
    /// The post-edit length implied by the edit disagrees with the new source.
    #[error("edit implies a new length of {expected} bytes but the new source has {actual}")]
    LengthMismatch {
        /// Length implied by the edit.
        expected: usize,
        /// Length of the new source.
        actual: usize,
    },
    /// The text a change claims to delete is not what the source holds.
    #[error("deleted text does not match the source at character {start}")]
    DeletedTextMismatch {
        /// Character offset of the change.
        start: usize,
    },
}

/// One text mutation in parser coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit {
    /// First byte touched by the edit.
    pub start_byte: usize,
    /// End of the replaced bytes, in the pre-edit source.
    pub old_end_byte: usize,
    /// End of the inserted bytes, in the post-edit source.
    pub new_end_byte: usize,
    /// Point of `start_byte`.
    pub start_point: Point,
    /// Point of `old_end_byte` in the pre-edit source.
    pub old_end_point: Point,
    /// Point of `new_end_byte` in the post-edit source.
    pub new_end_point: Point,
}

impl Edit {
    /// Build the edit that replaces `old_end - start` bytes at `start` in `before` with
    /// `inserted`.
    pub fn replace(
        before: &str,
        start_byte: usize,
        old_end_byte: usize,
        inserted: &str,
    ) -> Result<Self, EditError> {
        if start_byte > old_end_byte || old_end_byte > before.len() {
            return Err(EditError::OutOfRange {
                range: ByteRange::new(start_byte, old_end_byte),
                source_len: before.len(),
            });
        }

        let start_point = crate::range::point_at(before, start_byte);
        let old_end_point = crate::range::point_at(before, old_end_byte);
        Ok(Self {
            start_byte,
            old_end_byte,
            new_end_byte: start_byte + inserted.len(),
            start_point,
            old_end_point,
            new_end_point: start_point.advance(inserted),
        })
    }

    /// Build the edit for inserting `inserted` at byte `at` of `before`.
    pub fn insert(before: &str, at: usize, inserted: &str) -> Result<Self, EditError> {
        Self::replace(before, at, at, inserted)
    }

    /// Build the edit for deleting `range` from `before`.
    pub fn delete(before: &str, range: ByteRange) -> Result<Self, EditError> {
        Self::replace(before, range.start, range.end, "")
    }

    /// Convert an editor change (character offsets) into parser coordinates.
    ///
    /// `index` must describe the source as it is *before* `change` is applied.
    pub fn from_change(index: &SourceIndex, change: &TextChange) -> Result<Self, EditError> {
        let start_byte = index.char_to_byte(change.start);
        let old_end_byte = start_byte + change.deleted_text.len();
        if change.start > index.char_count() || old_end_byte > index.byte_count() {
            return Err(EditError::OutOfRange {
                range: ByteRange::new(start_byte, old_end_byte),
                source_len: index.byte_count(),
            });
        }

        if index.byte_slice(start_byte, old_end_byte).as_deref()
            != Some(change.deleted_text.as_str())
        {
            return Err(EditError::DeletedTextMismatch {
                start: change.start,
            });
        }

        let start_point = index.byte_to_point(start_byte);
        Ok(Self {
            start_byte,
            old_end_byte,
            new_end_byte: start_byte + change.inserted_text.len(),
            start_point,
            old_end_point: start_point.advance(&change.deleted_text),
            new_end_point: start_point.advance(&change.inserted_text),
        })
    }

    /// The replaced range in the pre-edit source.
    pub fn old_range(&self) -> ByteRange {
        ByteRange::new(self.start_byte, self.old_end_byte)
    }

    /// The inserted range in the post-edit source.
    pub fn new_range(&self) -> ByteRange {
        ByteRange::new(self.start_byte, self.new_end_byte)
    }

    /// Returns `true` if the edit replaces nothing with nothing.
    pub fn is_noop(&self) -> bool {
        self.old_end_byte == self.start_byte && self.new_end_byte == self.start_byte
    }

    /// Source length after applying this edit to a source of `old_len` bytes.
    pub fn apply_to_len(&self, old_len: usize) -> usize {
        old_len - (self.old_end_byte - self.start_byte) + (self.new_end_byte - self.start_byte)
    }

    /// Check the edit against the pre-edit and post-edit source lengths.
    pub fn validate(&self, old_len: usize, new_len: usize) -> Result<(), EditError> {
        if self.start_byte > self.old_end_byte || self.start_byte > self.new_end_byte {
            return Err(EditError::Inverted {
                start: self.start_byte,
                old_end: self.old_end_byte,
                new_end: self.new_end_byte,
            });
        }
        if self.old_end_byte > old_len {
            return Err(EditError::OutOfRange {
                range: self.old_range(),
                source_len: old_len,
            });
        }

        let expected = self.apply_to_len(old_len);
        if expected != new_len {
            return Err(EditError::LengthMismatch {
                expected,
                actual: new_len,
            });
        }
        Ok(())
    }
}

/// A single editor change expressed in character offsets.
///
/// Semantics:
/// - `start` is a character offset in the document **at the time this change is applied**.
/// - The deleted range is defined by the length (in `char`s) of `deleted_text`.
/// - A sequence of changes must be applied **in order**.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    /// Start character offset.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl TextChange {
    /// A pure insertion.
    pub fn insert(start: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            deleted_text: String::new(),
            inserted_text: text.into(),
        }
    }

    /// A pure deletion of `deleted_text` at `start`.
    pub fn delete(start: usize, deleted_text: impl Into<String>) -> Self {
        Self {
            start,
            deleted_text: deleted_text.into(),
            inserted_text: String::new(),
        }
    }

    /// A replacement.
    pub fn replace(
        start: usize,
        deleted_text: impl Into<String>,
        inserted_text: impl Into<String>,
    ) -> Self {
        Self {
            start,
            deleted_text: deleted_text.into(),
            inserted_text: inserted_text.into(),
        }
    }

    /// Length of `deleted_text` in characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of `inserted_text` in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Apply this change to `index` in place.
    pub fn apply(&self, index: &mut SourceIndex) {
        index.delete(self.start, self.deleted_len());
        index.insert(self.start, &self.inserted_text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_edit_points() {
        let edit = Edit::insert("def f():", 5, "oo").unwrap();
        assert_eq!(edit.old_range(), ByteRange::new(5, 5));
        assert_eq!(edit.new_range(), ByteRange::new(5, 7));
        assert_eq!(edit.new_end_point, Point::new(0, 7));
        assert!(edit.validate(8, 10).is_ok());
    }

    #[test]
    fn test_multiline_replace_points() {
        let before = "a\nbcd\ne";
        let edit = Edit::replace(before, 3, 7, "X\nYZ").unwrap();
        assert_eq!(edit.start_point, Point::new(1, 1));
        assert_eq!(edit.old_end_point, Point::new(2, 1));
        assert_eq!(edit.new_end_point, Point::new(2, 2));
    }

    #[test]
    fn test_validate_rejects_inconsistent_lengths() {
        let edit = Edit::insert("abc", 1, "zz").unwrap();
        assert_eq!(
            edit.validate(3, 4),
            Err(EditError::LengthMismatch {
                expected: 5,
                actual: 4
            })
        );
        assert!(matches!(
            edit.validate(0, 2),
            Err(EditError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_edit() {
        let edit = Edit {
            start_byte: 4,
            old_end_byte: 2,
            new_end_byte: 6,
            start_point: Point::new(0, 4),
            old_end_point: Point::new(0, 2),
            new_end_point: Point::new(0, 6),
        };
        assert!(matches!(
            edit.validate(10, 14),
            Err(EditError::Inverted { .. })
        ));
    }

    #[test]
    fn test_from_change_uses_byte_offsets() {
        let index = SourceIndex::from_text("é = 1\n");
        let change = TextChange::replace(4, "1", "22");
        let edit = Edit::from_change(&index, &change).unwrap();
        assert_eq!(edit.start_byte, 5);
        assert_eq!(edit.old_end_byte, 6);
        assert_eq!(edit.new_end_byte, 7);
        assert_eq!(edit.start_point, Point::new(0, 5));
    }

    #[test]
    fn test_from_change_rejects_wrong_deleted_text() {
        let index = SourceIndex::from_text("abc");
        let change = TextChange::delete(1, "x");
        assert_eq!(
            Edit::from_change(&index, &change),
            Err(EditError::DeletedTextMismatch { start: 1 })
        );
    }

    #[test]
    fn test_text_change_apply() {
        let mut index = SourceIndex::from_text("hello world");
        TextChange::replace(6, "world", "there").apply(&mut index);
        assert_eq!(index.text(), "hello there");
    }
}
