//! Editor-facing positions and the line index that maps them to byte offsets.

use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A zero-based line/column position.
///
/// Columns count characters (Unicode scalar values), not bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Zero-based line.
    pub line: u32,
    /// Zero-based character offset within the line.
    pub character: u32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.character + 1)
    }
}

/// A range between two positions (end exclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Start position (inclusive).
    pub start: Position,
    /// End position (exclusive).
    pub end: Position,
}

impl Range {
    /// Create a new range.
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `pos` lies in the range (end inclusive).
    #[must_use]
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// A line index for offset/position conversion.
///
/// Building the index is O(n) in the source length; lookups binary-search the
/// line table and then walk a single line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// The indexed text.
    text: Arc<str>,
    /// Byte offset of the start of each line (line 0 starts at 0).
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text, line_starts }
    }

    /// The indexed text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// A shared handle to the indexed text.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// Number of lines (an empty text has one line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of a line without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let line = line as usize;
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        let raw = &self.text[start..end];
        Some(raw.strip_suffix('\r').unwrap_or(raw))
    }

    /// Byte offset where `line` starts.
    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Convert a byte offset to a position, clamping to the text length.
    pub fn position_of(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }

        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let start = self.line_starts[line];
        let character = self.text[start..offset].chars().count();

        Position::new(line as u32, character as u32)
    }

    /// Convert a position to a byte offset.
    ///
    /// Returns `None` when the line does not exist or the column is past the
    /// end of the line.
    pub fn offset_of(&self, pos: Position) -> Option<usize> {
        let start = self.line_start(pos.line)?;
        let line = self.line_text(pos.line)?;

        let mut chars = line.char_indices();
        let mut remaining = pos.character;
        loop {
            if remaining == 0 {
                return Some(start + chars.next().map_or(line.len(), |(i, _)| i));
            }
            chars.next()?;
            remaining -= 1;
        }
    }

    /// Convert a byte span to a range.
    pub fn range_of(&self, span: Span) -> Range {
        Range::new(self.position_of(span.start), self.position_of(span.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_of() {
        let index = LineIndex::new("line1\nline2\nline3");
        assert_eq!(index.position_of(0), Position::new(0, 0));
        assert_eq!(index.position_of(5), Position::new(0, 5));
        assert_eq!(index.position_of(6), Position::new(1, 0));
        assert_eq!(index.position_of(12), Position::new(2, 0));
        assert_eq!(index.position_of(1000), Position::new(2, 5));
    }

    #[test]
    fn test_offset_of() {
        let index = LineIndex::new("ab\ncde\n");
        assert_eq!(index.offset_of(Position::new(0, 0)), Some(0));
        assert_eq!(index.offset_of(Position::new(0, 2)), Some(2));
        assert_eq!(index.offset_of(Position::new(1, 3)), Some(6));
        assert_eq!(index.offset_of(Position::new(2, 0)), Some(7));
        assert_eq!(index.offset_of(Position::new(1, 4)), None);
        assert_eq!(index.offset_of(Position::new(5, 0)), None);
    }

    #[test]
    fn test_multibyte_columns() {
        let index = LineIndex::new("let é = 1");
        assert_eq!(index.position_of(6), Position::new(0, 5));
        assert_eq!(index.offset_of(Position::new(0, 5)), Some(6));
    }

    #[test]
    fn test_line_text_strips_terminators() {
        let index = LineIndex::new("first\r\nsecond\n");
        assert_eq!(index.line_text(0), Some("first"));
        assert_eq!(index.line_text(1), Some("second"));
        assert_eq!(index.line_text(2), Some(""));
        assert_eq!(index.line_text(3), None);
        assert_eq!(index.line_count(), 3);
    }
}
