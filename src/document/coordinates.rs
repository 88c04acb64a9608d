//! Conversion between byte offsets, LSP positions and tree-sitter points.
//!
//! LSP counts columns in UTF-16 code units while tree-sitter works in bytes;
//! every position that crosses that boundary goes through [`PositionMapper`].

use tower_lsp_server::ls_types::Position;
use tree_sitter::Point;

use crate::domain::{SourcePos, SourceRange};

/// Position mapper for a single text buffer with pre-computed line starts.
pub struct PositionMapper<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> PositionMapper<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = compute_line_starts(text);
        Self { text, line_starts }
    }

    fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = match self.line_starts.get(line + 1) {
            Some(next) => next - 1, // exclude the newline
            None => self.text.len(),
        };
        Some((start, end.max(start)))
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Characters past the end of the line clamp to the line end.
    pub fn position_to_byte(&self, position: Position) -> Option<usize> {
        let (line_start, line_end) = self.line_bounds(position.line as usize)?;
        let line_text = &self.text[line_start..line_end];

        match convert_utf16_to_byte_in_line(line_text, position.character as usize) {
            Some(byte_offset) => Some(line_start + byte_offset),
            None => Some(line_end),
        }
    }

    /// Convert an LSP position to a tree-sitter point (byte column).
    pub fn position_to_point(&self, position: Position) -> Option<Point> {
        let byte = self.position_to_byte(position)?;
        let line_start = self.line_starts[position.line as usize];
        Some(Point::new(position.line as usize, byte - line_start))
    }

    /// Convert a byte offset to a document position.
    ///
    /// Offsets inside a multi-byte character snap back to its first byte.
    pub fn source_pos(&self, offset: usize) -> Option<SourcePos> {
        if offset > self.text.len() {
            return None;
        }

        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let (line_start, line_end) = self.line_bounds(line)?;
        let line_text = &self.text[line_start..line_end];

        let mut byte_in_line = (offset - line_start).min(line_text.len());
        while !line_text.is_char_boundary(byte_in_line) {
            byte_in_line -= 1;
        }
        let column = convert_byte_to_utf16_in_line(line_text, byte_in_line)?;

        Some(SourcePos::new(
            line as u32,
            column as u32,
            line_start + byte_in_line,
        ))
    }

    /// Convert a byte span to a document range.
    pub fn source_range(&self, start: usize, end: usize) -> Option<SourceRange> {
        Some(SourceRange::new(
            self.source_pos(start)?,
            self.source_pos(end)?,
        ))
    }
}

/// Compute line start offsets for efficient position mapping
pub fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    line_starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx + 1),
    );
    line_starts
}

/// Convert UTF-16 position to byte position within a line
/// Returns None if the UTF-16 position is beyond the line end
#[inline(always)]
pub fn convert_utf16_to_byte_in_line(line_text: &str, utf16_pos: usize) -> Option<usize> {
    let mut byte_offset = 0;
    let mut utf16_offset = 0;

    for ch in line_text.chars() {
        if utf16_offset >= utf16_pos {
            return Some(byte_offset);
        }
        utf16_offset += ch.len_utf16();
        byte_offset += ch.len_utf8();
    }

    (utf16_offset == utf16_pos).then_some(byte_offset)
}

/// Convert byte position to UTF-16 position within a line
/// Returns None if the byte position is not on a character boundary
#[inline(always)]
pub fn convert_byte_to_utf16_in_line(line_text: &str, byte_pos: usize) -> Option<usize> {
    if byte_pos > line_text.len() || !line_text.is_char_boundary(byte_pos) {
        return None;
    }
    Some(line_text[..byte_pos].encode_utf16().count())
}
