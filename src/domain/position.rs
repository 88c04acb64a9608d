use serde::{Deserialize, Serialize};
use tower_lsp_server::ls_types::{Position, Range};

/// A point in a source document.
///
/// `line` and `column` are 0-based, with `column` counted in UTF-16 code units
/// so the position maps onto LSP without further conversion. `byte` is the
/// 0-based byte offset into the document text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
    pub byte: usize,
}

impl SourcePos {
    pub const fn new(line: u32, column: u32, byte: usize) -> Self {
        Self { line, column, byte }
    }
}

impl From<SourcePos> for Position {
    fn from(pos: SourcePos) -> Self {
        Position::new(pos.line, pos.column)
    }
}

/// A span of source text.
///
/// Equality and hashing cover all six positional fields, so ranges can be used
/// directly as map keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourcePos,
    pub end: SourcePos,
}

impl SourceRange {
    pub const fn new(start: SourcePos, end: SourcePos) -> Self {
        Self { start, end }
    }

    /// Zero-width range.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the byte span of `other` lies within this range.
    pub fn contains(&self, other: &SourceRange) -> bool {
        self.start.byte <= other.start.byte && other.end.byte <= self.end.byte
    }

    /// Anchor point inside the range.
    ///
    /// Single-line ranges are centred: column and byte advance by half the
    /// column width, rounded down. Multi-line and zero-width ranges anchor at
    /// their start.
    pub fn midpoint(&self) -> SourcePos {
        let mut pos = self.start;
        if self.start.line == self.end.line && self.end.column > self.start.column {
            let half = (self.end.column - self.start.column) / 2;
            pos.column += half;
            pos.byte += half as usize;
        }
        pos
    }
}

impl From<SourceRange> for Range {
    fn from(range: SourceRange) -> Self {
        Range::new(range.start.into(), range.end.into())
    }
}
