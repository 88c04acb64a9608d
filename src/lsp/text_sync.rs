//! didChange handling: applies LSP content changes and builds the
//! tree-sitter `InputEdit`s needed to reparse incrementally.

use tower_lsp_server::ls_types::{Range, TextDocumentContentChangeEvent};
use tree_sitter::{InputEdit, Point};

use crate::document::PositionMapper;

/// Apply content changes in order, returning the new text and the edits to
/// replay on the old tree.
///
/// A full-document change discards every edit collected before it; an empty
/// edit list tells the caller to parse from scratch.
pub(crate) fn apply_content_changes_with_edits(
    old_text: &str,
    content_changes: Vec<TextDocumentContentChangeEvent>,
) -> (String, Vec<InputEdit>) {
    let mut text = old_text.to_string();
    let mut edits = Vec::new();

    for change in content_changes {
        match change.range {
            Some(range) => {
                let edit = input_edit(&text, range, &change.text);
                text.replace_range(edit.start_byte..edit.old_end_byte, &change.text);
                edits.push(edit);
            }
            None => {
                text = change.text;
                edits.clear();
            }
        }
    }

    (text, edits)
}

fn input_edit(text: &str, range: Range, new_text: &str) -> InputEdit {
    let mapper = PositionMapper::new(text);
    let start_byte = mapper.position_to_byte(range.start).unwrap_or(text.len());
    let old_end_byte = mapper
        .position_to_byte(range.end)
        .unwrap_or(text.len())
        .max(start_byte);

    let start_position = mapper
        .position_to_point(range.start)
        .unwrap_or(Point::new(range.start.line as usize, 0));
    let old_end_position = mapper
        .position_to_point(range.end)
        .unwrap_or(Point::new(range.end.line as usize, 0));

    InputEdit {
        start_byte,
        old_end_byte,
        new_end_byte: start_byte + new_text.len(),
        start_position,
        old_end_position,
        new_end_position: end_point_after_insert(start_position, new_text),
    }
}

/// Point reached after inserting `inserted` at `start`; columns are bytes
fn end_point_after_insert(start: Point, inserted: &str) -> Point {
    match inserted.rfind('\n') {
        Some(last_newline) => Point::new(
            start.row + inserted.matches('\n').count(),
            inserted.len() - last_newline - 1,
        ),
        None => Point::new(start.row, start.column + inserted.len()),
    }
}
