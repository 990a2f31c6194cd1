//! JSON-safe preview projection.

use crate::models::{Cell, Preview, PreviewRow, Table, NULL_MARKER};

/// Projects the first `limit` rows of `table` to text.
///
/// Missing cells, NaN and ±infinity render as `NULL`; every other value is
/// rendered as text, so the preview serializes without special floats.
/// `total_rows` always reports the full table.
pub fn project(table: &Table, limit: usize) -> Preview {
    let columns = table.columns().to_vec();
    let rows = table
        .rows()
        .iter()
        .take(limit)
        .map(|row| {
            PreviewRow(
                columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(json_safe))
                    .collect(),
            )
        })
        .collect();

    Preview {
        columns,
        total_rows: table.row_count(),
        rows,
    }
}

fn json_safe(cell: &Cell) -> String {
    if cell.is_missing() {
        NULL_MARKER.to_string()
    } else {
        // non-finite numbers render as NULL too
        cell.render()
    }
}
