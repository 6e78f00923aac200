//! Plain-text rendering of sheets and documents.
//!
//! Output is meant for a monospace view: every cell is right-padded to the
//! width of its column and cells are joined with [`COLUMN_SEPARATOR`].

use rayon::prelude::*;

use super::column_widths::ColumnWidths;
use super::sheet::{ParsedDocument, Sheet};
use crate::util::{pad_to_width, WidthMode};

pub const COLUMN_SEPARATOR: &str = "  |  ";

/// Sheets with more rows than this are aligned on the rayon pool
const PARALLEL_SHEET_ROWS: usize = 5_000;

/// Render one sheet as an aligned text block with no trailing newline.
pub fn align(sheet: &Sheet, mode: WidthMode) -> String {
    if sheet.rows.is_empty() {
        return String::new();
    }

    let cells: Vec<Vec<String>> = sheet
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.stringify()).collect())
        .collect();

    let widths = ColumnWidths::compute(&cells, mode);

    cells
        .iter()
        .map(|row| render_row(row, &widths, mode))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Row is only as wide as its own data; missing trailing cells are not emitted.
fn render_row(row: &[String], widths: &ColumnWidths, mode: WidthMode) -> String {
    row.iter()
        .enumerate()
        .map(|(col, s)| pad_to_width(s, widths.get(col), mode))
        .collect::<Vec<_>>()
        .join(COLUMN_SEPARATOR)
}

/// Header line label for a sheet; unnamed sheets get their 1-based ordinal.
pub fn sheet_label(sheet: &Sheet, index: usize) -> String {
    match sheet.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => format!("Sheet {}", index + 1),
    }
}

/// Combine every sheet of a document into one text block.
///
/// A single sheet renders exactly as [`align`]. With several sheets each block is
/// preceded by `=== Sheet: <name> ===` surrounded by blank lines, and consecutive
/// blocks are separated by one blank line.
pub fn aggregate(document: &ParsedDocument, mode: WidthMode) -> String {
    let sheets = document.sheets();

    let blocks: Vec<String> = if sheets.iter().any(|s| s.row_count() > PARALLEL_SHEET_ROWS) {
        sheets.par_iter().map(|s| align(s, mode)).collect()
    } else {
        sheets.iter().map(|s| align(s, mode)).collect()
    };

    if !document.is_multi_sheet() {
        return blocks.into_iter().next().unwrap_or_default();
    }

    let last = blocks.len() - 1;
    let mut out = String::new();
    for (index, (sheet, block)) in sheets.iter().zip(blocks.iter()).enumerate() {
        out.push_str(&format!("\n=== Sheet: {} ===\n\n", sheet_label(sheet, index)));
        out.push_str(block);
        if index < last {
            out.push('\n');
        }
    }
    out
}
