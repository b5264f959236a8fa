//! CSV export of a processed table.
//!
//! Column order is the table's `columns`. Missing and null cells print as
//! [`PLACEHOLDER`], and the grand total always comes last.
//!
//! Note-tagged rows print their label in the first cell when that cell is
//! empty. When some labelled row has data in its first cell (summaries
//! without groupings, for instance), a leading [`LABEL_COLUMN`] is added
//! instead, so the label never replaces a value and is never lost.

use serde_json::Value;
use std::io::Write;

use crate::error::ExportResult;
use crate::models::{DerivedRow, ProcessedTable};
use crate::transform::coerce::raw_text;

/// Text written for an absent cell.
pub const PLACEHOLDER: &str = "-";

/// Header of the leading label column.
pub const LABEL_COLUMN: &str = "";

/// Write `table` as CSV to `writer`.
pub fn write_csv<W: Write>(writer: W, table: &ProcessedTable, delimiter: u8) -> ExportResult<()> {
    let mut out = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    let labelled = needs_label_column(table);

    let mut header: Vec<&str> = Vec::with_capacity(table.columns.len() + 1);
    if labelled {
        header.push(LABEL_COLUMN);
    }
    header.extend(table.columns.iter().map(String::as_str));
    out.write_record(&header)?;

    for row in rows_of(table) {
        let cells: Vec<String> = if labelled {
            let label = row.note.map(|note| note.label()).unwrap_or("");
            std::iter::once(label.to_string())
                .chain(table.columns.iter().map(|column| render_cell(row.get(column))))
                .collect()
        } else {
            render_row(row, &table.columns)
        };
        out.write_record(cells)?;
    }

    out.flush()?;
    Ok(())
}

/// Export `table` to a comma-separated string.
pub fn to_csv(table: &ProcessedTable) -> ExportResult<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, table, b',')?;
    Ok(String::from_utf8(buffer)?)
}

/// Cells of one row in column order, the note label in a free first cell.
pub fn render_row(row: &DerivedRow, columns: &[String]) -> Vec<String> {
    let mut cells: Vec<String> = columns
        .iter()
        .map(|column| render_cell(row.get(column)))
        .collect();

    if let (Some(note), Some(first)) = (row.note, cells.first_mut()) {
        if *first == PLACEHOLDER || first.is_empty() {
            *first = note.label().to_string();
        }
    }

    cells
}

/// Whether some labelled row has no free first cell for its label.
pub fn needs_label_column(table: &ProcessedTable) -> bool {
    rows_of(table)
        .filter(|row| row.note.is_some_and(|note| !note.label().is_empty()))
        .any(|row| match table.columns.first() {
            Some(column) => {
                let first = render_cell(row.get(column));
                first != PLACEHOLDER && !first.is_empty()
            }
            None => true,
        })
}

fn rows_of(table: &ProcessedTable) -> impl Iterator<Item = &DerivedRow> {
    table.processed_data.iter().chain(table.grand_total_row.iter())
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => PLACEHOLDER.to_string(),
        Some(v) => raw_text(v),
    }
}
