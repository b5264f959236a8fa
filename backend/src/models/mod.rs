//! Domain models shared by the engine, the exporter and the HTTP layer.
//!
//! - [`Row`] - one raw input record, keyed by column identifier
//! - [`DerivedRow`] - one output record, optionally tagged with a [`RowNote`]
//! - [`ColumnTypes`] - static declaration of numeric and date columns
//! - [`ProcessedTable`] - everything the engine hands back to a caller

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

// =============================================================================
// Rows
// =============================================================================

/// A raw input record.
///
/// Keys are not fixed across rows: a key present in one row may be missing
/// from another, and every access site must treat it as optional.
pub type Row = Map<String, Value>;

/// Sentinel tag carried by special output rows in the reserved `note` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowNote {
    /// Aggregation over the whole filtered population.
    GrandTotal,
    /// Aggregation over a block of groups.
    Subtotal,
    /// Visual separator with no data.
    Divider,
}

impl RowNote {
    /// Label shown by renderers in the first cell of the row.
    pub fn label(&self) -> &'static str {
        match self {
            RowNote::GrandTotal => "Grand Total",
            RowNote::Subtotal => "Subtotal",
            RowNote::Divider => "",
        }
    }
}

/// Reserved key carrying a [`RowNote`] in serialized output rows.
pub const NOTE_KEY: &str = "note";

/// Output name of a source column called [`NOTE_KEY`].
pub const ESCAPED_NOTE_KEY: &str = "_note";

/// Name a source column takes in output rows and column lists.
///
/// Only a column literally named `note` is renamed, to [`ESCAPED_NOTE_KEY`],
/// so user data never shares a key with the sentinel.
pub fn output_key(column: &str) -> &str {
    if column == NOTE_KEY {
        ESCAPED_NOTE_KEY
    } else {
        column
    }
}

/// An output record produced by the engine.
///
/// Serializes flat: the values and the optional `note` share one JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedRow {
    #[serde(flatten)]
    pub values: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<RowNote>,
}

impl DerivedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a raw row without touching its values (see [`output_key`]).
    pub fn from_row(row: &Row) -> Self {
        Self {
            values: row
                .iter()
                .map(|(column, value)| (output_key(column).to_string(), value.clone()))
                .collect(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: RowNote) -> Self {
        self.note = Some(note);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        self.values.insert(output_key(&column).to_string(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn is_grand_total(&self) -> bool {
        self.note == Some(RowNote::GrandTotal)
    }
}

impl std::ops::Index<&str> for DerivedRow {
    type Output = Value;

    fn index(&self, column: &str) -> &Value {
        &self.values[column]
    }
}

// =============================================================================
// Column types
// =============================================================================

/// Which columns are coerced as numbers and which as dates.
///
/// Every other column is treated as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTypes {
    #[serde(default)]
    pub numeric: HashSet<String>,

    #[serde(default)]
    pub date: HashSet<String>,
}

/// Declared semantic type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Date,
    Text,
}

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn with_date<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Numeric wins when a column is declared both ways.
    pub fn kind_of(&self, column: &str) -> ColumnKind {
        if self.numeric.contains(column) {
            ColumnKind::Numeric
        } else if self.date.contains(column) {
            ColumnKind::Date
        } else {
            ColumnKind::Text
        }
    }
}

// =============================================================================
// Engine output
// =============================================================================

/// The derived view: table rows, their column order and the grand total.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTable {
    pub processed_data: Vec<DerivedRow>,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grand_total_row: Option<DerivedRow>,
}

impl ProcessedTable {
    pub fn row_count(&self) -> usize {
        self.processed_data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_serializes_flat() {
        let mut row = DerivedRow::new().with_note(RowNote::GrandTotal);
        row.insert("qty_sum", json!(10));

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value, json!({"qty_sum": 10, "note": "grand_total"}));
    }

    #[test]
    fn test_plain_row_has_no_note_key() {
        let raw = json!({"site": "A"}).as_object().unwrap().clone();
        let value = serde_json::to_value(DerivedRow::from_row(&raw)).unwrap();
        assert!(value.get("note").is_none());
    }

    #[test]
    fn test_note_round_trips_from_json() {
        let row: DerivedRow = serde_json::from_value(json!({"a": 1, "note": "divider"})).unwrap();
        assert_eq!(row.note, Some(RowNote::Divider));
        assert_eq!(row["a"], 1);
        assert!(row.values.get("note").is_none());
    }

    #[test]
    fn test_user_note_column_is_escaped() {
        let raw = json!({"site": "A", "note": "fragile"}).as_object().unwrap().clone();
        let row = DerivedRow::from_row(&raw);

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value, json!({"site": "A", "_note": "fragile"}));

        let back: DerivedRow = serde_json::from_value(value).unwrap();
        assert_eq!(back.note, None);
        assert_eq!(back["_note"], "fragile");
    }

    #[test]
    fn test_insert_escapes_note_key() {
        let mut row = DerivedRow::new().with_note(RowNote::GrandTotal);
        row.insert("note", json!("x"));
        assert_eq!(row.note, Some(RowNote::GrandTotal));
        assert_eq!(row["_note"], "x");
        assert_eq!(output_key("site"), "site");
    }

    #[test]
    fn test_numeric_declaration_wins() {
        let types = ColumnTypes::new().with_numeric(["qty"]).with_date(["qty", "when"]);
        assert_eq!(types.kind_of("qty"), ColumnKind::Numeric);
        assert_eq!(types.kind_of("when"), ColumnKind::Date);
        assert_eq!(types.kind_of("site"), ColumnKind::Text);
    }

    #[test]
    fn test_processed_table_wire_names() {
        let table = ProcessedTable {
            processed_data: vec![],
            columns: vec!["a".into()],
            grand_total_row: None,
        };
        let value = serde_json::to_value(&table).unwrap();
        assert!(value.get("processedData").is_some());
        assert!(value.get("grandTotalRow").is_none());
    }
}
