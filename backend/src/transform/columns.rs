//! Output column derivation.

use super::config::{GroupingSpec, SummarizationSpec};
use crate::models::{output_key, Row};

/// Ordered output columns for a configuration shape.
///
/// - nothing configured: the keys of the first row;
/// - otherwise: grouping columns, then one synthetic `<column>_<kind>` per
///   summary, then (only when there are no summaries) the remaining keys of
///   the first row.
///
/// A source column named `note` is listed under its escaped name
/// (see [`output_key`]).
///
/// The first filtered row is the first member of the first group, so its key
/// order is the key order of the first grouped row.
pub fn derive_columns(rows: &[&Row], groupings: &[GroupingSpec], summaries: &[SummarizationSpec]) -> Vec<String> {
    let first_keys = || {
        rows.first()
            .map(|row| row.keys().map(|key| output_key(key).to_string()).collect::<Vec<_>>())
            .unwrap_or_default()
    };

    if groupings.is_empty() && summaries.is_empty() {
        return first_keys();
    }

    let mut columns: Vec<String> = Vec::new();
    let mut push = |column: String| {
        if !columns.contains(&column) {
            columns.push(column);
        }
    };

    for grouping in groupings {
        push(output_key(&grouping.column).to_string());
    }
    for summary in summaries {
        push(summary.output_column());
    }
    if summaries.is_empty() {
        for key in first_keys() {
            push(key);
        }
    }

    columns
}
