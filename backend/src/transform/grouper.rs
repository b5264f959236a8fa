//! Group filtered rows by a composite key and aggregate each group.
//!
//! # Architecture
//!
//! ```text
//! Filtered rows                      →  Grouped rows (first-seen order)
//! ┌──────────────────────────┐         ┌─────────────────────────┐
//! │ site: A, qty: 5          │         │ site: A, qty_sum: 8     │
//! │ site: A, qty: 3          │   →     ├─────────────────────────┤
//! │ site: B, qty: 2          │         │ site: B, qty_sum: 2     │
//! └──────────────────────────┘         ├─────────────────────────┤
//!                                      │ qty_sum: 10 (grand)     │
//!                                      └─────────────────────────┘
//! ```
//!
//! The grand total is always re-aggregated from the filtered rows, never
//! from the group rows: an average of group averages is not the average.

use serde_json::Value;
use std::collections::HashMap;

use super::coerce::{coerce, number_value};
use super::config::{AggregationKind, GroupingSpec, SummarizationSpec};
use crate::models::{ColumnTypes, DerivedRow, Row, RowNote};

/// Separator between the coerced grouping values of a group key.
pub const GROUP_KEY_SEPARATOR: &str = " | ";

/// Output of [`group_and_aggregate`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedData {
    pub data: Vec<DerivedRow>,
    pub grand_total_row: Option<DerivedRow>,
}

/// Partition `rows` by the grouping columns and aggregate each partition.
///
/// With neither groupings nor summaries the rows pass through unchanged.
/// Without groupings but with summaries, every row falls into one group.
pub fn group_and_aggregate(
    rows: &[&Row],
    groupings: &[GroupingSpec],
    summaries: &[SummarizationSpec],
    types: &ColumnTypes,
) -> GroupedData {
    if groupings.is_empty() && summaries.is_empty() {
        return GroupedData {
            data: rows.iter().map(|row| DerivedRow::from_row(row)).collect(),
            grand_total_row: None,
        };
    }

    let data = partition(rows, groupings, types)
        .into_iter()
        .map(|members| build_group_row(&members, groupings, summaries, types))
        .collect();

    let grand_total_row = if !summaries.is_empty() && !rows.is_empty() {
        Some(grand_total(rows, summaries, types))
    } else {
        None
    };

    GroupedData { data, grand_total_row }
}

/// Composite key of a row: coerced grouping values joined by [`GROUP_KEY_SEPARATOR`].
pub fn group_key(row: &Row, groupings: &[GroupingSpec], types: &ColumnTypes) -> String {
    groupings
        .iter()
        .map(|g| coerce(row, &g.column, types).as_text())
        .collect::<Vec<_>>()
        .join(GROUP_KEY_SEPARATOR)
}

/// Split rows into groups, keeping groups in the order their key first appears.
fn partition<'a>(rows: &[&'a Row], groupings: &[GroupingSpec], types: &ColumnTypes) -> Vec<Vec<&'a Row>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<&'a Row>> = Vec::new();

    for &row in rows {
        let key = group_key(row, groupings, types);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }

    groups
}

fn build_group_row(
    members: &[&Row],
    groupings: &[GroupingSpec],
    summaries: &[SummarizationSpec],
    types: &ColumnTypes,
) -> DerivedRow {
    let mut out = DerivedRow::new();
    let Some(first) = members.first() else {
        return out;
    };

    for grouping in groupings {
        out.insert(grouping.column.clone(), coerce(first, &grouping.column, types).into_json());
    }

    if summaries.is_empty() {
        // Keep the rest of the first member visible.
        for column in first.keys() {
            if !groupings.iter().any(|g| &g.column == column) {
                out.insert(column.clone(), coerce(first, column, types).into_json());
            }
        }
    } else {
        for summary in summaries {
            out.insert(summary.output_column(), summarize(members, summary, types));
        }
    }

    out
}

fn grand_total(rows: &[&Row], summaries: &[SummarizationSpec], types: &ColumnTypes) -> DerivedRow {
    let mut out = DerivedRow::new().with_note(RowNote::GrandTotal);
    for summary in summaries {
        out.insert(summary.output_column(), summarize(rows, summary, types));
    }
    out
}

/// Aggregate one summary over a set of rows.
pub fn summarize(rows: &[&Row], summary: &SummarizationSpec, types: &ColumnTypes) -> Value {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| coerce(row, &summary.column, types).as_number())
        .collect();

    number_value(aggregate(&values, summary.aggregation_kind))
}

/// Apply an aggregation to already-valid numbers. Empty input yields 0.
pub fn aggregate(values: &[f64], kind: AggregationKind) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    match kind {
        AggregationKind::Sum => values.iter().sum(),
        AggregationKind::Average => round2(values.iter().sum::<f64>() / values.len() as f64),
        AggregationKind::Count => values.len() as f64,
        AggregationKind::First => values[0],
        AggregationKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregationKind::Unsupported => 0.0,
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}
