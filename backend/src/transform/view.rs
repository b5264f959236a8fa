//! The derived view: filter → group/aggregate → columns, in one pure call.

use super::columns::derive_columns;
use super::config::ViewConfig;
use super::filter::apply_filters;
use super::grouper::group_and_aggregate;
use crate::models::{ColumnTypes, ProcessedTable, Row};

/// Recompute the whole derived table from raw rows and a configuration.
///
/// Pure: the same inputs always give the same table, and `rows` is never
/// modified. The configuration is normalized first (duplicate and
/// unsupported specs dropped).
pub fn process_table(rows: &[Row], config: &ViewConfig, types: &ColumnTypes) -> ProcessedTable {
    let config = config.normalized();

    let filtered = apply_filters(rows, &config.filters, types);
    let grouped = group_and_aggregate(&filtered, &config.groupings, &config.summaries, types);
    let columns = derive_columns(&filtered, &config.groupings, &config.summaries);

    ProcessedTable {
        processed_data: grouped.data,
        columns,
        grand_total_row: grouped.grand_total_row,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::config::{AggregationKind, PredicateKind};
    use serde_json::{json, Value};

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn pantry() -> Vec<Row> {
        rows(json!([
            {"site": "North", "ingredient": "flour", "ingredient_qty": "5", "received": "2024-01-02"},
            {"site": "North", "ingredient": "sugar", "ingredient_qty": "3", "received": "2024-01-03"},
            {"site": "South", "ingredient": "flour", "ingredient_qty": "2", "received": ""},
            {"site": "South", "ingredient": "salt", "ingredient_qty": "x", "received": "2024-02-01"},
            {"ingredient": "yeast", "ingredient_qty": "1"}
        ]))
    }

    fn types() -> ColumnTypes {
        ColumnTypes::new().with_numeric(["ingredient_qty"]).with_date(["received"])
    }

    #[test]
    fn test_empty_config_passes_rows_through() {
        let data = pantry();
        let table = process_table(&data, &ViewConfig::new(), &types());

        assert_eq!(table.row_count(), 5);
        assert_eq!(table.columns, vec!["site", "ingredient", "ingredient_qty", "received"]);
        assert_eq!(table.processed_data[0]["received"], "2024-01-02");
        assert!(table.grand_total_row.is_none());
    }

    #[test]
    fn test_filter_group_summarize() {
        let data = pantry();
        let config = ViewConfig::new()
            .filter("site", PredicateKind::In, json!(["north", "south"]))
            .group_by("site")
            .summarize("ingredient_qty", AggregationKind::Sum)
            .summarize("ingredient", AggregationKind::Count);

        let table = process_table(&data, &config, &types());

        assert_eq!(table.columns, vec!["site", "ingredient_qty_sum", "ingredient_count"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.processed_data[0]["site"], "North");
        assert_eq!(table.processed_data[0]["ingredient_qty_sum"], 8);
        assert_eq!(table.processed_data[1]["ingredient_qty_sum"], 2);
        assert_eq!(table.processed_data[1]["ingredient_count"], 0);

        let total = table.grand_total_row.unwrap();
        assert!(total.is_grand_total());
        assert_eq!(total["ingredient_qty_sum"], 10);
    }

    #[test]
    fn test_grouping_coerces_dates() {
        let data = pantry();
        let config = ViewConfig::new()
            .filter("received", PredicateKind::Contains, json!("2024"))
            .group_by("received");

        let table = process_table(&data, &config, &types());
        assert_eq!(table.processed_data[0]["received"], "1/2/2024");
        assert_eq!(table.columns[0], "received");
    }

    #[test]
    fn test_filtered_out_everything() {
        let data = pantry();
        let config = ViewConfig::new()
            .filter("site", PredicateKind::Equals, json!("east"))
            .group_by("site")
            .summarize("ingredient_qty", AggregationKind::Sum);

        let table = process_table(&data, &config, &types());
        assert!(table.processed_data.is_empty());
        assert!(table.grand_total_row.is_none());
        assert_eq!(table.columns, vec!["site", "ingredient_qty_sum"]);
    }

    #[test]
    fn test_unsupported_summary_never_reaches_output() {
        let data = pantry();
        let config = ViewConfig::new()
            .group_by("site")
            .summarize("ingredient_qty", AggregationKind::Unsupported);

        let table = process_table(&data, &config, &types());
        assert_eq!(table.columns, vec!["site", "ingredient", "ingredient_qty", "received"]);
        assert!(table.grand_total_row.is_none());
    }

    #[test]
    fn test_raw_rows_untouched() {
        let data = pantry();
        let before = data.clone();
        let config = ViewConfig::new().group_by("site").summarize("ingredient_qty", AggregationKind::Max);

        let first = process_table(&data, &config, &types());
        let second = process_table(&data, &config, &types());

        assert_eq!(data, before);
        assert_eq!(first, second);
    }
}
