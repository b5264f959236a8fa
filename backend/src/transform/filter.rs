//! Filter engine: keep the rows that satisfy every predicate.

use serde_json::Value;

use super::coerce::{coerce, parse_number, raw_text};
use super::config::{FilterSpec, PredicateKind};
use crate::models::{ColumnTypes, Row};

/// Apply `filters` to `rows` with logical AND.
///
/// An empty filter list returns every row. A row whose cell for a filtered
/// column is missing or null never survives that filter.
pub fn apply_filters<'a>(rows: &'a [Row], filters: &[FilterSpec], types: &ColumnTypes) -> Vec<&'a Row> {
    if filters.is_empty() {
        return rows.iter().collect();
    }

    rows.iter()
        .filter(|row| filters.iter().all(|filter| matches(row, filter, types)))
        .collect()
}

/// Evaluate one predicate against one row.
pub fn matches(row: &Row, filter: &FilterSpec, types: &ColumnTypes) -> bool {
    match row.get(&filter.column) {
        None | Some(Value::Null) => return false,
        Some(_) => {}
    }

    let value = coerce(row, &filter.column, types);

    match filter.kind {
        PredicateKind::Equals => value.as_text().to_lowercase() == operand_text(&filter.value),
        PredicateKind::Contains => value
            .as_text()
            .to_lowercase()
            .contains(&operand_text(&filter.value)),
        PredicateKind::In => {
            let needle = value.as_text().to_lowercase();
            operand_list(&filter.value).iter().any(|item| *item == needle)
        }
        PredicateKind::RangeNumber => match value.as_number() {
            Some(n) => {
                let (min, max) = operand_bounds(&filter.value);
                n >= min && n <= max
            }
            None => false,
        },
        PredicateKind::Unknown => true,
    }
}

fn operand_text(operand: &Value) -> String {
    raw_text(operand).to_lowercase()
}

/// A non-list operand counts as a list of one.
fn operand_list(operand: &Value) -> Vec<String> {
    match operand {
        Value::Array(items) => items.iter().map(operand_text).collect(),
        Value::Null => Vec::new(),
        other => vec![operand_text(other)],
    }
}

/// `[min, max]`, each bound optional. Missing bounds are infinite.
fn operand_bounds(operand: &Value) -> (f64, f64) {
    let bound = |index: usize| -> Option<f64> {
        match operand.as_array()?.get(index)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    };

    (
        bound(0).unwrap_or(f64::NEG_INFINITY),
        bound(1).unwrap_or(f64::INFINITY),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn numeric_qty() -> ColumnTypes {
        ColumnTypes::new().with_numeric(["qty"])
    }

    fn qtys(kept: &[&Row]) -> Vec<i64> {
        kept.iter().map(|r| r["qty"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_no_filters_is_identity() {
        let data = rows(json!([{"a": 1}, {"b": 2}]));
        assert_eq!(apply_filters(&data, &[], &ColumnTypes::new()).len(), 2);
    }

    #[test]
    fn test_equals_ignores_case() {
        let data = rows(json!([{"site": "North"}, {"site": "south"}, {"site": "NORTH"}]));
        let filters = [FilterSpec::new("site", PredicateKind::Equals, json!("north"))];
        assert_eq!(apply_filters(&data, &filters, &ColumnTypes::new()).len(), 2);
    }

    #[test]
    fn test_equals_number_operand() {
        let data = rows(json!([{"qty": "5"}, {"qty": "6"}]));
        let filters = [FilterSpec::new("qty", PredicateKind::Equals, json!(5))];
        let kept = apply_filters(&data, &filters, &numeric_qty());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["qty"], "5");
    }

    #[test]
    fn test_contains() {
        let data = rows(json!([{"name": "Brown Sugar"}, {"name": "salt"}]));
        let filters = [FilterSpec::new("name", PredicateKind::Contains, json!("SUG"))];
        let kept = apply_filters(&data, &filters, &ColumnTypes::new());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["name"], "Brown Sugar");
    }

    #[test]
    fn test_in_list() {
        let data = rows(json!([{"s": "open"}, {"s": "Closed"}, {"s": "pending"}]));
        let filters = [FilterSpec::new("s", PredicateKind::In, json!(["OPEN", "closed"]))];
        assert_eq!(apply_filters(&data, &filters, &ColumnTypes::new()).len(), 2);
    }

    #[test]
    fn test_in_scalar_operand() {
        let data = rows(json!([{"s": "open"}, {"s": "closed"}]));
        let filters = [FilterSpec::new("s", PredicateKind::In, json!("open"))];
        assert_eq!(apply_filters(&data, &filters, &ColumnTypes::new()).len(), 1);
    }

    #[test]
    fn test_range_is_inclusive() {
        let data = rows(json!([{"qty": 1}, {"qty": 2}, {"qty": 3}, {"qty": 5}, {"qty": 6}]));
        let filters = [FilterSpec::new("qty", PredicateKind::RangeNumber, json!([2, 5]))];
        let kept = apply_filters(&data, &filters, &ColumnTypes::new());
        assert_eq!(qtys(&kept), vec![2, 3, 5]);
    }

    #[test]
    fn test_range_open_bounds() {
        let data = rows(json!([{"qty": 1}, {"qty": 10}, {"qty": 100}]));

        let lower_only = [FilterSpec::new("qty", PredicateKind::RangeNumber, json!([10, null]))];
        assert_eq!(qtys(&apply_filters(&data, &lower_only, &ColumnTypes::new())), vec![10, 100]);

        let upper_only = [FilterSpec::new("qty", PredicateKind::RangeNumber, json!([null, "10"]))];
        assert_eq!(qtys(&apply_filters(&data, &upper_only, &ColumnTypes::new())), vec![1, 10]);
    }

    #[test]
    fn test_range_excludes_non_numeric() {
        let data = rows(json!([{"qty": "lots"}, {"qty": ""}, {"qty": "4"}]));
        let filters = [FilterSpec::new("qty", PredicateKind::RangeNumber, json!([null, null]))];
        assert_eq!(apply_filters(&data, &filters, &ColumnTypes::new()).len(), 1);
    }

    #[test]
    fn test_missing_column_excluded_for_every_kind() {
        let data = rows(json!([{"other": "x"}, {"qty": null}]));
        let operands = [
            (PredicateKind::Equals, json!("")),
            (PredicateKind::Contains, json!("")),
            (PredicateKind::In, json!([""])),
            (PredicateKind::RangeNumber, json!([null, null])),
            (PredicateKind::Unknown, json!(null)),
        ];

        for (kind, operand) in operands {
            let filters = [FilterSpec::new("qty", kind, operand)];
            assert!(apply_filters(&data, &filters, &numeric_qty()).is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn test_unknown_kind_passes() {
        let data = rows(json!([{"qty": 1}, {"qty": 2}]));
        let filters = [FilterSpec::new("qty", PredicateKind::Unknown, json!("whatever"))];
        assert_eq!(apply_filters(&data, &filters, &ColumnTypes::new()).len(), 2);
    }

    #[test]
    fn test_adding_filters_never_grows_result() {
        let data = rows(json!([
            {"site": "A", "qty": 1},
            {"site": "A", "qty": 4},
            {"site": "B", "qty": 4},
            {"site": "b", "qty": 9}
        ]));
        let f1 = vec![FilterSpec::new("qty", PredicateKind::RangeNumber, json!([2, null]))];
        let mut f2 = f1.clone();
        f2.push(FilterSpec::new("site", PredicateKind::Equals, json!("b")));

        let wide = apply_filters(&data, &f1, &ColumnTypes::new());
        let narrow = apply_filters(&data, &f2, &ColumnTypes::new());
        assert!(narrow.len() <= wide.len());
        assert!(narrow.iter().all(|r| wide.iter().any(|w| std::ptr::eq(*w, *r))));
        assert_eq!(narrow.len(), 2);
    }

    #[test]
    fn test_filter_order_does_not_matter() {
        let data = rows(json!([{"a": "x", "b": 1}, {"a": "y", "b": 2}, {"a": "x", "b": 3}]));
        let f = FilterSpec::new("a", PredicateKind::Equals, json!("x"));
        let g = FilterSpec::new("b", PredicateKind::RangeNumber, json!([2, null]));

        let fg = apply_filters(&data, &[f.clone(), g.clone()], &ColumnTypes::new());
        let gf = apply_filters(&data, &[g, f], &ColumnTypes::new());
        assert_eq!(fg, gf);
        assert_eq!(fg.len(), 1);
    }
}
