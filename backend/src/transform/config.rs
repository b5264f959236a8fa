//! View configuration: what to group by, what to summarize, what to filter.
//!
//! A [`ViewConfig`] is an immutable snapshot of user intent. It comes from a
//! JSON file, an HTTP request body or the suggestion oracle, and is handed to
//! [`crate::transform::process_table`] as a whole on every recomputation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::api::logs::log_warning;

/// A complete view configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    /// Grouping columns, in key composition order.
    #[serde(default)]
    pub groupings: Vec<GroupingSpec>,

    /// Aggregations computed per group and for the grand total.
    #[serde(default)]
    pub summaries: Vec<SummarizationSpec>,

    /// Predicates combined with logical AND.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

/// One grouping key component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingSpec {
    pub column: String,
}

impl GroupingSpec {
    pub fn new(column: impl Into<String>) -> Self {
        Self { column: column.into() }
    }
}

// =============================================================================
// Summaries
// =============================================================================

/// Aggregation applied to the numeric values of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    Sum,
    Average,
    Count,
    First,
    Max,
    /// Any kind this engine does not know. Dropped by [`ViewConfig::normalized`].
    #[serde(other)]
    Unsupported,
}

impl AggregationKind {
    /// Every kind the engine computes.
    pub const SUPPORTED: [AggregationKind; 5] = [
        AggregationKind::Sum,
        AggregationKind::Average,
        AggregationKind::Count,
        AggregationKind::First,
        AggregationKind::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "sum",
            AggregationKind::Average => "average",
            AggregationKind::Count => "count",
            AggregationKind::First => "first",
            AggregationKind::Max => "max",
            AggregationKind::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != AggregationKind::Unsupported
    }

    pub fn description(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "Arithmetic sum of the numeric values (0 when none)",
            AggregationKind::Average => "Mean rounded to 2 decimals (0 when none)",
            AggregationKind::Count => "Number of values that parse as finite numbers",
            AggregationKind::First => "First numeric value in row order (0 when none)",
            AggregationKind::Max => "Largest numeric value (0 when none)",
            AggregationKind::Unsupported => "Ignored",
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregation over a source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizationSpec {
    pub column: String,

    /// Also read from `aggregation` or `type`; the schema admits exactly one.
    #[serde(alias = "aggregation", alias = "type")]
    pub aggregation_kind: AggregationKind,
}

impl SummarizationSpec {
    pub fn new(column: impl Into<String>, aggregation_kind: AggregationKind) -> Self {
        Self {
            column: column.into(),
            aggregation_kind,
        }
    }

    /// Synthetic output column, `<column>_<kind>`.
    pub fn output_column(&self) -> String {
        format!("{}_{}", self.column, self.aggregation_kind)
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Predicate applied to the coerced value of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    Equals,
    Contains,
    In,
    RangeNumber,
    /// Unknown predicates always pass.
    #[serde(other)]
    Unknown,
}

impl PredicateKind {
    pub const SUPPORTED: [PredicateKind; 4] = [
        PredicateKind::Equals,
        PredicateKind::Contains,
        PredicateKind::In,
        PredicateKind::RangeNumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateKind::Equals => "equals",
            PredicateKind::Contains => "contains",
            PredicateKind::In => "in",
            PredicateKind::RangeNumber => "range_number",
            PredicateKind::Unknown => "unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PredicateKind::Equals => "Case-insensitive equality, value: scalar",
            PredicateKind::Contains => "Case-insensitive substring, value: scalar",
            PredicateKind::In => "Case-insensitive membership, value: [a, b, ...]",
            PredicateKind::RangeNumber => "Inclusive numeric range, value: [min|null, max|null]",
            PredicateKind::Unknown => "Always passes",
        }
    }
}

/// One filter predicate. `value` holds the operand, whose shape depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,

    #[serde(rename = "type")]
    pub kind: PredicateKind,

    #[serde(default)]
    pub value: Value,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, kind: PredicateKind, value: Value) -> Self {
        Self {
            column: column.into(),
            kind,
            value,
        }
    }
}

// =============================================================================
// Normalization
// =============================================================================

impl ViewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.groupings.push(GroupingSpec::new(column));
        self
    }

    pub fn summarize(mut self, column: impl Into<String>, kind: AggregationKind) -> Self {
        self.summaries.push(SummarizationSpec::new(column, kind));
        self
    }

    pub fn filter(mut self, column: impl Into<String>, kind: PredicateKind, value: Value) -> Self {
        self.filters.push(FilterSpec::new(column, kind, value));
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_empty(&self) -> bool {
        self.groupings.is_empty() && self.summaries.is_empty() && self.filters.is_empty()
    }

    /// Enforce the list invariants.
    ///
    /// Duplicate grouping columns and duplicate summary columns are dropped
    /// (first occurrence wins), as are summaries with an unsupported kind.
    pub fn normalized(&self) -> ViewConfig {
        let mut seen = HashSet::new();
        let mut groupings = Vec::with_capacity(self.groupings.len());
        for grouping in &self.groupings {
            if seen.insert(grouping.column.as_str()) {
                groupings.push(grouping.clone());
            } else {
                log_warning(format!("Ignoring duplicate grouping on '{}'", grouping.column));
            }
        }

        let mut seen = HashSet::new();
        let mut summaries = Vec::with_capacity(self.summaries.len());
        for summary in &self.summaries {
            if !summary.aggregation_kind.is_supported() {
                log_warning(format!("Ignoring unsupported aggregation on '{}'", summary.column));
            } else if seen.insert(summary.column.as_str()) {
                summaries.push(summary.clone());
            } else {
                log_warning(format!("Ignoring duplicate summary on '{}'", summary.column));
            }
        }

        ViewConfig {
            groupings,
            summaries,
            filters: self.filters.clone(),
        }
    }

    /// Drop every spec that references a column outside `headers`.
    pub fn restricted_to(&self, headers: &[String]) -> ViewConfig {
        let known = |column: &str| headers.iter().any(|h| h == column);

        ViewConfig {
            groupings: self.groupings.iter().filter(|g| known(&g.column)).cloned().collect(),
            summaries: self.summaries.iter().filter(|s| known(&s.column)).cloned().collect(),
            filters: self.filters.iter().filter(|f| known(&f.column)).cloned().collect(),
        }
    }
}

/// Example configuration shown by the CLI.
pub fn example_config() -> ViewConfig {
    ViewConfig::new()
        .group_by("site")
        .summarize("qty", AggregationKind::Sum)
        .summarize("price", AggregationKind::Average)
        .filter("status", PredicateKind::In, serde_json::json!(["open", "pending"]))
        .filter("qty", PredicateKind::RangeNumber, serde_json::json!([1, null]))
}

/// Human-readable list of aggregation and predicate kinds.
pub fn kinds_description() -> String {
    let mut out = String::from("Aggregations (summaries[].aggregationKind):\n");
    for kind in AggregationKind::SUPPORTED {
        out.push_str(&format!("  {:<13} {}\n", kind.as_str(), kind.description()));
    }
    out.push_str("\nPredicates (filters[].type):\n");
    for kind in PredicateKind::SUPPORTED {
        out.push_str(&format!("  {:<13} {}\n", kind.as_str(), kind.description()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wire_format() {
        let config = ViewConfig::from_json(
            r#"{
                "groupings": [{"column": "site"}],
                "summaries": [{"column": "qty", "aggregationKind": "sum"}],
                "filters": [{"column": "qty", "type": "range_number", "value": [2, 5]}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.groupings[0].column, "site");
        assert_eq!(config.summaries[0].aggregation_kind, AggregationKind::Sum);
        assert_eq!(config.filters[0].kind, PredicateKind::RangeNumber);
        assert_eq!(config.filters[0].value, json!([2, 5]));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let config = ViewConfig::from_json("{}").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_unknown_kinds_deserialize() {
        let config = ViewConfig::from_json(
            r#"{
                "summaries": [{"column": "qty", "aggregationKind": "median"}],
                "filters": [{"column": "qty", "type": "regex", "value": "^1"}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.summaries[0].aggregation_kind, AggregationKind::Unsupported);
        assert_eq!(config.filters[0].kind, PredicateKind::Unknown);
    }

    #[test]
    fn test_aggregation_alias() {
        let spec: SummarizationSpec =
            serde_json::from_value(json!({"column": "qty", "aggregation": "average"})).unwrap();
        assert_eq!(spec.aggregation_kind, AggregationKind::Average);
    }

    #[test]
    fn test_output_column_name() {
        let spec = SummarizationSpec::new("ingredient_qty", AggregationKind::Sum);
        assert_eq!(spec.output_column(), "ingredient_qty_sum");
    }

    #[test]
    fn test_normalized_drops_duplicates_and_unsupported() {
        let config = ViewConfig::new()
            .group_by("site")
            .group_by("site")
            .summarize("qty", AggregationKind::Sum)
            .summarize("qty", AggregationKind::Count)
            .summarize("price", AggregationKind::Unsupported)
            .summarize("price", AggregationKind::Max);

        let normalized = config.normalized();
        assert_eq!(normalized.groupings, vec![GroupingSpec::new("site")]);
        assert_eq!(
            normalized.summaries,
            vec![
                SummarizationSpec::new("qty", AggregationKind::Sum),
                SummarizationSpec::new("price", AggregationKind::Max),
            ]
        );
    }

    #[test]
    fn test_restricted_to_headers() {
        let headers = vec!["site".to_string(), "qty".to_string()];
        let config = ViewConfig::new()
            .group_by("site")
            .group_by("ghost")
            .summarize("qty", AggregationKind::Sum)
            .filter("ghost", PredicateKind::Equals, json!("x"));

        let restricted = config.restricted_to(&headers);
        assert_eq!(restricted.groupings.len(), 1);
        assert_eq!(restricted.summaries.len(), 1);
        assert!(restricted.filters.is_empty());
    }

    #[test]
    fn test_example_config_round_trips() {
        let json = example_config().to_json().unwrap();
        assert_eq!(ViewConfig::from_json(&json).unwrap(), example_config());
    }

    #[test]
    fn test_kinds_description_lists_everything() {
        let text = kinds_description();
        assert!(text.contains("average"));
        assert!(text.contains("range_number"));
        assert!(!text.contains("unsupported"));
    }
}
