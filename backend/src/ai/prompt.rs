//! Prompt generation for configuration suggestions
//!
//! Sends a table preview, its headers and per-column value samples to the AI
//! and asks for a view configuration back.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use crate::models::Row;
use crate::transform::coerce::{parse_number, raw_text};
use crate::validation::VIEW_CONFIG_SCHEMA;

/// Distinct values listed per column before switching to a sample.
const MAX_LISTED_VALUES: usize = 30;

/// Sample size for high-cardinality columns.
const SAMPLE_VALUES: usize = 15;

/// Generate the system prompt
pub fn system_prompt() -> String {
    format!(
        r#"You are a data analysis assistant. Your task is to look at an uploaded table and propose a useful summary view of it.

## Your Mission

Given:
1. A preview of the table rows (as JSON objects)
2. The list of column names
3. Distinct values observed per column

Return a view configuration that groups the rows by one or more descriptive columns, summarizes the numeric columns, and optionally filters out irrelevant rows.

## CRITICAL: Output Format

You MUST return ONLY valid JSON matching this schema EXACTLY:

```json
{schema}
```

## Aggregations (summaries[].aggregationKind)
- `sum`: total of the numeric values
- `average`: mean of the numeric values
- `count`: number of numeric values
- `first`: first numeric value
- `max`: largest numeric value

## Predicates (filters[].type)
- `equals`: case-insensitive equality, value is a string
- `contains`: case-insensitive substring, value is a string
- `in`: case-insensitive membership, value is a list of strings
- `range_number`: inclusive range, value is [min, max] (either may be null)

## Rules

1. Use exact column names from the list (case-sensitive)
2. Group only by low-cardinality descriptive columns (sites, categories, statuses)
3. Summarize only columns whose values are mostly numbers
4. Never use the same column twice in groupings, nor twice in summaries
5. Prefer no filters over guessed filters
6. Return ONLY the JSON object, no explanations or markdown"#,
        schema = VIEW_CONFIG_SCHEMA
    )
}

/// Generate the user prompt with table data
///
/// # Arguments
/// * `preview` - First N rows for the AI to see the structure
/// * `all_rows` - All rows (for extracting distinct values)
/// * `headers` - Column names in source order
pub fn user_prompt(preview: &[Row], all_rows: &[Row], headers: &[String]) -> String {
    let preview_json = serde_json::to_string_pretty(preview).unwrap_or_default();
    let column_profile = describe_columns(all_rows, headers);

    let preview_count = preview.len();
    let total_count = all_rows.len();

    format!(
        r#"## Table Preview ({preview_count} rows shown, {total_count} total)

```json
{preview_json}
```

## Columns (from {total_count} rows)

{column_profile}

## Task

Propose groupings, summaries and filters for this table."#
    )
}

/// Per-column profile: numeric ratio and distinct values (or a sample).
fn describe_columns(rows: &[Row], headers: &[String]) -> String {
    let mut distinct: HashMap<&str, BTreeSet<String>> = HashMap::new();
    let mut numeric: HashMap<&str, usize> = HashMap::new();
    let mut filled: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        for header in headers {
            let text = row.get(header).map(raw_text).unwrap_or_default();
            if text.trim().is_empty() {
                continue;
            }
            *filled.entry(header).or_default() += 1;
            if parse_number(&text).is_some() {
                *numeric.entry(header).or_default() += 1;
            }
            distinct.entry(header).or_default().insert(text);
        }
    }

    let mut result = String::new();
    for header in headers {
        let values: Vec<&str> = distinct
            .get(header.as_str())
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let filled = filled.get(header.as_str()).copied().unwrap_or(0);
        let numeric = numeric.get(header.as_str()).copied().unwrap_or(0);

        let display = if values.len() <= MAX_LISTED_VALUES {
            values.join(", ")
        } else {
            format!(
                "{}, ... ({} distinct - high cardinality, sample shown)",
                values[..SAMPLE_VALUES].join(", "),
                values.len()
            )
        };

        result.push_str(&format!(
            "- **{}** ({}/{} numeric): {}\n",
            header, numeric, filled, display
        ));
    }

    result
}

/// Build the message list for the API call
pub fn build_messages(preview: &[Row], all_rows: &[Row], headers: &[String]) -> Vec<Value> {
    vec![serde_json::json!({
        "role": "user",
        "content": user_prompt(preview, all_rows, headers)
    })]
}
