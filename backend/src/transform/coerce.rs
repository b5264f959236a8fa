//! Value coercion: raw cell → typed value, driven by the declared column type.
//!
//! Coercion never fails. Unparsable numbers become `0`, unparsable dates
//! become empty text, and absent cells become `0` or empty text.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;

use crate::models::{ColumnKind, ColumnTypes, Row};

/// Leading numeric prefix, the part a lenient float parser accepts.
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid numeric regex")
});

/// Rendering of coerced dates (month/day/year, no padding).
pub const DATE_DISPLAY_FORMAT: &str = "%-m/%-d/%Y";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A coerced cell.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Number(f64),
    Text(String),
}

impl TypedValue {
    /// Text form used for grouping keys and string predicates.
    pub fn as_text(&self) -> String {
        match self {
            TypedValue::Number(n) => format_number(*n),
            TypedValue::Text(s) => s.clone(),
        }
    }

    /// Numeric reading of the value, `None` when it is not a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) if n.is_finite() => Some(*n),
            TypedValue::Number(_) => None,
            TypedValue::Text(s) => parse_number(s),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            TypedValue::Number(n) => number_value(n),
            TypedValue::Text(s) => Value::String(s),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Coerce `row[column]` according to the declared type of `column`.
pub fn coerce(row: &Row, column: &str, types: &ColumnTypes) -> TypedValue {
    let raw = row.get(column);

    match types.kind_of(column) {
        ColumnKind::Numeric => TypedValue::Number(coerce_number(raw)),
        ColumnKind::Date => TypedValue::Text(coerce_date(raw)),
        ColumnKind::Text => TypedValue::Text(raw.map(raw_text).unwrap_or_default()),
    }
}

fn coerce_number(raw: Option<&Value>) -> f64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

fn coerce_date(raw: Option<&Value>) -> String {
    let date = match raw {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) if s.trim().is_empty() => return String::new(),
        Some(Value::String(s)) => parse_date(s),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        Some(_) => None,
    };

    date.map(|d| d.format(DATE_DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a calendar date from the common textual layouts.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Lenient float parse: the longest numeric prefix after trimming.
///
/// `"12.5 kg"` reads as `12.5`, `"abc"` and `""` read as `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    NUMERIC_PREFIX
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Text of a raw JSON cell; `null` reads as empty.
pub fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n
            .as_f64()
            .map(format_number)
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Shortest text form: `8` rather than `8.0`.
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

/// JSON number, integral when the value has no fractional part.
pub fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
