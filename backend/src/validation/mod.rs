//! JSON Schema validation for view configurations.
//!
//! Configurations arrive as JSON from files, request bodies and the
//! suggestion oracle. Before they are deserialized into a
//! [`ViewConfig`](crate::transform::ViewConfig) their shape is checked
//! against an embedded JSON Schema (Draft 7), so a malformed file reports
//! every problem at once instead of serde's first one.
//!
//! The schema is structural only: unknown aggregation and predicate kinds are
//! accepted here and handled by the engine's own policy.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tableshape::validation::{is_valid_view_config, validate_view_config};
//!
//! let config = json!({
//!     "groupings": [{ "column": "site" }],
//!     "summaries": [{ "column": "qty", "aggregationKind": "sum" }]
//! });
//! assert!(validate_view_config(&config).is_ok());
//!
//! assert!(!is_valid_view_config(&json!({ "groupings": [{}] })));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

/// Embedded configuration schema.
pub const VIEW_CONFIG_SCHEMA: &str = include_str!("../../schemas/view-config-schema.json");

static VIEW_CONFIG_SCHEMA_VALUE: Lazy<Value> =
    Lazy::new(|| serde_json::from_str(VIEW_CONFIG_SCHEMA).expect("Invalid embedded schema"));

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// The parsed configuration schema.
pub fn view_config_schema() -> &'static Value {
    &VIEW_CONFIG_SCHEMA_VALUE
}

/// Validate against the view configuration schema.
pub fn validate_view_config(data: &Value) -> Result<(), Vec<String>> {
    validate(view_config_schema(), data)
}

/// Quick check against the view configuration schema.
pub fn is_valid_view_config(data: &Value) -> bool {
    is_valid(view_config_schema(), data)
}
