//! High-level pipeline API: upload → rows → configuration → derived table.
//!
//! This module combines parsing, configuration loading (from a file or the
//! suggestion oracle) and [`process_table`].
//!
//! # Example
//!
//! ```rust,ignore
//! use tableshape::transform::pipeline::{process_file, PipelineOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = PipelineOptions {
//!         config_path: Some("view.json".into()),
//!         ..Default::default()
//!     };
//!     let output = process_file(Path::new("pantry.csv"), options).await?;
//!
//!     println!("{} rows, columns {:?}", output.table.row_count(), output.table.columns);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::config::ViewConfig;
use super::view::process_table;
use crate::ai::AiClient;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::error::{ConfigError, ConfigResult, PipelineResult, SuggestResult};
use crate::models::{ColumnTypes, ProcessedTable, Row};
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult};
use crate::validation::validate_view_config;

/// Options for the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// View configuration file; wins over any suggestion
    pub config_path: Option<String>,

    /// Column type declaration file (`{"numeric": [...], "date": [...]}`)
    pub column_types_path: Option<String>,

    /// Ask the suggestion oracle when no configuration file is given
    pub suggest: bool,

    /// Number of rows shown verbatim to the oracle
    pub preview_rows: usize,

    /// Skip schema validation of configuration files
    pub skip_validation: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            column_types_path: None,
            suggest: false,
            preview_rows: 10,
            skip_validation: false,
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    /// The derived table
    pub table: ProcessedTable,

    /// Configuration the table was computed with
    pub config: ViewConfig,

    /// Column types the table was computed with
    pub column_types: ColumnTypes,

    /// Whether `config` came from the suggestion oracle
    pub suggested: bool,

    /// Parsing metadata
    pub csv_info: CsvInfo,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.rows.len(),
        }
    }
}

/// Run the pipeline on a file.
pub async fn process_file(path: &Path, options: PipelineOptions) -> PipelineResult<PipelineOutput> {
    log_info(format!("Reading {}", path.display()));
    let parsed = parse_file_auto(path)?;
    process_parsed(parsed, options).await
}

/// Run the pipeline on raw bytes.
pub async fn process_bytes(bytes: &[u8], options: PipelineOptions) -> PipelineResult<PipelineOutput> {
    let parsed = parse_bytes_auto(bytes)?;
    process_parsed(parsed, options).await
}

/// Run the pipeline on already-parsed rows.
pub async fn process_parsed(parsed: ParseResult, options: PipelineOptions) -> PipelineResult<PipelineOutput> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows, {} columns", parsed.rows.len(), parsed.headers.len()));

    let column_types = match options.column_types_path {
        Some(ref path) => load_column_types(path)?,
        None => ColumnTypes::default(),
    };

    let (config, suggested) = resolve_config(&parsed, &options).await?;

    log_info("Processing table...");
    let table = process_table(&parsed.rows, &config, &column_types);
    log_success(format!(
        "{} rows, {} columns{}",
        table.row_count(),
        table.columns.len(),
        if table.grand_total_row.is_some() { ", with grand total" } else { "" }
    ));

    Ok(PipelineOutput {
        csv_info: CsvInfo::from(&parsed),
        table,
        config,
        column_types,
        suggested,
    })
}

/// Pick the configuration: explicit file, then oracle, then empty.
///
/// A failing oracle is logged and falls back to the empty configuration.
async fn resolve_config(parsed: &ParseResult, options: &PipelineOptions) -> PipelineResult<(ViewConfig, bool)> {
    if let Some(ref path) = options.config_path {
        log_info(format!("Using configuration file: {}", path));
        return Ok((load_config(path, options.skip_validation)?, false));
    }

    if options.suggest {
        log_info("Asking for a suggested configuration...");
        match suggest_for(parsed, options.preview_rows).await {
            Ok(config) => {
                log_success(format!(
                    "Suggestion: {} grouping(s), {} summary(ies), {} filter(s)",
                    config.groupings.len(),
                    config.summaries.len(),
                    config.filters.len()
                ));
                for grouping in &config.groupings {
                    log_info_indent(format!("group by {}", grouping.column), 1);
                }
                for summary in &config.summaries {
                    log_info_indent(format!("{} of {}", summary.aggregation_kind, summary.column), 1);
                }
                for filter in &config.filters {
                    log_info_indent(format!("{} {} {}", filter.column, filter.kind.as_str(), filter.value), 1);
                }
                return Ok((config, true));
            }
            Err(e) => {
                log_error(format!("Suggestion failed: {}", e));
                log_warning("Falling back to the unconfigured table");
            }
        }
    }

    Ok((ViewConfig::default(), false))
}

/// Ask the oracle for a configuration over the parsed table.
pub async fn suggest_for(parsed: &ParseResult, preview_rows: usize) -> SuggestResult<ViewConfig> {
    let client = AiClient::from_env()?;
    let preview_count = preview_rows.min(parsed.rows.len());
    let preview: &[Row] = &parsed.rows[..preview_count];
    client.suggest_config(preview, &parsed.rows, &parsed.headers).await
}

/// Load a view configuration file, schema-checking it first.
pub fn load_config(path: impl AsRef<Path>, skip_validation: bool) -> ConfigResult<ViewConfig> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let value: Value = serde_json::from_str(&content)?;
    parse_config_value(value, skip_validation)
}

/// Turn a JSON value into a configuration, schema-checking it first.
///
/// `null` is the empty configuration.
pub fn parse_config_value(value: Value, skip_validation: bool) -> ConfigResult<ViewConfig> {
    if value.is_null() {
        return Ok(ViewConfig::default());
    }
    if !skip_validation {
        validate_view_config(&value).map_err(|errors| ConfigError::SchemaError { errors })?;
    }
    Ok(serde_json::from_value(value)?)
}

/// Load a column type declaration file.
pub fn load_column_types(path: impl AsRef<Path>) -> ConfigResult<ColumnTypes> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::config::AggregationKind;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_options() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.preview_rows, 10);
        assert!(!opts.suggest);
        assert!(!opts.skip_validation);
    }

    #[test]
    fn test_load_config() {
        let file = write_temp(r#"{"groupings": [{"column": "site"}], "summaries": [{"column": "qty", "aggregationKind": "sum"}]}"#);
        let config = load_config(file.path(), false).unwrap();
        assert_eq!(config.groupings[0].column, "site");
        assert_eq!(config.summaries[0].aggregation_kind, AggregationKind::Sum);
    }

    #[test]
    fn test_load_config_schema_error() {
        let file = write_temp(r#"{"groupings": [{"col": "site"}]}"#);
        assert!(matches!(load_config(file.path(), false), Err(ConfigError::SchemaError { .. })));
    }

    #[test]
    fn test_load_config_skip_validation_still_needs_shape() {
        let file = write_temp(r#"{"groupings": [{"col": "site"}]}"#);
        assert!(matches!(load_config(file.path(), true), Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_duplicate_aggregation_keys_are_a_schema_error() {
        let value = serde_json::json!({
            "summaries": [{"column": "qty", "aggregationKind": "sum", "type": "sum"}]
        });
        assert!(matches!(parse_config_value(value, false), Err(ConfigError::SchemaError { .. })));
    }

    #[test]
    fn test_null_config_is_empty() {
        assert!(parse_config_value(Value::Null, false).unwrap().is_empty());
    }

    #[test]
    fn test_load_column_types() {
        let file = write_temp(r#"{"numeric": ["qty"], "date": ["received"]}"#);
        let types = load_column_types(file.path()).unwrap();
        assert!(types.numeric.contains("qty"));
        assert!(types.date.contains("received"));
    }

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter('\t'), "TAB");
        assert_eq!(format_delimiter(';'), ";");
    }

    #[tokio::test]
    async fn test_process_bytes_with_config_file() {
        let config = write_temp(r#"{"groupings": [{"column": "site"}], "summaries": [{"column": "qty", "aggregationKind": "sum"}]}"#);
        let types = write_temp(r#"{"numeric": ["qty"]}"#);
        let options = PipelineOptions {
            config_path: Some(config.path().to_string_lossy().to_string()),
            column_types_path: Some(types.path().to_string_lossy().to_string()),
            ..Default::default()
        };

        let output = process_bytes(b"site;qty\nA;5\nA;3\nB;2\n", options).await.unwrap();

        assert!(!output.suggested);
        assert_eq!(output.csv_info.row_count, 3);
        assert_eq!(output.table.columns, vec!["site", "qty_sum"]);
        assert_eq!(output.table.processed_data[0]["qty_sum"], 8);
        assert_eq!(output.table.grand_total_row.unwrap()["qty_sum"], 10);
    }

    #[tokio::test]
    async fn test_process_bytes_without_config() {
        let output = process_bytes(b"a,b\nx,1\ny,2\n", PipelineOptions::default()).await.unwrap();
        assert_eq!(output.table.columns, vec!["a", "b"]);
        assert_eq!(output.table.row_count(), 2);
        assert!(output.config.is_empty());
    }
}
