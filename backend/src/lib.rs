//! # Tableshape - grouped, summarized and filtered views of uploaded tables
//!
//! Tableshape reads CSV files (any common encoding and separator) and turns
//! the rows into a derived table: rows are filtered, grouped by a composite
//! key, summarized per group and closed by a grand total row.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Transform  │────▶│  Processed  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (filter/grp)│     │    table    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                ▲
//!                                    ViewConfig (file or AI)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tableshape::{process_table, AggregationKind, ColumnTypes, Row, ViewConfig};
//! use serde_json::json;
//!
//! let rows: Vec<Row> = serde_json::from_value(json!([
//!     {"site": "North", "qty": "5"},
//!     {"site": "North", "qty": "3"},
//!     {"site": "South", "qty": "2"}
//! ])).unwrap();
//!
//! let config = ViewConfig::new()
//!     .group_by("site")
//!     .summarize("qty", AggregationKind::Sum);
//! let types = ColumnTypes::new().with_numeric(["qty"]);
//!
//! let table = process_table(&rows, &config, &types);
//! assert_eq!(table.columns, vec!["site", "qty_sum"]);
//! assert_eq!(table.grand_total_row.unwrap()["qty_sum"], 10);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Rows, column types and the processed table
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Coercion, filtering, grouping, columns and pipeline
//! - [`validation`] - View configuration schema validation
//! - [`export`] - CSV export of processed tables
//! - [`ai`] - AI-suggested configurations
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Export
pub mod export;

// AI
pub mod ai;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, ExportError, PipelineError, ServerError, SuggestError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{ColumnKind, ColumnTypes, DerivedRow, ProcessedTable, Row, RowNote};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use transform::{
    apply_filters, coerce, derive_columns, example_config, group_and_aggregate, kinds_description,
    process_table, AggregationKind, FilterSpec, GroupingSpec, PredicateKind, SummarizationSpec,
    TypedValue, ViewConfig, GROUP_KEY_SEPARATOR,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv, parse_file_auto,
    parse_file_with_delimiter, ParseResult,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid_view_config, validate_view_config};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{to_csv, write_csv};

// =============================================================================
// Re-exports - AI Client
// =============================================================================

pub use ai::{suggest_config, AiClient};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    load_column_types, load_config, process_bytes, process_file, process_parsed, CsvInfo,
    PipelineOptions, PipelineOutput,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ProcessRequest, ResponseMetadata, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
