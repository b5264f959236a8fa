//! Error types for the Tableshape pipeline.
//!
//! - [`CsvError`] - CSV decoding and parsing errors
//! - [`ConfigError`] - View configuration loading errors
//! - [`SuggestError`] - Suggestion oracle errors
//! - [`ExportError`] - Export encoding errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! The table engine itself is total and has no error type: malformed cells
//! degrade to zero or empty text. Everything here comes from the layers
//! around it. `From` implementations let `?` cross those boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while turning uploaded bytes into rows.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Bytes could not be decoded.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Malformed CSV record.
    #[error("Invalid CSV at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Only blank lines.
    #[error("No header row found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading a view configuration or column type declaration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read file.
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Not valid JSON, or JSON of the wrong shape.
    #[error("Invalid config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// JSON that violates the configuration schema.
    #[error("Config does not match schema: {}", .errors.join("; "))]
    SchemaError { errors: Vec<String> },
}

// =============================================================================
// Suggestion Oracle Errors
// =============================================================================

/// Errors from the configuration suggestion oracle.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// Missing API key.
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Provider returned an error.
    #[error("API error: {0}")]
    ApiError(String),

    /// Response body was not the expected JSON.
    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    /// Response text held no usable configuration.
    #[error("Failed to parse suggestion: {0}")]
    ParseError(String),

    /// Suggested configuration violates the schema.
    #[error("Suggestion does not match schema: {}", .errors.join("; "))]
    SchemaError { errors: Vec<String> },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while encoding a processed table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Export IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Output was not valid UTF-8.
    #[error("Export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Suggestion oracle error.
    #[error("Suggestion error: {0}")]
    Suggest(#[from] SuggestError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Socket or runtime failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for suggestion oracle calls.
pub type SuggestResult<T> = Result<T, SuggestError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // SuggestError -> PipelineError
        let suggest_err = SuggestError::MissingApiKey("ANTHROPIC_API_KEY not set".into());
        let pipeline_err: PipelineError = suggest_err.into();
        assert!(pipeline_err.to_string().contains("ANTHROPIC_API_KEY"));

        // PipelineError -> ServerError
        let server_err: ServerError = PipelineError::from(CsvError::NoHeaders).into();
        assert!(server_err.to_string().contains("header"));
    }

    #[test]
    fn test_schema_error_lists_every_violation() {
        let err = ConfigError::SchemaError {
            errors: vec!["missing column".into(), "bad type".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing column"));
        assert!(msg.contains("bad type"));
    }

    #[test]
    fn test_parse_error_format() {
        let err = CsvError::ParseError {
            line: 7,
            message: "unterminated quote".into(),
        };
        assert_eq!(err.to_string(), "Invalid CSV at line 7: unterminated quote");
    }
}
