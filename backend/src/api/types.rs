//! REST API types for client integration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{ColumnTypes, Row};
use crate::transform::pipeline::{CsvInfo, PipelineOutput};
use crate::transform::ViewConfig;

/// Response sent after a file upload.
///
/// Rows are the parsed source rows; the client recomputes the view from them
/// whenever the configuration changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" or "error"
    pub status: String,

    /// Parsed rows, keys in source column order
    pub rows: Vec<Row>,

    /// Column names in source order
    pub headers: Vec<String>,

    /// Suggested configuration, when one was asked for and obtained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<ViewConfig>,

    pub metadata: ResponseMetadata,
}

/// Metadata about the upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub column_count: usize,
}

impl From<&CsvInfo> for ResponseMetadata {
    fn from(info: &CsvInfo) -> Self {
        Self {
            encoding: info.encoding.clone(),
            delimiter: info.delimiter.to_string(),
            row_count: info.row_count,
            column_count: info.headers.len(),
        }
    }
}

impl UploadResponse {
    pub fn new(rows: Vec<Row>, output: PipelineOutput) -> Self {
        UploadResponse {
            job_id: Uuid::new_v4().to_string(),
            status: "ready".to_string(),
            metadata: ResponseMetadata::from(&output.csv_info),
            headers: output.csv_info.headers,
            suggestion: output.suggested.then_some(output.config),
            rows,
        }
    }
}

/// Body of `/api/process` and `/api/export`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub rows: Vec<Row>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub column_types: ColumnTypes,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "rows": [],
        "headers": []
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let response = error_response("No file provided");
        assert_eq!(response["status"], "error");
        assert_eq!(response["error"], "No file provided");
        assert_eq!(response["rows"], json!([]));
        assert_eq!(response["headers"], json!([]));
    }

    #[test]
    fn test_process_request_defaults() {
        let request: ProcessRequest = serde_json::from_value(json!({"rows": [{"a": "1"}]})).unwrap();
        assert_eq!(request.rows.len(), 1);
        assert!(request.config.is_null());
        assert!(request.column_types.numeric.is_empty());
    }

    #[test]
    fn test_process_request_camel_case() {
        let request: ProcessRequest = serde_json::from_value(json!({
            "rows": [],
            "config": {"groupings": [{"column": "a"}]},
            "columnTypes": {"numeric": ["b"]}
        }))
        .unwrap();
        assert!(request.column_types.numeric.contains("b"));
        assert_eq!(request.config["groupings"][0]["column"], "a");
    }

    #[test]
    fn test_upload_response_omits_missing_suggestion() {
        let response = UploadResponse {
            job_id: "job".into(),
            status: "ready".into(),
            rows: vec![],
            headers: vec!["a".into()],
            suggestion: None,
            metadata: ResponseMetadata {
                encoding: "UTF-8".into(),
                delimiter: ",".into(),
                row_count: 0,
                column_count: 1,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("suggestion").is_none());
        assert_eq!(json["jobId"], "job");
        assert_eq!(json["metadata"]["columnCount"], 1);
    }
}
