//! HTTP server for the tableshape API.
//!
//! The server is stateless: uploads return the parsed rows, and every later
//! request carries the rows and configuration it wants a view of.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/api/upload`     | Upload CSV, optionally ask for a config  |
//! | POST   | `/api/process`    | Rows + config → processed table (JSON)   |
//! | POST   | `/api/export`     | Rows + config → processed table (CSV)    |
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |

use axum::{
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, ProcessRequest, UploadResponse};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::export::to_csv;
use crate::models::ProcessedTable;
use crate::parser::parse_bytes_auto;
use crate::transform::pipeline::{parse_config_value, process_parsed, PipelineOptions};
use crate::transform::process_table;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Csv(_) | PipelineError::Config(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log_error(self.to_string());
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the application router
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/process", post(process))
        .route("/api/export", post(export))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> ServerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Tableshape server running on http://localhost:{}", port);
    println!("   POST /api/upload  - Upload CSV file");
    println!("   POST /api/process - Compute a view");
    println!("   POST /api/export  - Download a view as CSV");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tableshape",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "process": "POST /api/process",
            "export": "POST /api/export",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
///
/// Multipart fields: `file` (required) and `suggest` (`"true"` to ask the
/// oracle for a starting configuration).
async fn upload_csv(mut multipart: Multipart) -> ServerResult<Json<UploadResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut suggest = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "suggest" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                suggest = text.trim().eq_ignore_ascii_case("true");
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    log_info(format!(
        "New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let parsed = parse_bytes_auto(&bytes).map_err(PipelineError::from)?;
    let rows = parsed.rows.clone();

    let options = PipelineOptions {
        suggest,
        ..Default::default()
    };
    let output = process_parsed(parsed, options).await?;

    Ok(Json(UploadResponse::new(rows, output)))
}

/// Compute the processed table for a request body.
fn view_of(request: ProcessRequest) -> ServerResult<ProcessedTable> {
    let config = parse_config_value(request.config, false).map_err(PipelineError::from)?;
    Ok(process_table(&request.rows, &config, &request.column_types))
}

/// View endpoint (JSON)
async fn process(Json(request): Json<ProcessRequest>) -> ServerResult<Json<ProcessedTable>> {
    Ok(Json(view_of(request)?))
}

/// View endpoint (CSV download)
async fn export(Json(request): Json<ProcessRequest>) -> ServerResult<Response> {
    let table = view_of(request)?;
    let csv = to_csv(&table).map_err(PipelineError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"table.csv\""),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;

    fn request(config: Value) -> ProcessRequest {
        let rows: Vec<Row> = serde_json::from_value(json!([
            {"site": "A", "qty": "5"},
            {"site": "A", "qty": "3"},
            {"site": "B", "qty": "2"}
        ]))
        .unwrap();
        ProcessRequest {
            rows,
            config,
            column_types: serde_json::from_value(json!({"numeric": ["qty"]})).unwrap(),
        }
    }

    #[test]
    fn test_view_of_groups_rows() {
        let table = view_of(request(json!({
            "groupings": [{"column": "site"}],
            "summaries": [{"column": "qty", "aggregationKind": "sum"}]
        })))
        .unwrap();

        assert_eq!(table.columns, vec!["site", "qty_sum"]);
        assert_eq!(table.processed_data.len(), 2);
        assert_eq!(table.grand_total_row.unwrap()["qty_sum"], 10);
    }

    #[test]
    fn test_view_of_rejects_invalid_config() {
        let err = view_of(request(json!({"groupings": [{"col": "site"}]}))).unwrap_err();
        assert!(matches!(err, ServerError::Pipeline(PipelineError::Config(_))));
    }

    #[test]
    fn test_error_status_codes() {
        let response = ServerError::BadRequest("No file provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ServerError::Io(std::io::Error::other("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "tableshape");
    }
}
