//! AI module for view configuration suggestions
//!
//! Uses the Anthropic Messages API to look at an uploaded table and propose
//! groupings, summaries and filters. The answer is only a candidate: it is
//! schema-checked, stripped of columns the table does not have, and the
//! caller is free to ignore it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tableshape::ai::AiClient;
//! use tableshape::parser::parse_bytes_auto;
//!
//! let parsed = parse_bytes_auto(bytes)?;
//! let client = AiClient::from_env()?;
//! let config = client.suggest_config(&parsed.rows[..10], &parsed.rows, &parsed.headers).await?;
//! ```

pub mod prompt;

use serde::Deserialize;
use serde_json::Value;
use std::env;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{SuggestError, SuggestResult};
use crate::models::Row;
use crate::transform::ViewConfig;
use crate::validation::validate_view_config;

pub use prompt::{system_prompt, user_prompt};

/// Default model id, overridable with `TABLESHAPE_MODEL`.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic API client
#[derive(Clone)]
pub struct AiClient {
    api_key: String,
    model: String,
    max_tokens: u32,
}

/// Anthropic API response structure
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Anthropic API error response
#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Default number of retries
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

impl AiClient {
    /// Create a new client with explicit API key
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
        }
    }

    /// Create a client from `ANTHROPIC_API_KEY` (and optionally `TABLESHAPE_MODEL`)
    pub fn from_env() -> SuggestResult<Self> {
        let _ = dotenvy::dotenv();

        let api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| SuggestError::MissingApiKey("ANTHROPIC_API_KEY not set".to_string()))?;

        let client = Self::new(api_key);
        Ok(match env::var("TABLESHAPE_MODEL") {
            Ok(model) if !model.trim().is_empty() => client.with_model(model.trim()),
            _ => client,
        })
    }

    /// Set the model to use
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Suggest a view configuration for a table (with retries)
    ///
    /// # Arguments
    /// * `preview` - First N rows, shown verbatim
    /// * `all_rows` - Every row, used for per-column value samples
    /// * `headers` - Column names; specs naming other columns are dropped
    pub async fn suggest_config(
        &self,
        preview: &[Row],
        all_rows: &[Row],
        headers: &[String],
    ) -> SuggestResult<ViewConfig> {
        let mut last_error = None;

        for attempt in 1..=DEFAULT_MAX_RETRIES {
            match self.try_suggest(preview, all_rows, headers).await {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log_warning(format!("Attempt {}/{} failed: {}", attempt, DEFAULT_MAX_RETRIES, e));
                    let retryable = !matches!(e, SuggestError::MissingApiKey(_));
                    last_error = Some(e);

                    if !retryable {
                        break;
                    }
                    if attempt < DEFAULT_MAX_RETRIES {
                        log_info(format!("Retrying in {}ms...", RETRY_DELAY_MS));
                        tokio::time::sleep(tokio::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SuggestError::ApiError("Unknown error".to_string())))
    }

    /// Single attempt
    async fn try_suggest(&self, preview: &[Row], all_rows: &[Row], headers: &[String]) -> SuggestResult<ViewConfig> {
        let response = self.call_api(preview, all_rows, headers).await?;
        parse_config_from_response(&response, headers)
    }

    /// Call Anthropic API
    async fn call_api(&self, preview: &[Row], all_rows: &[Row], headers: &[String]) -> SuggestResult<String> {
        log_info(format!(
            "Calling Anthropic API (model {}, {} preview rows, {} total rows)",
            self.model,
            preview.len(),
            all_rows.len()
        ));

        let client = reqwest::Client::new();

        let request_body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "system": prompt::system_prompt(),
            "messages": prompt::build_messages(preview, all_rows, headers)
        });

        let response = client
            .post("https://api.anthropic.com/v1/messages")
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| SuggestError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SuggestError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<AnthropicError>(&body) {
                return Err(SuggestError::ApiError(error.error.message));
            }
            return Err(SuggestError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let response: AnthropicResponse =
            serde_json::from_str(&body).map_err(|e| SuggestError::InvalidJson(e.to_string()))?;

        let text = response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(SuggestError::InvalidJson("Empty response".to_string()));
        }

        log_success(format!("Received {} bytes", text.len()));
        Ok(text)
    }
}

/// Turn the model's answer into a configuration over known columns.
pub fn parse_config_from_response(response: &str, headers: &[String]) -> SuggestResult<ViewConfig> {
    let json_str = extract_json(response);

    let value: Value = serde_json::from_str(&json_str).map_err(|e| {
        SuggestError::ParseError(format!(
            "{}. Response was: {}",
            e,
            response.chars().take(500).collect::<String>()
        ))
    })?;

    validate_view_config(&value).map_err(|errors| SuggestError::SchemaError { errors })?;

    let config: ViewConfig =
        serde_json::from_value(value).map_err(|e| SuggestError::ParseError(e.to_string()))?;

    let restricted = config.restricted_to(headers);
    let dropped = spec_count(&config) - spec_count(&restricted);
    if dropped > 0 {
        log_warning(format!("Dropped {} suggested spec(s) naming unknown columns", dropped));
    }

    Ok(restricted)
}

fn spec_count(config: &ViewConfig) -> usize {
    config.groupings.len() + config.summaries.len() + config.filters.len()
}

/// Extract JSON from a response that may contain markdown code blocks
fn extract_json(text: &str) -> String {
    // Fenced block, with or without a language tag
    if let Some(start) = text.find("```") {
        let after_start = start + 3;
        let content_start = text[after_start..]
            .find('\n')
            .map(|i| after_start + i + 1)
            .unwrap_or(after_start);

        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim().to_string();
        }
    }

    // Raw JSON object
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

/// Convenience function (creates client internally)
pub async fn suggest_config(preview: &[Row], all_rows: &[Row], headers: &[String]) -> SuggestResult<ViewConfig> {
    let client = AiClient::from_env()?;
    client.suggest_config(preview, all_rows, headers).await
}
