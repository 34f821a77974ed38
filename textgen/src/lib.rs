//! Minimal generative-text client.
//!
//! This crate provides a focused, non-streaming client for a hosted
//! Messages API with:
//! - Single-prompt completions returning plain text
//! - Bounded request and connect timeouts
//! - Error classification so callers can tell a missing model apart from
//!   a rejected key

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when using the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of a failed call.
///
/// Callers use this to decide whether to try another model, give up on the
/// service entirely, or just skip this one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The requested model does not exist or is not available to this key.
    ModelNotFound,
    /// The key is missing, invalid, or lacks permission.
    Auth,
    /// Anything else (network, rate limit, server error, bad payload).
    Other,
}

impl Error {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::NoApiKey => ErrorClass::Auth,
            Error::Api { status: 404, .. } => ErrorClass::ModelNotFound,
            Error::Api {
                status: 401 | 403, ..
            } => ErrorClass::Auth,
            Error::Api { message, .. } => classify_message(message),
            Error::Config(message) => classify_message(message),
            Error::Network(_) | Error::Parse(_) => ErrorClass::Other,
        }
    }
}

/// Classify a raw provider error message.
///
/// Providers disagree on status codes for these cases, so the message text
/// is checked for the usual markers.
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();

    // Auth first: "API key not found" must not read as a missing model.
    if message.contains("PERMISSION_DENIED")
        || lower.contains("permission")
        || lower.contains("authentication")
        || lower.contains("api key")
        || lower.contains("invalid key")
        || lower.contains("invalid x-api-key")
        || has_status(message, "401")
        || has_status(message, "403")
    {
        return ErrorClass::Auth;
    }

    if message.contains("NOT_FOUND")
        || lower.contains("not found")
        || lower.contains("not_found")
        || has_status(message, "404")
    {
        return ErrorClass::ModelNotFound;
    }

    ErrorClass::Other
}

/// Whether `code` appears in `message` as a whole number, so that dated
/// model names like `...-20240307` do not count.
fn has_status(message: &str, code: &str) -> bool {
    message.match_indices(code).any(|(at, _)| {
        let before = message[..at].chars().next_back();
        let after = message[at + code.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

/// Generative-text API client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    max_tokens: usize,
}

impl Client {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: build_http(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a client from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| Error::NoApiKey)?;
        if api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }
        Ok(Self::new(api_key.trim()))
    }

    /// Point the client at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = build_http(timeout);
        self
    }

    /// Set the maximum number of tokens per completion.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send a single-prompt completion and return its text.
    ///
    /// The returned text is trimmed; it may be empty if the model produced
    /// no text blocks.
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, Error> {
        let api_request = build_api_request(model, prompt, temperature, self.max_tokens);
        let headers = self.build_headers()?;

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(api_response.text())
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }
}

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn build_api_request(model: &str, prompt: &str, temperature: f32, max_tokens: usize) -> ApiRequest {
    ApiRequest {
        model: model.to_string(),
        max_tokens,
        messages: vec![ApiMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        temperature: temperature.clamp(0.0, 1.0),
    }
}

// ============================================================================
// API types (internal)
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: usize,
    messages: Vec<ApiMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ApiContent>,
}

impl ApiResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ApiContent::Text { text } => Some(text.as_str()),
                ApiContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
