//! Error types for the Jira client.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Result type for Jira operations.
pub type JiraResult<T> = Result<T, JiraError>;

/// Errors raised while talking to Jira.
#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    /// Transport-level failure (connection refused, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 401 or 403.
    #[error("Authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// 400/422 or a request rejected before it was sent.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Request timed out")]
    Timeout,

    /// Any other non-success response.
    #[error("Jira API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl JiraError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Stable identifier reported to MCP clients as `error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Authentication { .. } => "authentication",
            Self::NotFound(_) => "not_found",
            Self::Validation { .. } => "validation",
            Self::RateLimited { .. } => "rate_limited",
            Self::Timeout => "timeout",
            Self::Api { .. } => "api",
            Self::Config(_) | Self::InvalidUrl(_) => "config",
            Self::Json(_) => "json",
        }
    }

    /// Map a non-success response onto the error taxonomy.
    pub fn from_response(status: u16, body: &str, retry_after_secs: Option<u64>) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
        let field_errors = parsed
            .as_ref()
            .map(|p| p.errors.clone())
            .unwrap_or_default();
        let message = parsed
            .as_ref()
            .and_then(ErrorResponse::message)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    trimmed.chars().take(500).collect()
                }
            });

        match status {
            401 | 403 => Self::Authentication { status, message },
            404 => Self::NotFound(message),
            400 | 422 => Self::Validation {
                message,
                field_errors,
            },
            429 => Self::RateLimited { retry_after_secs },
            _ => Self::Api { status, message },
        }
    }
}

/// Jira's error body: `{"errorMessages": [...], "errors": {"field": "message"}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "errorMessages", default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl ErrorResponse {
    fn message(&self) -> Option<String> {
        let mut parts: Vec<String> = self.error_messages.clone();
        parts.extend(self.errors.iter().map(|(k, v)| format!("{}: {}", k, v)));
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}
