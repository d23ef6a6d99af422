//! Errors returned by the API client and how they are shown to users

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    /// The request never produced a response
    #[error("{0}")]
    Transport(String),

    /// Refresh failed after a 401; tokens have been cleared
    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Builds a status error from a raw response body
    pub fn from_response(status: u16, body: &str) -> Self {
        ApiError::Status {
            status,
            detail: extract_detail(body),
        }
    }

    /// Human-readable message, falling back to `fallback` when the server
    /// sent nothing useful
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status { detail: Some(detail), .. } => detail.clone(),
            ApiError::Status { .. } => fallback.to_string(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Transport("Request timed out".to_string())
        } else if e.is_connect() {
            ApiError::Transport(format!("Connection failed: {}", e))
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(format!("Request failed: {}", e))
        }
    }
}

/// Pulls a message out of an error body.
///
/// `detail` as a string wins; a `detail` array (validation errors) yields its
/// first `msg`; then a string `message`.
pub fn extract_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("detail") {
        Some(Value::String(detail)) => return Some(detail.clone()),
        Some(Value::Array(items)) => {
            let msg = items
                .first()
                .and_then(|item| item.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("Validation error");
            return Some(msg.to_string());
        }
        _ => {}
    }
    json.get("message").and_then(Value::as_str).map(str::to_string)
}

pub type ApiResult<T> = Result<T, ApiError>;
