//! Failure taxonomy for everything that goes through the HTTP client.

use serde_json::Value;

pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
pub const NETWORK_MESSAGE: &str =
    "Unable to connect to server. Please check your internet connection.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Deadline elapsed before the response body was read; the request was dropped.
    #[error("Request timed out. Please try again.")]
    Timeout,

    /// The owner of the request went away.
    #[error("Request cancelled")]
    Cancelled,

    /// DNS, TCP or TLS failure, or the connection dropped mid-body.
    #[error("Unable to connect to server. Please check your internet connection.")]
    NetworkUnavailable { reason: String },

    /// Non-2xx response other than an intercepted 401.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<String>,
        code: Option<String>,
    },

    /// 401 on an authenticated request. The coordinator has already run.
    #[error("Session expired. Please sign in again.")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Unexpected response from server: {0}")]
    Decode(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Server-provided detail, if the error body carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Http { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Errors that are reported to nobody: the 401 flow and disposed owners.
    pub fn is_silent(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Cancelled)
    }

    /// Build an `Http` error from a non-2xx status and its (possibly empty) body.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let (detail, code) = extract_error_fields(body);
        let message = match (&detail, &code) {
            (Some(detail), Some(code)) => format!("{detail} ({code})"),
            (Some(detail), None) => detail.clone(),
            (None, Some(code)) => format!("HTTP error! status: {status} ({code})"),
            (None, None) => format!("HTTP error! status: {status}"),
        };

        ApiError::Http {
            status,
            message,
            detail,
            code,
        }
    }
}

/// Pull `detail`/`message` and `code` out of an error envelope.
///
/// A bare JSON string body is treated as the detail. Anything unparseable
/// yields nothing so the caller falls back to the synthesized status message.
fn extract_error_fields(body: &[u8]) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return (None, None),
    };

    match value {
        Value::String(text) => (non_blank(text), None),
        Value::Object(map) => {
            let detail = ["detail", "message"]
                .iter()
                .filter_map(|key| map.get(*key))
                .filter_map(|v| v.as_str())
                .find_map(|s| non_blank(s.to_string()));
            let code = map.get("code").and_then(|v| match v {
                Value::String(s) => non_blank(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            (detail, code)
        }
        _ => (None, None),
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
