use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} {message}")]
    Status { status: StatusCode, message: String },

    #[error("retry exhausted after {attempts} reconnect attempts (last_error: {last_error})")]
    RetryExhausted { attempts: u32, last_error: String },
}

impl ForgeApiError {
    /// Builds a status error, keeping a short body excerpt as the message.
    pub fn status(status: StatusCode, body: &str) -> Self {
        Self::Status {
            status,
            message: status_message(status, body),
        }
    }
}

/// Human-readable message for a non-success response.
///
/// Falls back to the canonical reason phrase when the body is blank.
pub fn status_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }

    const MAX_BODY_CHARS: usize = 512;
    if body.chars().count() > MAX_BODY_CHARS {
        let excerpt: String = body.chars().take(MAX_BODY_CHARS).collect();
        format!("{excerpt}...")
    } else {
        body.to_string()
    }
}
