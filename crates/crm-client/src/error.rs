//! Error types for the upstream client.

use crate::safety::sanitize_reqwest_error;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single upstream operation.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Client construction errors (invalid base URL, unusable API version header).
    #[error("config error: {0}")]
    Config(String),

    /// Operation arguments could not be read into the operation's argument type.
    #[error("invalid argument '{field}': {message}")]
    InvalidArguments { field: String, message: String },

    /// The upstream answered with a non-2xx status.
    #[error("API request failed with status {status}")]
    Status {
        status: u16,
        /// Parsed JSON error body, or the raw text as a JSON string.
        body: Value,
        /// Raw value of the upstream retry header, if any.
        retry_after: Option<String>,
    },

    /// No response at all (connect, DNS, TLS, body read).
    #[error("http transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body is not JSON.
    #[error("invalid upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// HTTP status of the upstream reply, when there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Build an [`UpstreamError::InvalidArguments`] from a serde failure.
///
/// serde reports missing fields as ``missing field `name` ``; that name becomes the `field`.
pub(crate) fn invalid_arguments(e: &serde_json::Error) -> UpstreamError {
    let message = e.to_string();
    let field = message
        .split('`')
        .nth(1)
        .filter(|_| message.starts_with("missing field"))
        .unwrap_or("arguments")
        .to_string();
    UpstreamError::InvalidArguments { field, message }
}
