// slackflow — Error type for Slack Web API calls

use thiserror::Error;

/// Every way a single Web API round trip can fail.
///
/// Errors are returned to the caller as-is; nothing in this crate retries.
#[derive(Error, Debug)]
pub enum SlackError {
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("slack api returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("slack api rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
    #[error("slack api error: {error}")]
    Api { error: String, messages: Vec<String> },
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid api url: {0}")]
    InvalidUrl(String),
    #[error("request cancelled")]
    Cancelled,
}

impl SlackError {
    /// The server-provided error code, if this is an application-level failure.
    pub fn api_error(&self) -> Option<&str> {
        match self {
            SlackError::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlackError>;
