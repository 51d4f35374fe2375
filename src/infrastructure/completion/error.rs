//! Error classification for the messages API transport.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the HTTP transport, classified so the retry policy
/// can tell transient failures from permanent ones.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API key (401)")]
    InvalidApiKey,

    #[error("forbidden (403): {0}")]
    Forbidden(String),

    #[error("endpoint not found (404)")]
    NotFound,

    #[error("invalid request (400): {0}")]
    InvalidRequest(String),

    #[error("rate limit exceeded (429)")]
    RateLimitExceeded,

    #[error("server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("unexpected status ({status}): {body}")]
    Unexpected { status: u16, body: String },
}

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::InvalidApiKey,
            StatusCode::FORBIDDEN => Self::Forbidden(body),
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::BAD_REQUEST => Self::InvalidRequest(body),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimitExceeded,
            s if s.is_server_error() => Self::ServerError {
                status: s.as_u16(),
                body,
            },
            s => Self::Unexpected {
                status: s.as_u16(),
                body,
            },
        }
    }

    /// Transient errors are worth retrying; permanent ones fail fast.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError { .. } | Self::Timeout | Self::Network(_)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
