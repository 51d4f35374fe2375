//! Domain errors for the recommender.

use thiserror::Error;

/// Domain-level errors that can occur in the recommender.
///
/// The taxonomy maps directly onto recovery behavior: `ToolResolution` is
/// recoverable inside the agent loop (it is fed back to the model as an
/// error-flagged tool result), `Completion` may be retried by the transport
/// layer, and the remaining variants are fatal for the current session.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("tool resolution failed: {0}")]
    ToolResolution(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("completion request failed: {0}")]
    Completion(String),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization: {err}"))
    }
}
