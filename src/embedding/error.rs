use std::time::Duration;

use thiserror::Error;

use crate::reliability::Retryable;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid embedding response: {reason}")]
    InvalidResponse { reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid embedder configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("embedding timed out after {after:?}")]
    Timeout { after: Duration },
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::RequestFailed { .. } | EmbeddingError::Timeout { .. } => true,
            EmbeddingError::Status { status, .. } => *status == 429 || *status >= 500,
            EmbeddingError::InvalidResponse { .. }
            | EmbeddingError::DimensionMismatch { .. }
            | EmbeddingError::InvalidConfig { .. } => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        EmbeddingError::Timeout { after }
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::RequestFailed {
            reason: err.to_string(),
        }
    }
}
