use std::time::Duration;

use thiserror::Error;

use crate::reliability::Retryable;

#[derive(Debug, Error)]
/// Errors returned by trial index operations.
pub enum VectorDbError {
    /// Could not connect to the Qdrant endpoint.
    #[error("failed to connect to Qdrant at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Search failed.
    #[error("failed to search in '{collection}': {message}")]
    SearchFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// The call did not finish within its timeout.
    #[error("trial index call timed out after {after:?}")]
    Timeout {
        /// Per-attempt timeout.
        after: Duration,
    },
}

impl Retryable for VectorDbError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            VectorDbError::ConnectionFailed { .. }
                | VectorDbError::SearchFailed { .. }
                | VectorDbError::Timeout { .. }
        )
    }

    fn timed_out(after: Duration) -> Self {
        VectorDbError::Timeout { after }
    }
}
