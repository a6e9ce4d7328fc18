use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::reliability::Retryable;

#[derive(Debug, Error)]
pub enum VerifierError {
    /// The chat backend failed to answer.
    #[error("chat completion failed: {message}")]
    Chat { message: String },

    /// The model answered, but not with the expected JSON object.
    #[error("unusable verifier reply: {reason}")]
    InvalidReply { reason: String },

    /// Inputs could not be serialized for the cache key.
    #[error("failed to derive verifier cache key: {0}")]
    Key(#[from] serde_json::Error),

    /// The verdict could not be memoized. Fatal for the patient.
    #[error("verdict cache write failed: {0}")]
    Cache(#[from] CacheError),

    #[error("verification timed out after {after:?}")]
    Timeout { after: Duration },
}

impl VerifierError {
    /// Cache write failures must fail the patient instead of degrading to a fallback verdict.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VerifierError::Cache(_))
    }
}

impl Retryable for VerifierError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            VerifierError::Chat { .. }
                | VerifierError::InvalidReply { .. }
                | VerifierError::Timeout { .. }
        )
    }

    fn timed_out(after: Duration) -> Self {
        VerifierError::Timeout { after }
    }
}
