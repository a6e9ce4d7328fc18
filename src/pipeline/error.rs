use thiserror::Error;

use crate::cache::CacheError;
use crate::retrieval::RetrievalError;
use crate::verifier::VerifierError;

/// Errors that fail one patient's run. A batch reports them and moves on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid patient record: {reason}")]
    InvalidPatient { reason: String },

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Only fatal verifier errors surface here; the rest degrade to a conservative verdict.
    #[error("verification failed: {0}")]
    Verifier(#[from] VerifierError),

    #[error("result commit failed: {0}")]
    Persist(#[from] CacheError),
}
