use thiserror::Error;

use crate::cache::CacheError;
use crate::embedding::EmbeddingError;
use crate::reliability::Retryable;
use crate::vectordb::VectorDbError;

/// Errors that abort retrieval for one patient.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("trial search failed: {0}")]
    Search(#[from] VectorDbError),

    #[error("embedding cache write failed: {0}")]
    Cache(#[from] CacheError),
}

impl RetrievalError {
    /// Whether the underlying collaborator failure was transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            RetrievalError::Embedding(e) => e.is_retryable(),
            RetrievalError::Search(e) => e.is_retryable(),
            RetrievalError::Cache(_) => false,
        }
    }
}
