use thiserror::Error;

use crate::cache::CacheError;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("failed to derive evaluation cache key: {0}")]
    Key(#[from] serde_json::Error),

    #[error("evaluation cache write failed: {0}")]
    Cache(#[from] CacheError),
}
