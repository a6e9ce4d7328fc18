//! Cross-cutting, shared constants.
//!
//! # Dimension Invariants
//!
//! The embedder and the trial index must agree on the vector length. The default below matches
//! `text-embedding-3-small`; use [`validate_embedding_dim`] at the boundary where an embedder
//! is paired with a collection.

pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

pub const DEFAULT_COLLECTION_NAME: &str = "clinical-trials";
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_MAX_PATIENTS: usize = 5;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CRITIC_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Upper bound on conflict samples printed by the evaluate command.
pub const DEFAULT_CONFLICT_LIMIT: usize = 5;

/// Error returned when an embedder and an index disagree on vector length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use trialmatch::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// validate_embedding_dim(1536, DEFAULT_EMBEDDING_DIM).unwrap();
/// assert!(validate_embedding_dim(768, DEFAULT_EMBEDDING_DIM).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual == 0 {
        return Err(DimValidationError::ZeroDimension);
    }
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
