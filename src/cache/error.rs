use std::path::PathBuf;
use thiserror::Error;

use super::Namespace;

#[derive(Debug, Error)]
/// Errors returned by the content-addressed cache.
///
/// Only the write path surfaces errors; reads degrade to a miss.
pub enum CacheError {
    /// Filesystem operation failed.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized for storage.
    #[error("failed to serialize value for {namespace}/{key}: {source}")]
    Serialization {
        /// Target namespace.
        namespace: Namespace,
        /// Target key.
        key: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The namespace file exists but is not a JSON object; writing would drop its entries.
    #[error("namespace file {path} is corrupt: {reason}")]
    CorruptNamespace {
        /// Namespace file.
        path: PathBuf,
        /// Parse failure.
        reason: String,
    },

    /// A committed value exists but no longer decodes into the expected type.
    #[error("committed value for {namespace}/{key} does not decode: {reason}")]
    IncompatibleEntry {
        /// Namespace.
        namespace: Namespace,
        /// Key.
        key: String,
        /// Decode failure.
        reason: String,
    },
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
