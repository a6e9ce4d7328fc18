use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::Namespace;
use super::error::{CacheError, CacheResult};

/// Key-value contract every cache backend implements.
///
/// Entries are memoized results of deterministic computations: they never expire and a key
/// is only rewritten with the value it already holds.
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `(namespace, key)`. Backend failures read as a miss.
    fn get(&self, namespace: Namespace, key: &str) -> Option<Value>;

    /// Durably stores `value` under `(namespace, key)`.
    fn put(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<()>;

    /// Stores `value` only if the key is vacant and returns whichever value is committed.
    ///
    /// The check and the write happen under one lock, so concurrent callers for the same key
    /// all observe the first writer's value.
    fn put_if_absent(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<Value>;

    /// Returns `true` if `(namespace, key)` holds a value.
    fn contains(&self, namespace: Namespace, key: &str) -> bool {
        self.get(namespace, key).is_some()
    }
}

impl<S: CacheStore + ?Sized> CacheStore for std::sync::Arc<S> {
    fn get(&self, namespace: Namespace, key: &str) -> Option<Value> {
        (**self).get(namespace, key)
    }

    fn put(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<()> {
        (**self).put(namespace, key, value)
    }

    fn put_if_absent(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<Value> {
        (**self).put_if_absent(namespace, key, value)
    }

    fn contains(&self, namespace: Namespace, key: &str) -> bool {
        (**self).contains(namespace, key)
    }
}

/// Typed helpers layered over any [`CacheStore`].
pub trait CacheStoreExt: CacheStore {
    /// Loads and decodes a value. A value that fails to decode is reported and treated as a miss.
    fn load<T: DeserializeOwned>(&self, namespace: Namespace, key: &str) -> Option<T> {
        let value = self.get(namespace, key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(%namespace, key, error = %e, "Cached value does not decode, treating as miss");
                None
            }
        }
    }

    /// Encodes and stores a value.
    fn save<T>(&self, namespace: Namespace, key: &str, value: &T) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let encoded = encode(namespace, key, value)?;
        self.put(namespace, key, encoded)
    }

    /// First-write-wins commit: returns the existing value if one is present, otherwise stores
    /// and returns `value`.
    fn commit_once<T>(&self, namespace: Namespace, key: &str, value: &T) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let encoded = encode(namespace, key, value)?;
        let committed = self.put_if_absent(namespace, key, encoded)?;
        serde_json::from_value(committed).map_err(|e| CacheError::IncompatibleEntry {
            namespace,
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}

fn encode<T: Serialize + ?Sized>(namespace: Namespace, key: &str, value: &T) -> CacheResult<Value> {
    serde_json::to_value(value).map_err(|source| CacheError::Serialization {
        namespace,
        key: key.to_string(),
        source,
    })
}
