//! Bounded in-memory front over a durable store.
//!
//! Entries are immutable once committed, so a read-through copy can never go stale; eviction
//! only costs a re-read from the backing store.

use moka::sync::Cache;
use serde_json::Value;

use super::Namespace;
use super::error::CacheResult;
use super::store::CacheStore;

/// [`CacheStore`] wrapper that keeps recently used entries in memory.
pub struct MemoizedStore<S: CacheStore> {
    hot: Cache<(Namespace, String), Value>,
    inner: S,
}

impl<S: CacheStore> MemoizedStore<S> {
    const DEFAULT_CAPACITY: u64 = 10_000;

    /// Wraps `inner` with the default hot-set capacity.
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY)
    }

    /// Wraps `inner`, keeping at most `capacity` entries in memory.
    pub fn with_capacity(inner: S, capacity: u64) -> Self {
        Self {
            hot: Cache::builder().max_capacity(capacity).build(),
            inner,
        }
    }

    /// Returns the backing store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of entries currently held in memory.
    pub fn hot_len(&self) -> u64 {
        self.hot.run_pending_tasks();
        self.hot.entry_count()
    }
}

impl<S: CacheStore> std::fmt::Debug for MemoizedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoizedStore")
            .field("hot_entries", &self.hot.entry_count())
            .finish_non_exhaustive()
    }
}

impl<S: CacheStore> CacheStore for MemoizedStore<S> {
    fn get(&self, namespace: Namespace, key: &str) -> Option<Value> {
        let hot_key = (namespace, key.to_string());
        if let Some(value) = self.hot.get(&hot_key) {
            return Some(value);
        }

        let value = self.inner.get(namespace, key)?;
        self.hot.insert(hot_key, value.clone());
        Some(value)
    }

    fn put(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<()> {
        self.inner.put(namespace, key, value.clone())?;
        self.hot.insert((namespace, key.to_string()), value);
        Ok(())
    }

    fn put_if_absent(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<Value> {
        let committed = self.inner.put_if_absent(namespace, key, value)?;
        self.hot
            .insert((namespace, key.to_string()), committed.clone());
        Ok(committed)
    }
}
