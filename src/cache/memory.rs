use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use super::Namespace;
use super::error::CacheResult;
use super::store::CacheStore;

/// Process-local [`CacheStore`]. Nothing survives a restart; useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(Namespace, String), Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `namespace`.
    pub fn len(&self, namespace: Namespace) -> usize {
        self.entries
            .read()
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .count()
    }

    /// Returns `true` if no namespace holds any entry.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, namespace: Namespace, key: &str) -> Option<Value> {
        self.entries
            .read()
            .get(&(namespace, key.to_string()))
            .cloned()
    }

    fn put(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<()> {
        self.entries
            .write()
            .insert((namespace, key.to_string()), value);
        Ok(())
    }

    fn put_if_absent(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<Value> {
        let mut entries = self.entries.write();
        Ok(entries
            .entry((namespace, key.to_string()))
            .or_insert(value)
            .clone())
    }
}
