//! JSON-file backend: one object file per namespace.
//!
//! Layout: `{root}/{namespace}.json`, each file a JSON object mapping keys to values.
//! Writes go through a uniquely named temp file and an atomic rename so a crash never leaves a
//! truncated namespace behind.
//!
//! A read-modify-write holds two locks: a process-wide mutex keyed by the namespace file, so
//! every store instance over the same directory queues behind it, and an advisory lock on
//! `{namespace}.json.lock` for other processes.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::Namespace;
use super::error::{CacheError, CacheResult};
use super::store::CacheStore;

const JSON_EXTENSION: &str = "json";

const LOCK_EXTENSION: &str = "json.lock";

type NamespaceLocks = Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

/// Write mutexes shared by every store in the process, keyed by canonical namespace file.
static NAMESPACE_LOCKS: LazyLock<NamespaceLocks> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Durable [`CacheStore`] rooted at a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `root`. The directory is created lazily on first write.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file backing `namespace`.
    pub fn namespace_path(&self, namespace: Namespace) -> PathBuf {
        self.root
            .join(format!("{}.{}", namespace.as_str(), JSON_EXTENSION))
    }

    fn lock_path(&self, namespace: Namespace) -> PathBuf {
        self.root
            .join(format!("{}.{}", namespace.as_str(), LOCK_EXTENSION))
    }

    fn ensure_root(&self) -> CacheResult<()> {
        fs::create_dir_all(&self.root).map_err(io_at(&self.root))
    }

    /// Process-wide mutex for `namespace`. Requires the root to exist.
    fn process_lock(&self, namespace: Namespace) -> Arc<Mutex<()>> {
        let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        let key = root.join(format!("{}.{}", namespace.as_str(), JSON_EXTENSION));

        NAMESPACE_LOCKS
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Takes the advisory lock shared with other processes. Released when the file drops.
    fn file_lock(&self, namespace: Namespace) -> CacheResult<File> {
        let path = self.lock_path(namespace);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_at(&path))?;
        file.lock().map_err(io_at(&path))?;
        Ok(file)
    }

    /// Runs a read-modify-write on `namespace` with both write locks held. `apply` reports
    /// whether it changed the map; only changed maps are written back.
    fn update<T>(
        &self,
        namespace: Namespace,
        apply: impl FnOnce(&mut Map<String, Value>) -> (T, bool),
    ) -> CacheResult<T> {
        self.ensure_root()?;
        let lock = self.process_lock(namespace);
        let _guard = lock.lock();
        let _file_lock = self.file_lock(namespace)?;

        let mut map = self.read_for_update(namespace)?;
        let (out, changed) = apply(&mut map);
        if changed {
            self.write_namespace(namespace, &map)?;
        }
        Ok(out)
    }

    /// Reads a namespace for lookup. Anything other than a readable JSON object is a miss.
    fn read_for_lookup(&self, namespace: Namespace) -> Option<Map<String, Value>> {
        let path = self.namespace_path(namespace);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache namespace unreadable, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                warn!(path = %path.display(), "Cache namespace is not a JSON object, treating as miss");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache namespace does not parse, treating as miss");
                None
            }
        }
    }

    /// Reads a namespace before modifying it. Unlike lookups, damage here is an error because
    /// rewriting the file would silently drop committed entries.
    fn read_for_update(&self, namespace: Namespace) -> CacheResult<Map<String, Value>> {
        let path = self.namespace_path(namespace);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(CacheError::CorruptNamespace {
                path,
                reason: format!("expected object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(CacheError::CorruptNamespace {
                path,
                reason: e.to_string(),
            }),
        }
    }

    fn write_namespace(&self, namespace: Namespace, map: &Map<String, Value>) -> CacheResult<()> {
        let final_path = self.namespace_path(namespace);

        let temp = NamedTempFile::new_in(&self.root).map_err(io_at(&self.root))?;
        let temp_path = temp.path().to_path_buf();
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, map).map_err(|e| CacheError::Io {
                path: temp_path.clone(),
                source: std::io::Error::other(e),
            })?;
            writer.flush().map_err(io_at(&temp_path))?;
        }
        temp.as_file().sync_all().map_err(io_at(&temp_path))?;

        temp.persist(&final_path)
            .map_err(|e| io_at(&final_path)(e.error))?;

        debug!(%namespace, entries = map.len(), "Cache namespace written");
        Ok(())
    }
}

impl CacheStore for JsonFileStore {
    fn get(&self, namespace: Namespace, key: &str) -> Option<Value> {
        self.read_for_lookup(namespace)?.remove(key)
    }

    fn put(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<()> {
        self.update(namespace, |map| {
            map.insert(key.to_string(), value);
            ((), true)
        })
    }

    fn put_if_absent(&self, namespace: Namespace, key: &str, value: Value) -> CacheResult<Value> {
        self.update(namespace, |map| {
            if let Some(existing) = map.get(key) {
                debug!(%namespace, key, "Key already committed, keeping first write");
                return (existing.clone(), false);
            }
            map.insert(key.to_string(), value.clone());
            (value, true)
        })
    }
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + use<> {
    let path = path.to_path_buf();
    move |source| CacheError::Io { path, source }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
