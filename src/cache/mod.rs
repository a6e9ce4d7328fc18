//! Content-addressed, namespaced memoization cache.
//!
//! Keys come from [`crate::hashing::content_key`] over every semantic input of the cached
//! computation, so a key identifies its value for all time: entries are never evicted from
//! the durable backend and are only rewritten with identical content.
//!
//! - [`JsonFileStore`] persists one JSON object file per [`Namespace`].
//! - [`MemoryStore`] keeps everything in-process.
//! - [`MemoizedStore`] puts a bounded `moka` hot set in front of another store.
//!
//! Reads never fail (a damaged backend reads as a miss); writes propagate every error, since a
//! lost write breaks the at-most-once guarantee the pipeline relies on.

pub mod error;
pub mod file;
pub mod memoized;
pub mod memory;
pub mod namespace;
pub mod store;


pub use error::{CacheError, CacheResult};
pub use file::JsonFileStore;
pub use memoized::MemoizedStore;
pub use memory::MemoryStore;
pub use namespace::Namespace;
pub use store::{CacheStore, CacheStoreExt};
