//! Content-address derivation for cache keys and vector point ids.
//!
//! Every memoized computation is keyed by [`content_key`] of its inputs: the inputs are
//! serialized to JSON, object keys are sorted recursively, and the canonical text is hashed
//! with BLAKE3. Two logically identical inputs therefore map to the same key regardless of
//! the order in which their fields were produced.

use serde::Serialize;
use serde_json::{Map, Value};

/// Rebuilds `value` with every object's keys in sorted order.
///
/// `serde_json` may be compiled with `preserve_order` by another crate in the graph, so the
/// ordering is enforced here instead of relying on the default map type.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                sorted.insert(key, canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes `value` to compact JSON with sorted object keys.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize(value))
}

/// Returns the lowercase hex BLAKE3 digest of the canonical JSON form of `value`.
#[inline]
pub fn content_key<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(value)?;
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Used for vector point ids, where a rare collision only overwrites a point in the index.
/// Cache keys always use the full digest from [`content_key`].
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Stable point id for a trial identifier (e.g. an NCT number).
#[inline]
pub fn trial_point_id(trial_id: &str) -> u64 {
    hash_to_u64(trial_id.trim().to_uppercase().as_bytes())
}
