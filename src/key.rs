//! Request fingerprint keys.
//!
//! A [`CacheKey`] is a SHA-256 digest of the canonical JSON form of a
//! request's parameters: object keys are sorted lexicographically at every
//! nesting level before hashing, so two requests that differ only in field
//! order produce the same key. The digest is stable across processes and
//! restarts, which is what lets the disk tier survive them.
//!
//! The cache itself never inspects request semantics — it only requires
//! keys to be deterministic (same logical request → same key) and unique
//! (distinct requests → different keys with overwhelming probability).

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Deterministic fingerprint of a request's parameters.
///
/// Opaque 32-byte value. Equality and hashing are exact; no normalization
/// happens after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Wrap an externally produced 32-byte digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fingerprint a request-parameter value.
    ///
    /// The value is rewritten into canonical form (object keys sorted at
    /// every level) and the SHA-256 of its JSON serialization becomes the
    /// key, so field order in the input never affects the result.
    pub fn of_request(request: &Value) -> Result<Self> {
        let canonical = canonicalize(request);
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(Self(Sha256::digest(&bytes).into()))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex digest. Used as the filename stem for disk
    /// records.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CacheKey {
    /// Abbreviated hex digest, for log lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.hex();
        write!(f, "{}", &full[..16])
    }
}

/// Rebuild a JSON value with object keys in sorted order at every level.
///
/// `serde_json`'s map is key-sorted by default, but that is a feature flag
/// away from insertion order (`preserve_order`), so the sort is done
/// explicitly rather than relied upon.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::with_capacity(keys.len());
            for key in keys {
                out.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
