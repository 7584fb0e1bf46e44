//! Bounded in-process memory tier.
//!
//! A strict LRU store: a `get` hit refreshes recency, and a `put` at
//! capacity evicts exactly the least-recently-used entry. Eviction order
//! is deterministic, unlike admission-policy caches, which keeps the
//! tier's behavior reasoned about rather than probabilistic.
//!
//! Thread-safe via a single internal mutex; callers never need external
//! synchronization. Entries vanish on process exit or [`MemoryTier::reset`].

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;

use crate::key::CacheKey;
use crate::telemetry;

/// Bounded, non-persistent key→value store with LRU eviction.
pub struct MemoryTier<V> {
    entries: Mutex<LruCache<CacheKey, V>>,
}

impl<V: Clone> MemoryTier<V> {
    /// Create a tier holding at most `max_entries` entries.
    ///
    /// A bound of zero is clamped to one; the bound limits memory, not
    /// correctness.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a value. A hit marks the entry most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Insert (or overwrite) a value, evicting the least-recently-used
    /// entry first when the tier is full.
    pub fn put(&self, key: CacheKey, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((evicted, _)) = entries.push(key, value) {
            // push also returns the old pair on overwrite; only a
            // different key means a capacity eviction.
            if evicted != key {
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "tier" => "memory")
                    .increment(1);
                tracing::debug!(key = %evicted, "memory tier evicted least recently used entry");
            }
        }
    }

    /// Drop every entry.
    pub fn reset(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the tier is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> CacheKey {
        CacheKey::from_bytes([byte; 32])
    }

    #[test]
    fn put_then_get_round_trip() {
        let tier: MemoryTier<String> = MemoryTier::new(10);
        tier.put(key(1), "value".to_string());
        assert_eq!(tier.get(&key(1)), Some("value".to_string()));
    }

    #[test]
    fn overwrite_replaces_without_duplicating() {
        let tier: MemoryTier<u32> = MemoryTier::new(10);
        tier.put(key(1), 1);
        tier.put(key(1), 2);
        assert_eq!(tier.len(), 1);
        assert_eq!(tier.get(&key(1)), Some(2));
    }

    #[test]
    fn bound_is_never_exceeded() {
        let tier: MemoryTier<u8> = MemoryTier::new(3);
        for byte in 0..20 {
            tier.put(key(byte), byte);
            assert!(tier.len() <= 3);
        }
    }

    #[test]
    fn evicts_least_recently_used() {
        // Bound 2: put A, B, C — A is the LRU and must be the one evicted.
        let tier: MemoryTier<&str> = MemoryTier::new(2);
        tier.put(key(b'A'), "a");
        tier.put(key(b'B'), "b");
        tier.put(key(b'C'), "c");

        assert_eq!(tier.get(&key(b'A')), None);
        assert_eq!(tier.get(&key(b'B')), Some("b"));
        assert_eq!(tier.get(&key(b'C')), Some("c"));
    }

    #[test]
    fn get_refreshes_recency() {
        let tier: MemoryTier<&str> = MemoryTier::new(2);
        tier.put(key(b'A'), "a");
        tier.put(key(b'B'), "b");
        // Touch A so B becomes the LRU.
        tier.get(&key(b'A'));
        tier.put(key(b'C'), "c");

        assert_eq!(tier.get(&key(b'A')), Some("a"));
        assert_eq!(tier.get(&key(b'B')), None);
    }

    #[test]
    fn reset_clears_everything() {
        let tier: MemoryTier<u8> = MemoryTier::new(10);
        tier.put(key(1), 1);
        tier.put(key(2), 2);
        tier.reset();
        assert!(tier.is_empty());
        assert_eq!(tier.get(&key(1)), None);
    }

    #[test]
    fn zero_bound_is_clamped() {
        let tier: MemoryTier<u8> = MemoryTier::new(0);
        tier.put(key(1), 1);
        assert_eq!(tier.len(), 1);
    }
}
