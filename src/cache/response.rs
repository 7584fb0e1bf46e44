//! Two-tier response cache facade.
//!
//! [`ResponseCache`] composes the memory and disk tiers behind one
//! lookup/store API. Lookup order is memory → disk → fallback; a disk hit
//! is promoted (copied) into the memory tier so later lookups skip disk
//! I/O, and a computed result is written to every enabled tier before it
//! is returned.
//!
//! # Concurrency
//!
//! Any number of callers may invoke [`ResponseCache::get_or_compute`]
//! concurrently; each tier synchronizes internally. Concurrent calls for
//! the *same* key are not deduplicated — the underlying calls may be
//! non-idempotent side-effecting operations the cache does not own, so
//! racing fallbacks are allowed and the last writer wins.
//! [`ResponseCache::reconfigure`] takes `&mut self`, so the borrow checker
//! rules out reconfiguring while operations are in flight.
//!
//! # Degradation
//!
//! A disk directory that cannot be initialized downgrades the cache to
//! memory-only with a warning; it never aborts construction. Records that
//! fail to decode are treated as misses and deleted opportunistically.
//! Fallback errors are never caught or cached — they propagate unchanged
//! and nothing is stored for that key.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::key::CacheKey;
use crate::telemetry;

use super::{DiskTier, MemoryTier};

/// Two-tier cache for expensive remote-call responses.
///
/// `V` is the response type; it crosses the disk boundary as JSON.
pub struct ResponseCache<V> {
    config: CacheConfig,
    memory: Option<MemoryTier<V>>,
    disk: Option<Arc<DiskTier>>,
}

impl<V> ResponseCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Build a cache from `config`.
    ///
    /// Fails only on a configuration conflict (disk tier and external
    /// cache both enabled). An unusable disk directory is downgraded to a
    /// warning and the cache runs without the disk tier.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let memory = config
            .enable_memory_cache
            .then(|| MemoryTier::new(config.memory_max_entries));

        let disk = if config.enable_disk_cache {
            match DiskTier::open(&config.disk_cache_dir, config.disk_size_limit_bytes) {
                Ok(tier) => Some(Arc::new(tier)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        dir = %config.disk_cache_dir.display(),
                        "disk cache unavailable, continuing with the disk tier disabled"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            config,
            memory,
            disk,
        })
    }

    /// Look up a cached response.
    ///
    /// Probes the memory tier, then the disk tier; a disk hit is promoted
    /// into the memory tier. Emits a hit counter labelled with the tier
    /// that answered, or a miss counter when neither did.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        if let Some(memory) = &self.memory {
            if let Some(value) = memory.get(key) {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "memory").increment(1);
                tracing::debug!(key = %key, "memory cache hit");
                return Some(value);
            }
        }

        if let Some(disk) = &self.disk {
            if let Some(payload) = Self::disk_read(disk, key).await {
                match serde_json::from_slice::<V>(&payload) {
                    Ok(value) => {
                        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "disk")
                            .increment(1);
                        tracing::debug!(key = %key, "disk cache hit");
                        if let Some(memory) = &self.memory {
                            memory.put(*key, value.clone());
                        }
                        return Some(value);
                    }
                    Err(e) => {
                        // EntryCorruption: undecodable record counts as a
                        // miss and is dropped so it cannot hurt again.
                        tracing::warn!(key = %key, error = %e, "corrupt cache entry, dropping");
                        Self::disk_remove(disk, key).await;
                    }
                }
            }
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        tracing::debug!(key = %key, "cache miss");
        None
    }

    /// Store a response in every enabled tier.
    ///
    /// Disk serialization or write failures degrade to a warning; the
    /// memory tier write is unaffected.
    pub async fn put(&self, key: &CacheKey, value: V) {
        if let Some(disk) = &self.disk {
            match serde_json::to_vec(&value) {
                Ok(payload) => {
                    Self::disk_write(disk, key, payload).await;
                    metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "tier" => "disk").increment(1);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to serialize cache entry");
                }
            }
        }

        if let Some(memory) = &self.memory {
            memory.put(*key, value);
            metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "tier" => "memory").increment(1);
        }
    }

    /// Return the cached response for `key`, or compute and cache it.
    ///
    /// On a full miss `fallback` is invoked exactly once for this call; a
    /// fallback error propagates unchanged and nothing is stored. There is
    /// no cross-call deduplication: concurrent calls for the same key may
    /// each invoke their fallback, and the last writer wins.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &CacheKey, fallback: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = fallback().await?;
        self.put(key, value.clone()).await;
        Ok(value)
    }

    /// Clear every enabled tier.
    ///
    /// Blocking: removes the disk tier's files on the calling thread.
    pub fn reset(&self) {
        if let Some(memory) = &self.memory {
            memory.reset();
        }
        if let Some(disk) = &self.disk {
            disk.reset();
        }
    }

    /// Replace the active configuration, discarding the current tiers and
    /// constructing fresh ones. Existing memory entries are not migrated.
    ///
    /// Requires exclusive access: reconfiguration is not safe concurrently
    /// with in-flight cache operations, and `&mut self` enforces that. A
    /// validation failure leaves the cache untouched.
    pub fn reconfigure(&mut self, config: CacheConfig) -> Result<()> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// The active configuration snapshot.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether the memory tier is active.
    pub fn memory_enabled(&self) -> bool {
        self.memory.is_some()
    }

    /// Whether the disk tier is active (configured on and successfully
    /// initialized).
    pub fn disk_enabled(&self) -> bool {
        self.disk.is_some()
    }

    /// Total bytes currently held by the disk tier; zero when disabled.
    pub fn disk_size_bytes(&self) -> u64 {
        self.disk.as_ref().map_or(0, |disk| disk.size_bytes())
    }

    // Disk I/O is blocking; route it through the blocking pool so memory
    // tier operations on other tasks never stall behind it.

    async fn disk_read(disk: &Arc<DiskTier>, key: &CacheKey) -> Option<Vec<u8>> {
        let disk = Arc::clone(disk);
        let key = *key;
        match tokio::task::spawn_blocking(move || disk.get(&key)).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "disk cache read task failed");
                None
            }
        }
    }

    async fn disk_write(disk: &Arc<DiskTier>, key: &CacheKey, payload: Vec<u8>) {
        let disk = Arc::clone(disk);
        let key = *key;
        let outcome = tokio::task::spawn_blocking(move || disk.put(&key, &payload)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(key = %key, error = %e, "disk cache write failed"),
            Err(e) => tracing::warn!(error = %e, "disk cache write task failed"),
        }
    }

    async fn disk_remove(disk: &Arc<DiskTier>, key: &CacheKey) {
        let disk = Arc::clone(disk);
        let key = *key;
        if let Err(e) = tokio::task::spawn_blocking(move || disk.remove(&key)).await {
            tracing::warn!(error = %e, "disk cache remove task failed");
        }
    }
}
