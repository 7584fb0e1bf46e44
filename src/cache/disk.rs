//! Byte-bounded persistent disk tier.
//!
//! Each entry is one payload file named after the key's hex digest, plus a
//! JSON index (`index.json`) recording per-entry byte size and a logical
//! last-used sequence number. The sequence number, not a wall-clock
//! timestamp, orders eviction: strictly increasing, immune to clock skew,
//! restored as `max + 1` on reopen.
//!
//! Crash safety: payloads and the index are written to a temp file and
//! renamed into place, and `open` reconciles the two — index records whose
//! payload vanished are dropped, payload files the index never heard of
//! are adopted. A crash between the two writes therefore costs at most one
//! entry's recency, never the tier.
//!
//! All operations synchronize on one internal mutex; reads and writes are
//! blocking I/O and are expected to run on a blocking-capable thread (the
//! facade routes them through `spawn_blocking`).

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StratumError};
use crate::key::CacheKey;
use crate::telemetry;

const INDEX_FILE: &str = "index.json";
const PAYLOAD_EXT: &str = "bin";

/// Index record for one stored payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    /// Payload size in bytes.
    size: u64,
    /// Logical recency marker; higher means more recently used.
    last_used: u64,
}

/// Persisted form of the index.
#[derive(Debug, Default, Deserialize)]
struct DiskIndex {
    entries: HashMap<String, IndexEntry>,
}

/// Borrowing twin of [`DiskIndex`] so persisting never clones the map.
#[derive(Serialize)]
struct DiskIndexSnapshot<'a> {
    entries: &'a HashMap<String, IndexEntry>,
}

/// In-memory accounting guarded by the tier mutex.
struct DiskState {
    entries: HashMap<String, IndexEntry>,
    total_bytes: u64,
    clock: u64,
}

/// Persistent, size-bounded key→payload store.
///
/// Lifetime spans process restarts; the directory is created lazily at
/// [`DiskTier::open`]. Total bytes never exceed the configured limit after
/// any single operation completes.
pub struct DiskTier {
    dir: PathBuf,
    size_limit_bytes: u64,
    state: Mutex<DiskState>,
}

impl DiskTier {
    /// Open (or create) the tier at `dir` with the given byte limit.
    ///
    /// Rebuilds accounting from `index.json`, reconciling it against the
    /// payload files actually present. Returns
    /// [`StratumError::TierUnavailable`] when the directory cannot be
    /// created or written — the caller decides whether that is fatal.
    pub fn open(dir: impl Into<PathBuf>, size_limit_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StratumError::TierUnavailable {
            path: dir.clone(),
            source,
        })?;

        let mut entries = load_index(&dir);
        let mut clock = entries.values().map(|e| e.last_used).max().unwrap_or(0);

        // Drop records whose payload is gone.
        entries.retain(|stem, _| payload_path(&dir, stem).is_file());

        // Adopt payloads the index never heard of (crash between payload
        // write and index write).
        for dentry in fs::read_dir(&dir)
            .map_err(|source| StratumError::TierUnavailable {
                path: dir.clone(),
                source,
            })?
            .flatten()
        {
            let path = dentry.path();
            if path.extension().is_none_or(|ext| ext != PAYLOAD_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if entries.contains_key(stem) {
                continue;
            }
            if let Ok(meta) = path.metadata() {
                clock += 1;
                tracing::debug!(file = %path.display(), "adopting orphaned cache payload");
                entries.insert(
                    stem.to_string(),
                    IndexEntry {
                        size: meta.len(),
                        last_used: clock,
                    },
                );
            }
        }

        let total_bytes = entries.values().map(|e| e.size).sum();
        let tier = Self {
            dir: dir.clone(),
            size_limit_bytes,
            state: Mutex::new(DiskState {
                entries,
                total_bytes,
                clock,
            }),
        };

        {
            let mut state = tier.lock_state();
            // The limit may have shrunk since the previous run.
            tier.evict_to_fit(&mut state, 0);
            // The first persist doubles as the writability check.
            tier.persist(&state)
                .map_err(|source| StratumError::TierUnavailable { path: dir, source })?;
            metrics::gauge!(telemetry::DISK_CACHE_BYTES).set(state.total_bytes as f64);
        }

        Ok(tier)
    }

    /// Look up the payload for `key`, refreshing its recency.
    ///
    /// A record with an unreadable payload is dropped and reported as a
    /// miss — one damaged entry never makes the tier unusable.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let stem = key.hex();
        let mut state = self.lock_state();
        state.entries.get(&stem)?;

        match fs::read(payload_path(&self.dir, &stem)) {
            Ok(payload) => {
                state.clock += 1;
                let clock = state.clock;
                if let Some(entry) = state.entries.get_mut(&stem) {
                    entry.last_used = clock;
                }
                if let Err(e) = self.persist(&state) {
                    tracing::warn!(error = %e, "failed to persist disk cache index");
                }
                Some(payload)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "unreadable disk cache entry, dropping");
                self.remove_locked(&mut state, &stem);
                if let Err(e) = self.persist(&state) {
                    tracing::warn!(error = %e, "failed to persist disk cache index");
                }
                None
            }
        }
    }

    /// Store `payload` under `key`, evicting least-recently-used entries
    /// until it fits.
    ///
    /// A payload larger than the whole tier is skipped with a warning
    /// rather than wedging the tier on an unsatisfiable eviction.
    pub fn put(&self, key: &CacheKey, payload: &[u8]) -> Result<()> {
        let size = payload.len() as u64;
        if size > self.size_limit_bytes {
            tracing::warn!(
                key = %key,
                size,
                limit = self.size_limit_bytes,
                "payload exceeds the disk cache size limit, not cached"
            );
            return Ok(());
        }

        let stem = key.hex();
        let mut state = self.lock_state();

        // Overwrites replace: retire the old record's accounting first.
        if let Some(old) = state.entries.remove(&stem) {
            state.total_bytes -= old.size;
        }
        self.evict_to_fit(&mut state, size);

        let path = payload_path(&self.dir, &stem);
        let tmp = path.with_extension("tmp");
        write_atomic(&tmp, &path, payload)?;

        state.clock += 1;
        let entry = IndexEntry {
            size,
            last_used: state.clock,
        };
        state.entries.insert(stem, entry);
        state.total_bytes += size;

        if let Err(e) = self.persist(&state) {
            tracing::warn!(error = %e, "failed to persist disk cache index");
        }
        metrics::gauge!(telemetry::DISK_CACHE_BYTES).set(state.total_bytes as f64);
        Ok(())
    }

    /// Delete the record for `key`, if present.
    ///
    /// Used by the facade to drop records that fail to deserialize.
    pub fn remove(&self, key: &CacheKey) {
        let stem = key.hex();
        let mut state = self.lock_state();
        if state.entries.contains_key(&stem) {
            self.remove_locked(&mut state, &stem);
            if let Err(e) = self.persist(&state) {
                tracing::warn!(error = %e, "failed to persist disk cache index");
            }
        }
    }

    /// Remove every persisted record, leaving a valid empty directory.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        for stem in state.entries.keys() {
            if let Err(e) = fs::remove_file(payload_path(&self.dir, stem)) {
                tracing::warn!(error = %e, "failed to remove cache payload during reset");
            }
        }
        state.entries.clear();
        state.total_bytes = 0;
        if let Err(e) = fs::remove_file(self.dir.join(INDEX_FILE)) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(error = %e, "failed to remove cache index during reset");
            }
        }
        metrics::gauge!(telemetry::DISK_CACHE_BYTES).set(0.0);
    }

    /// Total bytes currently held.
    pub fn size_bytes(&self) -> u64 {
        self.lock_state().total_bytes
    }

    /// Number of persisted records.
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    /// Whether the tier holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Directory backing this tier.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DiskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evict least-recently-used records until `incoming` more bytes fit.
    fn evict_to_fit(&self, state: &mut DiskState, incoming: u64) {
        while state.total_bytes + incoming > self.size_limit_bytes {
            let Some(stem) = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(stem, _)| stem.clone())
            else {
                break;
            };
            tracing::debug!(entry = %stem, "disk tier evicting least recently used entry");
            self.remove_locked(state, &stem);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "tier" => "disk").increment(1);
        }
    }

    fn remove_locked(&self, state: &mut DiskState, stem: &str) {
        if let Some(entry) = state.entries.remove(stem) {
            state.total_bytes -= entry.size;
            if let Err(e) = fs::remove_file(payload_path(&self.dir, stem)) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(error = %e, "failed to remove evicted cache payload");
                }
            }
        }
    }

    fn persist(&self, state: &DiskState) -> io::Result<()> {
        let snapshot = DiskIndexSnapshot {
            entries: &state.entries,
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(io::Error::other)?;
        let path = self.dir.join(INDEX_FILE);
        let tmp = self.dir.join(format!("{INDEX_FILE}.tmp"));
        write_atomic(&tmp, &path, &bytes)
    }
}

fn payload_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{PAYLOAD_EXT}"))
}

/// Write via temp file + rename so a crash never leaves a torn file.
fn write_atomic(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}

/// Load the index, tolerating a missing or corrupt file.
fn load_index(dir: &Path) -> HashMap<String, IndexEntry> {
    let path = dir.join(INDEX_FILE);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => return HashMap::new(),
    };
    match serde_json::from_slice::<DiskIndex>(&bytes) {
        Ok(index) => index.entries,
        Err(e) => {
            tracing::warn!(error = %e, "corrupt disk cache index, starting empty");
            HashMap::new()
        }
    }
}
