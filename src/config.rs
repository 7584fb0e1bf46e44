//! Cache configuration.
//!
//! [`CacheConfig`] is an immutable snapshot of enablement flags and limits,
//! fixed at cache construction time. Defaults for the disk directory and
//! byte limit can be overridden through the `STRATUM_CACHE_DIR` and
//! `STRATUM_CACHE_LIMIT` environment variables, read once per process.
//!
//! Validation enforces the one hard rule: the disk tier and a host-provided
//! external cache are mutually exclusive. Enabling both is a configuration
//! error surfaced before any cache operation executes, never a runtime
//! fallback.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::{Result, StratumError};

/// Environment variable overriding the default cache directory.
pub const CACHE_DIR_ENV: &str = "STRATUM_CACHE_DIR";

/// Environment variable overriding the default disk size limit (bytes).
pub const CACHE_LIMIT_ENV: &str = "STRATUM_CACHE_LIMIT";

/// Default disk tier size limit: 30 GB.
pub const DEFAULT_DISK_SIZE_LIMIT_BYTES: u64 = 30_000_000_000;

/// Default memory tier entry bound. Bounds memory, not correctness.
pub const DEFAULT_MEMORY_MAX_ENTRIES: usize = 1_000_000;

/// Configuration for a [`ResponseCache`](crate::ResponseCache).
///
/// ```rust
/// # use stratum::CacheConfig;
/// let config = CacheConfig::new()
///     .disk_cache_dir("/tmp/stratum")
///     .disk_size_limit_bytes(1_000_000_000)
///     .memory_max_entries(10_000);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether the persistent disk tier is enabled. Default: true.
    pub enable_disk_cache: bool,
    /// Whether the in-process memory tier is enabled. Default: true.
    pub enable_memory_cache: bool,
    /// Directory backing the disk tier. Default: the platform cache
    /// directory under `stratum/`, or `STRATUM_CACHE_DIR`.
    pub disk_cache_dir: PathBuf,
    /// Maximum total bytes for the disk tier. Default: 30 GB, or
    /// `STRATUM_CACHE_LIMIT`.
    pub disk_size_limit_bytes: u64,
    /// Maximum entry count for the memory tier. Default: 1,000,000.
    pub memory_max_entries: usize,
    /// Whether the host process runs its own request-level cache. Mutually
    /// exclusive with `enable_disk_cache`. Default: false.
    pub enable_external_cache: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_disk_cache: true,
            enable_memory_cache: true,
            disk_cache_dir: default_disk_cache_dir(),
            disk_size_limit_bytes: default_disk_size_limit(),
            memory_max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
            enable_external_cache: false,
        }
    }
}

impl CacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the disk tier.
    pub fn enable_disk_cache(mut self, enabled: bool) -> Self {
        self.enable_disk_cache = enabled;
        self
    }

    /// Enable or disable the memory tier.
    pub fn enable_memory_cache(mut self, enabled: bool) -> Self {
        self.enable_memory_cache = enabled;
        self
    }

    /// Set the directory backing the disk tier.
    pub fn disk_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.disk_cache_dir = dir.into();
        self
    }

    /// Set the maximum total bytes for the disk tier.
    pub fn disk_size_limit_bytes(mut self, bytes: u64) -> Self {
        self.disk_size_limit_bytes = bytes;
        self
    }

    /// Set the maximum entry count for the memory tier.
    pub fn memory_max_entries(mut self, entries: usize) -> Self {
        self.memory_max_entries = entries;
        self
    }

    /// Declare that the host process runs its own request-level cache.
    ///
    /// The disk tier must be disabled in that case; the memory tier may
    /// remain active independently.
    pub fn enable_external_cache(mut self, enabled: bool) -> Self {
        self.enable_external_cache = enabled;
        self
    }

    /// Enforce the exclusivity rule between the disk tier and a
    /// host-provided external cache.
    ///
    /// Fails fast at configure time; a failed validation has no side
    /// effects.
    pub fn validate(&self) -> Result<()> {
        if self.enable_disk_cache && self.enable_external_cache {
            return Err(StratumError::Configuration(
                "cannot enable both the external cache and the on-disk cache; \
                 set at most one of `enable_disk_cache` or `enable_external_cache`"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Default cache directory, resolved once per process.
fn default_disk_cache_dir() -> PathBuf {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        std::env::var(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::cache_dir()
                    .unwrap_or_else(|| PathBuf::from(".cache"))
                    .join("stratum")
            })
    })
    .clone()
}

/// Default disk size limit, resolved once per process.
fn default_disk_size_limit() -> u64 {
    static LIMIT: OnceLock<u64> = OnceLock::new();
    *LIMIT.get_or_init(|| match std::env::var(CACHE_LIMIT_ENV) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(
                value = %raw,
                "ignoring unparsable {CACHE_LIMIT_ENV}, using default limit"
            );
            DEFAULT_DISK_SIZE_LIMIT_BYTES
        }),
        Err(_) => DEFAULT_DISK_SIZE_LIMIT_BYTES,
    })
}
