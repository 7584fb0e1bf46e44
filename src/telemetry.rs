//! Telemetry metric name constants.
//!
//! Centralised metric names for stratum cache operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `stratum_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `tier` — which tier the event occurred in: "memory" or "disk"

/// Total cache hits, per tier.
///
/// Labels: `tier` ("memory" | "disk").
pub const CACHE_HITS_TOTAL: &str = "stratum_cache_hits_total";

/// Total full cache misses (every enabled tier probed, fallback invoked).
pub const CACHE_MISSES_TOTAL: &str = "stratum_cache_misses_total";

/// Total cache writes, per tier. Promotion of a disk hit into the memory
/// tier is not counted as a write.
///
/// Labels: `tier` ("memory" | "disk").
pub const CACHE_WRITES_TOTAL: &str = "stratum_cache_writes_total";

/// Total entries evicted to stay within a tier's bound.
///
/// Labels: `tier` ("memory" | "disk").
pub const CACHE_EVICTIONS_TOTAL: &str = "stratum_cache_evictions_total";

/// Current total bytes held by the disk tier (gauge).
pub const DISK_CACHE_BYTES: &str = "stratum_disk_cache_bytes";
