//! Caching subsystem.
//!
//! Two tiers behind one facade:
//!
//! - [`memory::MemoryTier`] — bounded, non-persistent in-process store with
//!   strict least-recently-used eviction. First tier probed on lookup.
//!
//! - [`disk::DiskTier`] — byte-bounded persistent store surviving process
//!   restarts. Probed on a memory miss; hits are promoted back into the
//!   memory tier.
//!
//! - [`response::ResponseCache`] — composes the tiers behind a single
//!   lookup/store API, enforces exclusivity against a host-provided
//!   external cache, and emits hit/miss telemetry.

pub mod disk;
pub mod memory;
pub mod response;

pub use disk::DiskTier;
pub use memory::MemoryTier;
pub use response::ResponseCache;
