//! Stratum - two-tier response cache for model inference calls
//!
//! Expensive, non-deterministic remote calls (LLM requests, embedding
//! batches) are addressed by a deterministic fingerprint of their
//! parameters and served from a bounded in-process memory tier backed by a
//! bounded on-disk tier that survives restarts. The cache never inspects
//! call semantics — it is a pure key→value store with policy around size,
//! persistence, and exclusivity against a host-provided external cache.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use stratum::{CacheConfig, CacheKey, ResponseCache};
//!
//! #[tokio::main]
//! async fn main() -> stratum::Result<()> {
//!     let cache: ResponseCache<String> = ResponseCache::new(
//!         CacheConfig::new().disk_cache_dir("/tmp/stratum"),
//!     )?;
//!
//!     let key = CacheKey::of_request(&json!({
//!         "model": "anthropic/claude-sonnet-4",
//!         "messages": [{"role": "user", "content": "What is the capital of France?"}],
//!     }))?;
//!
//!     let response = cache
//!         .get_or_compute(&key, || async {
//!             // the real model call goes here
//!             Ok::<_, stratum::StratumError>("Paris".to_string())
//!         })
//!         .await?;
//!
//!     println!("{response}");
//!     Ok(())
//! }
//! ```
//!
//! Lookups probe memory, then disk (promoting hits into memory), then the
//! fallback; results are stored in every enabled tier. Hit/miss telemetry
//! is emitted through the [`metrics`] facade using the names in
//! [`telemetry`].

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod telemetry;

// Re-export main types at crate root
pub use cache::{DiskTier, MemoryTier, ResponseCache};
pub use config::CacheConfig;
pub use error::{Result, StratumError};
pub use key::CacheKey;
