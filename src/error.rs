//! Stratum error types

use std::io;
use std::path::PathBuf;

/// Stratum error types
#[derive(Debug, thiserror::Error)]
pub enum StratumError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A cache tier could not be initialized (directory not creatable or
    /// not writable). The facade recovers by disabling that tier and
    /// continuing with reduced functionality.
    #[error("cache tier unavailable at {path}: {source}")]
    TierUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A persisted record could not be decoded. Lookups treat this as a
    /// miss; the damaged record may be deleted opportunistically.
    #[error("corrupt cache entry: {0}")]
    EntryCorruption(String),

    // Storage plumbing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for stratum operations
pub type Result<T> = std::result::Result<T, StratumError>;
