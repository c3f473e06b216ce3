//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.
//!
//! Only two failure classes ever reach a caller: configuration errors
//! (unknown backend kind) and connection bootstrap errors (a remote store
//! that cannot be reached at construction time). Everything else is
//! recovered inside the backends and surfaced as the operation's miss
//! value.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend kind named in configuration is not recognized
    #[error("Unknown cache backend: {0}")]
    UnknownBackend(String),

    /// Initial connection to a remote store failed
    #[error("Cache backend connection failed: {0}")]
    Connection(String),

    /// Filesystem fault in the file backend
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored entry bytes are malformed (e.g. truncated header)
    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),

    /// Error reported by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
