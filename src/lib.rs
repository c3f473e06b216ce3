//! Shelf Cache - a pluggable cache layer
//!
//! Provides fetch-or-compute caching with TTL expiration, structured key
//! generation, and pattern-based invalidation over interchangeable
//! backends: in-memory, file-based, Redis, and null.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod service;

pub use backend::{CacheBackend, CacheStats, FileBackend, MemoryBackend, NullBackend, RedisBackend};
pub use config::{BackendKind, CacheConfig};
pub use error::{CacheError, Result};
pub use service::CacheService;
