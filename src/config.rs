//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Backend Kind ==
/// The concrete storage backend a [`crate::CacheService`] delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Mutex-guarded in-process hash map; default for development and tests
    Memory,
    /// One file per key under a sharded cache directory
    File,
    /// Remote Redis store with native TTL support
    Redis,
    /// Always-miss passthrough; disables caching without touching call sites
    Null,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "file" => Ok(BackendKind::File),
            "redis" => Ok(BackendKind::Redis),
            "null" => Ok(BackendKind::Null),
            other => Err(CacheError::UnknownBackend(other.to_string())),
        }
    }
}

// == Cache Config ==
/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. Constructed once at process start and passed to
/// [`crate::CacheService::from_config`]; there is no global mutable state.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Which backend to construct
    pub backend: BackendKind,
    /// Root directory for the file backend
    pub file_dir: PathBuf,
    /// Connection URL for the Redis backend
    pub redis_url: String,
    /// Connect timeout for the Redis backend
    pub redis_timeout: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - Backend kind: memory, file, redis, null (default: memory)
    /// - `CACHE_DIR` - File backend root directory (default: `<tmp>/shelf_cache`)
    /// - `REDIS_URL` - Redis connection URL (default: redis://127.0.0.1:6379)
    /// - `REDIS_TIMEOUT_SECS` - Redis connect timeout in seconds (default: 5)
    ///
    /// An unrecognized `CACHE_BACKEND` value is a configuration error, not a
    /// silent fallback; a cache that was asked for and cannot exist should
    /// fail at startup.
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("CACHE_BACKEND") {
            Ok(kind) => kind.parse()?,
            Err(_) => BackendKind::Memory,
        };

        Ok(Self {
            backend,
            file_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_cache_dir()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            redis_timeout: Duration::from_secs(
                env::var("REDIS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            file_dir: default_cache_dir(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_timeout: Duration::from_secs(5),
        }
    }
}

/// Process-local default location for the file backend.
fn default_cache_dir() -> PathBuf {
    env::temp_dir().join("shelf_cache")
}
