//! Cache Service Module
//!
//! Single entry point applications use. Owns the configured backend,
//! performs the byte codec round-trip so backends only ever see opaque
//! bytes, and provides fetch-or-compute semantics on top of the raw
//! operations.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{
    CacheBackend, CacheStats, FileBackend, MemoryBackend, NullBackend, RedisBackend,
};
use crate::codec;
use crate::config::{BackendKind, CacheConfig};
use crate::error::Result;

// == Cache Service ==
/// Facade over the configured backend.
///
/// Constructed once at process start and shared by reference; tests that
/// need a different backend construct another instance rather than mutating
/// shared state.
pub struct CacheService {
    backend: Box<dyn CacheBackend>,
}

impl CacheService {
    // == Constructors ==
    /// Builds the backend selected by `config` and wraps it.
    ///
    /// Fails on an unreachable file root or remote store; a cache that was
    /// configured but cannot exist is a startup error, not a silent no-op.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let backend: Box<dyn CacheBackend> = match config.backend {
            BackendKind::Memory => Box::new(MemoryBackend::new()),
            BackendKind::File => Box::new(FileBackend::new(&config.file_dir)?),
            BackendKind::Redis => Box::new(RedisBackend::new(
                &config.redis_url,
                config.redis_timeout,
            )?),
            BackendKind::Null => Box::new(NullBackend::new()),
        };

        info!(backend = backend.name(), "cache backend configured");
        Ok(Self { backend })
    }

    /// Wraps an already-constructed backend (used by tests and embedders).
    pub fn with_backend(backend: Box<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // == Fetch ==
    /// Returns the cached value for `key`, computing and storing it on a
    /// miss.
    ///
    /// On a hit the stored bytes are decoded and returned without invoking
    /// `compute`; an entry that fails to decode is purged and treated as a
    /// miss. On a miss `compute` runs exactly once; a `None` result is
    /// returned as-is and never stored, so "nothing to show" is re-computed
    /// on every call rather than cached.
    ///
    /// Concurrent callers missing on the same key each run their own
    /// compute; there is no cross-caller single-flight deduplication.
    ///
    /// # Arguments
    /// * `key` - Cache key, typically built by [`crate::keys`]
    /// * `ttl` - Entry lifetime; `None` means "never expires"
    /// * `compute` - Closure producing the value on a miss
    pub fn fetch<T, F>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Option<T>,
    {
        if let Some(value) = self.get(key) {
            debug!(key, "cache hit");
            return Some(value);
        }

        debug!(key, "cache miss");
        let value = compute()?;
        self.store(key, &value, ttl);
        Some(value)
    }

    // == Get ==
    /// Decoded value for `key`, or `None` when absent, expired, or
    /// undecodable (undecodable entries are purged).
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.backend.get(key)?;
        match codec::decode(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, %err, "purging undecodable cache entry");
                self.backend.delete(&[key]);
                None
            }
        }
    }

    // == Set ==
    /// Encodes and stores `value` under `key`, replacing any existing
    /// entry. Returns false if encoding or the backend write failed.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        self.store(key, value, ttl)
    }

    fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        match codec::encode(value) {
            Ok(bytes) => self.backend.set(key, &bytes, ttl),
            Err(err) => {
                warn!(key, %err, "cache value encoding failed");
                false
            }
        }
    }

    // == Pass-Throughs ==
    /// Removes the given keys; missing keys are skipped. Returns the count
    /// actually removed.
    pub fn delete(&self, keys: &[&str]) -> usize {
        self.backend.delete(keys)
    }

    /// True iff a non-expired entry is present.
    pub fn exists(&self, key: &str) -> bool {
        self.backend.exists(key)
    }

    /// Removes all entries unconditionally.
    pub fn clear(&self) -> bool {
        self.backend.clear()
    }

    /// Snapshot of the backend keyspace.
    pub fn stats(&self) -> CacheStats {
        self.backend.stats()
    }

    /// All non-expired keys matching the glob `pattern`.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        self.backend.keys(pattern)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn memory_service() -> CacheService {
        CacheService::with_backend(Box::new(MemoryBackend::new()))
    }

    #[test]
    fn test_typed_set_and_get() {
        let cache = memory_service();

        assert!(cache.set("key", &vec![1, 2, 3], None));
        assert_eq!(cache.get::<Vec<i32>>("key"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_get_wrong_type_purges_entry() {
        let cache = memory_service();

        cache.set("key", &"a string", None);
        // Decoding into an incompatible type misses and drops the entry
        assert_eq!(cache.get::<Vec<i32>>("key"), None);
        assert!(!cache.exists("key"));
    }

    #[test]
    fn test_fetch_computes_once_and_caches() {
        let cache = memory_service();
        let calls = Cell::new(0);

        let value = cache.fetch("key", None, || {
            calls.set(calls.get() + 1);
            Some("computed".to_string())
        });
        assert_eq!(value.as_deref(), Some("computed"));
        assert_eq!(calls.get(), 1);

        // Second fetch hits and must not invoke the new closure
        let value = cache.fetch("key", None, || {
            calls.set(calls.get() + 1);
            Some("other".to_string())
        });
        assert_eq!(value.as_deref(), Some("computed"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fetch_does_not_cache_none() {
        let cache = memory_service();
        let calls = Cell::new(0);

        let value: Option<String> = cache.fetch("key", None, || {
            calls.set(calls.get() + 1);
            None
        });
        assert_eq!(value, None);

        // The miss was not persisted, so the next compute runs too
        let value = cache.fetch("key", None, || {
            calls.set(calls.get() + 1);
            Some("v".to_string())
        });
        assert_eq!(value.as_deref(), Some("v"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_null_backend_never_memoizes() {
        let cache = CacheService::with_backend(Box::new(NullBackend::new()));
        let calls = Cell::new(0);

        for _ in 0..2 {
            let value = cache.fetch("key", None, || {
                calls.set(calls.get() + 1);
                Some(42)
            });
            assert_eq!(value, Some(42));
        }

        assert_eq!(calls.get(), 2);
        assert!(!cache.exists("key"));
    }

    #[test]
    fn test_delete_pass_through() {
        let cache = memory_service();

        cache.set("key", &1, None);
        assert_eq!(cache.delete(&["key", "missing"]), 1);
        assert_eq!(cache.get::<i32>("key"), None);
    }

    #[test]
    fn test_from_config_memory() {
        let config = CacheConfig::default();
        let cache = CacheService::from_config(&config).unwrap();
        assert_eq!(cache.backend_name(), "memory");
    }
}
