//! In-Memory Backend Module
//!
//! Reference backend: two parallel maps behind one mutex. Targets
//! development and test workloads, so every operation holds the lock for
//! its full duration; correctness over throughput.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::backend::{
    expiry_timestamp, glob_to_regex, is_expired, now_epoch_secs, CacheBackend, CacheStats,
};

// == Inner State ==
/// Value bytes and expiry timestamps, keyed in parallel.
///
/// An entry's value and expiry are always written together under the lock,
/// so a key is either fully present or fully absent.
#[derive(Debug, Default)]
struct MemoryInner {
    store: HashMap<String, Vec<u8>>,
    expiry: HashMap<String, u64>,
}

impl MemoryInner {
    /// Removes the key from both maps if its expiry has passed.
    ///
    /// Returns true when the entry was stale and purged.
    fn purge_if_expired(&mut self, key: &str, now: u64) -> bool {
        match self.expiry.get(key) {
            Some(&expires_at) if is_expired(expires_at, now) => {
                self.store.remove(key);
                self.expiry.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Sweeps the whole expiry map, purging every stale entry.
    ///
    /// Returns the number purged. Called by `stats` and `keys` so their
    /// results are computed from a clean store.
    fn purge_expired(&mut self, now: u64) -> usize {
        let stale: Vec<String> = self
            .expiry
            .iter()
            .filter(|(_, &expires_at)| is_expired(expires_at, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            self.store.remove(key);
            self.expiry.remove(key);
        }

        stale.len()
    }
}

// == Memory Backend ==
/// Mutex-guarded in-process store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<MemoryInner>,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the store lock, recovering from a poisoned mutex.
    ///
    /// A panic in another thread mid-operation leaves at worst a missing or
    /// stale entry, which the lazy-expiry path already tolerates.
    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut inner = self.lock();
        if inner.purge_if_expired(key, now_epoch_secs()) {
            debug!(key, "purged expired entry on get");
            return None;
        }
        inner.store.get(key).cloned()
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> bool {
        let mut inner = self.lock();
        inner.store.insert(key.to_string(), value.to_vec());
        match expiry_timestamp(ttl) {
            0 => {
                // Overwriting with no TTL must erase any previous expiry
                inner.expiry.remove(key);
            }
            expires_at => {
                inner.expiry.insert(key.to_string(), expires_at);
            }
        }
        true
    }

    fn delete(&self, keys: &[&str]) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;
        for key in keys {
            if inner.store.remove(*key).is_some() {
                removed += 1;
            }
            inner.expiry.remove(*key);
        }
        removed
    }

    fn exists(&self, key: &str) -> bool {
        let mut inner = self.lock();
        if inner.purge_if_expired(key, now_epoch_secs()) {
            return false;
        }
        inner.store.contains_key(key)
    }

    fn clear(&self) -> bool {
        let mut inner = self.lock();
        inner.store.clear();
        inner.expiry.clear();
        true
    }

    fn stats(&self) -> CacheStats {
        let mut inner = self.lock();
        let purged = inner.purge_expired(now_epoch_secs());
        let mut stats = CacheStats::new(self.name());
        stats.total_keys = inner.store.len();
        stats.expired_keys = purged;
        stats
    }

    fn keys(&self, pattern: &str) -> Vec<String> {
        let Some(re) = glob_to_regex(pattern) else {
            return Vec::new();
        };

        let mut inner = self.lock();
        inner.purge_expired(now_epoch_secs());
        inner
            .store
            .keys()
            .filter(|key| re.is_match(key))
            .cloned()
            .collect()
    }
}
