//! Null Backend Module
//!
//! Always-miss passthrough. Retains nothing, so every facade `fetch`
//! through it re-runs its compute closure; configuring this backend turns
//! caching off without touching a single call site.

use std::time::Duration;

use crate::backend::{CacheBackend, CacheStats};

// == Null Backend ==
#[derive(Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CacheBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    /// Reports success but stores nothing.
    fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> bool {
        true
    }

    fn delete(&self, _keys: &[&str]) -> usize {
        0
    }

    fn exists(&self, _key: &str) -> bool {
        false
    }

    fn clear(&self) -> bool {
        true
    }

    fn stats(&self) -> CacheStats {
        CacheStats::new(self.name())
    }

    fn keys(&self, _pattern: &str) -> Vec<String> {
        Vec::new()
    }
}
