//! Cache Statistics Module
//!
//! Snapshot record returned by every backend's `stats` operation.

use std::collections::HashMap;

use serde::Serialize;

// == Cache Stats ==
/// A point-in-time snapshot of a backend's keyspace.
///
/// `expired_keys` counts entries found stale and purged while the snapshot
/// was taken; taking stats is therefore also an opportunistic cleanup pass.
/// Backend-specific counters (memory usage, server version, ...) go in
/// `details`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Name of the backend that produced the snapshot
    pub backend: String,
    /// Number of live entries
    pub total_keys: usize,
    /// Number of expired entries purged during the snapshot
    pub expired_keys: usize,
    /// Backend-specific counters
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates an empty snapshot for the named backend.
    pub fn new(backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            ..Self::default()
        }
    }

    // == Unavailable ==
    /// All-zero placeholder for a store that could not be reached.
    ///
    /// Stats must never fail; an unreachable store reports nothing rather
    /// than propagating an error.
    pub fn unavailable(backend: &str) -> Self {
        let mut stats = Self::new(backend);
        stats
            .details
            .insert("status".to_string(), "unavailable".to_string());
        stats
    }

    // == Detail ==
    /// Adds a backend-specific counter to the snapshot.
    pub fn with_detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new("memory");
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.total_keys, 0);
        assert_eq!(stats.expired_keys, 0);
        assert!(stats.details.is_empty());
    }

    #[test]
    fn test_stats_unavailable() {
        let stats = CacheStats::unavailable("redis");
        assert_eq!(stats.backend, "redis");
        assert_eq!(stats.total_keys, 0);
        assert_eq!(stats.details.get("status").unwrap(), "unavailable");
    }

    #[test]
    fn test_stats_with_detail() {
        let stats = CacheStats::new("file").with_detail("size_bytes", 1024);
        assert_eq!(stats.details.get("size_bytes").unwrap(), "1024");
    }

    #[test]
    fn test_stats_serializes() {
        let stats = CacheStats::new("memory");
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["backend"], "memory");
        assert_eq!(json["total_keys"], 0);
    }
}
