//! Backend Module
//!
//! The shared storage contract and the concrete backends implementing it:
//! in-memory, file-based, Redis, and null.
//!
//! Backends deal exclusively in bytes; the value codec lives at the facade.
//! Every operation degrades to its miss value on internal faults so that a
//! cache hiccup can never become an application outage.

use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tracing::warn;

mod file;
mod memory;
mod null;
mod redis;
mod stats;


// Re-export public types
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use null::NullBackend;
pub use self::redis::RedisBackend;
pub use stats::CacheStats;

// == Backend Contract ==
/// Common contract every concrete store implements.
///
/// The signatures encode the soft-failure policy directly: `get` returns
/// `None` for missing, expired, or unreadable entries alike; `set` answers
/// `false` when the write did not happen; `delete` counts only what was
/// actually removed; `stats` always produces a snapshot, zeroed if the
/// store is unreachable. No operation panics or propagates an error.
///
/// Entries whose expiry has passed are logically absent everywhere: they
/// are never returned and are purged lazily on access and during
/// `stats`/`keys` sweeps.
pub trait CacheBackend: Send + Sync {
    /// Short identifier used in logs and stats snapshots.
    fn name(&self) -> &'static str;

    /// Returns the stored bytes for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, replacing any existing entry and its
    /// expiry. `ttl: None` means the entry never expires.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> bool;

    /// Removes the given keys; missing keys are silently skipped.
    ///
    /// Returns the number of entries actually removed. Removals are
    /// independent per key; no multi-key atomicity is offered.
    fn delete(&self, keys: &[&str]) -> usize;

    /// True iff a non-expired entry is present, with the same lazy-expiry
    /// check as `get`.
    fn exists(&self, key: &str) -> bool;

    /// Removes all entries unconditionally.
    fn clear(&self) -> bool;

    /// Snapshot of the keyspace; purges expired entries found during the
    /// scan.
    fn stats(&self) -> CacheStats;

    /// All non-expired keys matching the glob `pattern`; purges expired
    /// entries encountered along the way.
    fn keys(&self, pattern: &str) -> Vec<String>;
}

// == Glob Translation ==
/// Compiles a glob pattern (`*` any run, `?` single char) into an anchored
/// regex. All other characters match literally.
///
/// Returns `None` (with a warning) if the translated expression fails to
/// compile; callers treat that as matching nothing.
pub(crate) fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    match Regex::new(&expr) {
        Ok(re) => Some(re),
        Err(err) => {
            warn!(pattern, %err, "failed to compile key pattern");
            None
        }
    }
}

// == Clock ==
/// Current Unix timestamp in whole seconds.
///
/// Expiry bookkeeping is second-precision throughout: the in-memory expiry
/// map, the on-disk header, and Redis TTLs all store epoch seconds.
pub(crate) fn now_epoch_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

// == Expiry ==
/// Absolute expiry timestamp for an optional TTL; 0 means "never expires".
///
/// Sub-second TTLs round up to one second, the smallest representable
/// lifetime.
pub(crate) fn expiry_timestamp(ttl: Option<Duration>) -> u64 {
    match ttl {
        Some(ttl) => now_epoch_secs() + ttl.as_secs().max(1),
        None => 0,
    }
}

/// An entry is expired once the current second has reached its expiry
/// timestamp; 0 never expires.
pub(crate) fn is_expired(expires_at: u64, now: u64) -> bool {
    expires_at > 0 && now >= expires_at
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_star_matches_any_run() {
        let re = glob_to_regex("app:book:list:*").unwrap();
        assert!(re.is_match("app:book:list:page=1:per=20:origin=api"));
        assert!(re.is_match("app:book:list:"));
        assert!(!re.is_match("app:book:find:id=1:origin=api"));
    }

    #[test]
    fn test_glob_question_matches_single_char() {
        let re = glob_to_regex("app:book:find:id=?:origin=api").unwrap();
        assert!(re.is_match("app:book:find:id=7:origin=api"));
        assert!(!re.is_match("app:book:find:id=42:origin=api"));
    }

    #[test]
    fn test_glob_is_anchored() {
        let re = glob_to_regex("book").unwrap();
        assert!(re.is_match("book"));
        assert!(!re.is_match("app:book"));
        assert!(!re.is_match("books"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let re = glob_to_regex("app:q=a.b+c").unwrap();
        assert!(re.is_match("app:q=a.b+c"));
        assert!(!re.is_match("app:q=aXb+c"));
    }

    #[test]
    fn test_expiry_timestamp_none_is_zero() {
        assert_eq!(expiry_timestamp(None), 0);
    }

    #[test]
    fn test_expiry_timestamp_subsecond_rounds_up() {
        let now = now_epoch_secs();
        let exp = expiry_timestamp(Some(Duration::from_millis(100)));
        assert!(exp >= now + 1);
    }

    #[test]
    fn test_is_expired_boundary() {
        assert!(is_expired(100, 100));
        assert!(is_expired(100, 101));
        assert!(!is_expired(100, 99));
        // 0 means never expires
        assert!(!is_expired(0, u64::MAX));
    }
}
