//! Redis Backend Module
//!
//! Network-backed store using the synchronous Redis client. TTLs map onto
//! the store's native expiring writes, so expiry is enforced server-side.
//!
//! The connection handle is lazily established and transparently recovered:
//! a connection-level error mid-operation discards the stale handle,
//! reconnects, and retries the operation exactly once. Bootstrap is the one
//! place failure is not swallowed; a backend that cannot even reach its
//! store should fail fast rather than silently behave as a null cache.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::backend::{CacheBackend, CacheStats};
use crate::error::{CacheError, Result};

/// Hard cap on SCAN round-trips before aborting with partial results.
pub(crate) const SCAN_MAX_ROUNDS: usize = 1000;

/// COUNT hint passed to each SCAN round.
const SCAN_COUNT: usize = 100;

// == Redis Backend ==
/// Remote key-value store with TTL support and connection recovery.
pub struct RedisBackend {
    client: redis::Client,
    conn: Mutex<Option<redis::Connection>>,
    timeout: Duration,
}

impl RedisBackend {
    // == Constructor ==
    /// Connects to the store and verifies it with a PING.
    ///
    /// # Arguments
    /// * `url` - Connection URL, e.g. `redis://127.0.0.1:6379`
    /// * `timeout` - Connect timeout for the initial and any recovered
    ///   connection
    ///
    /// Unlike every other operation on this backend, bootstrap failure is
    /// returned to the caller.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|err| {
            error!(url, %err, "invalid redis connection URL");
            CacheError::Connection(format!("invalid URL {url}: {err}"))
        })?;

        let backend = Self {
            client,
            conn: Mutex::new(None),
            timeout,
        };

        let mut conn = backend.connect().map_err(|err| {
            error!(url, %err, "redis bootstrap connection failed");
            err
        })?;
        redis::cmd("PING")
            .query::<String>(&mut conn)
            .map_err(|err| {
                error!(url, %err, "redis bootstrap ping failed");
                CacheError::Connection(format!("ping failed: {err}"))
            })?;

        info!(url, "redis cache backend connected");
        *backend.conn.lock().unwrap_or_else(PoisonError::into_inner) = Some(conn);
        Ok(backend)
    }

    /// Opens a fresh connection with the configured timeout.
    fn connect(&self) -> Result<redis::Connection> {
        self.client
            .get_connection_with_timeout(self.timeout)
            .map_err(|err| CacheError::Connection(err.to_string()))
    }

    // == Connection Recovery ==
    /// Runs `op` against the live connection, establishing one if needed.
    ///
    /// On a connection-level error the stale handle is dropped, a fresh
    /// connection is opened, and `op` is retried once; a second failure is
    /// returned for the operation boundary to absorb. The mutex also
    /// serializes reconnect attempts.
    fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        F: Fn(&mut redis::Connection) -> redis::RedisResult<T>,
    {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let conn = match &mut *guard {
            Some(conn) => conn,
            slot @ None => slot.insert(self.connect()?),
        };

        match op(conn) {
            Ok(value) => Ok(value),
            Err(err) if is_connection_fault(&err) => {
                warn!(%err, "redis connection lost, reconnecting");
                *guard = None;
                let fresh = guard.insert(self.connect()?);
                match op(fresh) {
                    Ok(value) => Ok(value),
                    Err(err) => {
                        if is_connection_fault(&err) {
                            *guard = None;
                        }
                        Err(err.into())
                    }
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Errors that indicate the connection itself is gone, as opposed to an
/// application-level error the server answered with.
fn is_connection_fault(err: &redis::RedisError) -> bool {
    err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_io_error()
        || err.is_timeout()
}

// == Scan Loop ==
/// Drives a cursor-based SCAN to completion, defending against two
/// pathologies independently: a hard cap on round-trips, and a cursor the
/// store hands back twice without ever reaching the canonical "done"
/// cursor. Either aborts the loop and returns whatever was accumulated.
/// Keys are de-duplicated, since SCAN may return the same key in more than
/// one page.
///
/// Generic over the page fetcher so the loop is testable without a server.
pub(crate) fn scan_keys<F>(mut fetch_page: F) -> Vec<String>
where
    F: FnMut(u64) -> Result<(u64, Vec<String>)>,
{
    let mut seen_cursors = HashSet::new();
    let mut seen_keys = HashSet::new();
    let mut keys = Vec::new();
    let mut cursor = 0u64;

    for round in 0.. {
        if round >= SCAN_MAX_ROUNDS {
            warn!(
                rounds = round,
                "scan safety limit hit, returning partial results"
            );
            break;
        }
        if !seen_cursors.insert(cursor) {
            warn!(cursor, "infinite scan loop detected, aborting iteration");
            break;
        }

        let (next, page) = match fetch_page(cursor) {
            Ok(page) => page,
            Err(err) => {
                warn!(%err, "scan page fetch failed, returning partial results");
                break;
            }
        };

        for key in page {
            if seen_keys.insert(key.clone()) {
                keys.push(key);
            }
        }

        if next == 0 {
            break;
        }
        cursor = next;
    }

    keys
}

/// Extracts a `field:value` line from INFO output.
fn info_field(info: &str, field: &str) -> Option<String> {
    info.lines().find_map(|line| {
        line.strip_prefix(field)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|value| value.trim().to_string())
    })
}

impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.with_conn(|conn| redis::cmd("GET").arg(key).query::<Option<Vec<u8>>>(conn)) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, %err, "redis get failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> bool {
        let result = match ttl {
            Some(ttl) => self.with_conn(|conn| {
                redis::cmd("SETEX")
                    .arg(key)
                    .arg(ttl.as_secs().max(1))
                    .arg(value)
                    .query::<()>(conn)
            }),
            None => self.with_conn(|conn| {
                redis::cmd("SET").arg(key).arg(value).query::<()>(conn)
            }),
        };

        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(key, %err, "redis set failed");
                false
            }
        }
    }

    fn delete(&self, keys: &[&str]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        match self.with_conn(|conn| redis::cmd("DEL").arg(keys).query::<usize>(conn)) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(%err, "redis delete failed");
                0
            }
        }
    }

    fn exists(&self, key: &str) -> bool {
        match self.with_conn(|conn| redis::cmd("EXISTS").arg(key).query::<bool>(conn)) {
            Ok(present) => present,
            Err(err) => {
                warn!(key, %err, "redis exists failed");
                false
            }
        }
    }

    fn clear(&self) -> bool {
        match self.with_conn(|conn| redis::cmd("FLUSHDB").query::<()>(conn)) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "redis clear failed");
                false
            }
        }
    }

    fn stats(&self) -> CacheStats {
        let snapshot = self.with_conn(|conn| {
            let info: String = redis::cmd("INFO").query(conn)?;
            let total: u64 = redis::cmd("DBSIZE").query(conn)?;
            Ok((info, total))
        });

        match snapshot {
            Ok((info, total)) => {
                let mut stats = CacheStats::new(self.name());
                stats.total_keys = total as usize;
                stats.expired_keys = info_field(&info, "expired_keys")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(0);
                for field in [
                    "used_memory_human",
                    "connected_clients",
                    "total_commands_processed",
                    "keyspace_hits",
                    "keyspace_misses",
                    "redis_version",
                    "uptime_in_seconds",
                ] {
                    if let Some(value) = info_field(&info, field) {
                        stats.details.insert(field.to_string(), value);
                    }
                }
                stats
            }
            Err(err) => {
                warn!(%err, "redis stats unavailable");
                CacheStats::unavailable(self.name())
            }
        }
    }

    fn keys(&self, pattern: &str) -> Vec<String> {
        scan_keys(|cursor| {
            self.with_conn(|conn| {
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query(conn)
            })
        })
    }
}
