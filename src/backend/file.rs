//! File-System Backend Module
//!
//! One file per key, hashed into two-hex-char shard subdirectories to bound
//! directory fan-out. Each file carries an 8-byte big-endian expiry header
//! (absolute Unix-epoch seconds, 0 meaning "no expiry") followed by the
//! payload bytes.
//!
//! Unreadable or truncated files are deleted on access and reported as
//! misses, so the cache heals itself from corruption. A coarse in-process
//! mutex serializes operations; there is no cross-process file locking, so
//! concurrent writers from separate processes can interleave unsafely
//! (known limitation).

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use md5::{Digest, Md5};
use tracing::{debug, warn};

use crate::backend::{
    expiry_timestamp, glob_to_regex, is_expired, now_epoch_secs, CacheBackend, CacheStats,
};
use crate::error::{CacheError, Result};

/// Length of the big-endian expiry header at the start of every entry file.
const EXPIRY_HEADER_LEN: usize = 8;

/// Extension given to every entry file.
const CACHE_FILE_EXT: &str = "cache";

// == Walk Summary ==
/// Result of a full tree walk: live entries (file stem and size) plus the
/// number of expired files purged along the way.
#[derive(Debug, Default)]
struct WalkSummary {
    live: Vec<(String, u64)>,
    purged: usize,
}

// == File Backend ==
/// One-file-per-key store rooted at a cache directory.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileBackend {
    // == Constructor ==
    /// Creates the backend, creating the cache root directory if needed.
    ///
    /// # Arguments
    /// * `root` - Directory that will hold the shard subdirectories
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Root directory the backend writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Key Addressing ==
    /// Replaces every character outside `[A-Za-z0-9\-_:]` with `_` so keys
    /// are safe as file names.
    ///
    /// The sanitized form is what `keys` reconstructs from file stems, so a
    /// key that contained sanitized characters comes back with `_` in their
    /// place (known limitation).
    fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|ch| match ch {
                'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | ':' => ch,
                _ => '_',
            })
            .collect()
    }

    /// Path of the entry file for `key`:
    /// `<root>/<first-2-hex-of-md5(sanitized)>/<sanitized>.cache`.
    fn entry_path(&self, key: &str) -> PathBuf {
        let sanitized = Self::sanitize_key(key);
        let digest = format!("{:x}", Md5::digest(sanitized.as_bytes()));
        self.root
            .join(&digest[..2])
            .join(format!("{sanitized}.{CACHE_FILE_EXT}"))
    }

    // == Entry I/O ==
    /// Reads the expiry header; a file shorter than the header is corrupt.
    fn read_expiry(file: &mut fs::File, path: &Path) -> Result<u64> {
        let mut header = [0u8; EXPIRY_HEADER_LEN];
        file.read_exact(&mut header).map_err(|_| {
            CacheError::CorruptEntry(format!(
                "{} is shorter than the expiry header",
                path.display()
            ))
        })?;
        Ok(u64::from_be_bytes(header))
    }

    /// Reads an entry file.
    ///
    /// Returns `Ok(None)` when the file is absent or expired (the expired
    /// file is removed). Truncated or unreadable files are errors for the
    /// caller to clean up.
    fn read_entry(path: &Path) -> Result<Option<Vec<u8>>> {
        let mut file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let expires_at = Self::read_expiry(&mut file, path)?;
        if is_expired(expires_at, now_epoch_secs()) {
            drop(file);
            fs::remove_file(path)?;
            debug!(path = %path.display(), "purged expired cache file");
            return Ok(None);
        }

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;
        Ok(Some(payload))
    }

    /// Writes header and payload for `key`, creating its shard directory.
    fn write_entry(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut buf = Vec::with_capacity(EXPIRY_HEADER_LEN + value.len());
        buf.extend_from_slice(&expiry_timestamp(ttl).to_be_bytes());
        buf.extend_from_slice(value);
        fs::write(&path, buf)?;
        Ok(())
    }

    /// Shared get/exists path: read the entry, deleting it on any fault.
    fn load(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        match Self::read_entry(&path) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, %err, "removing unreadable cache file");
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    // == Tree Walk ==
    /// Visits every entry file, purging expired and unreadable ones, and
    /// collects the survivors' stems and sizes.
    fn walk_entries(&self) -> Result<WalkSummary> {
        let now = now_epoch_secs();
        let mut summary = WalkSummary::default();

        for shard in fs::read_dir(&self.root)? {
            let Ok(shard) = shard else { continue };
            let shard_path = shard.path();
            if !shard_path.is_dir() {
                continue;
            }
            let Ok(entries) = fs::read_dir(&shard_path) else {
                continue;
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some(CACHE_FILE_EXT) {
                    continue;
                }

                let expires_at = match fs::File::open(&path)
                    .map_err(CacheError::from)
                    .and_then(|mut file| Self::read_expiry(&mut file, &path))
                {
                    Ok(expires_at) => expires_at,
                    Err(err) => {
                        warn!(path = %path.display(), %err, "removing unreadable cache file");
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                };

                if is_expired(expires_at, now) {
                    let _ = fs::remove_file(&path);
                    summary.purged += 1;
                    continue;
                }

                let stem = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or_default()
                    .to_string();
                let size = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
                summary.live.push((stem, size));
            }
        }

        Ok(summary)
    }

    /// Deletes every entry file, then prunes the emptied shard directories.
    fn remove_all(&self) -> Result<()> {
        for shard in fs::read_dir(&self.root)? {
            let shard = shard?;
            let path = shard.path();
            if shard.file_type()?.is_dir() {
                for entry in fs::read_dir(&path)? {
                    let entry = entry?;
                    if entry.file_type()?.is_file() {
                        fs::remove_file(entry.path())?;
                    }
                }
                let _ = fs::remove_dir(&path);
            } else if shard.file_type()?.is_file() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl CacheBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let _guard = self.guard();
        self.load(key)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> bool {
        let _guard = self.guard();
        match self.write_entry(key, value, ttl) {
            Ok(()) => true,
            Err(err) => {
                warn!(key, %err, "cache file write failed");
                false
            }
        }
    }

    fn delete(&self, keys: &[&str]) -> usize {
        let _guard = self.guard();
        keys.iter()
            .filter(|key| fs::remove_file(self.entry_path(key)).is_ok())
            .count()
    }

    fn exists(&self, key: &str) -> bool {
        let _guard = self.guard();
        self.load(key).is_some()
    }

    fn clear(&self) -> bool {
        let _guard = self.guard();
        match self.remove_all() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "cache clear failed");
                false
            }
        }
    }

    fn stats(&self) -> CacheStats {
        let _guard = self.guard();
        match self.walk_entries() {
            Ok(summary) => {
                let size_bytes: u64 = summary.live.iter().map(|(_, size)| size).sum();
                let mut stats = CacheStats::new(self.name())
                    .with_detail("cache_dir", self.root.display())
                    .with_detail("size_bytes", size_bytes);
                stats.total_keys = summary.live.len();
                stats.expired_keys = summary.purged;
                stats
            }
            Err(err) => {
                warn!(%err, "cache directory walk failed");
                CacheStats::unavailable(self.name())
            }
        }
    }

    fn keys(&self, pattern: &str) -> Vec<String> {
        let Some(re) = glob_to_regex(pattern) else {
            return Vec::new();
        };

        let _guard = self.guard();
        match self.walk_entries() {
            Ok(summary) => summary
                .live
                .into_iter()
                .map(|(stem, _)| stem)
                .filter(|key| re.is_match(key))
                .collect(),
            Err(err) => {
                warn!(%err, "cache directory walk failed");
                Vec::new()
            }
        }
    }
}
