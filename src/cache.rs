//! Time-bounded cache of normalized video records.
//!
//! Entries live in a shared [`StorageManager`] under [`CACHE_KEY_PREFIX`],
//! and expiry is checked when an entry is read.

use crate::{metadata::VideoRecord, storage::StorageManager};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{io, sync::Arc, time::Duration};

/// Every key this cache owns starts with this. Bulk deletes filter on it.
pub const CACHE_KEY_PREFIX: &str = "mlbv_video_";

/// Source of the current unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    record: VideoRecord,
    expires_at: i64,
}

/// Storage key for a slug.
pub fn cache_key(slug: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{:x}", Sha256::digest(slug.as_bytes()))
}

#[derive(Clone)]
pub struct VideoCache {
    storage: Arc<dyn StorageManager>,
    clock: Arc<dyn Clock>,
}

impl VideoCache {
    pub fn new(storage: Arc<dyn StorageManager>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn StorageManager>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Cached record for `slug`, unless missing or expired.
    ///
    /// Expired and unreadable entries are removed on the way out.
    pub fn get(&self, slug: &str) -> Option<VideoRecord> {
        let key = cache_key(slug);
        if !self.storage.exists(&key) {
            return None;
        }

        let bytes = match self.storage.read(&key) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    log::warn!("cache read failed slug={slug} err={err}");
                }
                return None;
            }
        };

        let entry = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("dropping unreadable cache entry slug={slug} err={err}");
                self.purge(&key);
                return None;
            }
        };

        if self.clock.now() >= entry.expires_at {
            log::debug!("cache entry expired slug={slug}");
            self.purge(&key);
            return None;
        }

        Some(entry.record)
    }

    /// Store `record` for `slug` until `ttl` from now, replacing any entry.
    pub fn set(&self, slug: &str, record: &VideoRecord, ttl: Duration) -> io::Result<()> {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            record: record.clone(),
            expires_at: self.clock.now().saturating_add(ttl),
        };

        let bytes = serde_json::to_vec(&entry)?;
        self.storage.write(&cache_key(slug), &bytes)
    }

    /// Remove the entry for `slug`. Returns whether one existed.
    pub fn delete(&self, slug: &str) -> io::Result<bool> {
        remove(self.storage.as_ref(), &cache_key(slug))
    }

    /// Remove every cache entry, leaving other keys in the store alone.
    pub fn delete_all(&self) -> io::Result<usize> {
        let mut removed = 0;
        for key in self.storage.list() {
            if key.starts_with(CACHE_KEY_PREFIX) && remove(self.storage.as_ref(), &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn purge(&self, key: &str) {
        if let Err(err) = remove(self.storage.as_ref(), key) {
            log::warn!("failed to purge cache entry key={key} err={err}");
        }
    }
}

fn remove(storage: &dyn StorageManager, key: &str) -> io::Result<bool> {
    if !storage.exists(key) {
        return Ok(false);
    }

    match storage.delete(key) {
        Ok(()) => Ok(true),
        // lost a race with another delete
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
