//! JSON-file backed metrics cache with a fixed time-to-live.
//!
//! The whole mapping is read once at startup and rewritten after every
//! insert. Writes go to a temporary file in the same directory and are
//! renamed over the cache file, and an in-process mutex serializes writers.
//! Expired entries are ignored on read but never purged.

use crate::error::CacheError;
use crate::types::MetricsRecord;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Entries older than this are treated as missing
pub const CACHE_TTL_SECS: i64 = 3600;

pub fn cache_ttl() -> Duration {
    Duration::seconds(CACHE_TTL_SECS)
}

/// Cache key for a dataset, evaluation kind and sample budget
pub fn cache_key(dataset: &str, kind: &str, sample_size: usize) -> String {
    format!("{}_{}_{}", dataset, kind, sample_size)
}

/// A cached record and the time it was stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub metrics: MetricsRecord,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(metrics: MetricsRecord) -> Self {
        Self {
            metrics,
            timestamp: Utc::now(),
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp < cache_ttl()
    }
}

/// Key to [`MetricsRecord`] store persisted as one JSON document
pub struct MetricsCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

impl MetricsCache {
    /// Read the backing file; a missing or unreadable file gives an empty cache
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match read_entries(&path) {
            Ok(Some(entries)) => {
                info!(path = %path.display(), entries = entries.len(), "Loaded metrics cache");
                entries
            }
            Ok(None) => {
                debug!(path = %path.display(), "No metrics cache file, starting cold");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load metrics cache, starting cold");
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Fresh record for `key`, if any
    pub fn get(&self, key: &str) -> Option<MetricsRecord> {
        self.get_at(key, Utc::now())
    }

    /// Fresh record for `key` as of `now`
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<MetricsRecord> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                debug!(key = %key, "Metrics cache hit");
                Some(entry.metrics.clone())
            }
            Some(_) => {
                debug!(key = %key, "Metrics cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite `key`, then write the whole cache to disk
    ///
    /// A failed write is logged; the in-memory entry is kept either way.
    pub fn put(&self, key: &str, record: MetricsRecord) {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), CacheEntry::new(record));
        if let Err(e) = self.write(&entries) {
            warn!(path = %self.path.display(), key = %key, error = %e, "Failed to save metrics cache");
        }
    }

    /// Write the whole cache to disk, logging any failure
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            warn!(path = %self.path.display(), error = %e, "Failed to save metrics cache");
        }
    }

    /// Write the whole cache to disk
    pub fn try_save(&self) -> Result<(), CacheError> {
        let entries = self.entries.lock();
        self.write(&entries)
    }

    /// Keys whose entries have outlived the TTL but are still stored
    pub fn stale_keys(&self) -> Vec<String> {
        let now = Utc::now();
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Stored entries, fresh or not
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "metrics_cache.json".to_string());
        let temp_path = self
            .path
            .with_file_name(format!("{}.{}.tmp", file_name, std::process::id()));

        let payload = serde_json::to_vec_pretty(entries)?;
        fs::write(&temp_path, payload)?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), entries = entries.len(), "Saved metrics cache");
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Option<BTreeMap<String, CacheEntry>>, CacheError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&raw)?))
}
