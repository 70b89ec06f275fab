//! Snapshot caching
//!
//! A snapshot is reused only when caching is enabled, no refresh is forced,
//! the stored entry is readable and unexpired, and it was produced under
//! exactly the filters and namespace currently configured. Every other path
//! rebuilds.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::snapshot::{Fingerprint, Snapshot};

/// Default prefix for cache keys
pub const DEFAULT_CACHE_PREFIX: &str = "librenms_";

/// Derive a cache key from the inventory source path
#[must_use]
pub fn cache_key(prefix: &str, source: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{prefix}{}", &digest[..16])
}

/// A stored snapshot with its write time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cached_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

impl CacheEntry {
    /// Wrap a snapshot, stamped now
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            cached_at: Utc::now(),
            snapshot,
        }
    }

    /// Check the entry age against a time-to-live; `None` never expires
    #[must_use]
    pub fn is_expired(&self, ttl: Option<Duration>) -> bool {
        let Some(ttl) = ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()) else {
            return false;
        };
        Utc::now().signed_duration_since(self.cached_at) > ttl
    }
}

/// Key-value storage for snapshots
///
/// No locking is performed; concurrent writers to one key race and the
/// last write wins.
pub trait CacheStore: Send + Sync {
    /// Read an entry; `Ok(None)` when absent
    ///
    /// # Errors
    /// Returns an error if the entry exists but cannot be read or decoded.
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Write or overwrite an entry
    ///
    /// # Errors
    /// Returns an error if the entry cannot be written.
    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError>;
}

/// One JSON file per key in a directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing a key
    #[must_use]
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let content = match fs::read_to_string(self.path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let content =
            serde_json::to_string(entry).map_err(|e| CacheError::Io(e.to_string()))?;

        // Replace atomically so readers never see a partial file
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::Io(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::Io(e.to_string()))?;
        entries.insert(key.to_string(), entry.clone());
        Ok(())
    }
}

/// States visited while resolving a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Caching disabled or refresh forced
    NoCache,
    /// An entry was found
    CacheHit,
    /// The entry was produced under different filters or namespace
    CacheStaleFilters,
    /// No usable entry (absent, expired, or unreadable)
    CacheMiss,
    /// A fresh snapshot was built
    Rebuilt,
}

/// Cache behaviour for one run
#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    /// Use the store at all
    pub enabled: bool,
    /// Skip reading and always rebuild
    pub force_update: bool,
    /// Entry time-to-live; `None` never expires
    pub timeout: Option<Duration>,
}

/// Snapshot plus the states visited to obtain it
#[derive(Debug, Clone)]
pub struct CacheOutcome {
    pub snapshot: Snapshot,
    pub transitions: Vec<CacheState>,
}

impl CacheOutcome {
    /// Terminal state
    #[must_use]
    pub fn final_state(&self) -> CacheState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(CacheState::NoCache)
    }

    /// Whether the cached snapshot was reused
    #[must_use]
    pub fn reused(&self) -> bool {
        self.final_state() == CacheState::CacheHit
    }
}

/// Decides between reusing a cached snapshot and rebuilding it
pub struct CacheManager<'a> {
    store: Option<&'a dyn CacheStore>,
    settings: CacheSettings,
}

impl<'a> CacheManager<'a> {
    pub fn new(store: Option<&'a dyn CacheStore>, settings: CacheSettings) -> Self {
        Self { store, settings }
    }

    fn active_store(&self) -> Option<&'a dyn CacheStore> {
        self.store.filter(|_| self.settings.enabled)
    }

    /// Return a reusable cached snapshot or build, persist and return a new one
    ///
    /// Cache failures never fail the call; only `rebuild` errors propagate.
    ///
    /// # Errors
    /// Returns the error produced by `rebuild`.
    pub async fn resolve<F, Fut, E>(
        &self,
        key: &str,
        expected: &Fingerprint<'_>,
        rebuild: F,
    ) -> Result<CacheOutcome, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot, E>>,
    {
        let store = self.active_store();
        let mut transitions = Vec::new();

        match store.filter(|_| !self.settings.force_update) {
            None => transitions.push(CacheState::NoCache),
            Some(store) => match store.get(key) {
                Ok(Some(entry)) if entry.is_expired(self.settings.timeout) => {
                    debug!(key, cached_at = %entry.cached_at, "cache entry expired");
                    transitions.push(CacheState::CacheMiss);
                }
                Ok(Some(entry)) => {
                    transitions.push(CacheState::CacheHit);
                    if entry.snapshot.matches(expected) {
                        info!(key, "using cached inventory");
                        return Ok(CacheOutcome {
                            snapshot: entry.snapshot,
                            transitions,
                        });
                    }
                    info!(
                        key,
                        namespace = entry.snapshot.namespace(),
                        "cached filters differ from configuration, rebuilding"
                    );
                    transitions.push(CacheState::CacheStaleFilters);
                }
                Ok(None) => {
                    debug!(key, "no cache entry");
                    transitions.push(CacheState::CacheMiss);
                }
                Err(e) => {
                    warn!(key, error = %e, "failed to read cache, rebuilding");
                    transitions.push(CacheState::CacheMiss);
                }
            },
        }

        let snapshot = rebuild().await?;
        transitions.push(CacheState::Rebuilt);

        let snapshot = match store {
            Some(store) => {
                let entry = CacheEntry::new(snapshot);
                match store.set(key, &entry) {
                    Ok(()) => debug!(key, "cache saved"),
                    Err(e) => warn!(key, error = %e, "failed to write cache"),
                }
                entry.snapshot
            }
            None => snapshot,
        };

        Ok(CacheOutcome {
            snapshot,
            transitions,
        })
    }
}
