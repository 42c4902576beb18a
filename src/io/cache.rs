//! Metric result caching.
//!
//! Expensive per-callable analyzers (cyclomatic, NPath, Halstead, LOC,
//! maintainability index) cache their raw basis values keyed by analyzer
//! identity, node identity, and a content fingerprint. Any failure on the
//! restore path — missing key, unreadable file, decode error — degrades to
//! a cache miss and silent recomputation; caching never surfaces errors to
//! the analysis itself.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::core::errors::{MetrikError, Result};
use crate::metrics::AnalyzerId;
use crate::model::NodeId;

/// Key of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// The analyzer that produced the entry
    pub analyzer: AnalyzerId,
    /// The node the entry belongs to
    pub node: NodeId,
    /// Content fingerprint of the node's source at computation time
    pub fingerprint: u64,
}

impl CacheKey {
    /// Stable digest of the key, used as the file-cache entry name.
    pub fn digest(&self) -> u64 {
        let encoded = bincode::serialize(self).unwrap_or_default();
        xxh3_64(&encoded)
    }
}

/// Persists and retrieves serialized metric bases.
pub trait CacheDriver: Send + Sync {
    /// Retrieve a previously stored payload, `None` on any miss.
    fn restore(&self, key: &CacheKey) -> Option<Vec<u8>>;

    /// Store a payload. Failures are logged and swallowed.
    fn store(&self, key: &CacheKey, payload: &[u8]);
}

/// Process-lifetime in-memory cache driver.
#[derive(Debug, Default)]
pub struct MemoryCacheDriver {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCacheDriver {
    /// Create an empty in-memory driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheDriver for MemoryCacheDriver {
    fn restore(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    fn store(&self, key: &CacheKey, payload: &[u8]) {
        self.entries.lock().insert(*key, payload.to_vec());
    }
}

/// Disk-backed cache driver: one file per entry under a root directory,
/// segmented per analyzer. Survives process restarts.
#[derive(Debug)]
pub struct FileCacheDriver {
    root: PathBuf,
}

impl FileCacheDriver {
    /// Create a driver rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            MetrikError::io(
                format!("Failed to create cache directory {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(key.analyzer.name())
            .join(format!("{:016x}.bin", key.digest()))
    }
}

impl CacheDriver for FileCacheDriver {
    fn restore(&self, key: &CacheKey) -> Option<Vec<u8>> {
        fs::read(self.entry_path(key)).ok()
    }

    fn store(&self, key: &CacheKey, payload: &[u8]) {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("failed to create cache segment {}: {err}", parent.display());
                return;
            }
        }
        if let Err(err) = fs::write(&path, payload) {
            warn!("failed to write cache entry {}: {err}", path.display());
        }
    }
}

/// Per-analyzer caching helper.
///
/// This is the composition replacement for an inheritance-based caching
/// analyzer: an analyzer owns one `AnalysisCache` and funnels each
/// per-callable computation through [`AnalysisCache::get_or_compute`],
/// which restores the serialized basis on a hit and recomputes + stores on
/// a miss. The fingerprint in the key invalidates stale entries when the
/// node's source changes.
#[derive(Clone)]
pub struct AnalysisCache {
    analyzer: AnalyzerId,
    driver: Option<Arc<dyn CacheDriver>>,
}

impl AnalysisCache {
    /// Create a cache helper for the given analyzer, initially unbacked.
    pub fn new(analyzer: AnalyzerId) -> Self {
        Self {
            analyzer,
            driver: None,
        }
    }

    /// Attach the backing driver.
    pub fn set_driver(&mut self, driver: Arc<dyn CacheDriver>) {
        self.driver = Some(driver);
    }

    /// Whether a driver is attached.
    pub fn is_backed(&self) -> bool {
        self.driver.is_some()
    }

    /// Restore the basis for `(node, fingerprint)` or compute and store it.
    pub fn get_or_compute<B, F>(&self, node: NodeId, fingerprint: u64, compute: F) -> B
    where
        B: Serialize + DeserializeOwned,
        F: FnOnce() -> B,
    {
        let key = CacheKey {
            analyzer: self.analyzer,
            node,
            fingerprint,
        };
        if let Some(driver) = &self.driver {
            if let Some(bytes) = driver.restore(&key) {
                match bincode::deserialize(&bytes) {
                    Ok(basis) => {
                        debug!(analyzer = %self.analyzer, "metric cache hit");
                        return basis;
                    }
                    Err(err) => {
                        debug!(analyzer = %self.analyzer, "corrupt cache entry, recomputing: {err}");
                    }
                }
            }
        }
        let basis = compute();
        if let Some(driver) = &self.driver {
            match bincode::serialize(&basis) {
                Ok(bytes) => driver.store(&key, &bytes),
                Err(err) => warn!(analyzer = %self.analyzer, "failed to encode cache entry: {err}"),
            }
        }
        basis
    }
}
