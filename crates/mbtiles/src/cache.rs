//! Path-keyed cache of opened archives.
//!
//! One entry per archive path. An entry is reused while the file's
//! modification time matches the time recorded at open; otherwise the
//! archive is reopened, its metadata derived again and the entry replaced.
//!
//! ## Locking
//!
//! Locks are striped per path. The slot map lock is only held long enough
//! to find or insert the slot for a path. Each slot has its own async mutex
//! held across the whole lookup-or-create sequence for that path, so:
//! - opens of different archives run concurrently
//! - concurrent requests that notice the same archive is stale trigger a
//!   single reopen, the others wait and reuse it
//!
//! A failed open leaves a cached archive in place. A path that never
//! opened keeps no entry, so requests for missing files do not grow the map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chart_common::{TileError, TileResult};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::archive::Archive;
use crate::metadata::StyleConfig;

type Slot = Arc<Mutex<Option<Arc<Archive>>>>;

/// Archive cache settings.
#[derive(Debug, Clone)]
pub struct ArchiveCacheConfig {
    /// Style descriptor lookup for vector archives
    pub styles: StyleConfig,
    /// Read connections per archive
    pub max_connections: u32,
    /// Upper bound for opening an archive and deriving its metadata
    pub open_timeout: Duration,
    /// Upper bound for a single tile query
    pub query_timeout: Duration,
    /// How long SQLite retries a locked database before failing a statement
    pub busy_timeout: Duration,
}

impl Default for ArchiveCacheConfig {
    fn default() -> Self {
        Self {
            styles: StyleConfig::default(),
            max_connections: 4,
            open_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Statistics for the archive cache.
///
/// All fields are atomic for lock-free reads from metrics endpoints.
#[derive(Debug, Default)]
pub struct ArchiveCacheStats {
    /// Acquires answered from a fresh cached entry
    pub hits: AtomicU64,
    /// Archives opened, i.e. metadata derivations run
    pub opens: AtomicU64,
    /// Opens that replaced a stale entry
    pub reloads: AtomicU64,
    /// Acquires that failed to open or derive
    pub failures: AtomicU64,
}

impl ArchiveCacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::Relaxed)
    }

    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Calculate cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.opens() + self.failures();
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// Cache of opened archives keyed by file path.
///
/// Constructed once at service start and shared for the process lifetime.
/// Opened archives are never evicted; a replaced archive is dropped once the last
/// reader releases it.
pub struct ArchiveCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
    config: ArchiveCacheConfig,
    stats: Arc<ArchiveCacheStats>,
}

impl ArchiveCache {
    pub fn new(config: ArchiveCacheConfig) -> Self {
        info!(
            styles_dir = %config.styles.dir.display(),
            max_connections = config.max_connections,
            open_timeout_secs = config.open_timeout.as_secs_f64(),
            "Initializing archive cache"
        );
        Self {
            slots: Mutex::new(HashMap::new()),
            config,
            stats: Arc::new(ArchiveCacheStats::default()),
        }
    }

    pub fn config(&self) -> &ArchiveCacheConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<ArchiveCacheStats> {
        Arc::clone(&self.stats)
    }

    /// Get the archive at `path`, opening or reopening it when needed.
    ///
    /// The returned archive carries both the handle and its metadata.
    pub async fn acquire(&self, path: &Path) -> TileResult<Arc<Archive>> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(path.to_path_buf()).or_default())
        };

        let mut entry = slot.lock().await;

        let reload = if let Some(archive) = entry.as_ref() {
            if !archive.is_stale().await {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(archive));
            }
            info!(path = %path.display(), "Reloading archive");
            true
        } else {
            false
        };

        let opened = tokio::time::timeout(
            self.config.open_timeout,
            Archive::open(
                path,
                &self.config.styles,
                self.config.max_connections,
                self.config.busy_timeout,
            ),
        )
        .await
        .map_err(|_| TileError::Timeout(format!("opening {}", path.display())))
        .and_then(|result| result);

        let archive = match opened {
            Ok(archive) => Arc::new(archive),
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!(path = %path.display(), error = %e, "Failed to open archive");
                if entry.is_none() {
                    self.release_empty_slot(path, &slot).await;
                }
                return Err(e);
            }
        };

        self.stats.opens.fetch_add(1, Ordering::Relaxed);
        if reload {
            self.stats.reloads.fetch_add(1, Ordering::Relaxed);
        }
        debug!(path = %path.display(), reload, "Archive cached");

        *entry = Some(Arc::clone(&archive));
        Ok(archive)
    }

    /// Drop the map entry for a slot that never held an archive.
    ///
    /// Called with the slot lock held. Other acquires waiting on the same
    /// slot hold a clone of it, in which case the entry stays for them.
    async fn release_empty_slot(&self, path: &Path, slot: &Slot) {
        let mut slots = self.slots.lock().await;
        let unshared = slots
            .get(path)
            .map(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2)
            .unwrap_or(false);
        if unshared {
            slots.remove(path);
        }
    }

    /// Paths that currently hold an opened archive.
    pub async fn cached_paths(&self) -> Vec<PathBuf> {
        let slots: Vec<(PathBuf, Slot)> = {
            let slots = self.slots.lock().await;
            slots
                .iter()
                .map(|(path, slot)| (path.clone(), Arc::clone(slot)))
                .collect()
        };

        let mut paths = Vec::with_capacity(slots.len());
        for (path, slot) in slots {
            if slot.lock().await.is_some() {
                paths.push(path);
            }
        }
        paths.sort();
        paths
    }

    /// Number of opened archives.
    pub async fn len(&self) -> usize {
        self.cached_paths().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        let stats = ArchiveCacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = ArchiveCacheStats::default();
        stats.hits.store(3, Ordering::Relaxed);
        stats.opens.store(1, Ordering::Relaxed);
        assert_eq!(stats.hit_rate(), 75.0);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArchiveCache::new(ArchiveCacheConfig::default());

        let result = cache.acquire(&dir.path().join("missing.mbtiles")).await;

        assert!(matches!(result, Err(TileError::ArchiveOpen { .. })));
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().failures(), 1);
        assert_eq!(cache.stats().opens(), 0);
    }

    #[tokio::test]
    async fn test_failed_opens_leave_no_slots() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArchiveCache::new(ArchiveCacheConfig::default());

        for i in 0..100 {
            let path = dir.path().join(format!("missing{}.mbtiles", i));
            assert!(cache.acquire(&path).await.is_err());
        }

        assert_eq!(cache.slots.lock().await.len(), 0);
        assert_eq!(cache.stats().failures(), 100);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.mbtiles");
        test_utils::ArchiveBuilder::new()
            .metadata("format", "png")
            .tile(0, 0, 0, vec![1, 2, 3])
            .write(&path)
            .await
            .unwrap();
        let cache = ArchiveCache::new(ArchiveCacheConfig::default());
        cache.acquire(&path).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        assert!(cache.acquire(&path).await.is_err());

        assert_eq!(cache.slots.lock().await.len(), 1);
        assert_eq!(cache.cached_paths().await, vec![path]);
    }
}
