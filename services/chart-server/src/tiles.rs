//! Archive listing and tile lookup addressed by archive file name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chart_common::{TileCoord, TileError, TileResult};
use mbtiles::{is_archive_file_name, ArchiveCache, FetchedTile, TileFetcher, TileMetadata};
use tracing::{debug, warn};

use crate::config::{DecodeFailurePolicy, ServerConfig};

/// Result of a tile lookup that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    Found(FetchedTile),
    NotFound,
}

/// Tile operations over the archives of one data directory.
pub struct TileService {
    data_dir: PathBuf,
    fetcher: TileFetcher,
    decode_failure: DecodeFailurePolicy,
}

impl TileService {
    pub fn new(config: &ServerConfig) -> Self {
        let cache = Arc::new(ArchiveCache::new(config.cache.clone()));
        Self {
            data_dir: config.data_dir.clone(),
            fetcher: TileFetcher::new(cache),
            decode_failure: config.decode_failure,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache(&self) -> &Arc<ArchiveCache> {
        self.fetcher.cache()
    }

    /// Metadata of every archive in the data directory, keyed by file name.
    ///
    /// Archives that fail to open or derive are logged and left out. Only a
    /// failure to read the directory itself is an error.
    pub async fn list_archives(&self) -> TileResult<BTreeMap<String, TileMetadata>> {
        let scan_error = |e: std::io::Error| TileError::DirectoryScan {
            path: self.data_dir.display().to_string(),
            message: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(&self.data_dir).await.map_err(scan_error)?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Cannot stat directory entry");
                    continue;
                }
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_archive_file_name(&name) {
                names.push(name);
            }
        }

        let mut archives = BTreeMap::new();
        for name in names {
            match self.cache().acquire(&self.data_dir.join(&name)).await {
                Ok(archive) => {
                    archives.insert(name, archive.metadata().clone());
                }
                Err(e) => {
                    warn!(archive = %name, error = %e, "Skipping archive in listing");
                }
            }
        }

        debug!(count = archives.len(), "Listed archives");
        Ok(archives)
    }

    /// Look up one tile of the archive named `archive` in the data directory.
    ///
    /// `coord.y` is the stored row; no TMS/XYZ flip is applied.
    pub async fn serve_tile(&self, archive: &str, coord: TileCoord) -> TileResult<TileOutcome> {
        validate_archive_name(archive)?;
        let path = self.data_dir.join(archive);

        match self.fetcher.fetch_tile(&path, coord).await {
            Ok(Some(tile)) => Ok(TileOutcome::Found(tile)),
            Ok(None) => Ok(TileOutcome::NotFound),
            Err(e) if e.is_decode_failure() => {
                warn!(archive = %archive, tile = %coord, error = %e, "Stored tile failed to decode");
                match self.decode_failure {
                    DecodeFailurePolicy::NotFound => Ok(TileOutcome::NotFound),
                    DecodeFailurePolicy::Error => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// Archive names are bare file names inside the data directory.
pub fn validate_archive_name(name: &str) -> TileResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(TileError::InvalidArchiveName(name.to_string()));
    }
    Ok(())
}
