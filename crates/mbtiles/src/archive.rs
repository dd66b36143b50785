//! A single opened MBTiles archive.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chart_common::{TileCoord, TileError, TileResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::metadata::{derive_metadata, StyleConfig, TileMetadata, VECTOR_FORMAT};

/// An opened archive: read-only connection pool plus the metadata derived
/// when it was opened.
///
/// An `Archive` is never mutated. When the file changes on disk the cache
/// builds a new one and swaps it in; readers still holding the old `Arc`
/// finish their query against the old pool.
///
/// The pool is safe for concurrent read-only queries.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    modified: SystemTime,
    pool: SqlitePool,
    metadata: TileMetadata,
}

impl Archive {
    /// Open the archive at `path` read-only and derive its metadata.
    ///
    /// The modification time is captured before opening, so a write that
    /// races with the open is picked up as staleness on the next acquire.
    pub async fn open(
        path: &Path,
        styles: &StyleConfig,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> TileResult<Self> {
        let open_error = |message: String| TileError::ArchiveOpen {
            path: path.display().to_string(),
            message,
        };

        let modified = modification_time(path)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        // SQLite opens lazily; touching the schema rejects files that are
        // not databases at all.
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sqlite_master")
            .fetch_one(&pool)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        let metadata = derive_metadata(&pool, path, styles).await?;

        info!(
            path = %path.display(),
            format = metadata.get("format").map(String::as_str).unwrap_or("unknown"),
            keys = metadata.len(),
            "Opened tile archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            modified,
            pool,
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time of the file when this archive was opened.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn metadata(&self) -> &TileMetadata {
        &self.metadata
    }

    /// Declared tile payload format (`png`, `jpg`, `pbf`, ...).
    pub fn format(&self) -> Option<&str> {
        self.metadata.get("format").map(String::as_str)
    }

    pub fn is_vector(&self) -> bool {
        self.format() == Some(VECTOR_FORMAT)
    }

    /// True when the file's modification time no longer matches, or the
    /// file cannot be stat'ed at all.
    pub async fn is_stale(&self) -> bool {
        match modification_time(&self.path).await {
            Ok(current) => current != self.modified,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Archive stat failed");
                true
            }
        }
    }

    /// Raw payload of one tile, `None` when the archive has no such row.
    pub async fn query_tile(&self, coord: TileCoord) -> TileResult<Option<Vec<u8>>> {
        let data: Option<Option<Vec<u8>>> = sqlx::query_scalar(
            "SELECT tile_data FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
        )
        .bind(coord.z as i64)
        .bind(coord.x as i64)
        .bind(coord.y as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TileError::TileQuery {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(data.flatten())
    }
}

async fn modification_time(path: &Path) -> std::io::Result<SystemTime> {
    tokio::fs::metadata(path).await?.modified()
}
