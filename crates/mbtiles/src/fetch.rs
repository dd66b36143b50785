//! Tile lookup against cached archives.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chart_common::{TileCoord, TileError, TileResult};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::cache::ArchiveCache;
use crate::metadata::VECTOR_FORMAT;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A tile payload together with the archive's declared format.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTile {
    pub data: Bytes,
    pub format: Option<String>,
}

/// Fetches single tiles, going through the archive cache for the handle.
///
/// Only the acquire step is synchronized; the tile query itself runs on the
/// acquired archive without holding any cache lock.
#[derive(Clone)]
pub struct TileFetcher {
    cache: Arc<ArchiveCache>,
}

impl TileFetcher {
    pub fn new(cache: Arc<ArchiveCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ArchiveCache> {
        &self.cache
    }

    /// Payload of tile `coord` in the archive at `path`.
    ///
    /// Returns `Ok(None)` when the archive has no row for `coord`. Vector
    /// tiles stored gzip-compressed are returned decompressed.
    pub async fn fetch(&self, path: &Path, coord: TileCoord) -> TileResult<Option<Bytes>> {
        Ok(self.fetch_tile(path, coord).await?.map(|tile| tile.data))
    }

    /// Like [`fetch`](Self::fetch), also reporting the archive's format.
    pub async fn fetch_tile(&self, path: &Path, coord: TileCoord) -> TileResult<Option<FetchedTile>> {
        let archive = self.cache.acquire(path).await?;

        let data = tokio::time::timeout(self.cache.config().query_timeout, archive.query_tile(coord))
            .await
            .map_err(|_| {
                TileError::Timeout(format!("querying tile {} of {}", coord, path.display()))
            })??;

        let Some(data) = data else {
            debug!(path = %path.display(), tile = %coord, "Tile not in archive");
            return Ok(None);
        };

        let data = normalize_payload(archive.format(), data).map_err(|e| TileError::TileDecode {
            path: path.display().to_string(),
            tile: coord.to_string(),
            message: e.to_string(),
        })?;

        Ok(Some(FetchedTile {
            data,
            format: archive.format().map(str::to_string),
        }))
    }
}

/// Gunzip vector tile payloads that start with the gzip magic; pass
/// everything else through unchanged.
pub fn normalize_payload(format: Option<&str>, data: Vec<u8>) -> std::io::Result<Bytes> {
    if format != Some(VECTOR_FORMAT) || !data.starts_with(&GZIP_MAGIC) {
        return Ok(Bytes::from(data));
    }

    let mut inflated = Vec::with_capacity(data.len() * 4);
    GzDecoder::new(data.as_slice()).read_to_end(&mut inflated)?;
    Ok(Bytes::from(inflated))
}
