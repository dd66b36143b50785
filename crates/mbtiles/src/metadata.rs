//! Metadata derivation for MBTiles archives.
//!
//! Explicit `metadata` rows are returned as-is. Values the archive leaves
//! out are filled in from the `tiles` relation:
//! - `minzoom` / `maxzoom` from the stored zoom levels
//! - `bounds` from the tile footprint at the maximum zoom
//! - `stratux_style_url` when a style descriptor exists for a vector archive
//!
//! Map clients need `bounds` up front; without it they request every tile
//! of the world at high zoom and get nothing but 404s outside the footprint.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chart_common::{tile_extent, TileError, TileResult};
use sqlx::SqlitePool;
use tracing::debug;

/// String-keyed archive metadata.
pub type TileMetadata = BTreeMap<String, String>;

/// `format` value of vector tile archives.
pub const VECTOR_FORMAT: &str = "pbf";

/// Metadata key added when a vector style descriptor is found.
pub const STYLE_URL_KEY: &str = "stratux_style_url";

/// Where vector style descriptors live and how clients address them.
#[derive(Debug, Clone)]
pub struct StyleConfig {
    /// Directory holding `<archive-file-name>/style.json`
    pub dir: PathBuf,
    /// URL prefix matching `dir`, used for `stratux_style_url`
    pub url_base: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./static/data/styles"),
            url_base: "./static/data/styles".to_string(),
        }
    }
}

impl StyleConfig {
    /// Filesystem location of the style for `archive_name`.
    pub fn style_path(&self, archive_name: &str) -> PathBuf {
        self.dir.join(archive_name).join("style.json")
    }

    /// Client-facing location of the style for `archive_name`.
    pub fn style_url(&self, archive_name: &str) -> String {
        format!(
            "{}/{}/style.json",
            self.url_base.trim_end_matches('/'),
            archive_name
        )
    }
}

/// Read explicit metadata and fill in the derived keys.
///
/// Only failures to query the `metadata` or `tiles` relations are errors;
/// bounds derivation and the style lookup degrade to omitting their key.
pub async fn derive_metadata(
    pool: &SqlitePool,
    path: &Path,
    styles: &StyleConfig,
) -> TileResult<TileMetadata> {
    let query_error = |e: sqlx::Error| TileError::MetadataQuery {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut meta = TileMetadata::new();

    let has_metadata: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = 'metadata'",
    )
    .fetch_one(pool)
    .await
    .map_err(query_error)?;

    if has_metadata > 0 {
        let rows: Vec<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT CAST(name AS TEXT), CAST(value AS TEXT) FROM metadata")
                .fetch_all(pool)
                .await
                .map_err(query_error)?;

        for (name, value) in rows {
            if let (Some(name), Some(value)) = (name, value) {
                if !value.is_empty() {
                    meta.insert(name, value);
                }
            }
        }
    }

    // An unqueryable tiles relation fails the archive even when nothing
    // below needs a scan.
    sqlx::query_scalar::<_, i64>("SELECT 1 FROM tiles LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(query_error)?;

    // Separate statements so SQLite answers each from the index.
    for (key, sql) in [
        ("minzoom", "SELECT MIN(zoom_level) FROM tiles"),
        ("maxzoom", "SELECT MAX(zoom_level) FROM tiles"),
    ] {
        if meta.contains_key(key) {
            continue;
        }
        let zoom: Option<i64> = sqlx::query_scalar(sql)
            .fetch_one(pool)
            .await
            .map_err(query_error)?;
        if let Some(z) = zoom {
            meta.insert(key.to_string(), z.to_string());
        }
    }

    if !meta.contains_key("bounds") {
        match derive_bounds(pool, &meta).await {
            Ok(Some(bounds)) => {
                meta.insert("bounds".to_string(), bounds);
            }
            Ok(None) => debug!(path = %path.display(), "No tiles at max zoom, bounds omitted"),
            Err(e) => debug!(path = %path.display(), error = %e, "Bounds derivation failed"),
        }
    }

    if meta.get("format").map(String::as_str) == Some(VECTOR_FORMAT) {
        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if tokio::fs::try_exists(styles.style_path(file_name))
                .await
                .unwrap_or(false)
            {
                meta.insert(STYLE_URL_KEY.to_string(), styles.style_url(file_name));
            }
        }
    }

    Ok(meta)
}

/// Bounding box of all tiles at the archive's maximum zoom, formatted as
/// an MBTiles `bounds` value. `None` when there is nothing to cover.
async fn derive_bounds(pool: &SqlitePool, meta: &TileMetadata) -> Result<Option<String>, sqlx::Error> {
    let Some(zoom) = meta.get("maxzoom").and_then(|z| z.trim().parse::<u32>().ok()) else {
        return Ok(None);
    };

    let row: (Option<i64>, Option<i64>, Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT MIN(tile_column), MIN(tile_row), MAX(tile_column), MAX(tile_row) FROM tiles WHERE zoom_level = ?",
    )
    .bind(zoom as i64)
    .fetch_one(pool)
    .await?;

    let (Some(x_min), Some(y_min), Some(x_max), Some(y_max)) = row else {
        return Ok(None);
    };

    // South-west tile and north-east tile span the whole footprint.
    let south_west = tile_extent(zoom, x_min, y_min);
    let north_east = tile_extent(zoom, x_max, y_max);
    Ok(Some(south_west.union(&north_east).to_bounds_string()))
}
