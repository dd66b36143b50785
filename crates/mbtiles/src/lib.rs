//! Read-only access to MBTiles archives.
//!
//! Provides:
//! - [`Archive`]: one opened archive with its derived metadata
//! - [`ArchiveCache`]: path-keyed cache with modification-time invalidation
//! - [`TileFetcher`]: tile lookup with gzip normalization of vector tiles

pub mod archive;
pub mod cache;
pub mod fetch;
pub mod metadata;

pub use archive::Archive;
pub use cache::{ArchiveCache, ArchiveCacheConfig, ArchiveCacheStats};
pub use fetch::{normalize_payload, FetchedTile, TileFetcher};
pub use metadata::{derive_metadata, StyleConfig, TileMetadata, STYLE_URL_KEY, VECTOR_FORMAT};

/// File extensions recognized as tile archives.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["mbtiles", "db"];

/// True when `file_name` carries a recognized archive extension.
pub fn is_archive_file_name(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ARCHIVE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}
