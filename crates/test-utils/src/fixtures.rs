//! Common archive fixtures for tile service tests.
//!
//! Each fixture writes a complete archive into the given directory and
//! returns its path.

use std::path::{Path, PathBuf};

use crate::{fake_png_tile, gzip, ArchiveBuilder};

/// Payload stored gzip-compressed in the world fixture.
pub const WORLD_TILE_PAYLOAD: &[u8] = b"hello";

/// File name of the world fixture.
pub const WORLD_ARCHIVE: &str = "world.mbtiles";

/// Tiles of the raster fixture: two zoom levels, an L-shaped footprint at
/// the maximum zoom.
pub const RASTER_TILES: &[(u32, u32, u32)] = &[
    (2, 1, 1),
    (2, 2, 2),
    (3, 2, 3),
    (3, 3, 3),
    (3, 2, 4),
    (3, 5, 5),
];

/// `world.mbtiles`: one gzip-wrapped vector tile at 1/1/1, `format=pbf`,
/// no explicit bounds or zoom range.
pub async fn write_world_archive(dir: &Path) -> PathBuf {
    let path = dir.join(WORLD_ARCHIVE);
    ArchiveBuilder::new()
        .metadata("name", "world")
        .metadata("format", "pbf")
        .tile(1, 1, 1, gzip(WORLD_TILE_PAYLOAD))
        .write(&path)
        .await
        .expect("Failed to write world fixture");
    path
}

/// A PNG archive with [`RASTER_TILES`], no zoom range and no bounds.
pub async fn write_raster_archive(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let builder = RASTER_TILES
        .iter()
        .fold(
            ArchiveBuilder::new()
                .metadata("name", name)
                .metadata("format", "png"),
            |builder, &(z, x, y)| builder.tile(z, x, y, fake_png_tile(z, x, y)),
        );
    builder
        .write(&path)
        .await
        .expect("Failed to write raster fixture");
    path
}
