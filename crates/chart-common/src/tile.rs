//! Slippy-map tile addressing and tile-to-geographic conversion.
//!
//! MBTiles archives store rows in TMS order (row 0 at the south edge); the
//! conversions here take archive rows and flip them into the OSM scheme
//! where row 0 is the northernmost row.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// A tile coordinate (z/x/y) as stored in an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y), TMS order
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Geographic extent of this tile.
    pub fn extent(&self) -> BoundingBox {
        tile_extent(self.z, self.x as i64, self.y as i64)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Convert an archive tile index to the longitude/latitude of the tile's
/// upper-left corner in the y-flipped (row 0 = north) scheme.
///
/// Row and column are signed so callers can address the edge one row or
/// column outside the archive. Negative or huge inputs yield NaN/Inf rather
/// than an error.
pub fn tile_to_lon_lat(z: u32, x: i64, y: i64) -> (f64, f64) {
    let tiles = (z as f64).exp2();
    let flipped = tiles - y as f64 - 1.0;
    let n = PI - 2.0 * PI * flipped / tiles;
    let lat = n.sinh().atan().to_degrees();
    let lon = x as f64 / tiles * 360.0 - 180.0;
    (lon, lat)
}

/// Full geographic extent of one archive tile.
///
/// The north edge of TMS row `y` is the upper-left corner returned by
/// [`tile_to_lon_lat`]; its south edge is the north edge of row `y - 1`.
pub fn tile_extent(z: u32, x: i64, y: i64) -> BoundingBox {
    let (west, north) = tile_to_lon_lat(z, x, y);
    let (east, south) = tile_to_lon_lat(z, x + 1, y - 1);
    BoundingBox::new(west, south, east, north)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_corner_is_exact() {
        assert_eq!(tile_to_lon_lat(1, 0, 0), (-180.0, 0.0));
    }

    #[test]
    fn test_web_mercator_max_latitude() {
        let (lon, lat) = tile_to_lon_lat(1, 1, 1);
        assert!((lon - 0.0).abs() < 1e-9);
        assert!((lat - 85.0511287798).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_zero_covers_world() {
        let extent = tile_extent(0, 0, 0);
        assert!((extent.min_x + 180.0).abs() < 1e-9);
        assert!((extent.max_x - 180.0).abs() < 1e-9);
        assert!((extent.min_y + 85.0511287798).abs() < 1e-9);
        assert!((extent.max_y - 85.0511287798).abs() < 1e-9);
    }

    #[test]
    fn test_tile_coord_display() {
        assert_eq!(TileCoord::new(3, 4, 5).to_string(), "3/4/5");
    }
}
