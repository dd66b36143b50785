//! Common types and utilities shared across the chart-tiles crates.

pub mod bbox;
pub mod error;
pub mod tile;

pub use bbox::BoundingBox;
pub use error::{TileError, TileResult};
pub use tile::{tile_extent, tile_to_lon_lat, TileCoord};
