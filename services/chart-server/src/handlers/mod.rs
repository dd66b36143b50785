//! HTTP request handlers.

mod metrics;
mod tiles;

pub use metrics::{health_handler, metrics_handler};
pub use tiles::{content_type, tile_handler, tilesets_handler};
