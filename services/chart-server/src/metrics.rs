//! Request counters exported through the Prometheus recorder.

use chart_common::TileError;
use mbtiles::ArchiveCacheStats;
use metrics::{counter, gauge};

pub fn record_tile_served(archive: &str) {
    counter!("tiles_served_total", "archive" => archive.to_string()).increment(1);
}

pub fn record_tile_not_found(archive: &str) {
    counter!("tiles_not_found_total", "archive" => archive.to_string()).increment(1);
}

pub fn record_tile_error(error: &TileError) {
    counter!("tile_errors_total", "kind" => error.kind()).increment(1);
}

/// Publish the archive cache counters, called before each scrape.
pub fn record_cache_stats(stats: &ArchiveCacheStats) {
    counter!("archive_opens_total").absolute(stats.opens());
    counter!("archive_reloads_total").absolute(stats.reloads());
    counter!("archive_open_failures_total").absolute(stats.failures());
    counter!("archive_cache_hits_total").absolute(stats.hits());
    gauge!("archive_cache_hit_rate").set(stats.hit_rate());
}
