//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mbtiles::{ArchiveCacheConfig, StyleConfig};

/// What a tile request answers when the stored payload cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DecodeFailurePolicy {
    /// Report a server error (500)
    #[default]
    Error,
    /// Treat the tile as missing (404)
    NotFound,
}

/// Chart tile server
#[derive(Parser, Debug, Clone)]
#[command(name = "chart-server")]
#[command(about = "Serves map tiles from MBTiles archives")]
pub struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "CHART_LISTEN_ADDR")]
    pub listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "CHART_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// Directory scanned for `.mbtiles` / `.db` archives
    #[arg(long, default_value = "./static/data", env = "CHART_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Directory holding `<archive>/style.json` vector styles
    #[arg(long, default_value = "./static/data/styles", env = "CHART_STYLES_DIR")]
    pub styles_dir: PathBuf,

    /// URL prefix under which clients reach the styles directory
    #[arg(long, default_value = "./static/data/styles", env = "CHART_STYLES_URL_BASE")]
    pub styles_url_base: String,

    /// Directory served under /static
    #[arg(long, default_value = "./static", env = "CHART_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Read connections per archive
    #[arg(long, default_value_t = 4, env = "CHART_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Seconds allowed for opening an archive and deriving its metadata
    #[arg(long, default_value_t = 30, env = "CHART_OPEN_TIMEOUT_SECS")]
    pub open_timeout_secs: u64,

    /// Seconds allowed for a single tile query
    #[arg(long, default_value_t = 10, env = "CHART_QUERY_TIMEOUT_SECS")]
    pub query_timeout_secs: u64,

    /// Milliseconds SQLite retries a locked archive before failing a statement
    #[arg(long, default_value_t = 5000, env = "CHART_BUSY_TIMEOUT_MS")]
    pub busy_timeout_ms: u64,

    /// Response for tiles whose payload fails to decompress
    #[arg(long, value_enum, default_value_t = DecodeFailurePolicy::Error, env = "CHART_DECODE_FAILURE")]
    pub decode_failure: DecodeFailurePolicy,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub decode_failure: DecodeFailurePolicy,
    pub cache: ArchiveCacheConfig,
}

impl ServerConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            data_dir: args.data_dir.clone(),
            static_dir: args.static_dir.clone(),
            decode_failure: args.decode_failure,
            cache: ArchiveCacheConfig {
                styles: StyleConfig {
                    dir: args.styles_dir.clone(),
                    url_base: args.styles_url_base.clone(),
                },
                max_connections: args.max_connections,
                open_timeout: Duration::from_secs(args.open_timeout_secs),
                query_timeout: Duration::from_secs(args.query_timeout_secs),
                busy_timeout: Duration::from_millis(args.busy_timeout_ms),
            },
        }
    }

    /// Configuration for archives under `data_dir`, styles in
    /// `data_dir/styles`, everything else default.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let styles = StyleConfig {
            dir: data_dir.join("styles"),
            ..StyleConfig::default()
        };
        Self {
            static_dir: data_dir.clone(),
            data_dir,
            decode_failure: DecodeFailurePolicy::default(),
            cache: ArchiveCacheConfig {
                styles,
                ..ArchiveCacheConfig::default()
            },
        }
    }
}
