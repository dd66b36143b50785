//! Application state shared across handlers.

use crate::config::ServerConfig;
use crate::tiles::TileService;

/// Shared application state.
pub struct AppState {
    pub config: ServerConfig,
    pub tiles: TileService,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let tiles = TileService::new(&config);
        Self { config, tiles }
    }
}
