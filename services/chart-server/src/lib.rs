//! Chart tile server.
//!
//! HTTP front end over a directory of MBTiles archives: tileset listing with
//! derived metadata, raw tile lookup, and the static files clients need to
//! resolve vector styles.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod state;
pub mod tiles;

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Build the service router.
pub fn create_router(state: Arc<AppState>, prometheus: PrometheusHandle) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/tiles/tilesets", get(handlers::tilesets_handler))
        .route("/tiles/:archive/:z/:x/:y", get(handlers::tile_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .nest_service("/static", static_files)
        .layer(Extension(state))
        .layer(Extension(prometheus))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
