//! Tile and tileset listing endpoints.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chart_common::{TileCoord, TileError};
use tracing::{error, instrument};

use crate::metrics::{record_tile_error, record_tile_not_found, record_tile_served};
use crate::state::AppState;
use crate::tiles::TileOutcome;

/// GET /tiles/tilesets - Metadata of every archive, keyed by file name
#[instrument(skip(state))]
pub async fn tilesets_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.tiles.list_archives().await {
        Ok(archives) => Json(archives).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /tiles/:archive/:z/:x/:y.ext - Raw tile payload
///
/// The extension is ignored; the archive's `format` decides the content type.
#[instrument(skip(state))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((archive, z, x, file)): Path<(String, u32, u32, String)>,
) -> Response {
    let y_str = file.split_once('.').map(|(y, _)| y).unwrap_or(&file);
    let y = match y_str.parse::<u32>() {
        Ok(y) => y,
        Err(_) => {
            return error_response(&TileError::InvalidCoordinate(format!(
                "bad tile row: {}",
                file
            )))
        }
    };

    let coord = TileCoord::new(z, x, y);
    match state.tiles.serve_tile(&archive, coord).await {
        Ok(TileOutcome::Found(tile)) => {
            record_tile_served(&archive);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type(tile.format.as_deref()))],
                tile.data,
            )
                .into_response()
        }
        Ok(TileOutcome::NotFound) => {
            record_tile_not_found(&archive);
            (StatusCode::NOT_FOUND, "Tile not found").into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// MIME type for an archive `format` value.
pub fn content_type(format: Option<&str>) -> &'static str {
    match format {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("pbf") => "application/x-protobuf",
        _ => "application/octet-stream",
    }
}

/// Client errors carry their message; server errors only their status text,
/// the detail (paths, SQLite messages) goes to the log.
fn error_response(e: &TileError) -> Response {
    record_tile_error(e);
    let status =
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(kind = e.kind(), error = %e, "Request failed");
        let reason = status.canonical_reason().unwrap_or("Server error");
        return (status, reason).into_response();
    }
    (status, e.to_string()).into_response()
}
