//! End-to-end tests for the HTTP router.
//!
//! Each test builds archives in a temporary data directory and drives the
//! router with `tower::ServiceExt::oneshot`, no listener involved.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chart_common::BoundingBox;
use chart_server::config::{DecodeFailurePolicy, ServerConfig};
use chart_server::create_router;
use chart_server::state::AppState;
use metrics_exporter_prometheus::PrometheusBuilder;
use test_utils::{
    corrupt_gzip, write_raster_archive, write_style, write_world_archive, ArchiveBuilder, DataDir,
    WORLD_TILE_PAYLOAD,
};
use tower::ServiceExt;

fn router(config: ServerConfig) -> Router {
    let prometheus = PrometheusBuilder::new().build_recorder().handle();
    create_router(Arc::new(AppState::new(config)), prometheus)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

async fn tilesets(app: Router) -> BTreeMap<String, BTreeMap<String, String>> {
    let (status, _, body) = get(app, "/tiles/tilesets").await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn write_corrupt_archive(data: &DataDir) {
    ArchiveBuilder::new()
        .metadata("format", "pbf")
        .tile(0, 0, 0, corrupt_gzip())
        .write(&data.path().join("corrupt.mbtiles"))
        .await
        .unwrap();
}

// ============================================================================
// World archive scenario
// ============================================================================

#[tokio::test]
async fn test_world_tileset_metadata() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let sets = tilesets(app).await;
    let world = &sets["world.mbtiles"];

    assert_eq!(world["format"], "pbf");
    assert_eq!(world["minzoom"], "1");
    assert_eq!(world["maxzoom"], "1");

    let bounds = BoundingBox::from_bounds_string(&world["bounds"]).unwrap();
    assert!(bounds.contains_point(0.0, 85.05), "bounds were {}", world["bounds"]);
    assert!(bounds.contains_point(0.0, 0.0), "bounds were {}", world["bounds"]);
}

#[tokio::test]
async fn test_world_tile_is_decompressed() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, content_type, body) = get(app, "/tiles/world.mbtiles/1/1/1.pbf").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/x-protobuf"));
    assert_eq!(body, WORLD_TILE_PAYLOAD);
}

#[tokio::test]
async fn test_style_url_advertised_and_served() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    write_style(&data.styles(), "world.mbtiles").unwrap();
    let config = ServerConfig::for_data_dir(data.path());

    let sets = tilesets(router(config.clone())).await;
    assert_eq!(
        sets["world.mbtiles"]["stratux_style_url"],
        "./static/data/styles/world.mbtiles/style.json"
    );

    // for_data_dir serves the data directory itself under /static
    let (status, _, body) = get(router(config), "/static/styles/world.mbtiles/style.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("\"version\":8"));
}

// ============================================================================
// Tile lookup
// ============================================================================

#[tokio::test]
async fn test_missing_tile_row_is_404() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, _, _) = get(app, "/tiles/world.mbtiles/5/0/0.pbf").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_raster_tile_served_with_png_type() {
    let data = DataDir::new();
    write_raster_archive(&data.path(), "sectional.db").await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, content_type, body) = get(app, "/tiles/sectional.db/3/2/3.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(body, test_utils::fake_png_tile(3, 2, 3));
}

#[tokio::test]
async fn test_corrupt_tile_is_500_by_default() {
    let data = DataDir::new();
    write_corrupt_archive(&data).await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, _, body) = get(app, "/tiles/corrupt.mbtiles/0/0/0.pbf").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Internal Server Error");
}

#[tokio::test]
async fn test_corrupt_tile_is_404_under_not_found_policy() {
    let data = DataDir::new();
    write_corrupt_archive(&data).await;
    let mut config = ServerConfig::for_data_dir(data.path());
    config.decode_failure = DecodeFailurePolicy::NotFound;
    let app = router(config);

    let (status, _, _) = get(app, "/tiles/corrupt.mbtiles/0/0/0.pbf").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_archive_is_500() {
    let data = DataDir::new();
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, _, body) = get(app, "/tiles/nowhere.mbtiles/0/0/0.png").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(body).unwrap();
    assert!(!body.contains(&*data.path().to_string_lossy()), "body leaked a path: {}", body);
}

#[tokio::test]
async fn test_malformed_row_is_400() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, _, _) = get(app, "/tiles/world.mbtiles/1/1/abc.pbf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_traversal_in_archive_name_is_400() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    let app = router(ServerConfig::for_data_dir(data.path().join("styles")));

    let (status, _, _) = get(app, "/tiles/..%2Fworld.mbtiles/1/1/1.pbf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_percent_encoded_archive_name() {
    let data = DataDir::new();
    write_raster_archive(&data.path(), "VFR Sectional.mbtiles").await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, _, _) = get(app, "/tiles/VFR%20Sectional.mbtiles/2/1/1.png").await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Tileset listing
// ============================================================================

#[tokio::test]
async fn test_tilesets_skip_broken_and_foreign_files() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    write_raster_archive(&data.path(), "sectional.db").await;
    std::fs::write(data.path().join("broken.mbtiles"), b"not a database").unwrap();
    std::fs::write(data.path().join("readme.txt"), b"charts").unwrap();
    std::fs::create_dir(data.path().join("nested.mbtiles")).unwrap();
    let app = router(ServerConfig::for_data_dir(data.path()));

    let sets = tilesets(app).await;

    let names: Vec<&str> = sets.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["sectional.db", "world.mbtiles"]);
    assert_eq!(sets["sectional.db"]["format"], "png");
    assert_eq!(sets["sectional.db"]["minzoom"], "2");
    assert_eq!(sets["sectional.db"]["maxzoom"], "3");
}

#[tokio::test]
async fn test_tilesets_empty_directory() {
    let data = DataDir::new();
    let app = router(ServerConfig::for_data_dir(data.path()));

    assert!(tilesets(app).await.is_empty());
}

#[tokio::test]
async fn test_tilesets_missing_directory_is_500() {
    let data = DataDir::new();
    let app = router(ServerConfig::for_data_dir(data.path().join("absent")));

    let (status, _, _) = get(app, "/tiles/tilesets").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Health, metrics, CORS
// ============================================================================

#[tokio::test]
async fn test_health() {
    let data = DataDir::new();
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, _, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let data = DataDir::new();
    let app = router(ServerConfig::for_data_dir(data.path()));

    let (status, content_type, _) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let data = DataDir::new();
    write_world_archive(&data.path()).await;
    let app = router(ServerConfig::for_data_dir(data.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/tiles/tilesets")
                .header(header::ORIGIN, "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
