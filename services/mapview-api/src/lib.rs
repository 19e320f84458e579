//! MapView API service.
//!
//! A single embedded HTTP listener exposing WMS, WMTS and WFS endpoints
//! plus permalink navigation over an injected rendering backend and layer
//! store.

pub mod download;
pub mod handlers;
pub mod layers;
pub mod metrics;
pub mod renderer;
pub mod rendering;
pub mod state;

use axum::{extract::Extension, routing::get, Router};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the service router over a constructed server context.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WMS (also carries permalink-style navigation parameters)
        .route("/wms", get(handlers::wms::wms_handler))
        .route("/wms/", get(handlers::wms::wms_handler))
        // WMTS KVP
        .route("/wmts", get(handlers::wmts::wmts_kvp_handler))
        .route("/wmts/", get(handlers::wmts::wmts_kvp_handler))
        // WMTS RESTful tiles, plus the XYZ alias
        .route("/wmts/*path", get(handlers::wmts::wmts_tile_handler))
        .route("/xyz/*path", get(handlers::wmts::wmts_tile_handler))
        // WFS
        .route("/wfs", get(handlers::wfs::wfs_handler))
        .route("/wfs/", get(handlers::wfs::wfs_handler))
        .route("/wfs-layers", get(handlers::wfs::wfs_layers_handler))
        // Permalink navigation
        .route("/map", get(handlers::navigation::map_handler))
        // Viewer style document
        .route("/style", get(handlers::style::style_handler))
        // Probes
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .fallback(handlers::not_found)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
