//! HTTP request handlers: the protocol dispatcher.

pub mod common;
pub mod navigation;
pub mod style;
pub mod wfs;
pub mod wms;
pub mod wmts;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::Response,
};
use metrics_exporter_prometheus::PrometheusHandle;

/// Liveness probe.
pub async fn health_handler() -> &'static str {
    "ok"
}

/// Prometheus metrics scrape endpoint.
pub async fn metrics_handler(
    prometheus: Option<Extension<PrometheusHandle>>,
) -> Response {
    match prometheus {
        Some(Extension(handle)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(handle.render().into())
            .unwrap(),
        None => Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .body("metrics recorder not installed".into())
            .unwrap(),
    }
}

/// Catch-all for unknown paths: a plain 404 naming the live endpoints.
pub async fn not_found() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(
            "Available endpoints: /wms (WMS KVP + permalink), /wmts (WMTS KVP), \
             /wmts/{matrix}/{col}/{row}.png (RESTful tiles), /wfs (WFS), \
             /wfs-layers (layer listing), /map (permalink navigation), \
             /style (viewer style document)"
                .into(),
        )
        .unwrap()
}
