//! Permalink navigation endpoint.
//!
//! `/map` accepts any input the permalink codec understands: native
//! permalink KVP, a full permalink URL in a `permalink` parameter, a
//! third-party map-service URL, lat/lon keys or a bare coordinate string.
//! The resolved view renders to PNG; errors are plain text, not OGC XML.

use axum::{
    extract::{Extension, RawQuery},
    response::Response,
};
use std::sync::Arc;
use tracing::{info, instrument};

use mapview_common::crs::transform_point;
use mapview_common::{compute_bbox, CrsCode, MapViewSnapshot, DEFAULT_DPI};
use mapview_protocol::permalink::{self, ParsedNavigation};
use mapview_protocol::wms::check_dimensions;

use super::common::{plain_error, png_response};
use crate::renderer::RenderTask;
use crate::rendering::render_serialized;
use crate::state::AppState;

#[instrument(skip(state, query))]
pub async fn map_handler(
    Extension(state): Extension<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    crate::metrics::record_request("navigation");

    let query = query.unwrap_or_default();

    // A `permalink` parameter carries a complete foreign URL to decode;
    // otherwise the query itself is the navigation input.
    let input = permalink_param(&query).unwrap_or_else(|| query.clone());

    let nav = match permalink::decode(&input) {
        Ok(nav) => nav,
        Err(e) => return plain_error(&e),
    };

    info!(input = %input, "navigation request");

    let task = match nav {
        ParsedNavigation::WmsGetMap(request) => RenderTask {
            bbox: request.bbox,
            crs: request.crs,
            width: request.width,
            height: request.height,
            rotation: request.rotation,
            layers: None,
            transparent: request.transparent,
        },
        other => {
            let view = other
                .view()
                .expect("non-GetMap navigation always resolves to a view");
            if let Err(e) = check_dimensions(view.width, view.height) {
                return plain_error(&e);
            }
            view_task(&view)
        }
    };

    match render_serialized(&state, task).await {
        Ok(png) => png_response(png),
        Err(e) => plain_error(&e),
    }
}

/// Build a render task from a view snapshot.
///
/// Degrees-unit centers are projected to Web Mercator before the planar
/// bbox arithmetic; meter-unit and unknown CRSs pass through.
fn view_task(view: &MapViewSnapshot) -> RenderTask {
    let (cx, cy) = transform_point(view.center.0, view.center.1, &view.crs, &CrsCode::Epsg3857);
    let crs = if view.crs.is_geographic() {
        CrsCode::Epsg3857
    } else {
        view.crs.clone()
    };
    let bbox = compute_bbox((cx, cy), view.scale, view.width, view.height, DEFAULT_DPI);

    RenderTask {
        bbox,
        crs,
        width: view.width,
        height: view.height,
        rotation: view.rotation,
        layers: None,
        transparent: false,
    }
}

/// Extract a case-sensitive `permalink` parameter from a raw query string.
fn permalink_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "permalink")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permalink_param_extraction() {
        let query = "permalink=https%3A%2F%2Fexample.com%2Fmaps%2F%4035.6%2C139.7%2C16z";
        assert_eq!(
            permalink_param(query).as_deref(),
            Some("https://example.com/maps/@35.6,139.7,16z")
        );
        assert_eq!(permalink_param("x=1&y=2"), None);
        assert_eq!(permalink_param("permalink="), None);
    }

    #[test]
    fn test_view_task_projects_degrees() {
        let view = MapViewSnapshot {
            center: (139.6917, 35.6895),
            scale: 10_000.0,
            rotation: 0.0,
            crs: CrsCode::Epsg4326,
            width: 800,
            height: 600,
        };
        let task = view_task(&view);
        assert_eq!(task.crs, CrsCode::Epsg3857);
        // Tokyo is around x=15.55e6 in Web Mercator
        let (cx, _) = task.bbox.center();
        assert!((cx - 15_549_000.0).abs() < 10_000.0);
    }

    #[test]
    fn test_view_task_keeps_mercator() {
        let view = MapViewSnapshot {
            center: (15_550_000.0, 4_260_000.0),
            scale: 10_000.0,
            rotation: 30.0,
            crs: CrsCode::Epsg3857,
            width: 800,
            height: 600,
        };
        let task = view_task(&view);
        assert_eq!(task.crs, CrsCode::Epsg3857);
        assert_eq!(task.rotation, 30.0);
        let (cx, cy) = task.bbox.center();
        assert!((cx - 15_550_000.0).abs() < 1e-6);
        assert!((cy - 4_260_000.0).abs() < 1e-6);
    }
}
