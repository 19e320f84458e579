//! WMS request handlers.
//!
//! `/wms` answers both standard WMS KVP and permalink-style navigation
//! parameters. When a request carries standard GetMap keys they govern
//! image serving; the permalink family only applies when no GetMap shape
//! is present.

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use std::sync::Arc;
use tracing::{info, instrument};

use mapview_common::crs::transform_bbox;
use mapview_common::extent::normalize_rotation;
use mapview_common::{compute_bbox, CrsCode, MapsError, ThemeState, DEFAULT_DPI};
use mapview_protocol::permalink::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use mapview_protocol::wms::{check_dimensions, WmsCapabilities};
use mapview_protocol::{GetMapRequest, WmsKvp};

use super::common::{png_response, wms_error, xml_response};
use crate::renderer::RenderTask;
use crate::rendering::render_serialized;
use crate::state::AppState;

#[instrument(skip(state, params))]
pub async fn wms_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<WmsKvp>,
) -> Response {
    crate::metrics::record_request("wms");

    // Permalink-only requests are navigation; GetMap keys take precedence
    if !params.is_standard_getmap() && params.has_permalink_params() {
        return permalink_as_getmap(&state, &params).await;
    }

    let service = params.service.as_deref().map(|s| s.to_uppercase());
    if service.as_deref() != Some("WMS") {
        return wms_error(&MapsError::InvalidParameter {
            param: "SERVICE".to_string(),
            message: "SERVICE must be WMS".to_string(),
        });
    }

    let request = params.request.as_deref().map(|s| s.to_uppercase());
    match request.as_deref() {
        Some("GETCAPABILITIES") => get_capabilities(&state).await,
        Some("GETMAP") => get_map(&state, &params).await,
        Some(other) => wms_error(&MapsError::UnknownOperation(other.to_string())),
        None => wms_error(&MapsError::MissingParameter("REQUEST".to_string())),
    }
}

async fn get_capabilities(state: &AppState) -> Response {
    let view = state.layers.current_view().await;
    // A rotated view advertises the axis-aligned box enclosing its viewport
    let geographic_bbox = transform_bbox(&view.enclosing_bbox(), &view.crs, &CrsCode::Epsg4326);

    let layers: Vec<(String, String)> = state
        .layers
        .vector_layers()
        .await
        .into_iter()
        .map(|l| (l.id, l.title))
        .collect();

    let xml = WmsCapabilities {
        base_url: &state.config.base_url,
        title: &state.config.service_title,
        abstract_text: &state.config.service_abstract,
        geographic_bbox,
        layers: &layers,
    }
    .build();

    xml_response(xml)
}

async fn get_map(state: &AppState, params: &WmsKvp) -> Response {
    let request = match GetMapRequest::from_kvp(params) {
        Ok(r) => r,
        Err(e) => return wms_error(&e),
    };

    info!(
        bbox = %request.bbox.to_wms_string(),
        crs = %request.crs,
        width = request.width,
        height = request.height,
        rotation = request.rotation,
        "GetMap request"
    );

    let layers = layer_restriction(request.theme.as_ref(), request.layers.as_deref());

    let task = RenderTask {
        bbox: request.bbox,
        crs: request.crs.clone(),
        width: request.width,
        height: request.height,
        rotation: request.rotation,
        layers,
        transparent: request.transparent,
    };

    match render_serialized(state, task).await {
        Ok(png) => png_response(png),
        Err(e) => wms_error(&e),
    }
}

/// Serve permalink parameters through the GetMap pipeline.
async fn permalink_as_getmap(state: &AppState, params: &WmsKvp) -> Response {
    let (Some(x), Some(y), Some(scale)) = (params.x, params.y, params.scale) else {
        return wms_error(&MapsError::MissingParameter("x/y/scale".to_string()));
    };
    if scale <= 0.0 || !scale.is_finite() {
        return wms_error(&MapsError::InvalidParameter {
            param: "scale".to_string(),
            message: "scale must be a positive number".to_string(),
        });
    }

    let crs = params
        .crs
        .as_deref()
        .map(CrsCode::from_wms_string)
        .unwrap_or(CrsCode::Epsg3857);
    let rotation = normalize_rotation(params.rotation.unwrap_or(0.0));
    let width = params.width.unwrap_or(DEFAULT_WIDTH);
    let height = params.height.unwrap_or(DEFAULT_HEIGHT);
    if let Err(e) = check_dimensions(width, height) {
        return wms_error(&e);
    }

    let theme = params.theme.as_deref().and_then(ThemeState::from_json);
    let layers = layer_restriction(theme.as_ref(), None);

    info!(x, y, scale, crs = %crs, rotation, width, height, "permalink GetMap request");

    // Degrees-unit centers are projected before the planar bbox math;
    // meter-unit and unknown CRSs pass through untouched.
    let (cx, cy) = mapview_common::crs::transform_point(x, y, &crs, &CrsCode::Epsg3857);
    let render_crs = if crs.is_geographic() {
        CrsCode::Epsg3857
    } else {
        crs
    };
    let bbox = compute_bbox((cx, cy), scale, width, height, DEFAULT_DPI);

    let task = RenderTask {
        bbox,
        crs: render_crs,
        width,
        height,
        rotation,
        layers,
        transparent: false,
    };

    match render_serialized(state, task).await {
        Ok(png) => png_response(png),
        Err(e) => wms_error(&e),
    }
}

/// Layer restriction for a render: an explicit theme wins over the LAYERS
/// parameter.
fn layer_restriction(theme: Option<&ThemeState>, layers_param: Option<&str>) -> Option<Vec<String>> {
    if let Some(theme) = theme {
        if !theme.layer_states.is_empty() {
            return Some(
                theme
                    .visible_layer_ids()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            );
        }
    }
    layers_param.map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_restriction_theme_wins() {
        let theme = ThemeState::from_json(
            r#"{"version":"1.0","layer_states":{"a":{"name":"A","visible":true},"b":{"name":"B","visible":false}}}"#,
        )
        .unwrap();
        let restriction = layer_restriction(Some(&theme), Some("c,d"));
        assert_eq!(restriction, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_layer_restriction_from_param() {
        let restriction = layer_restriction(None, Some("roads, buildings"));
        assert_eq!(
            restriction,
            Some(vec!["roads".to_string(), "buildings".to_string()])
        );
        assert_eq!(layer_restriction(None, None), None);
    }
}
