//! WFS request handlers.

use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use mapview_common::MapsError;
use mapview_protocol::wfs::{
    self, capabilities_xml, describe_feature_type_xml, features_to_geojson, features_to_gml,
    layer_listing_json, layer_sld_xml, WfsKvp,
};

use super::common::{json_response, ows_error, ows_error_with_locator, xml_response};
use crate::state::AppState;

#[instrument(skip(state, params))]
pub async fn wfs_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<WfsKvp>,
) -> Response {
    crate::metrics::record_request("wfs");

    let service = params.service.as_deref().map(|s| s.to_uppercase());
    if service.as_deref() != Some("WFS") {
        return ows_error(&MapsError::InvalidParameter {
            param: "SERVICE".to_string(),
            message: "SERVICE must be WFS".to_string(),
        });
    }

    let request = params.request.as_deref().map(|s| s.to_uppercase());
    match request.as_deref() {
        Some("GETCAPABILITIES") => get_capabilities(&state).await,
        Some("GETFEATURE") => get_feature(&state, &params).await,
        Some("DESCRIBEFEATURETYPE") => describe_feature_type(&state, &params).await,
        Some("GETSTYLES") => get_styles(&state, &params).await,
        Some(other) => ows_error(&MapsError::UnknownOperation(other.to_string())),
        None => ows_error(&MapsError::MissingParameter("REQUEST".to_string())),
    }
}

async fn get_capabilities(state: &AppState) -> Response {
    let layers = state.layers.vector_layers().await;
    xml_response(capabilities_xml(&layers, &state.config.base_url))
}

async fn get_feature(state: &AppState, params: &WfsKvp) -> Response {
    let typename = match params.required_typename() {
        Ok(t) => t,
        Err(e) => return ows_error_with_locator(&e, "TYPENAME"),
    };

    let layers = state.layers.vector_layers().await;
    let layer = match wfs::find_layer(&layers, typename) {
        Ok(l) => l,
        Err(e) => return ows_error(&e),
    };

    let max_features = params.max_features_limit();
    let bbox = params.bbox_filter();

    info!(
        typename = typename,
        features = layer.features.len(),
        max_features = ?max_features,
        "GetFeature request"
    );

    let output_format = params
        .output_format
        .as_deref()
        .unwrap_or("application/json")
        .to_ascii_lowercase();

    if output_format.contains("gml") {
        let body = features_to_gml(layer, max_features);
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/gml+xml; charset=utf-8")
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(body.into())
            .unwrap()
    } else {
        json_response(features_to_geojson(layer, bbox.as_ref(), max_features))
    }
}

async fn describe_feature_type(state: &AppState, params: &WfsKvp) -> Response {
    let typename = match params.required_typename() {
        Ok(t) => t,
        Err(e) => return ows_error_with_locator(&e, "TYPENAME"),
    };

    let layers = state.layers.vector_layers().await;
    match wfs::find_layer(&layers, typename) {
        Ok(layer) => xml_response(describe_feature_type_xml(layer)),
        Err(e) => ows_error(&e),
    }
}

async fn get_styles(state: &AppState, params: &WfsKvp) -> Response {
    let typename = match params.required_typename() {
        Ok(t) => t,
        Err(e) => return ows_error_with_locator(&e, "TYPENAME"),
    };

    let layers = state.layers.vector_layers().await;
    match wfs::find_layer(&layers, typename) {
        Ok(layer) => Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                "application/vnd.ogc.sld+xml; charset=utf-8",
            )
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(layer_sld_xml(layer).into())
            .unwrap(),
        Err(e) => ows_error(&e),
    }
}

/// JSON listing of publishable vector layers.
#[instrument(skip(state, params))]
pub async fn wfs_layers_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let only_visible = ["only-visible", "only_visible", "visible"]
        .iter()
        .filter_map(|k| params.get(*k))
        .any(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"));

    let layers = state.layers.vector_layers().await;
    json_response(layer_listing_json(&layers, only_visible))
}
