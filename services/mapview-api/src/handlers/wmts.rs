//! WMTS request handlers.
//!
//! `/wmts` serves KVP GetCapabilities/GetTile; `/wmts/{matrix}/{col}/{row}.{fmt}`
//! (and the `/xyz/...` alias) serve the RESTful binding. A `tms=1` query flag
//! flips the row origin to bottom-left.

use axum::{
    extract::{Extension, Path, Query},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use mapview_common::tile::TILE_SIZE;
use mapview_common::{CrsCode, MapsError};
use mapview_protocol::wmts::{TileFormat, WmtsCapabilities};
use mapview_protocol::{GetTileRequest, WmtsKvp, WmtsRestPath};

use super::common::{ows_error, png_response, xml_response};
use crate::renderer::RenderTask;
use crate::rendering::render_serialized;
use crate::state::AppState;

#[instrument(skip(state, params))]
pub async fn wmts_kvp_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<WmtsKvp>,
) -> Response {
    crate::metrics::record_request("wmts");

    let request = params.request.as_deref().map(|s| s.to_uppercase());
    let service = params.service.as_deref().map(|s| s.to_uppercase());

    // GetCapabilities also answers bare SERVICE=WMTS probes
    let is_capabilities = matches!(request.as_deref(), Some("GETCAPABILITIES"))
        || (request.is_none() && service.as_deref() == Some("WMTS"));
    if is_capabilities {
        return get_capabilities(&state).await;
    }

    match request.as_deref() {
        Some("GETTILE") => match params.to_tile_request() {
            Ok(req) => serve_tile(&state, req).await,
            Err(e) => ows_error(&e),
        },
        Some(other) => ows_error(&MapsError::UnknownOperation(other.to_string())),
        None => ows_error(&MapsError::MissingParameter("REQUEST".to_string())),
    }
}

/// Query parameters accepted alongside a RESTful tile path.
#[derive(Debug, Default, Deserialize)]
pub struct TileQuery {
    #[serde(rename = "tms", alias = "TMS")]
    pub tms: Option<String>,
}

impl TileQuery {
    fn tms_flag(&self) -> bool {
        matches!(
            self.tms.as_deref().map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("1") | Some("true") | Some("yes")
        )
    }
}

#[instrument(skip(state))]
pub async fn wmts_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<TileQuery>,
) -> Response {
    crate::metrics::record_request("wmts");

    match WmtsRestPath::parse(&path) {
        Ok(rest) => serve_tile(&state, rest.into_request(query.tms_flag())).await,
        Err(e) => ows_error(&e),
    }
}

async fn get_capabilities(state: &AppState) -> Response {
    let layers: Vec<(String, String)> = state
        .layers
        .vector_layers()
        .await
        .into_iter()
        .map(|l| (l.id, l.title))
        .collect();

    let xml = WmtsCapabilities {
        base_url: &state.config.base_url,
        title: &state.config.service_title,
        abstract_text: &state.config.service_abstract,
        layers: &layers,
    }
    .build();

    xml_response(xml)
}

async fn serve_tile(state: &AppState, request: GetTileRequest) -> Response {
    // The render backend only emits PNG
    if request.format != TileFormat::Png {
        return ows_error(&MapsError::UnsupportedFormat(
            request.format.mime().to_string(),
        ));
    }

    let (coord, bbox) = match request.resolve() {
        Ok(resolved) => resolved,
        Err(e) => return ows_error(&e),
    };

    info!(z = coord.z, x = coord.x, y = coord.y, tms = request.tms, "GetTile request");

    let task = RenderTask {
        bbox,
        crs: CrsCode::Epsg3857,
        width: TILE_SIZE,
        height: TILE_SIZE,
        rotation: 0.0,
        layers: None,
        transparent: false,
    };

    match render_serialized(state, task).await {
        Ok(png) => png_response(png),
        Err(e) => ows_error(&e),
    }
}
