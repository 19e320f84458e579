//! Viewer style endpoint.
//!
//! `/style` returns a style document for external map viewers: a raster
//! source over the WMTS tiles, plus (when a `typename` is given) the
//! published layer's symbol converted from its SLD into vector style
//! layers, bound to a GeoJSON source served by WFS GetFeature.

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

use mapview_protocol::sld_to_style_layers;
use mapview_protocol::wfs::{self, layer_sld_xml};

use super::common::{json_response, plain_error};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StyleQuery {
    #[serde(
        rename = "typename",
        alias = "typenames",
        alias = "TYPENAME",
        alias = "TYPENAMES",
        alias = "layer"
    )]
    pub typename: Option<String>,
}

#[instrument(skip(state, params))]
pub async fn style_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<StyleQuery>,
) -> Response {
    let base = &state.config.base_url;
    let tile_template = format!("{}/wmts/{{z}}/{{x}}/{{y}}.png", base);

    let mut sources = serde_json::Map::new();
    sources.insert(
        "basemap".to_string(),
        json!({
            "type": "raster",
            "tiles": [tile_template],
            "tileSize": 256,
        }),
    );

    let mut layer_entries: Vec<Value> = vec![json!({
        "id": "basemap",
        "type": "raster",
        "source": "basemap",
        "minzoom": 0,
        "layout": {"visibility": "visible"},
    })];

    let name = match &params.typename {
        None => None,
        Some(typename) => {
            let layers = state.layers.vector_layers().await;
            let layer = match wfs::find_layer(&layers, typename) {
                Ok(l) => l,
                Err(e) => return plain_error(&e),
            };

            let feature_url = format!(
                "{}/wfs?SERVICE=WFS&REQUEST=GetFeature&TYPENAMES={}&OUTPUTFORMAT=application/json",
                base, layer.id
            );
            sources.insert(
                layer.id.clone(),
                json!({
                    "type": "geojson",
                    "data": feature_url,
                }),
            );

            // The layer's symbol round-trips through its SLD document
            let sld = layer_sld_xml(layer);
            for style_layer in sld_to_style_layers(&sld, &layer.id) {
                layer_entries.push(style_layer.to_style_json());
            }

            Some(layer.id.clone())
        }
    };

    let style = json!({
        "version": 8,
        "name": name.unwrap_or_else(|| "basemap".to_string()),
        "sources": Value::Object(sources),
        "layers": layer_entries,
    });

    json_response(style.to_string())
}
