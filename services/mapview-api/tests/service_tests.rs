//! End-to-end dispatcher tests driving the router in-process.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use mapview_api::layers::InMemoryLayerStore;
use mapview_api::renderer::PlaceholderRenderer;
use mapview_api::state::{AppState, ServerConfig};

fn app() -> Router {
    let state = Arc::new(AppState::new(
        ServerConfig::default(),
        Arc::new(PlaceholderRenderer),
        Arc::new(InMemoryLayerStore::with_sample_data()),
    ));
    mapview_api::build_router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec(), content_type)
}

fn is_png(body: &[u8]) -> bool {
    body.starts_with(&[0x89, 0x50, 0x4E, 0x47])
}

// ============================================================================
// Probes and routing
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body, _) = get(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_unknown_endpoint_lists_available() {
    let (status, body, _) = get(app(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("/wms"));
    assert!(text.contains("/wmts"));
    assert!(text.contains("/wfs"));
}

// ============================================================================
// WMS
// ============================================================================

#[tokio::test]
async fn test_wms_capabilities() {
    let (status, body, content_type) =
        get(app(), "/wms?SERVICE=WMS&REQUEST=GetCapabilities").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/xml"));
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("<WMS_Capabilities"));
    assert!(xml.contains("<Name>landmarks</Name>"));
}

#[tokio::test]
async fn test_wms_capabilities_lowercase_keys() {
    let (status, body, _) = get(app(), "/wms?service=WMS&request=GetCapabilities").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("<WMS_Capabilities"));
}

#[tokio::test]
async fn test_wms_getmap_renders_png() {
    let (status, body, content_type) = get(
        app(),
        "/wms?SERVICE=WMS&REQUEST=GetMap&VERSION=1.3.0&CRS=EPSG:3857&BBOX=15540000,4250000,15560000,4270000&WIDTH=256&HEIGHT=256&FORMAT=image/png",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_wms_getmap_missing_bbox_is_exception() {
    let (status, body, _) =
        get(app(), "/wms?SERVICE=WMS&REQUEST=GetMap&CRS=EPSG:3857").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("ServiceExceptionReport"));
    assert!(xml.contains("MissingParameterValue"));
}

#[tokio::test]
async fn test_wms_wrong_service_rejected() {
    let (status, body, _) = get(app(), "/wms?SERVICE=WCS&REQUEST=GetMap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body)
        .unwrap()
        .contains("InvalidParameterValue"));
}

#[tokio::test]
async fn test_wms_oversized_dimensions_rejected() {
    let (status, body, _) = get(
        app(),
        "/wms?SERVICE=WMS&REQUEST=GetMap&CRS=EPSG:3857&BBOX=0,0,1,1&WIDTH=9000&HEIGHT=256",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("too large"));
}

#[tokio::test]
async fn test_wms_permalink_params_render() {
    // Permalink keys without a GetMap shape are navigation on /wms
    let (status, body, content_type) = get(
        app(),
        "/wms?x=15550408&y=4257415&scale=10000&crs=EPSG:3857&rotation=45",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert!(is_png(&body));
}

// ============================================================================
// WMTS
// ============================================================================

#[tokio::test]
async fn test_wmts_capabilities() {
    let (status, body, _) = get(app(), "/wmts?SERVICE=WMTS&REQUEST=GetCapabilities").await;
    assert_eq!(status, StatusCode::OK);
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("<Capabilities"));
    assert!(xml.contains("urn:ogc:def:crs:EPSG::3857"));
}

#[tokio::test]
async fn test_wmts_kvp_tile() {
    let (status, body, content_type) = get(
        app(),
        "/wmts?SERVICE=WMTS&REQUEST=GetTile&TILEMATRIXSET=EPSG:3857&TILEMATRIX=3&TILEROW=1&TILECOL=2&FORMAT=image/png",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_wmts_rest_tile() {
    let (status, body, _) = get(app(), "/wmts/3/2/1.png").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_wmts_rest_tile_tms_flag() {
    // Row 1 flips to 6 at matrix 3; both address valid tiles
    let (status, body, _) = get(app(), "/wmts/3/2/1.png?tms=1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_xyz_alias() {
    let (status, body, _) = get(app(), "/xyz/3/2/1.png").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_wmts_tile_out_of_range() {
    let (status, body, _) = get(app(), "/wmts/3/2/99.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("ExceptionReport"));
    assert!(xml.contains("TileOutOfRange"));
}

#[tokio::test]
async fn test_wmts_malformed_path() {
    let (status, _, _) = get(app(), "/wmts/not/a/tile").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// WFS
// ============================================================================

#[tokio::test]
async fn test_wfs_capabilities() {
    let (status, body, _) = get(app(), "/wfs?SERVICE=WFS&REQUEST=GetCapabilities").await;
    assert_eq!(status, StatusCode::OK);
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("WFS_Capabilities"));
    assert!(xml.contains("<Name>landmarks</Name>"));
}

#[tokio::test]
async fn test_wfs_getfeature_geojson_with_style_hint() {
    let (status, body, content_type) = get(
        app(),
        "/wfs?SERVICE=WFS&REQUEST=GetFeature&TYPENAME=landmarks&OUTPUTFORMAT=application/json",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("application/json"));
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["type"], "FeatureCollection");
    let features = parsed["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"]["_qgis_style"]["geomType"], "Point");
}

#[tokio::test]
async fn test_wfs_getfeature_maxfeatures() {
    let (status, body, _) = get(
        app(),
        "/wfs?SERVICE=WFS&REQUEST=GetFeature&TYPENAME=landmarks&MAXFEATURES=1",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["features"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_wfs_getfeature_unknown_layer() {
    let (status, body, _) = get(
        app(),
        "/wfs?SERVICE=WFS&REQUEST=GetFeature&TYPENAME=missing",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8(body).unwrap().contains("LayerNotDefined"));
}

#[tokio::test]
async fn test_wfs_describe_feature_type() {
    let (status, body, _) = get(
        app(),
        "/wfs?SERVICE=WFS&REQUEST=DescribeFeatureType&TYPENAME=landmarks",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("xsd:schema"));
    assert!(xml.contains(r#"<xsd:element name="name" type="xsd:string""#));
}

#[tokio::test]
async fn test_wfs_getstyles_returns_sld() {
    let (status, body, content_type) = get(
        app(),
        "/wfs?SERVICE=WFS&REQUEST=GetStyles&TYPENAME=landmarks",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().contains("sld"));
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("StyledLayerDescriptor"));
    assert!(xml.contains("<WellKnownName>circle</WellKnownName>"));

    // The served SLD converts cleanly back into style layers
    let layers = mapview_protocol::sld_to_style_layers(&xml, "landmarks");
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].kind, mapview_protocol::StyleLayerKind::Circle);
}

#[tokio::test]
async fn test_wfs_layers_listing() {
    let (status, body, _) = get(app(), "/wfs-layers").await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["layers"][0]["typename"], "landmarks");
}

// ============================================================================
// Viewer style document
// ============================================================================

#[tokio::test]
async fn test_style_base_only() {
    let (status, body, content_type) = get(app(), "/style").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("application/json"));
    let style: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(style["version"], 8);
    assert_eq!(style["layers"].as_array().unwrap().len(), 1);
    assert_eq!(style["layers"][0]["type"], "raster");
}

#[tokio::test]
async fn test_style_with_vector_layer() {
    let (status, body, _) = get(app(), "/style?typename=landmarks").await;
    assert_eq!(status, StatusCode::OK);
    let style: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let layers = style["layers"].as_array().unwrap();
    // basemap raster plus the converted circle layer
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[1]["type"], "circle");
    assert_eq!(layers[1]["source"], "landmarks");
    assert_eq!(layers[1]["paint"]["circle-color"], "#e03131");
    assert!(style["sources"]["landmarks"]["data"]
        .as_str()
        .unwrap()
        .contains("REQUEST=GetFeature"));
}

#[tokio::test]
async fn test_style_unknown_typename() {
    let (status, _, _) = get(app(), "/style?typename=missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Permalink navigation
// ============================================================================

#[tokio::test]
async fn test_map_native_permalink() {
    let (status, body, content_type) = get(
        app(),
        "/map?x=15550408&y=4257415&scale=10000&crs=EPSG:3857&rotation=0&width=400&height=300",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_map_foreign_url_parameter() {
    let (status, body, _) = get(
        app(),
        "/map?permalink=https%3A%2F%2Fwww.example.com%2Fmaps%2F%4035.6895%2C139.6917%2C850m%2Fdata",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_map_lat_lon_keys() {
    let (status, body, _) = get(app(), "/map?lat=35.6895&lon=139.6917&zoom=14").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_png(&body));
}

#[tokio::test]
async fn test_map_unparseable_is_plain_text_400() {
    let (status, _, content_type) = get(app(), "/map?bogus=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(content_type.unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_map_oversized_viewport_rejected() {
    let (status, _, _) = get(
        app(),
        "/map?x=0&y=0&scale=10000&width=50000&height=300",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
