//! Permalink encode/decode and navigation-input classification.
//!
//! A permalink is a URL query capturing a complete map view: position,
//! scale, rotation, viewport size and (optionally) a theme payload. Decoding
//! also understands standard WMS GetMap queries, third-party map-service
//! URLs of the `@lat,lon,VALUEz` / `@lat,lon,VALUEm` family and bare
//! `lat,lon,zoom` strings, so one navigation box accepts all of them.

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use url::Url;

use mapview_common::extent::normalize_rotation;
use mapview_common::theme::MAX_THEME_BYTES;
use mapview_common::{
    scale_for_zoom, zoom_for_view_distance, CrsCode, MapViewSnapshot, MapsError, MapsResult,
    ThemeState,
};

use crate::wms::{GetMapRequest, WmsKvp};

/// Default viewport for navigation requests that do not carry a size.
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

static AT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([-0-9.]+),([-0-9.]+),([^/\s]+)").unwrap());
static AT_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9.]+)(m|z)?").unwrap());

/// A decoded native permalink.
#[derive(Debug, Clone, PartialEq)]
pub struct Permalink {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub crs: CrsCode,
    /// Degrees, [0, 360)
    pub rotation: f64,
    pub width: u32,
    pub height: u32,
    pub theme: Option<ThemeState>,
}

impl Permalink {
    /// Encode as a URL query string. `decode` inverts this exactly.
    pub fn encode(&self) -> String {
        let mut query = format!(
            "x={}&y={}&scale={}&crs={}&rotation={}&width={}&height={}",
            self.x, self.y, self.scale, self.crs, self.rotation, self.width, self.height
        );
        if let Some(theme) = &self.theme {
            let json = theme.to_json();
            query.push_str("&theme=");
            query.push_str(&utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string());
        }
        query
    }

    /// The map view this permalink describes.
    pub fn view(&self) -> MapViewSnapshot {
        MapViewSnapshot {
            center: (self.x, self.y),
            scale: self.scale,
            rotation: self.rotation,
            crs: self.crs.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Classified navigation input.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedNavigation {
    /// Native permalink KVP
    Permalink(Permalink),
    /// Standard WMS GetMap KVP; image serving is governed by these keys
    WmsGetMap(GetMapRequest),
    /// Third-party map-service URL (`@lat,lon,16z` / `@lat,lon,850m`)
    MapServiceUrl {
        lat: f64,
        lon: f64,
        zoom: f64,
        scale: f64,
    },
    /// Bare `lat,lon[,zoom]` string or lat/lon query keys
    LatLonZoom {
        lat: f64,
        lon: f64,
        zoom: Option<f64>,
        scale: f64,
    },
}

impl ParsedNavigation {
    /// Resolve to a view snapshot for rendering, when the input is a pure
    /// navigation shape. GetMap inputs carry their own bbox and return None.
    pub fn view(&self) -> Option<MapViewSnapshot> {
        match self {
            ParsedNavigation::Permalink(p) => Some(p.view()),
            ParsedNavigation::WmsGetMap(_) => None,
            ParsedNavigation::MapServiceUrl { lat, lon, scale, .. }
            | ParsedNavigation::LatLonZoom { lat, lon, scale, .. } => Some(MapViewSnapshot {
                center: (*lon, *lat),
                scale: *scale,
                rotation: 0.0,
                crs: CrsCode::Epsg4326,
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
            }),
        }
    }
}

/// Decode any supported navigation input.
///
/// Accepts a full URL, a bare query string, a third-party map URL or a
/// bare coordinate string. Unrecognized shapes are a typed error, never a
/// guessed answer.
pub fn decode(input: &str) -> MapsResult<ParsedNavigation> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(MapsError::MalformedRequest(
            "empty navigation input".to_string(),
        ));
    }

    let pairs = query_pairs(trimmed);

    // Standard WMS GetMap governs when its keys are present
    if let Some(request) = value_ci(&pairs, "REQUEST") {
        if request.eq_ignore_ascii_case("GetMap") {
            let kvp = kvp_from_pairs(&pairs);
            return GetMapRequest::from_kvp(&kvp).map(ParsedNavigation::WmsGetMap);
        }
    }

    // Native permalink KVP (case-sensitive keys)
    if let (Some(x), Some(y)) = (value_cs(&pairs, "x"), value_cs(&pairs, "y")) {
        let has_view_key = pairs
            .iter()
            .any(|(k, _)| k == "scale" || k == "zoom" || k == "crs");
        if has_view_key {
            return decode_native(&pairs, x, y);
        }
    }

    // lat/lon query keys
    if let (Some(lat), Some(lon)) = (
        value_cs(&pairs, "lat").or_else(|| value_cs(&pairs, "latitude")),
        value_cs(&pairs, "lon")
            .or_else(|| value_cs(&pairs, "lng"))
            .or_else(|| value_cs(&pairs, "longitude")),
    ) {
        let lat: f64 = parse_num(&lat, "lat")?;
        let lon: f64 = parse_num(&lon, "lon")?;
        let zoom = value_cs(&pairs, "zoom")
            .or_else(|| value_cs(&pairs, "z"))
            .and_then(|z| z.parse::<f64>().ok());
        let scale = zoom.map(scale_for_zoom).unwrap_or(mapview_common::scale::DEFAULT_SCALE);
        return Ok(ParsedNavigation::LatLonZoom {
            lat,
            lon,
            zoom,
            scale,
        });
    }

    // Third-party map-service URL: .../@lat,lon,VALUE[z|m]
    if let Some(parsed) = parse_at_url(trimmed) {
        return Ok(parsed);
    }

    // Bare "lat,lon[,zoom]" string
    if let Some(parsed) = parse_bare_coordinates(trimmed) {
        return Ok(parsed);
    }

    Err(MapsError::MalformedRequest(format!(
        "unrecognized navigation input: {}",
        trimmed
    )))
}

fn decode_native(
    pairs: &[(String, String)],
    x: String,
    y: String,
) -> MapsResult<ParsedNavigation> {
    let x: f64 = parse_num(&x, "x")?;
    let y: f64 = parse_num(&y, "y")?;

    let scale = match value_cs(pairs, "scale") {
        Some(raw) => parse_num(&raw, "scale")?,
        None => {
            // zoom-only permalinks resolve through the scale table
            let zoom = value_cs(pairs, "zoom").and_then(|z| z.parse::<f64>().ok());
            zoom.map(scale_for_zoom)
                .unwrap_or(mapview_common::scale::DEFAULT_SCALE)
        }
    };
    if scale <= 0.0 || !scale.is_finite() {
        return Err(MapsError::InvalidParameter {
            param: "scale".to_string(),
            message: "scale must be a positive number".to_string(),
        });
    }

    let crs = value_cs(pairs, "crs")
        .map(|c| CrsCode::from_wms_string(&c))
        .unwrap_or(CrsCode::Epsg3857);

    let rotation = value_cs(pairs, "rotation")
        .and_then(|r| r.parse::<f64>().ok())
        .map(normalize_rotation)
        .unwrap_or(0.0);

    let width = value_cs(pairs, "width")
        .and_then(|w| w.parse().ok())
        .unwrap_or(DEFAULT_WIDTH);
    let height = value_cs(pairs, "height")
        .and_then(|h| h.parse().ok())
        .unwrap_or(DEFAULT_HEIGHT);

    let theme = match value_cs(pairs, "theme") {
        Some(raw) if raw.len() > MAX_THEME_BYTES => {
            return Err(MapsError::ResourceLimitExceeded(format!(
                "theme payload exceeds {} bytes",
                MAX_THEME_BYTES
            )))
        }
        // A malformed theme never sinks the position decode
        Some(raw) => ThemeState::from_json(&raw),
        None => None,
    };

    Ok(ParsedNavigation::Permalink(Permalink {
        x,
        y,
        scale,
        crs,
        rotation,
        width,
        height,
        theme,
    }))
}

fn parse_at_url(input: &str) -> Option<ParsedNavigation> {
    let caps = AT_PATTERN.captures(input)?;
    let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lon: f64 = caps.get(2)?.as_str().parse().ok()?;
    let rest = caps.get(3)?.as_str();

    let value_caps = AT_VALUE.captures(rest)?;
    let value: f64 = value_caps.get(1)?.as_str().parse().ok()?;
    let zoom = match value_caps.get(2).map(|m| m.as_str()) {
        // Zoom levels are used directly
        Some("z") | None => value,
        // View widths in meters invert through the distance table
        Some("m") => zoom_for_view_distance(value) as f64,
        Some(_) => return None,
    };

    Some(ParsedNavigation::MapServiceUrl {
        lat,
        lon,
        zoom,
        scale: scale_for_zoom(zoom),
    })
}

fn parse_bare_coordinates(input: &str) -> Option<ParsedNavigation> {
    let parts: Vec<&str> = input.split(',').map(|p| p.trim()).collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let a: f64 = parts[0].parse().ok()?;
    let b: f64 = parts[1].parse().ok()?;
    let zoom: Option<f64> = parts.get(2).and_then(|z| z.parse().ok());

    // Heuristic: a latitude cannot exceed 90
    let (lat, lon) = if a.abs() > 90.0 { (b, a) } else { (a, b) };
    if lat.abs() > 90.0 || lon.abs() > 360.0 {
        return None;
    }

    let scale = zoom
        .map(scale_for_zoom)
        .unwrap_or(mapview_common::scale::DEFAULT_SCALE);
    Some(ParsedNavigation::LatLonZoom {
        lat,
        lon,
        zoom,
        scale,
    })
}

// ============================================================================
// Query plumbing
// ============================================================================

/// Extract decoded key/value pairs from a URL or a bare query string.
fn query_pairs(input: &str) -> Vec<(String, String)> {
    let query = if let Ok(url) = Url::parse(input) {
        url.query().unwrap_or("").to_string()
    } else if input.contains('=') {
        input.trim_start_matches('?').to_string()
    } else {
        return Vec::new();
    };

    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn value_cs(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

fn value_ci(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.clone())
}

fn parse_num(raw: &str, param: &str) -> MapsResult<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| MapsError::InvalidParameter {
            param: param.to_string(),
            message: format!("not a number: {}", raw),
        })
}

/// Build a WmsKvp from raw pairs, matching OGC keys case-insensitively and
/// permalink keys exactly.
fn kvp_from_pairs(pairs: &[(String, String)]) -> WmsKvp {
    let mut kvp = WmsKvp::default();
    for (key, value) in pairs {
        match key.to_ascii_uppercase().as_str() {
            "SERVICE" => kvp.service = Some(value.clone()),
            "REQUEST" => kvp.request = Some(value.clone()),
            "VERSION" => kvp.version = Some(value.clone()),
            "LAYERS" => kvp.layers = Some(value.clone()),
            "STYLES" => kvp.styles = Some(value.clone()),
            "CRS" | "SRS" => kvp.crs = Some(value.clone()),
            "BBOX" => kvp.bbox = Some(value.clone()),
            "WIDTH" => kvp.width = value.parse().ok(),
            "HEIGHT" => kvp.height = value.parse().ok(),
            "FORMAT" => kvp.format = Some(value.clone()),
            "TRANSPARENT" => kvp.transparent = Some(value.clone()),
            "ANGLE" => kvp.angle = Some(value.clone()),
            _ => {}
        }
        if key == "theme" {
            kvp.theme = Some(value.clone());
        }
    }
    kvp
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapview_common::theme::LayerState;

    fn sample_permalink() -> Permalink {
        Permalink {
            x: 15554567.25,
            y: 4254338.5,
            scale: 10000.0,
            crs: CrsCode::Epsg3857,
            rotation: 45.0,
            width: 1024,
            height: 768,
            theme: None,
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let p = sample_permalink();
        let decoded = decode(&p.encode()).unwrap();
        assert_eq!(decoded, ParsedNavigation::Permalink(p));
    }

    #[test]
    fn test_roundtrip_with_theme() {
        let mut p = sample_permalink();
        let mut theme = ThemeState::new("StandardMap");
        theme.layer_states.insert(
            "roads".to_string(),
            LayerState {
                name: "Roads".to_string(),
                visible: true,
                opacity: 0.8,
                current_style: Some("highway_style".to_string()),
            },
        );
        p.theme = Some(theme);

        let encoded = p.encode();
        assert!(encoded.contains("theme=%7B"));
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, ParsedNavigation::Permalink(p));
    }

    #[test]
    fn test_roundtrip_through_full_url() {
        let p = sample_permalink();
        let url = format!("http://localhost:8089/map?{}", p.encode());
        let decoded = decode(&url).unwrap();
        assert_eq!(decoded, ParsedNavigation::Permalink(p));
    }

    #[test]
    fn test_defaults_applied() {
        let decoded = decode("x=100&y=200&scale=5000").unwrap();
        let ParsedNavigation::Permalink(p) = decoded else {
            panic!("expected permalink")
        };
        assert_eq!(p.crs, CrsCode::Epsg3857);
        assert_eq!(p.rotation, 0.0);
        assert_eq!(p.width, DEFAULT_WIDTH);
        assert_eq!(p.height, DEFAULT_HEIGHT);
    }

    #[test]
    fn test_malformed_theme_keeps_position() {
        let decoded = decode("x=100&y=200&scale=5000&theme=%7Bbroken").unwrap();
        let ParsedNavigation::Permalink(p) = decoded else {
            panic!("expected permalink")
        };
        assert!(p.theme.is_none());
        assert_eq!(p.x, 100.0);
    }

    #[test]
    fn test_oversized_theme_rejected() {
        let query = format!("x=1&y=2&scale=100&theme={}", "a".repeat(MAX_THEME_BYTES + 1));
        assert!(matches!(
            decode(&query),
            Err(MapsError::ResourceLimitExceeded(_))
        ));
    }

    #[test]
    fn test_getmap_governs_over_permalink_keys() {
        let decoded = decode(
            "SERVICE=WMS&REQUEST=GetMap&CRS=EPSG:3857&BBOX=0,0,100,100&WIDTH=256&HEIGHT=256&x=1&y=2&scale=100",
        )
        .unwrap();
        assert!(matches!(decoded, ParsedNavigation::WmsGetMap(_)));
    }

    #[test]
    fn test_map_service_url_zoom_suffix() {
        let decoded =
            decode("https://www.example.com/maps/@35.9118462,139.5876715,16z/data=!3m1!1e3")
                .unwrap();
        let ParsedNavigation::MapServiceUrl { lat, lon, zoom, scale } = decoded else {
            panic!("expected map-service URL")
        };
        assert!((lat - 35.9118462).abs() < 1e-9);
        assert!((lon - 139.5876715).abs() < 1e-9);
        assert_eq!(zoom, 16.0);
        assert_eq!(scale, 10_000.0);
    }

    #[test]
    fn test_map_service_url_meters_suffix() {
        // 850 m of view width -> nearest distance-table zoom is 13
        let decoded = decode("https://maps.example.co.jp/maps/@35.6895,139.6917,850m/").unwrap();
        let ParsedNavigation::MapServiceUrl { lat, lon, zoom, .. } = decoded else {
            panic!("expected map-service URL")
        };
        assert!((lat - 35.6895).abs() < 1e-9);
        assert!((lon - 139.6917).abs() < 1e-9);
        assert_eq!(zoom, 13.0);
    }

    #[test]
    fn test_bare_lat_lon_zoom() {
        let decoded = decode("35.6895,139.6917,12").unwrap();
        let ParsedNavigation::LatLonZoom { lat, lon, zoom, .. } = decoded else {
            panic!("expected lat/lon")
        };
        assert_eq!(lat, 35.6895);
        assert_eq!(lon, 139.6917);
        assert_eq!(zoom, Some(12.0));
    }

    #[test]
    fn test_bare_coordinates_order_heuristic() {
        // First value above 90 must be the longitude
        let decoded = decode("139.6917,35.6895,12").unwrap();
        let ParsedNavigation::LatLonZoom { lat, lon, .. } = decoded else {
            panic!("expected lat/lon")
        };
        assert_eq!(lat, 35.6895);
        assert_eq!(lon, 139.6917);
    }

    #[test]
    fn test_lat_lon_query_keys() {
        let decoded = decode("http://host/maplibre?lat=35.0&lon=139.0&zoom=10").unwrap();
        let ParsedNavigation::LatLonZoom { lat, lon, zoom, scale } = decoded else {
            panic!("expected lat/lon")
        };
        assert_eq!((lat, lon), (35.0, 139.0));
        assert_eq!(zoom, Some(10.0));
        assert_eq!(scale, 600_000.0);
    }

    #[test]
    fn test_unrecognized_input_is_typed_error() {
        assert!(matches!(
            decode("complete gibberish"),
            Err(MapsError::MalformedRequest(_))
        ));
        assert!(matches!(decode(""), Err(MapsError::MalformedRequest(_))));
        assert!(matches!(
            decode("999,999,10"),
            Err(MapsError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_view_resolution() {
        let p = sample_permalink();
        let view = ParsedNavigation::Permalink(p.clone()).view().unwrap();
        assert_eq!(view.center, (p.x, p.y));
        assert_eq!(view.scale, 10_000.0);
        assert_eq!(view.rotation, 45.0);

        let nav = decode("35.0,139.0,14").unwrap();
        let view = nav.view().unwrap();
        assert_eq!(view.crs, CrsCode::Epsg4326);
        assert_eq!(view.center, (139.0, 35.0));
        assert_eq!(view.scale, 40_000.0);
    }
}
