//! WMS 1.1.1 / 1.3.0 request shapes and capabilities.

use serde::Deserialize;

use mapview_common::extent::normalize_rotation;
use mapview_common::{AxisOrder, BoundingBox, CrsCode, MapsError, MapsResult, ThemeState};

use crate::exceptions::xml_escape;

/// Largest accepted output image edge, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;

/// WMS KVP query parameters.
///
/// OGC parameter names are case-insensitive by convention; the uppercase
/// canonical spelling plus the lowercase alias covers real-world clients.
/// The lowercase `x`/`y`/`scale`/`rotation`/`theme` keys are the permalink
/// family, which shares the `/wms` endpoint (case-sensitive, no aliases).
#[derive(Debug, Default, Deserialize)]
pub struct WmsKvp {
    #[serde(rename = "SERVICE", alias = "service")]
    pub service: Option<String>,
    #[serde(rename = "REQUEST", alias = "request")]
    pub request: Option<String>,
    #[serde(rename = "VERSION", alias = "version")]
    pub version: Option<String>,
    #[serde(rename = "LAYERS", alias = "layers")]
    pub layers: Option<String>,
    #[serde(rename = "STYLES", alias = "styles")]
    pub styles: Option<String>,
    #[serde(rename = "CRS", alias = "SRS", alias = "crs", alias = "srs")]
    pub crs: Option<String>,
    #[serde(rename = "BBOX", alias = "bbox")]
    pub bbox: Option<String>,
    #[serde(rename = "WIDTH", alias = "width")]
    pub width: Option<u32>,
    #[serde(rename = "HEIGHT", alias = "height")]
    pub height: Option<u32>,
    #[serde(rename = "FORMAT", alias = "format")]
    pub format: Option<String>,
    #[serde(rename = "TRANSPARENT", alias = "transparent")]
    pub transparent: Option<String>,
    /// Rotation extension parameter (degrees clockwise)
    #[serde(rename = "ANGLE", alias = "angle")]
    pub angle: Option<String>,

    // Permalink navigation keys (case-sensitive)
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: Option<f64>,
    pub rotation: Option<f64>,
    pub theme: Option<String>,
}

impl WmsKvp {
    /// True when the request carries a standard GetMap (BBOX-driven) shape.
    pub fn is_standard_getmap(&self) -> bool {
        self.request
            .as_deref()
            .map(|r| r.eq_ignore_ascii_case("GetMap"))
            .unwrap_or(false)
    }

    /// True when the permalink navigation keys are present.
    pub fn has_permalink_params(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.scale.is_some()
    }
}

/// A normalized GetMap request ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct GetMapRequest {
    /// Request bbox in `crs`, x/y axis order
    pub bbox: BoundingBox,
    pub crs: CrsCode,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub transparent: bool,
    /// Rotation in degrees, [0, 360)
    pub rotation: f64,
    /// Comma-separated layer ids restriction, if any
    pub layers: Option<String>,
    pub styles: Option<String>,
    pub theme: Option<ThemeState>,
}

impl GetMapRequest {
    /// Normalize raw KVP into a render-ready request.
    ///
    /// WMS 1.3.0 transmits EPSG:4326 BBOX in lat,lon axis order; it is
    /// swapped back to x,y here. Oversized output dimensions are rejected
    /// before any work happens.
    pub fn from_kvp(params: &WmsKvp) -> MapsResult<Self> {
        let crs_str = params
            .crs
            .as_deref()
            .ok_or_else(|| MapsError::MissingParameter("CRS".to_string()))?;
        let crs = CrsCode::from_wms_string(crs_str);

        let bbox_str = params
            .bbox
            .as_deref()
            .ok_or_else(|| MapsError::MissingParameter("BBOX".to_string()))?;
        let mut bbox = BoundingBox::from_wms_string(bbox_str)?;

        let version = params.version.as_deref().unwrap_or("1.3.0");
        if version.starts_with("1.3") && crs.axis_order_wms_1_3() == AxisOrder::LatLon {
            bbox = bbox.swapped_axes();
        }

        let width = params.width.unwrap_or(256);
        let height = params.height.unwrap_or(256);
        check_dimensions(width, height)?;

        let rotation = match params.angle.as_deref() {
            Some(raw) => normalize_rotation(raw.parse().unwrap_or(0.0)),
            None => 0.0,
        };

        let theme = params
            .theme
            .as_deref()
            .and_then(ThemeState::from_json);

        Ok(Self {
            bbox,
            crs,
            width,
            height,
            format: params
                .format
                .clone()
                .unwrap_or_else(|| "image/png".to_string()),
            transparent: params
                .transparent
                .as_deref()
                .map(|t| t.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            rotation,
            layers: params.layers.clone(),
            styles: params.styles.clone(),
            theme,
        })
    }
}

/// Reject output dimensions beyond the configured ceiling.
pub fn check_dimensions(width: u32, height: u32) -> MapsResult<()> {
    if width == 0 || height == 0 {
        return Err(MapsError::InvalidParameter {
            param: "WIDTH/HEIGHT".to_string(),
            message: "dimensions must be positive".to_string(),
        });
    }
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(MapsError::ResourceLimitExceeded(format!(
            "image dimensions too large, maximum allowed is {}x{}",
            MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION
        )));
    }
    Ok(())
}

/// Inputs for the WMS capabilities document.
pub struct WmsCapabilities<'a> {
    pub base_url: &'a str,
    pub title: &'a str,
    pub abstract_text: &'a str,
    /// Current view extent in WGS84
    pub geographic_bbox: BoundingBox,
    /// Published layers as (id, title) pairs
    pub layers: &'a [(String, String)],
}

impl WmsCapabilities<'_> {
    pub fn build(&self) -> String {
        let mut layers_xml = String::new();
        for (id, title) in self.layers {
            layers_xml.push_str(&format!(
                "      <Layer queryable=\"1\">\n        <Name>{}</Name>\n        <Title>{}</Title>\n        <CRS>EPSG:3857</CRS>\n        <CRS>EPSG:4326</CRS>\n      </Layer>\n",
                xml_escape(id),
                xml_escape(title)
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service>
    <Name>WMS</Name>
    <Title>{title}</Title>
    <Abstract>{abstract_text}</Abstract>
    <OnlineResource xlink:href="{base}/wms"/>
  </Service>
  <Capability>
    <Request>
      <GetCapabilities>
        <Format>text/xml</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:href="{base}/wms?"/></Get></HTTP></DCPType>
      </GetCapabilities>
      <GetMap>
        <Format>image/png</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:href="{base}/wms?"/></Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Exception><Format>XML</Format></Exception>
    <Layer>
      <Title>{title}</Title>
      <CRS>EPSG:3857</CRS>
      <CRS>EPSG:4326</CRS>
      <EX_GeographicBoundingBox>
        <westBoundLongitude>{west}</westBoundLongitude>
        <eastBoundLongitude>{east}</eastBoundLongitude>
        <southBoundLatitude>{south}</southBoundLatitude>
        <northBoundLatitude>{north}</northBoundLatitude>
      </EX_GeographicBoundingBox>
      <BoundingBox CRS="EPSG:3857" minx="-20037508.34" miny="-20037508.34" maxx="20037508.34" maxy="20037508.34"/>
      <BoundingBox CRS="EPSG:4326" minx="-180" miny="-90" maxx="180" maxy="90"/>
{layers}    </Layer>
  </Capability>
</WMS_Capabilities>"#,
            title = xml_escape(self.title),
            abstract_text = xml_escape(self.abstract_text),
            base = xml_escape(self.base_url),
            west = self.geographic_bbox.min_x,
            east = self.geographic_bbox.max_x,
            south = self.geographic_bbox.min_y,
            north = self.geographic_bbox.max_y,
            layers = layers_xml,
        )
    }
}
