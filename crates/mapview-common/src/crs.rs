//! Coordinate Reference System handling.
//!
//! Only the planar Web Mercator <-> WGS84 pair is implemented in-process;
//! anything else is carried as an opaque authority code and handed to the
//! host's geodesy facilities untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::BoundingBox;

const MERCATOR_EXTENT: f64 = 20037508.342789244;

/// A CRS authority code as carried on requests.
///
/// Well-known codes get a variant; everything else is preserved verbatim so
/// a reprojection collaborator can resolve it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
    /// Web Mercator (meters)
    Epsg3857,
    /// Any other authority:code string, passed through
    Other(String),
}

impl CrsCode {
    /// Parse a CRS string from a WMS request (SRS and CRS parameter formats).
    ///
    /// Accepts "EPSG:4326", "epsg:4326", "CRS:84" (lon/lat-ordered WGS84)
    /// and "EPSG:900913" (legacy Web Mercator alias).
    pub fn from_wms_string(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" => CrsCode::Epsg4326,
            "EPSG:3857" | "EPSG:900913" => CrsCode::Epsg3857,
            _ => CrsCode::Other(s.to_string()),
        }
    }

    /// The axis order used by WMS 1.3.0 for this CRS.
    ///
    /// WMS 1.3.0 uses the CRS's natural order: geographic CRSs are lat,lon.
    pub fn axis_order_wms_1_3(&self) -> AxisOrder {
        match self {
            CrsCode::Epsg4326 => AxisOrder::LatLon,
            _ => AxisOrder::XY,
        }
    }

    /// WMS 1.1.1 always uses x,y regardless of CRS.
    pub fn axis_order_wms_1_1(&self) -> AxisOrder {
        AxisOrder::XY
    }

    /// Check if this is a geographic (degrees-unit) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsCode::Epsg4326 => write!(f, "EPSG:4326"),
            CrsCode::Epsg3857 => write!(f, "EPSG:3857"),
            CrsCode::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    LatLon,
}

/// Convert Web Mercator (EPSG:3857) coordinates to WGS84 (EPSG:4326).
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_EXTENT) * 180.0;
    let lat = (y / MERCATOR_EXTENT) * 180.0;
    let lat = 180.0 / std::f64::consts::PI
        * (2.0 * (lat * std::f64::consts::PI / 180.0).exp().atan() - std::f64::consts::PI / 2.0);
    (lon, lat)
}

/// Convert WGS84 (EPSG:4326) coordinates to Web Mercator (EPSG:3857).
pub fn wgs84_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon * MERCATOR_EXTENT / 180.0;
    // Clamp latitude to the Mercator-representable band
    let lat = lat.clamp(-85.06, 85.06);
    let y = (lat + 90.0).to_radians() / 2.0;
    let y = y.tan().ln() / std::f64::consts::PI * MERCATOR_EXTENT;
    (x, y)
}

/// Transform a point between the two built-in CRSs.
///
/// Identity for same-CRS pairs and for codes the built-in pair cannot
/// handle; those are expected to be resolved by the host's geodesy layer.
pub fn transform_point(x: f64, y: f64, src: &CrsCode, dst: &CrsCode) -> (f64, f64) {
    match (src, dst) {
        (CrsCode::Epsg3857, CrsCode::Epsg4326) => mercator_to_wgs84(x, y),
        (CrsCode::Epsg4326, CrsCode::Epsg3857) => wgs84_to_mercator(x, y),
        _ => (x, y),
    }
}

/// Transform a bounding box between the two built-in CRSs.
pub fn transform_bbox(bbox: &BoundingBox, src: &CrsCode, dst: &CrsCode) -> BoundingBox {
    let (min_x, min_y) = transform_point(bbox.min_x, bbox.min_y, src, dst);
    let (max_x, max_y) = transform_point(bbox.max_x, bbox.max_y, src, dst);
    BoundingBox::new(min_x, min_y, max_x, max_y)
}
