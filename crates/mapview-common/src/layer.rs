//! Vector layer records supplied by the host application.
//!
//! These are plain value snapshots: the core never reaches into a live
//! project/layer-tree object graph. A host publishes the layers it wants
//! served (the WFS export list) and the service works off these records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{BoundingBox, CrsCode};

/// Geometry kind of a vector layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    /// GML/GeoJSON-ish type name for schema output.
    pub fn gml_type(&self) -> &'static str {
        match self {
            GeometryKind::Point => "gml:PointPropertyType",
            GeometryKind::Line => "gml:CurvePropertyType",
            GeometryKind::Polygon => "gml:SurfacePropertyType",
        }
    }
}

/// Field type of a layer attribute, mapped to XSD for DescribeFeatureType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Double,
    Boolean,
    Date,
}

impl FieldKind {
    pub fn xsd_type(&self) -> &'static str {
        match self {
            FieldKind::String => "xsd:string",
            FieldKind::Integer => "xsd:integer",
            FieldKind::Double => "xsd:double",
            FieldKind::Boolean => "xsd:boolean",
            FieldKind::Date => "xsd:date",
        }
    }
}

/// One attribute column of a vector layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

/// Minimal symbol description for a layer, the source for GetStyles SLD
/// output and for per-feature style hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolStyle {
    /// Fill/marker color as #rrggbb
    pub color: String,

    /// Stroke color as #rrggbb
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,

    /// Marker size or stroke width, in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,

    /// Opacity in [0, 1]
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

/// A single feature: GeoJSON geometry plus attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: u64,
    /// GeoJSON geometry object
    pub geometry: serde_json::Value,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// A published vector layer snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    /// Canonical layer id (the authoritative WFS typename)
    pub id: String,
    /// Human-readable title
    pub title: String,
    pub crs: CrsCode,
    pub geometry: GeometryKind,
    /// Layer extent in WGS84
    pub wgs84_bbox: BoundingBox,
    pub fields: Vec<FieldDef>,
    pub style: SymbolStyle,
    /// Visible in the current view (used by only-visible listings)
    pub visible: bool,
    pub features: Vec<Feature>,
}

impl VectorLayer {
    /// Match a requested typename against this layer. The canonical id wins;
    /// the title is accepted as a readable alias.
    pub fn matches_typename(&self, name: &str) -> bool {
        self.id == name || self.title == name || self.id.trim_start_matches('_') == name
    }
}
