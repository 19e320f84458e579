//! WFS 2.0 request shapes and response documents.
//!
//! The service publishes host-supplied vector layer snapshots. GetFeature
//! answers GeoJSON by default (GML on request); DescribeFeatureType derives
//! an XSD from the layer's field list; GetStyles renders the layer's symbol
//! as an SLD document, which round-trips through the SLD converter.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use mapview_common::layer::GeometryKind;
use mapview_common::{BoundingBox, MapsError, MapsResult, VectorLayer};

use crate::exceptions::xml_escape;

/// WFS KVP query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WfsKvp {
    #[serde(rename = "SERVICE", alias = "service")]
    pub service: Option<String>,
    #[serde(rename = "REQUEST", alias = "request")]
    pub request: Option<String>,
    #[serde(rename = "VERSION", alias = "version")]
    pub version: Option<String>,
    #[serde(
        rename = "TYPENAME",
        alias = "TYPENAMES",
        alias = "typename",
        alias = "typenames"
    )]
    pub type_name: Option<String>,
    #[serde(rename = "OUTPUTFORMAT", alias = "outputformat")]
    pub output_format: Option<String>,
    #[serde(rename = "MAXFEATURES", alias = "maxfeatures", alias = "COUNT", alias = "count")]
    pub max_features: Option<String>,
    #[serde(rename = "BBOX", alias = "bbox")]
    pub bbox: Option<String>,
    #[serde(rename = "SRSNAME", alias = "srsname")]
    pub srs_name: Option<String>,
}

impl WfsKvp {
    pub fn required_typename(&self) -> MapsResult<&str> {
        self.type_name
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MapsError::MissingParameter("TYPENAME".to_string()))
    }

    pub fn max_features_limit(&self) -> Option<usize> {
        self.max_features.as_deref().and_then(|m| m.parse().ok())
    }

    /// BBOX filter, tolerating a trailing CRS element ("minx,miny,maxx,maxy[,crs]").
    pub fn bbox_filter(&self) -> Option<BoundingBox> {
        let raw = self.bbox.as_deref()?;
        let coords: Vec<&str> = raw.split(',').collect();
        let numeric = if coords.len() > 4 {
            coords[..4].join(",")
        } else {
            raw.to_string()
        };
        BoundingBox::from_wms_string(&numeric).ok()
    }
}

/// Find the layer a requested typename refers to.
pub fn find_layer<'a>(layers: &'a [VectorLayer], typename: &str) -> MapsResult<&'a VectorLayer> {
    layers
        .iter()
        .find(|l| l.matches_typename(typename))
        .ok_or_else(|| MapsError::LayerNotFound(typename.to_string()))
}

// ============================================================================
// GetCapabilities
// ============================================================================

pub fn capabilities_xml(layers: &[VectorLayer], base_url: &str) -> String {
    let base = xml_escape(base_url);

    let mut feature_types = String::new();
    for layer in layers {
        feature_types.push_str(&format!(
            r#"
    <FeatureType>
      <Name>{name}</Name>
      <Title>{title}</Title>
      <Abstract>Vector layer published from the host project</Abstract>
      <DefaultCRS>{crs}</DefaultCRS>
      <OutputFormats>
        <Format>application/json</Format>
        <Format>application/gml+xml</Format>
      </OutputFormats>
      <WGS84BoundingBox>
        <LowerCorner>{minx} {miny}</LowerCorner>
        <UpperCorner>{maxx} {maxy}</UpperCorner>
      </WGS84BoundingBox>
    </FeatureType>"#,
            name = xml_escape(&layer.id),
            title = xml_escape(&layer.title),
            crs = layer.crs,
            minx = layer.wgs84_bbox.min_x,
            miny = layer.wgs84_bbox.min_y,
            maxx = layer.wgs84_bbox.max_x,
            maxy = layer.wgs84_bbox.max_y,
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<WFS_Capabilities version="2.0.0" xmlns="http://www.opengis.net/wfs/2.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xlink="http://www.w3.org/1999/xlink" xsi:schemaLocation="http://www.opengis.net/wfs/2.0 http://schemas.opengis.net/wfs/2.0/wfs.xsd">
  <ServiceIdentification>
    <Title>MapView WFS Service</Title>
    <Abstract>Dynamic WFS service for published vector layers</Abstract>
    <ServiceType>WFS</ServiceType>
    <ServiceTypeVersion>2.0.0</ServiceTypeVersion>
    <Fees>NONE</Fees>
    <AccessConstraints>NONE</AccessConstraints>
  </ServiceIdentification>
  <OperationsMetadata>
    <Operation name="GetCapabilities">
      <DCP><HTTP><Get xlink:href="{base}/wfs"/></HTTP></DCP>
    </Operation>
    <Operation name="DescribeFeatureType">
      <DCP><HTTP><Get xlink:href="{base}/wfs"/></HTTP></DCP>
    </Operation>
    <Operation name="GetFeature">
      <DCP><HTTP><Get xlink:href="{base}/wfs"/></HTTP></DCP>
    </Operation>
    <Operation name="GetStyles">
      <DCP><HTTP><Get xlink:href="{base}/wfs"/></HTTP></DCP>
    </Operation>
  </OperationsMetadata>
  <FeatureTypeList>{feature_types}
  </FeatureTypeList>
</WFS_Capabilities>"#,
        base = base,
        feature_types = feature_types,
    )
}

// ============================================================================
// DescribeFeatureType
// ============================================================================

/// XSD schema for one feature type, derived from the layer's field list.
pub fn describe_feature_type_xml(layer: &VectorLayer) -> String {
    let type_tag = sanitize_tag(&layer.id);

    let mut elements = String::new();
    for field in &layer.fields {
        elements.push_str(&format!(
            "          <xsd:element name=\"{}\" type=\"{}\" minOccurs=\"0\"/>\n",
            xml_escape(&field.name),
            field.kind.xsd_type()
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:gml="http://www.opengis.net/gml/3.2" elementFormDefault="qualified">
  <xsd:element name="{type_tag}" type="{type_tag}Type"/>
  <xsd:complexType name="{type_tag}Type">
    <xsd:complexContent>
      <xsd:extension base="gml:AbstractFeatureType">
        <xsd:sequence>
          <xsd:element name="geometry" type="{geom_type}"/>
{elements}        </xsd:sequence>
      </xsd:extension>
    </xsd:complexContent>
  </xsd:complexType>
</xsd:schema>"#,
        type_tag = type_tag,
        geom_type = layer.geometry.gml_type(),
        elements = elements,
    )
}

/// Replace characters that cannot appear in an XML tag name.
fn sanitize_tag(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true) {
        out.insert(0, '_');
    }
    out
}

// ============================================================================
// GetFeature
// ============================================================================

/// Build a GeoJSON FeatureCollection for a layer.
///
/// Each feature's properties carry an injected `_qgis_style` hint derived
/// from the layer's symbol so style-less clients can still draw something
/// sensible. Features without usable geometry are skipped, not fatal.
pub fn features_to_geojson(
    layer: &VectorLayer,
    bbox: Option<&BoundingBox>,
    max_features: Option<usize>,
) -> String {
    let hint = style_hint(layer);

    let mut features = Vec::new();
    for feature in &layer.features {
        if let Some(limit) = max_features {
            if features.len() >= limit {
                break;
            }
        }

        let Some(geom_bbox) = geometry_bbox(&feature.geometry) else {
            continue;
        };
        if let Some(filter) = bbox {
            if !filter.intersects(&geom_bbox) {
                continue;
            }
        }

        let mut properties = Map::new();
        for (k, v) in &feature.properties {
            properties.insert(k.clone(), v.clone());
        }
        properties.insert("_qgis_style".to_string(), hint.clone());

        features.push(json!({
            "type": "Feature",
            "id": feature.id,
            "geometry": feature.geometry.clone(),
            "properties": Value::Object(properties),
        }));
    }

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
    .to_string()
}

/// Minimal style hint attached to each served feature.
fn style_hint(layer: &VectorLayer) -> Value {
    let mut hint = Map::new();
    match layer.geometry {
        GeometryKind::Point => {
            hint.insert("geomType".into(), json!("Point"));
            hint.insert("stroke".into(), json!(layer.style.color));
            if let Some(size) = layer.style.size {
                hint.insert("size".into(), json!(size));
            }
        }
        GeometryKind::Line => {
            hint.insert("geomType".into(), json!("LineString"));
            hint.insert("stroke".into(), json!(layer.style.color));
            if let Some(width) = layer.style.size {
                hint.insert("stroke-width".into(), json!(width));
            }
        }
        GeometryKind::Polygon => {
            hint.insert("geomType".into(), json!("Polygon"));
            hint.insert("fill".into(), json!(layer.style.color));
            if layer.style.opacity < 1.0 {
                hint.insert("fill-opacity".into(), json!(layer.style.opacity));
            }
        }
    }
    Value::Object(hint)
}

/// Bounding box of a GeoJSON geometry's coordinates, if any are present.
fn geometry_bbox(geometry: &Value) -> Option<BoundingBox> {
    let coords = geometry.get("coordinates")?;
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    fn walk(v: &Value, acc: &mut (f64, f64, f64, f64)) {
        if let Some(arr) = v.as_array() {
            if arr.len() >= 2 && arr[0].is_number() && arr[1].is_number() {
                let x = arr[0].as_f64().unwrap_or(f64::NAN);
                let y = arr[1].as_f64().unwrap_or(f64::NAN);
                if x.is_finite() && y.is_finite() {
                    acc.0 = acc.0.min(x);
                    acc.1 = acc.1.min(y);
                    acc.2 = acc.2.max(x);
                    acc.3 = acc.3.max(y);
                }
            } else {
                for item in arr {
                    walk(item, acc);
                }
            }
        }
    }

    let mut acc = (min_x, min_y, max_x, max_y);
    walk(coords, &mut acc);
    (min_x, min_y, max_x, max_y) = acc;

    if min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite() {
        Some(BoundingBox::new(min_x, min_y, max_x, max_y))
    } else {
        None
    }
}

/// GML FeatureCollection envelope, for OUTPUTFORMAT=application/gml+xml.
pub fn features_to_gml(layer: &VectorLayer, max_features: Option<usize>) -> String {
    let type_tag = sanitize_tag(&layer.id);
    let mut members = String::new();

    for feature in layer
        .features
        .iter()
        .take(max_features.unwrap_or(usize::MAX))
    {
        let mut props = String::new();
        for (k, v) in &feature.properties {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            props.push_str(&format!(
                "      <{tag}>{val}</{tag}>\n",
                tag = sanitize_tag(k),
                val = xml_escape(&text)
            ));
        }
        members.push_str(&format!(
            "  <gml:featureMember>\n    <{tag} gml:id=\"{tag}.{id}\">\n{props}    </{tag}>\n  </gml:featureMember>\n",
            tag = type_tag,
            id = feature.id,
            props = props,
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gml:FeatureCollection xmlns:gml=\"http://www.opengis.net/gml/3.2\">\n{}</gml:FeatureCollection>",
        members
    )
}

// ============================================================================
// GetStyles
// ============================================================================

/// SLD document describing the layer's symbol.
pub fn layer_sld_xml(layer: &VectorLayer) -> String {
    let symbolizer = match layer.geometry {
        GeometryKind::Point => point_symbolizer(layer),
        GeometryKind::Line => line_symbolizer(layer),
        GeometryKind::Polygon => polygon_symbolizer(layer),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<StyledLayerDescriptor version="1.1.0" xmlns="http://www.opengis.net/sld" xmlns:ogc="http://www.opengis.net/ogc" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/sld http://schemas.opengis.net/sld/1.1.0/StyledLayerDescriptor.xsd">
  <NamedLayer>
    <Name>{name}</Name>
    <UserStyle>
      <Title>{title}</Title>
      <FeatureTypeStyle>
        <Rule>
{symbolizer}        </Rule>
      </FeatureTypeStyle>
    </UserStyle>
  </NamedLayer>
</StyledLayerDescriptor>"#,
        name = xml_escape(&layer.id),
        title = xml_escape(&layer.title),
        symbolizer = symbolizer,
    )
}

fn point_symbolizer(layer: &VectorLayer) -> String {
    let stroke = layer.style.stroke_color.as_deref().unwrap_or("#000000");
    format!(
        r#"          <PointSymbolizer>
            <Graphic>
              <Mark>
                <WellKnownName>circle</WellKnownName>
                <Fill>
                  <CssParameter name="fill">{fill}</CssParameter>
                  <CssParameter name="fill-opacity">{opacity}</CssParameter>
                </Fill>
                <Stroke>
                  <CssParameter name="stroke">{stroke}</CssParameter>
                  <CssParameter name="stroke-width">1</CssParameter>
                </Stroke>
              </Mark>
              <Size>{size}</Size>
            </Graphic>
          </PointSymbolizer>
"#,
        fill = xml_escape(&layer.style.color),
        opacity = layer.style.opacity,
        stroke = xml_escape(stroke),
        size = layer.style.size.unwrap_or(6.0),
    )
}

fn line_symbolizer(layer: &VectorLayer) -> String {
    format!(
        r#"          <LineSymbolizer>
            <Stroke>
              <CssParameter name="stroke">{stroke}</CssParameter>
              <CssParameter name="stroke-width">{width}</CssParameter>
              <CssParameter name="stroke-opacity">{opacity}</CssParameter>
            </Stroke>
          </LineSymbolizer>
"#,
        stroke = xml_escape(&layer.style.color),
        width = layer.style.size.unwrap_or(1.0),
        opacity = layer.style.opacity,
    )
}

fn polygon_symbolizer(layer: &VectorLayer) -> String {
    let stroke = layer.style.stroke_color.as_deref().unwrap_or("#232323");
    format!(
        r#"          <PolygonSymbolizer>
            <Fill>
              <CssParameter name="fill">{fill}</CssParameter>
              <CssParameter name="fill-opacity">{opacity}</CssParameter>
            </Fill>
            <Stroke>
              <CssParameter name="stroke">{stroke}</CssParameter>
              <CssParameter name="stroke-width">{width}</CssParameter>
            </Stroke>
          </PolygonSymbolizer>
"#,
        fill = xml_escape(&layer.style.color),
        opacity = layer.style.opacity,
        stroke = xml_escape(stroke),
        width = layer.style.size.unwrap_or(0.5),
    )
}

/// JSON listing of publishable layers for the `/wfs-layers` endpoint.
pub fn layer_listing_json(layers: &[VectorLayer], only_visible: bool) -> String {
    let entries: Vec<Value> = layers
        .iter()
        .filter(|l| !only_visible || l.visible)
        .map(|l| {
            json!({
                "typename": l.id,
                "name": l.title,
                "crs": l.crs.to_string(),
                "bbox": {
                    "minx": l.wgs84_bbox.min_x,
                    "miny": l.wgs84_bbox.min_y,
                    "maxx": l.wgs84_bbox.max_x,
                    "maxy": l.wgs84_bbox.max_y,
                },
            })
        })
        .collect();

    json!({ "layers": entries }).to_string()
}
