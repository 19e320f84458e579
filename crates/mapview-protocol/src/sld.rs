//! SLD 1.1 to vector style-layer conversion.
//!
//! Walks `NamedLayer/UserStyle/FeatureTypeStyle/Rule/*Symbolizer` and emits
//! an ordered list of style layers for external map viewers. Later rules
//! paint over earlier ones, so input order is preserved. Anything the
//! converter does not understand is skipped; malformed XML yields an empty
//! list so callers can fall back to a basemap-only style.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use mapview_common::scale::zoom_for_scale;

/// Kind of a produced style layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleLayerKind {
    Circle,
    Fill,
    Line,
    Symbol,
    Text,
}

impl StyleLayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleLayerKind::Circle => "circle",
            StyleLayerKind::Fill => "fill",
            StyleLayerKind::Line => "line",
            StyleLayerKind::Symbol => "symbol",
            StyleLayerKind::Text => "text",
        }
    }
}

/// One ordered entry of a converted style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,
    pub kind: StyleLayerKind,
    /// Source reference the external viewer binds this layer to
    pub source: String,
    /// Paint properties, viewer-style keys ("circle-color", "line-width", ...)
    pub paint: Map<String, Value>,
    /// Optional equality filter: ["==", property, literal]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Scale-denominator visibility range from the rule, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<f64>,
}

impl StyleLayer {
    /// Render as a viewer style-layer JSON object. Scale bounds become zoom
    /// bounds via the scale table (a MinScaleDenominator is the zoomed-in
    /// limit, so it maps to maxzoom).
    pub fn to_style_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".into(), json!(self.id));
        obj.insert("type".into(), json!(self.as_type_str()));
        obj.insert("source".into(), json!(self.source));
        obj.insert("paint".into(), Value::Object(self.paint.clone()));
        if let Some(filter) = &self.filter {
            obj.insert("filter".into(), filter.clone());
        }
        if let Some(max_scale) = self.max_scale {
            obj.insert("minzoom".into(), json!(zoom_for_scale(max_scale)));
        }
        if let Some(min_scale) = self.min_scale {
            obj.insert("maxzoom".into(), json!(zoom_for_scale(min_scale)));
        }
        Value::Object(obj)
    }

    fn as_type_str(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Pen/brush parameters accumulated from CssParameter/SvgParameter entries.
#[derive(Debug, Default, Clone)]
struct SymbolParams {
    fill: Option<String>,
    fill_opacity: Option<f64>,
    stroke: Option<String>,
    stroke_width: Option<f64>,
    stroke_opacity: Option<f64>,
    size: Option<f64>,
    well_known_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SymbolizerKind {
    Point,
    Line,
    Polygon,
    Other,
}

/// Convert SLD XML into an ordered style-layer list.
///
/// `source` names the data source every produced layer references.
pub fn sld_to_style_layers(xml: &str, source: &str) -> Vec<StyleLayer> {
    match parse(xml, source) {
        Ok(layers) => layers,
        Err(_) => Vec::new(),
    }
}

fn parse(xml: &str, source: &str) -> Result<Vec<StyleLayer>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut layers = Vec::new();
    let mut rule_index = 0usize;

    // Rule-level state
    let mut in_rule = false;
    let mut rule_min_scale: Option<f64> = None;
    let mut rule_max_scale: Option<f64> = None;
    let mut rule_filter_property: Option<String> = None;
    let mut rule_filter_literal: Option<String> = None;
    let mut rule_layers: Vec<StyleLayer> = Vec::new();

    // Symbolizer-level state
    let mut symbolizer = SymbolizerKind::Other;
    let mut in_symbolizer = false;
    let mut params = SymbolParams::default();
    let mut in_fill = false;
    let mut in_stroke = false;

    // Leaf text capture
    let mut capture: Option<&'static str> = None;
    let mut css_param_name: Option<String> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"Rule" => {
                        in_rule = true;
                        rule_min_scale = None;
                        rule_max_scale = None;
                        rule_filter_property = None;
                        rule_filter_literal = None;
                        rule_layers.clear();
                    }
                    b"PointSymbolizer" if in_rule => {
                        in_symbolizer = true;
                        symbolizer = SymbolizerKind::Point;
                        params = SymbolParams::default();
                    }
                    b"LineSymbolizer" if in_rule => {
                        in_symbolizer = true;
                        symbolizer = SymbolizerKind::Line;
                        params = SymbolParams::default();
                    }
                    b"PolygonSymbolizer" if in_rule => {
                        in_symbolizer = true;
                        symbolizer = SymbolizerKind::Polygon;
                        params = SymbolParams::default();
                    }
                    b"TextSymbolizer" | b"RasterSymbolizer" if in_rule => {
                        // recognized but not converted
                        in_symbolizer = true;
                        symbolizer = SymbolizerKind::Other;
                        params = SymbolParams::default();
                    }
                    b"Fill" if in_symbolizer => in_fill = true,
                    b"Stroke" if in_symbolizer => in_stroke = true,
                    b"Size" if in_symbolizer => {
                        capture = Some("size");
                        text_buf.clear();
                    }
                    b"WellKnownName" if in_symbolizer => {
                        capture = Some("wkn");
                        text_buf.clear();
                    }
                    b"MinScaleDenominator" if in_rule => {
                        capture = Some("min_scale");
                        text_buf.clear();
                    }
                    b"MaxScaleDenominator" if in_rule => {
                        capture = Some("max_scale");
                        text_buf.clear();
                    }
                    b"PropertyName" if in_rule && !in_symbolizer => {
                        capture = Some("filter_prop");
                        text_buf.clear();
                    }
                    b"Literal" if in_rule && !in_symbolizer => {
                        capture = Some("filter_lit");
                        text_buf.clear();
                    }
                    b"CssParameter" | b"SvgParameter" if in_symbolizer => {
                        css_param_name = e
                            .try_get_attribute("name")?
                            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                        capture = Some("css");
                        text_buf.clear();
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if capture.is_some() {
                    text_buf.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"CssParameter" | b"SvgParameter" => {
                        if capture == Some("css") {
                            apply_css_param(
                                &mut params,
                                css_param_name.as_deref(),
                                text_buf.trim(),
                                in_fill,
                                in_stroke,
                            );
                        }
                        capture = None;
                        css_param_name = None;
                    }
                    b"Size" => {
                        if capture == Some("size") {
                            params.size = text_buf.trim().parse().ok();
                        }
                        capture = None;
                    }
                    b"WellKnownName" => {
                        if capture == Some("wkn") {
                            params.well_known_name = Some(text_buf.trim().to_string());
                        }
                        capture = None;
                    }
                    b"MinScaleDenominator" => {
                        if capture == Some("min_scale") {
                            rule_min_scale = text_buf.trim().parse().ok();
                        }
                        capture = None;
                    }
                    b"MaxScaleDenominator" => {
                        if capture == Some("max_scale") {
                            rule_max_scale = text_buf.trim().parse().ok();
                        }
                        capture = None;
                    }
                    b"PropertyName" => {
                        if capture == Some("filter_prop") {
                            rule_filter_property = Some(text_buf.trim().to_string());
                        }
                        capture = None;
                    }
                    b"Literal" => {
                        if capture == Some("filter_lit") {
                            rule_filter_literal = Some(text_buf.trim().to_string());
                        }
                        capture = None;
                    }
                    b"Fill" => in_fill = false,
                    b"Stroke" => in_stroke = false,
                    b"PointSymbolizer" | b"LineSymbolizer" | b"PolygonSymbolizer"
                    | b"TextSymbolizer" | b"RasterSymbolizer" => {
                        if in_symbolizer {
                            emit_layers(
                                &mut rule_layers,
                                symbolizer,
                                &params,
                                source,
                                rule_index,
                            );
                            in_symbolizer = false;
                            in_fill = false;
                            in_stroke = false;
                        }
                    }
                    b"Rule" => {
                        let filter = match (&rule_filter_property, &rule_filter_literal) {
                            (Some(prop), Some(lit)) => Some(json!(["==", prop, lit])),
                            _ => None,
                        };
                        for mut layer in rule_layers.drain(..) {
                            layer.filter = filter.clone();
                            layer.min_scale = rule_min_scale;
                            layer.max_scale = rule_max_scale;
                            layers.push(layer);
                        }
                        in_rule = false;
                        rule_index += 1;
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(layers)
}

fn apply_css_param(
    params: &mut SymbolParams,
    name: Option<&str>,
    value: &str,
    in_fill: bool,
    in_stroke: bool,
) {
    let Some(name) = name else { return };
    match name {
        "fill" if in_fill => params.fill = Some(value.to_string()),
        "fill-opacity" if in_fill => params.fill_opacity = value.parse().ok(),
        "stroke" if in_stroke => params.stroke = Some(value.to_string()),
        "stroke-width" if in_stroke => params.stroke_width = value.parse().ok(),
        "stroke-opacity" if in_stroke => params.stroke_opacity = value.parse().ok(),
        _ => {}
    }
}

fn emit_layers(
    out: &mut Vec<StyleLayer>,
    symbolizer: SymbolizerKind,
    params: &SymbolParams,
    source: &str,
    rule_index: usize,
) {
    match symbolizer {
        SymbolizerKind::Point => {
            // Only circle marks are representable
            let wkn = params.well_known_name.as_deref().unwrap_or("circle");
            if wkn != "circle" {
                return;
            }
            let mut paint = Map::new();
            if let Some(fill) = &params.fill {
                paint.insert("circle-color".into(), json!(fill));
            }
            if let Some(size) = params.size {
                paint.insert("circle-radius".into(), json!(size));
            }
            if let Some(op) = params.fill_opacity {
                paint.insert("circle-opacity".into(), json!(op));
            }
            if let Some(stroke) = &params.stroke {
                paint.insert("circle-stroke-color".into(), json!(stroke));
            }
            if let Some(w) = params.stroke_width {
                paint.insert("circle-stroke-width".into(), json!(w));
            }
            out.push(StyleLayer {
                id: format!("{}-r{}-circle", source, rule_index),
                kind: StyleLayerKind::Circle,
                source: source.to_string(),
                paint,
                filter: None,
                min_scale: None,
                max_scale: None,
            });
        }
        SymbolizerKind::Line => {
            let mut paint = Map::new();
            if let Some(stroke) = &params.stroke {
                paint.insert("line-color".into(), json!(stroke));
            }
            if let Some(w) = params.stroke_width {
                paint.insert("line-width".into(), json!(w));
            }
            if let Some(op) = params.stroke_opacity {
                paint.insert("line-opacity".into(), json!(op));
            }
            out.push(StyleLayer {
                id: format!("{}-r{}-line", source, rule_index),
                kind: StyleLayerKind::Line,
                source: source.to_string(),
                paint,
                filter: None,
                min_scale: None,
                max_scale: None,
            });
        }
        SymbolizerKind::Polygon => {
            let mut paint = Map::new();
            if let Some(fill) = &params.fill {
                paint.insert("fill-color".into(), json!(fill));
            }
            if let Some(op) = params.fill_opacity {
                paint.insert("fill-opacity".into(), json!(op));
            }
            out.push(StyleLayer {
                id: format!("{}-r{}-fill", source, rule_index),
                kind: StyleLayerKind::Fill,
                source: source.to_string(),
                paint,
                filter: None,
                min_scale: None,
                max_scale: None,
            });

            // Polygon outlines become a separate line layer painted above
            if params.stroke.is_some() || params.stroke_width.is_some() {
                let mut outline = Map::new();
                if let Some(stroke) = &params.stroke {
                    outline.insert("line-color".into(), json!(stroke));
                }
                if let Some(w) = params.stroke_width {
                    outline.insert("line-width".into(), json!(w));
                }
                if let Some(op) = params.stroke_opacity {
                    outline.insert("line-opacity".into(), json!(op));
                }
                out.push(StyleLayer {
                    id: format!("{}-r{}-outline", source, rule_index),
                    kind: StyleLayerKind::Line,
                    source: source.to_string(),
                    paint: outline,
                    filter: None,
                    min_scale: None,
                    max_scale: None,
                });
            }
        }
        SymbolizerKind::Other => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIRCLE_SLD: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<StyledLayerDescriptor version="1.1.0" xmlns="http://www.opengis.net/sld" xmlns:ogc="http://www.opengis.net/ogc">
  <NamedLayer>
    <Name>test_layer</Name>
    <UserStyle>
      <Title>Test Style</Title>
      <FeatureTypeStyle>
        <Rule>
          <PointSymbolizer>
            <Graphic>
              <Mark>
                <WellKnownName>circle</WellKnownName>
                <Fill>
                  <CssParameter name="fill">#FF0000</CssParameter>
                  <CssParameter name="fill-opacity">0.8</CssParameter>
                </Fill>
                <Stroke>
                  <CssParameter name="stroke">#000000</CssParameter>
                  <CssParameter name="stroke-width">1</CssParameter>
                </Stroke>
              </Mark>
              <Size>10</Size>
            </Graphic>
          </PointSymbolizer>
        </Rule>
      </FeatureTypeStyle>
    </UserStyle>
  </NamedLayer>
</StyledLayerDescriptor>"##;

    #[test]
    fn test_single_circle_rule() {
        let layers = sld_to_style_layers(CIRCLE_SLD, "test_source");
        assert_eq!(layers.len(), 1);
        let layer = &layers[0];
        assert_eq!(layer.kind, StyleLayerKind::Circle);
        assert_eq!(layer.source, "test_source");
        assert_eq!(layer.paint["circle-color"], "#FF0000");
        assert_eq!(layer.paint["circle-radius"], 10.0);
        assert_eq!(layer.paint["circle-opacity"], 0.8);
        assert_eq!(layer.paint["circle-stroke-color"], "#000000");
    }

    #[test]
    fn test_invalid_and_empty_inputs() {
        assert!(sld_to_style_layers("", "s").is_empty());
        assert!(sld_to_style_layers("<unclosed", "s").is_empty());
        assert!(sld_to_style_layers("not xml at all", "s").is_empty());
        assert!(sld_to_style_layers("<StyledLayerDescriptor/>", "s").is_empty());
    }

    #[test]
    fn test_polygon_emits_fill_and_outline() {
        let sld = r##"<StyledLayerDescriptor><NamedLayer><UserStyle><FeatureTypeStyle>
          <Rule>
            <PolygonSymbolizer>
              <Fill><CssParameter name="fill">#00FF00</CssParameter></Fill>
              <Stroke><CssParameter name="stroke">#003300</CssParameter><CssParameter name="stroke-width">2</CssParameter></Stroke>
            </PolygonSymbolizer>
          </Rule>
        </FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"##;
        let layers = sld_to_style_layers(sld, "poly");
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].kind, StyleLayerKind::Fill);
        assert_eq!(layers[0].paint["fill-color"], "#00FF00");
        assert_eq!(layers[1].kind, StyleLayerKind::Line);
        assert_eq!(layers[1].paint["line-color"], "#003300");
        assert_eq!(layers[1].paint["line-width"], 2.0);
    }

    #[test]
    fn test_rule_order_preserved() {
        let sld = r##"<StyledLayerDescriptor><NamedLayer><UserStyle><FeatureTypeStyle>
          <Rule><LineSymbolizer><Stroke><CssParameter name="stroke">#111111</CssParameter></Stroke></LineSymbolizer></Rule>
          <Rule><LineSymbolizer><Stroke><CssParameter name="stroke">#222222</CssParameter></Stroke></LineSymbolizer></Rule>
        </FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"##;
        let layers = sld_to_style_layers(sld, "lines");
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].paint["line-color"], "#111111");
        assert_eq!(layers[1].paint["line-color"], "#222222");
        assert!(layers[0].id.contains("r0"));
        assert!(layers[1].id.contains("r1"));
    }

    #[test]
    fn test_unknown_symbolizer_skipped() {
        let sld = r##"<StyledLayerDescriptor><NamedLayer><UserStyle><FeatureTypeStyle>
          <Rule><TextSymbolizer><Label>x</Label></TextSymbolizer></Rule>
          <Rule><LineSymbolizer><Stroke><CssParameter name="stroke">#abcdef</CssParameter></Stroke></LineSymbolizer></Rule>
        </FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"##;
        let layers = sld_to_style_layers(sld, "s");
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].kind, StyleLayerKind::Line);
    }

    #[test]
    fn test_non_circle_mark_skipped() {
        let sld = r##"<StyledLayerDescriptor><NamedLayer><UserStyle><FeatureTypeStyle>
          <Rule><PointSymbolizer><Graphic><Mark><WellKnownName>star</WellKnownName></Mark><Size>8</Size></Graphic></PointSymbolizer></Rule>
        </FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"##;
        assert!(sld_to_style_layers(sld, "s").is_empty());
    }

    #[test]
    fn test_scale_range_maps_to_zoom_bounds() {
        let sld = r##"<StyledLayerDescriptor><NamedLayer><UserStyle><FeatureTypeStyle>
          <Rule>
            <MinScaleDenominator>5000</MinScaleDenominator>
            <MaxScaleDenominator>600000</MaxScaleDenominator>
            <LineSymbolizer><Stroke><CssParameter name="stroke">#ff0000</CssParameter></Stroke></LineSymbolizer>
          </Rule>
        </FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"##;
        let layers = sld_to_style_layers(sld, "s");
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].min_scale, Some(5000.0));
        assert_eq!(layers[0].max_scale, Some(600000.0));
        let style = layers[0].to_style_json();
        // 600000 -> zoom 10, 5000 -> zoom 17 on the scale table
        assert_eq!(style["minzoom"], 10);
        assert_eq!(style["maxzoom"], 17);
    }

    #[test]
    fn test_equality_filter_captured() {
        let sld = r##"<StyledLayerDescriptor><NamedLayer><UserStyle><FeatureTypeStyle>
          <Rule>
            <ogc:Filter xmlns:ogc="http://www.opengis.net/ogc">
              <ogc:PropertyIsEqualTo><ogc:PropertyName>kind</ogc:PropertyName><ogc:Literal>road</ogc:Literal></ogc:PropertyIsEqualTo>
            </ogc:Filter>
            <LineSymbolizer><Stroke><CssParameter name="stroke">#ff0000</CssParameter></Stroke></LineSymbolizer>
          </Rule>
        </FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"##;
        let layers = sld_to_style_layers(sld, "s");
        assert_eq!(layers.len(), 1);
        assert_eq!(
            layers[0].filter,
            Some(serde_json::json!(["==", "kind", "road"]))
        );
    }

    #[test]
    fn test_svg_parameter_accepted() {
        // SLD 1.1 uses se:SvgParameter instead of CssParameter
        let sld = r##"<StyledLayerDescriptor><NamedLayer><UserStyle><FeatureTypeStyle>
          <Rule><LineSymbolizer><Stroke><SvgParameter name="stroke">#010203</SvgParameter><SvgParameter name="stroke-width">3.5</SvgParameter></Stroke></LineSymbolizer></Rule>
        </FeatureTypeStyle></UserStyle></NamedLayer></StyledLayerDescriptor>"##;
        let layers = sld_to_style_layers(sld, "s");
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].paint["line-width"], 3.5);
    }
}
