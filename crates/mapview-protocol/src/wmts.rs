//! WMTS 1.0.0 request shapes and capabilities.
//!
//! Tiles are served from the EPSG:3857 grid with both KVP and RESTful
//! bindings. The RESTful path is `/wmts/{TileMatrix}/{TileCol}/{TileRow}.{fmt}`
//! (also mounted under `/xyz/`); a `tms=1` query flag selects bottom-left
//! row numbering.

use serde::Deserialize;

use mapview_common::tile::{tile_matrices, TileCoord, TILE_SIZE};
use mapview_common::{tms_to_xyz, BoundingBox, MapsError, MapsResult};

use crate::exceptions::xml_escape;

/// Highest tile matrix served.
pub const MAX_TILE_ZOOM: u32 = 22;

/// WMTS KVP query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WmtsKvp {
    #[serde(rename = "SERVICE", alias = "service")]
    pub service: Option<String>,
    #[serde(rename = "REQUEST", alias = "request")]
    pub request: Option<String>,
    #[serde(rename = "VERSION", alias = "version")]
    pub version: Option<String>,
    #[serde(rename = "LAYER", alias = "layer")]
    pub layer: Option<String>,
    #[serde(rename = "STYLE", alias = "style")]
    pub style: Option<String>,
    #[serde(rename = "FORMAT", alias = "format")]
    pub format: Option<String>,
    #[serde(rename = "TILEMATRIXSET", alias = "tilematrixset")]
    pub tile_matrix_set: Option<String>,
    #[serde(rename = "TILEMATRIX", alias = "tilematrix")]
    pub tile_matrix: Option<String>,
    #[serde(rename = "TILEROW", alias = "tilerow")]
    pub tile_row: Option<u32>,
    #[serde(rename = "TILECOL", alias = "tilecol")]
    pub tile_col: Option<u32>,
    /// TMS row-numbering flag ("1"/"true" selects bottom-left origin)
    #[serde(rename = "tms", alias = "TMS")]
    pub tms: Option<String>,
}

impl WmtsKvp {
    pub fn tms_flag(&self) -> bool {
        matches!(
            self.tms.as_deref().map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("1") | Some("true") | Some("yes")
        )
    }

    /// Parse the KVP shape into a GetTile request.
    pub fn to_tile_request(&self) -> MapsResult<GetTileRequest> {
        let tile_matrix = self
            .tile_matrix
            .as_deref()
            .ok_or_else(|| MapsError::MissingParameter("TILEMATRIX".to_string()))?;
        // Accept both bare indices and "EPSG:3857:12"-style identifiers
        let z: u32 = tile_matrix
            .rsplit(':')
            .next()
            .unwrap_or(tile_matrix)
            .parse()
            .map_err(|_| MapsError::InvalidParameter {
                param: "TILEMATRIX".to_string(),
                message: format!("invalid zoom level: {}", tile_matrix),
            })?;
        let row = self
            .tile_row
            .ok_or_else(|| MapsError::MissingParameter("TILEROW".to_string()))?;
        let col = self
            .tile_col
            .ok_or_else(|| MapsError::MissingParameter("TILECOL".to_string()))?;

        Ok(GetTileRequest {
            z,
            col,
            row,
            format: image_format_from_mime(self.format.as_deref().unwrap_or("image/png"))?,
            tms: self.tms_flag(),
        })
    }
}

/// Output format of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Png,
    Jpeg,
}

impl TileFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
        }
    }
}

fn image_format_from_mime(mime: &str) -> MapsResult<TileFormat> {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" | "png" => Ok(TileFormat::Png),
        "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(TileFormat::Jpeg),
        other => Err(MapsError::UnsupportedFormat(other.to_string())),
    }
}

/// A GetTile request before row-origin resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GetTileRequest {
    pub z: u32,
    pub col: u32,
    pub row: u32,
    pub format: TileFormat,
    /// Row index counts from the bottom of the matrix
    pub tms: bool,
}

impl GetTileRequest {
    /// Apply the TMS flip when requested, validate the address, and return
    /// the top-left-origin coordinate plus its Web Mercator bbox.
    pub fn resolve(&self) -> MapsResult<(TileCoord, BoundingBox)> {
        if self.z > MAX_TILE_ZOOM {
            return Err(MapsError::TileOutOfRange(format!(
                "zoom level {} out of allowed range 0..{}",
                self.z, MAX_TILE_ZOOM
            )));
        }
        let coord = if self.tms {
            tms_to_xyz(self.z, self.col, self.row)
        } else {
            TileCoord::new(self.z, self.col, self.row)
        };
        coord
            .validate(MAX_TILE_ZOOM)
            .map_err(|e| MapsError::TileOutOfRange(e.to_string()))?;
        Ok((coord, coord.bbox_3857()))
    }
}

/// A parsed RESTful tile path: `{TileMatrix}/{TileCol}/{TileRow}.{fmt}`.
#[derive(Debug, Clone, PartialEq)]
pub struct WmtsRestPath {
    pub z: u32,
    pub col: u32,
    pub row: u32,
    pub format: TileFormat,
}

impl WmtsRestPath {
    pub fn parse(path: &str) -> MapsResult<Self> {
        let invalid = || MapsError::MalformedRequest(format!("invalid tile path: {}", path));

        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let z: u32 = parts[0].parse().map_err(|_| invalid())?;
        let col: u32 = parts[1].parse().map_err(|_| invalid())?;
        let (row_str, ext) = parts[2].rsplit_once('.').ok_or_else(invalid)?;
        let row: u32 = row_str.parse().map_err(|_| invalid())?;
        let format = image_format_from_mime(ext)?;

        Ok(Self { z, col, row, format })
    }

    pub fn into_request(self, tms: bool) -> GetTileRequest {
        GetTileRequest {
            z: self.z,
            col: self.col,
            row: self.row,
            format: self.format,
            tms,
        }
    }
}

/// Inputs for the WMTS capabilities document.
pub struct WmtsCapabilities<'a> {
    pub base_url: &'a str,
    pub title: &'a str,
    pub abstract_text: &'a str,
    /// Published layers as (id, title) pairs
    pub layers: &'a [(String, String)],
}

impl WmtsCapabilities<'_> {
    pub fn build(&self) -> String {
        let base = xml_escape(self.base_url);

        let mut matrices_xml = String::new();
        for m in tile_matrices(MAX_TILE_ZOOM) {
            matrices_xml.push_str(&format!(
                r#"      <TileMatrix>
        <ows:Identifier>{id}</ows:Identifier>
        <ScaleDenominator>{scale:.6}</ScaleDenominator>
        <TopLeftCorner>-20037508.342789244 20037508.342789244</TopLeftCorner>
        <TileWidth>{ts}</TileWidth>
        <TileHeight>{ts}</TileHeight>
        <MatrixWidth>{mw}</MatrixWidth>
        <MatrixHeight>{mh}</MatrixHeight>
      </TileMatrix>
"#,
                id = m.identifier,
                scale = m.scale_denominator,
                ts = TILE_SIZE,
                mw = m.matrix_width,
                mh = m.matrix_height,
            ));
        }

        let tile_template = format!("{}/wmts/{{TileMatrix}}/{{TileCol}}/{{TileRow}}.png", base);

        let mut layers_xml = String::new();
        for (id, title) in self.layers {
            layers_xml.push_str(&format!(
                r#"    <Layer>
      <ows:Title>{title}</ows:Title>
      <ows:Identifier>{id}</ows:Identifier>
      <ows:WGS84BoundingBox>
        <ows:LowerCorner>-180 -85.0511287798066</ows:LowerCorner>
        <ows:UpperCorner>180 85.0511287798066</ows:UpperCorner>
      </ows:WGS84BoundingBox>
      <Style isDefault="true">
        <ows:Identifier>default</ows:Identifier>
      </Style>
      <Format>image/png</Format>
      <TileMatrixSetLink>
        <TileMatrixSet>EPSG:3857</TileMatrixSet>
      </TileMatrixSetLink>
      <ResourceURL resourceType="tile" format="image/png" template="{template}"/>
    </Layer>
"#,
                title = xml_escape(title),
                id = xml_escape(id),
                template = xml_escape(&tile_template),
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Capabilities xmlns="http://www.opengis.net/wmts/1.0"
    xmlns:ows="http://www.opengis.net/ows/1.1"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    version="1.0.0">
  <ows:ServiceIdentification>
    <ows:Title>{title}</ows:Title>
    <ows:Abstract>{abstract_text}</ows:Abstract>
    <ows:ServiceType>OGC WMTS</ows:ServiceType>
    <ows:ServiceTypeVersion>1.0.0</ows:ServiceTypeVersion>
  </ows:ServiceIdentification>
  <ows:OperationsMetadata>
    <ows:Operation name="GetCapabilities">
      <ows:DCP><ows:HTTP><ows:Get xlink:href="{base}/wmts?"/></ows:HTTP></ows:DCP>
    </ows:Operation>
    <ows:Operation name="GetTile">
      <ows:DCP><ows:HTTP><ows:Get xlink:href="{base}/wmts?"/></ows:HTTP></ows:DCP>
    </ows:Operation>
  </ows:OperationsMetadata>
  <Contents>
{layers}    <TileMatrixSet>
      <ows:Identifier>EPSG:3857</ows:Identifier>
      <ows:SupportedCRS>urn:ogc:def:crs:EPSG::3857</ows:SupportedCRS>
{matrices}    </TileMatrixSet>
  </Contents>
  <ServiceMetadataURL xlink:href="{base}/wmts?SERVICE=WMTS&amp;REQUEST=GetCapabilities"/>
</Capabilities>
"#,
            title = xml_escape(self.title),
            abstract_text = xml_escape(self.abstract_text),
            base = base,
            layers = layers_xml,
            matrices = matrices_xml,
        )
    }
}
