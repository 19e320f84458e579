//! OGC WMS/WMTS/WFS protocol shapes and the permalink codec.
//!
//! Supports:
//! - WMS 1.1.1 and 1.3.0 GetCapabilities/GetMap (KVP)
//! - WMTS 1.0.0 GetCapabilities/GetTile (KVP and RESTful bindings, TMS flip)
//! - WFS 2.0 GetCapabilities/DescribeFeatureType/GetFeature/GetStyles
//! - Proprietary permalink URLs and third-party map-service URLs
//! - SLD 1.1 to vector style-layer conversion

pub mod exceptions;
pub mod permalink;
pub mod sld;
pub mod wfs;
pub mod wms;
pub mod wmts;

pub use exceptions::{ows_exception_xml, wms_exception_xml, xml_escape};
pub use permalink::{ParsedNavigation, Permalink};
pub use sld::{sld_to_style_layers, StyleLayer, StyleLayerKind};
pub use wms::{GetMapRequest, WmsKvp, MAX_IMAGE_DIMENSION};
pub use wmts::{GetTileRequest, WmtsKvp, WmtsRestPath};
