//! Common types and utilities shared across all mapview-wms crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod extent;
pub mod layer;
pub mod scale;
pub mod theme;
pub mod tile;

pub use bbox::BoundingBox;
pub use crs::{AxisOrder, CrsCode};
pub use error::{MapsError, MapsResult};
pub use extent::{compute_bbox, rotated_enclosing_bbox, MapViewSnapshot, DEFAULT_DPI};
pub use layer::{Feature, FieldDef, FieldKind, GeometryKind, SymbolStyle, VectorLayer};
pub use scale::{scale_for_zoom, zoom_for_scale, zoom_for_view_distance};
pub use theme::{LayerState, ThemeState};
pub use tile::{tile_bbox_3857, tms_to_xyz, TileCoord, TileMatrixDef};
