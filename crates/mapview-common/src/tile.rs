//! WMTS tile addressing.
//!
//! Tiles are addressed on the Web Mercator (EPSG:3857) grid with a top-left
//! origin; the TMS convention (bottom-left origin) is supported via a row
//! flip.

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Half-extent of the Web Mercator square, in meters.
pub const MERCATOR_ORIGIN: f64 = 20037508.342789244;

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 256;

/// OGC standard pixel size in meters (0.28 mm), used for scale denominators.
const OGC_PIXEL_SIZE: f64 = 0.00028;

/// A tile coordinate (z/x/y), top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level (TileMatrix identifier)
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Validate that the coordinate addresses an existing tile.
    pub fn validate(&self, max_zoom: u32) -> Result<(), TileAddressError> {
        if self.z > max_zoom {
            return Err(TileAddressError::ZoomOutOfRange {
                z: self.z,
                max_zoom,
            });
        }
        let max_index = (1u32 << self.z) - 1;
        if self.x > max_index || self.y > max_index {
            return Err(TileAddressError::IndexOutOfRange {
                z: self.z,
                max_index,
            });
        }
        Ok(())
    }

    /// Web Mercator bbox of this tile.
    pub fn bbox_3857(&self) -> BoundingBox {
        tile_bbox_3857(self.z, self.x, self.y)
    }
}

/// TMS (bottom-left origin) to XYZ/WMTS (top-left origin) row flip.
///
/// The flip is an involution: applying it twice returns the input row.
pub fn tms_to_xyz(z: u32, x: u32, y: u32) -> TileCoord {
    let n = 1u32 << z;
    TileCoord { z, x, y: n - 1 - y }
}

/// Web Mercator bbox for an XYZ tile address.
pub fn tile_bbox_3857(z: u32, x: u32, y: u32) -> BoundingBox {
    let tiles = (1u64 << z) as f64;
    let tile_span = (MERCATOR_ORIGIN * 2.0) / tiles;

    let min_x = -MERCATOR_ORIGIN + x as f64 * tile_span;
    let max_x = -MERCATOR_ORIGIN + (x + 1) as f64 * tile_span;
    let max_y = MERCATOR_ORIGIN - y as f64 * tile_span;
    let min_y = MERCATOR_ORIGIN - (y + 1) as f64 * tile_span;

    BoundingBox::new(min_x, min_y, max_x, max_y)
}

/// One TileMatrix entry of the EPSG:3857 tile matrix set, as advertised in
/// WMTS GetCapabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMatrixDef {
    pub identifier: u32,
    pub scale_denominator: f64,
    pub matrix_width: u32,
    pub matrix_height: u32,
}

/// Build the TileMatrix entries for zoom levels `0..=max_zoom`.
///
/// Scale denominator is `resolution / 0.00028` per the WMTS spec's standard
/// pixel size.
pub fn tile_matrices(max_zoom: u32) -> Vec<TileMatrixDef> {
    let initial_resolution = (MERCATOR_ORIGIN * 2.0) / TILE_SIZE as f64;
    (0..=max_zoom)
        .map(|z| {
            let n = 1u32 << z;
            let resolution = initial_resolution / n as f64;
            TileMatrixDef {
                identifier: z,
                scale_denominator: resolution / OGC_PIXEL_SIZE,
                matrix_width: n,
                matrix_height: n,
            }
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum TileAddressError {
    #[error("Zoom level {z} out of allowed range 0..{max_zoom}")]
    ZoomOutOfRange { z: u32, max_zoom: u32 },

    #[error("Tile coordinates out of range for z={z} (0..{max_index})")]
    IndexOutOfRange { z: u32, max_index: u32 },
}
