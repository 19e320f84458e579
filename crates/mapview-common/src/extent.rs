//! Viewport extent computation.
//!
//! Converts a map view (center + scale denominator + rotation + pixel size)
//! into a ground-space bounding box. All arithmetic is planar in the request
//! CRS; reprojection belongs to the geodesy layer.

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, CrsCode};

/// Rendering DPI assumed when translating pixels to ground units.
pub const DEFAULT_DPI: f64 = 96.0;

const METERS_PER_INCH: f64 = 0.0254;

/// A read-only snapshot of a map view, as supplied by the host application.
///
/// The core never reaches into the host's project/canvas object graph; it
/// consumes one of these per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapViewSnapshot {
    /// View center in `crs` units
    pub center: (f64, f64),
    /// Scale denominator (the N in 1:N)
    pub scale: f64,
    /// Rotation in degrees, normalized to [0, 360)
    pub rotation: f64,
    /// CRS of `center`
    pub crs: CrsCode,
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl MapViewSnapshot {
    /// The unrotated ground-space bbox of this view.
    pub fn bbox(&self) -> BoundingBox {
        compute_bbox(
            self.center,
            self.scale,
            self.width,
            self.height,
            DEFAULT_DPI,
        )
    }

    /// Axis-aligned bbox enclosing the rotated viewport.
    pub fn enclosing_bbox(&self) -> BoundingBox {
        rotated_enclosing_bbox(&self.bbox(), self.rotation)
    }
}

/// Normalize a rotation angle in degrees to [0, 360).
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    degrees.rem_euclid(360.0)
}

/// Compute the unrotated ground-space bbox for a centered viewport.
///
/// Ground width is `(width_px / (dpi / 0.0254)) * scale`: pixels divided by
/// pixels-per-meter gives on-screen meters, multiplied by the scale
/// denominator gives ground meters (or degrees-equivalent units for a
/// geographic CRS; the arithmetic is unit-agnostic).
pub fn compute_bbox(
    center: (f64, f64),
    scale: f64,
    width_px: u32,
    height_px: u32,
    dpi: f64,
) -> BoundingBox {
    let pixels_per_meter = dpi / METERS_PER_INCH;
    let half_width = (width_px as f64 / pixels_per_meter) * scale / 2.0;
    let half_height = (height_px as f64 / pixels_per_meter) * scale / 2.0;

    BoundingBox::new(
        center.0 - half_width,
        center.1 - half_height,
        center.0 + half_width,
        center.1 + half_height,
    )
}

/// Axis-aligned bbox enclosing `bbox` rotated about its center.
///
/// Rotates the four corners and takes coordinate extrema. Collaborators
/// that only understand flat BBOX parameters (legacy WMS) get this box;
/// renderer-native paths pass rotation through instead.
pub fn rotated_enclosing_bbox(bbox: &BoundingBox, rotation_deg: f64) -> BoundingBox {
    let rotation = normalize_rotation(rotation_deg);
    if rotation == 0.0 {
        return *bbox;
    }

    let (cx, cy) = bbox.center();
    let angle = rotation.to_radians();
    let (sin, cos) = angle.sin_cos();

    let rotate = |px: f64, py: f64| -> (f64, f64) {
        let dx = px - cx;
        let dy = py - cy;
        (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
    };

    let corners = [
        rotate(bbox.min_x, bbox.min_y),
        rotate(bbox.min_x, bbox.max_y),
        rotate(bbox.max_x, bbox.min_y),
        rotate(bbox.max_x, bbox.max_y),
    ];

    let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

    BoundingBox::new(min_x, min_y, max_x, max_y)
}
