//! Scale denominator <-> zoom level conversion.
//!
//! The mapping is a hand-tuned lookup table, not a Web Mercator formula.
//! It must stay bit-identical across releases: permalinks generated years ago
//! encode scales that have to resolve to the same zoom today.

/// Scale denominators for integer zoom levels 0..=30.
///
/// Levels 0..=23 are explicit hand-tuned anchors; 24..=30 continue by
/// halving the level-23 scale per step.
pub const SCALE_TABLE: [f64; 31] = [
    400_000_000.0, // 0
    200_000_000.0, // 1
    100_000_000.0, // 2
    60_000_000.0,  // 3
    30_000_000.0,  // 4
    15_000_000.0,  // 5
    8_000_000.0,   // 6
    4_000_000.0,   // 7
    2_000_000.0,   // 8
    1_000_000.0,   // 9
    600_000.0,     // 10
    300_000.0,     // 11
    150_000.0,     // 12
    75_000.0,      // 13
    40_000.0,      // 14
    20_000.0,      // 15
    10_000.0,      // 16
    5_000.0,       // 17
    2_500.0,       // 18
    1_250.0,       // 19
    600.0,         // 20
    300.0,         // 21
    150.0,         // 22
    75.0,          // 23
    37.5,          // 24
    18.75,         // 25
    9.375,         // 26
    4.687_5,       // 27
    2.343_75,      // 28
    1.171_875,     // 29
    0.585_937_5,   // 30
];

/// Approximate ground distance (view width in meters) for zoom levels 0..=20.
///
/// Used to invert third-party "NNNm" view-width URL tokens back to a zoom
/// level; the relation is not analytically invertible, so inversion is a
/// nearest match over this table.
pub const ZOOM_DISTANCE_TABLE: [f64; 21] = [
    20_000_000.0, // 0
    10_000_000.0, // 1
    5_000_000.0,  // 2
    2_000_000.0,  // 3
    1_000_000.0,  // 4
    500_000.0,    // 5
    200_000.0,    // 6
    100_000.0,    // 7
    50_000.0,     // 8
    20_000.0,     // 9
    10_000.0,     // 10
    5_000.0,      // 11
    2_000.0,      // 12
    1_000.0,      // 13
    500.0,        // 14
    200.0,        // 15
    100.0,        // 16
    50.0,         // 17
    20.0,         // 18
    10.0,         // 19
    5.0,          // 20
];

/// Fallback zoom when scale input is unusable. This endpoint must never fail
/// on bad numeric input.
pub const DEFAULT_ZOOM: u8 = 16;

/// Fallback scale when zoom input is unusable.
pub const DEFAULT_SCALE: f64 = 20_000.0;

/// Fallback zoom for unusable view-distance input (the 5 km table entry).
pub const DEFAULT_DISTANCE_ZOOM: u8 = 11;

/// Estimate an integer zoom level from a scale denominator.
///
/// Picks the table entry minimizing `|ln(table) - ln(scale)|`. Non-positive
/// or non-finite input yields [`DEFAULT_ZOOM`] rather than an error.
pub fn zoom_for_scale(scale: f64) -> u8 {
    if !scale.is_finite() || scale <= 0.0 {
        return DEFAULT_ZOOM;
    }

    let target = scale.ln();
    let mut best = 0usize;
    let mut best_diff = f64::INFINITY;
    for (z, table_scale) in SCALE_TABLE.iter().enumerate() {
        let diff = (table_scale.ln() - target).abs();
        if diff < best_diff {
            best_diff = diff;
            best = z;
        }
    }
    best as u8
}

/// Estimate a scale denominator from a (possibly fractional) zoom level.
///
/// Integer zooms return the table value exactly; fractional zooms
/// log-linearly interpolate between the bracketing integer entries.
/// Input is clamped to `[0, 30]`; non-finite input yields [`DEFAULT_SCALE`].
pub fn scale_for_zoom(zoom: f64) -> f64 {
    if !zoom.is_finite() {
        return DEFAULT_SCALE;
    }

    let z = zoom.clamp(0.0, 30.0);
    let floor = z.floor() as usize;
    let ceil = z.ceil() as usize;
    if floor == ceil {
        return SCALE_TABLE[floor];
    }

    let s1 = SCALE_TABLE[floor].ln();
    let s2 = SCALE_TABLE[ceil].ln();
    let t = z - floor as f64;
    (s1 + t * (s2 - s1)).exp()
}

/// Invert a ground view width in meters to the nearest integer zoom level.
///
/// Nearest match on [`ZOOM_DISTANCE_TABLE`]; ties resolve to the lower zoom.
/// Non-positive or non-finite input yields [`DEFAULT_DISTANCE_ZOOM`].
pub fn zoom_for_view_distance(meters: f64) -> u8 {
    if !meters.is_finite() || meters <= 0.0 {
        return DEFAULT_DISTANCE_ZOOM;
    }

    let mut best = 0usize;
    let mut best_diff = f64::INFINITY;
    for (z, distance) in ZOOM_DISTANCE_TABLE.iter().enumerate() {
        let diff = (distance - meters).abs();
        if diff < best_diff {
            best_diff = diff;
            best = z;
        }
    }
    best as u8
}
