//! Tolerance-aware float comparisons.
//!
//! Slicers round coordinates differently and accumulate noise over long
//! files, so every comparison the tracker and the stabilization engine make
//! goes through these helpers and shares one tolerance.

/// Tolerance used by every comparison in this module.
pub const FLOAT_TOLERANCE: f64 = 5e-5;

#[inline]
pub fn is_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < FLOAT_TOLERANCE
}

#[inline]
pub fn is_zero(a: f64) -> bool {
    a.abs() < FLOAT_TOLERANCE
}

#[inline]
pub fn greater_than(a: f64, b: f64) -> bool {
    a - b >= FLOAT_TOLERANCE
}

#[inline]
pub fn greater_than_or_equal(a: f64, b: f64) -> bool {
    a - b > -FLOAT_TOLERANCE
}

#[inline]
pub fn less_than(a: f64, b: f64) -> bool {
    b - a >= FLOAT_TOLERANCE
}

#[inline]
pub fn less_than_or_equal(a: f64, b: f64) -> bool {
    b - a > -FLOAT_TOLERANCE
}

/// Euclidean distance between two points in the XY plane.
#[inline]
pub fn distance_xy(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}
