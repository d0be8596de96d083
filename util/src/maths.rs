//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use num_traits::Float;

/// Limit `value` to the range `[min, max]`.
///
/// An inverted range (`max < min`) leaves the value untouched.
pub fn bound<T>(min: T, max: T, value: T) -> T
where
    T: Float,
{
    if max < min {
        return value;
    }

    value.max(min).min(max)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Floating point round-off can give `r == rhs.abs()` for tiny negative `lhs`, callers needing a
/// strictly half-open range must check for that.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Convert degrees to radians.
pub fn deg2rad(deg: f64) -> f64 {
    deg.to_radians()
}

/// Convert radians to degrees.
pub fn rad2deg(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Wrap an angle in degrees into `[-180, 180]`.
pub fn normalize_deg(deg: f64) -> f64 {
    let wrapped = rem_euclid(deg + 180.0, 360.0) - 180.0;

    // Keep +180 rather than mapping it to -180
    if wrapped == -180.0 && deg > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Bearing of a vector (angle to the positive X axis) in degrees.
pub fn azimuth_deg(v: &Vector2<f64>) -> f64 {
    rad2deg(v.y.atan2(v.x))
}

/// Frame rotation matrix for an angle in degrees.
///
/// This is the passive rotation `[[cos, sin], [-sin, cos]]`, so for a frame whose heading is
/// `h` (counter clockwise from the global X axis) `frame_rotation_2d_deg(h)` maps global vectors
/// into that frame and `frame_rotation_2d_deg(-h)` maps them back out.
pub fn frame_rotation_2d_deg(deg: f64) -> Rotation2<f64> {
    Rotation2::new(-deg2rad(deg))
}

/// Mean of two headings in degrees, accounting for wrapping at +/-180.
pub fn mean_heading_deg(a: f64, b: f64) -> f64 {
    normalize_deg(a + normalize_deg(b - a) / 2.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalize_deg() {
        assert_eq!(normalize_deg(0.0), 0.0);
        assert_eq!(normalize_deg(190.0), -170.0);
        assert_eq!(normalize_deg(-190.0), 170.0);
        assert_eq!(normalize_deg(180.0), 180.0);
        assert_eq!(normalize_deg(720.0 + 45.0), 45.0);
    }

    #[test]
    fn test_headings() {
        assert!((azimuth_deg(&Vector2::new(1.0, 1.0)) - 45.0).abs() < 1e-9);
        assert!((azimuth_deg(&Vector2::new(0.0, -2.0)) + 90.0).abs() < 1e-9);

        assert!((mean_heading_deg(10.0, 30.0) - 20.0).abs() < 1e-9);
        assert!((mean_heading_deg(170.0, -170.0).abs() - 180.0).abs() < 1e-9);

        let v = frame_rotation_2d_deg(90.0) * Vector2::new(1.0, 0.0);
        assert!((v - Vector2::new(0.0, -1.0)).norm() < 1e-9);
        let v = frame_rotation_2d_deg(-90.0) * Vector2::new(1.0, 0.0);
        assert!((v - Vector2::new(0.0, 1.0)).norm() < 1e-9);
    }

    #[test]
    fn test_bound() {
        assert_eq!(bound(-1.0, 1.0, 2.0), 1.0);
        assert_eq!(bound(-1.0, 1.0, -2.0), -1.0);
        assert_eq!(bound(-1.0, 1.0, 0.5), 0.5);
        assert_eq!(bound(1.0, -1.0, 5.0), 5.0);
        assert!((rem_euclid(-0.25, 1.0) - 0.75).abs() < 1e-12);
    }
}
