//! Cubic Hermite splines over normalised phase
//!
//! The gait trajectories are short piecewise cubic curves, at most a handful of knots, evaluated
//! at the control rate. Points are stored inline so that building and evaluating a spline never
//! allocates.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::rem_euclid;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum number of knots a spline can hold.
pub const MAX_SPLINE_POINTS: usize = 10;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single knot of the spline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SplinePoint {
    pub t: f64,
    pub pos: f64,
    pub vel: f64,
}

/// Piecewise cubic Hermite spline with C1 continuity at every knot.
///
/// Knots must be added in non-decreasing `t`. Two knots may share the same `t` to introduce a
/// velocity discontinuity, in which case evaluating exactly at that `t` uses the later segment.
#[derive(Debug, Clone, Copy)]
pub struct SmoothSpline {
    points: [SplinePoint; MAX_SPLINE_POINTS],
    len: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SmoothSpline {
    fn default() -> Self {
        Self::new()
    }
}

impl SmoothSpline {
    /// Create an empty spline.
    pub fn new() -> Self {
        Self {
            points: [SplinePoint::default(); MAX_SPLINE_POINTS],
            len: 0,
        }
    }

    /// Add a knot, returning the spline to allow chaining.
    ///
    /// Knots past `MAX_SPLINE_POINTS` are ignored, the gait splines never need that many.
    pub fn point(mut self, t: f64, pos: f64, vel: f64) -> Self {
        if self.len < MAX_SPLINE_POINTS {
            self.points[self.len] = SplinePoint { t, pos, vel };
            self.len += 1;
        }
        self
    }

    /// Number of knots in the spline.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Evaluate the spline at `t`.
    ///
    /// Values of `t` outside the knot range are clamped to it. An empty spline evaluates to zero.
    pub fn pos(&self, t: f64) -> f64 {
        let points = &self.points[..self.len];

        match points.len() {
            0 => return 0.0,
            1 => return points[0].pos,
            _ => (),
        }

        let t = t.max(points[0].t).min(points[points.len() - 1].t);

        // Last non-degenerate segment is the fallback for t at the very end of the range
        let mut chosen = None;
        for (i, seg) in points.windows(2).enumerate() {
            if seg[1].t - seg[0].t <= 0.0 {
                continue;
            }
            chosen = Some(i);
            if t < seg[1].t {
                break;
            }
        }

        match chosen {
            Some(i) => hermite(&points[i], &points[i + 1], t),
            // Every knot shares the same t
            None => points[points.len() - 1].pos,
        }
    }

    /// Evaluate the spline at `t` wrapped into `[0, 1)`.
    pub fn pos_mod(&self, t: f64) -> f64 {
        let mut t = rem_euclid(t, 1.0);
        if t >= 1.0 {
            t = 0.0;
        }
        self.pos(t)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Cubic Hermite interpolation between two knots.
fn hermite(p0: &SplinePoint, p1: &SplinePoint, t: f64) -> f64 {
    let h = p1.t - p0.t;
    let s = (t - p0.t) / h;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    h00 * p0.pos + h10 * h * p0.vel + h01 * p1.pos + h11 * h * p1.vel
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_knots_interpolated() {
        let spline = SmoothSpline::new()
            .point(0.0, 1.0, 0.0)
            .point(0.5, -1.0, 0.0)
            .point(1.0, 1.0, 0.0);

        assert_eq!(spline.len(), 3);
        assert!((spline.pos(0.0) - 1.0).abs() < 1e-12);
        assert!((spline.pos(0.5) + 1.0).abs() < 1e-12);
        assert!((spline.pos(1.0) - 1.0).abs() < 1e-12);

        // Symmetric segment passes through zero half way
        assert!(spline.pos(0.25).abs() < 1e-12);

        // Clamped outside of the range
        assert!((spline.pos(-3.0) - 1.0).abs() < 1e-12);
        assert!((spline.pos(4.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_segment() {
        // Velocities matching the slope give a straight line
        let spline = SmoothSpline::new()
            .point(0.0, 0.0, 2.0)
            .point(0.5, 1.0, 2.0);

        for i in 0..=10 {
            let t = 0.05 * i as f64;
            assert!((spline.pos(t) - 2.0 * t).abs() < 1e-12);
        }
    }

    #[test]
    fn test_duplicate_knot_uses_later_segment() {
        let spline = SmoothSpline::new()
            .point(0.0, 0.0, 0.0)
            .point(0.5, 1.0, 0.0)
            .point(0.5, 5.0, 0.0)
            .point(1.0, 5.0, 0.0);

        assert!((spline.pos(0.5) - 5.0).abs() < 1e-12);
        assert!(spline.pos(0.4999) < 1.0 + 1e-9);
    }

    #[test]
    fn test_pos_mod() {
        let spline = SmoothSpline::new()
            .point(0.0, 0.0, 1.0)
            .point(1.0, 1.0, 1.0);

        assert!((spline.pos_mod(1.25) - 0.25).abs() < 1e-12);
        assert!((spline.pos_mod(-0.25) - 0.75).abs() < 1e-12);
        assert!(SmoothSpline::new().pos(0.3).abs() < 1e-12);
    }
}
