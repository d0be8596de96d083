//! Gait trajectory synthesis
//!
//! Foot and trunk targets are built from three splines over the normalised cycle phase:
//!
//! - step: forward position of a foot, moving back linearly while in support and swinging
//!   forward while in the air,
//! - rise: height of a foot, zero while in support,
//! - swing: lateral trunk oscillation.
//!
//! The right foot runs half a cycle behind the left. Every time dependent term is scaled by the
//! enabled gain so that a gain of zero gives a static stance.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry3, Translation3, UnitQuaternion};

use super::{
    ik::{solve_leg, IkError, LegGeometry, LegJointAngles, LegSide},
    spline::SmoothSpline,
    GaitParams,
};
use util::maths::rem_euclid;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Target poses at one instant of the cycle, all in the ground frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitPoses {
    pub trunk: Isometry3<f64>,
    pub left_foot: Isometry3<f64>,
    pub right_foot: Isometry3<f64>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap a phase into `[0, 1)`.
pub fn bound_phase(phase: f64) -> f64 {
    let p = rem_euclid(phase, 1.0);
    if p >= 1.0 {
        0.0
    } else {
        p
    }
}

/// Compute the trunk and foot targets at the given phase.
pub fn synthesize(params: &GaitParams, phase: f64) -> GaitPoses {
    let p = params;
    let phase_left = bound_phase(phase);
    let phase_right = bound_phase(phase + 0.5);

    let step_length = 0.5 * p.support_phase_ratio + 0.5;

    let step_spline = SmoothSpline::new()
        .point(0.0, 0.5, -1.0 / step_length)
        .point(step_length, -0.5, -1.0 / step_length)
        .point(step_length, -0.5, p.step_up_vel)
        .point(1.0, 0.5, -p.step_down_vel);

    let rise_spline = SmoothSpline::new()
        .point(0.0, 0.0, 0.0)
        .point(step_length, 0.0, 0.0)
        .point(step_length, 0.0, p.rise_up_vel)
        .point((1.0 + step_length) / 2.0, 1.0, 0.0)
        .point(1.0, 0.0, -p.rise_down_vel);

    let pause = p.swing_pause / 2.0;
    let vel = p.swing_vel;
    let swing_spline = SmoothSpline::new()
        .point(0.0, -1.0, 0.0)
        .point(pause, -1.0, 0.0)
        .point(pause, -1.0, vel)
        .point(0.5 - pause, 1.0, vel)
        .point(0.5 - pause, 1.0, 0.0)
        .point(0.5 + pause, 1.0, 0.0)
        .point(0.5 + pause, 1.0, -vel)
        .point(1.0 - pause, -1.0, -vel)
        .point(1.0 - pause, -1.0, 0.0)
        .point(1.0, -1.0, 0.0);

    let gain = p.enabled_gain;

    // ---- TRUNK ----

    let swing = swing_spline.pos_mod(phase_left + p.swing_phase);
    let trunk = pose(
        p.trunk_x_offset_m,
        p.trunk_y_offset_m + gain * p.swing_gain_m * swing,
        p.trunk_height_m(),
        p.trunk_roll_rad + gain * p.swing_roll_gain_rad * swing,
        p.trunk_pitch_rad,
        0.0,
    );

    // ---- FEET ----

    let step_left = step_spline.pos(phase_left);
    let step_right = step_spline.pos(phase_right);

    // The leading foot of a lateral step is the one on the side being walked towards
    let lat_sign = if p.lateral_gain_m >= 0.0 { 1.0 } else { -1.0 };
    let lat_left = gain * p.lateral_gain_m * (step_left + 0.5 * lat_sign);
    let lat_right = gain * p.lateral_gain_m * (step_right - 0.5 * lat_sign);

    let half_width = p.dist_feet_lateral_m / 2.0 + p.foot_y_offset_m;

    let left_foot = pose(
        gain * p.step_gain_m * step_left + p.extra_left_x_m,
        half_width + lat_left + p.extra_left_y_m,
        gain * p.rise_gain_m * rise_spline.pos(phase_left) + p.extra_left_z_m,
        p.extra_left_roll_rad,
        p.extra_left_pitch_rad,
        gain * p.turn_gain_rad * step_left + p.extra_left_yaw_rad,
    );

    let right_foot = pose(
        gain * p.step_gain_m * step_right + p.extra_right_x_m,
        -half_width + lat_right + p.extra_right_y_m,
        gain * p.rise_gain_m * rise_spline.pos(phase_right) + p.extra_right_z_m,
        p.extra_right_roll_rad,
        p.extra_right_pitch_rad,
        gain * p.turn_gain_rad * step_right + p.extra_right_yaw_rad,
    );

    GaitPoses {
        trunk,
        left_foot,
        right_foot,
    }
}

/// Advance the phase by `dt_s` and solve the leg joint angles at the new phase.
///
/// On success `phase` and `angles` are updated. On failure neither is touched, so the caller may
/// simply retry from the same point on the next tick.
pub fn walk(
    params: &GaitParams,
    dt_s: f64,
    phase: &mut f64,
    angles: &mut LegJointAngles,
) -> Result<(), IkError> {
    let new_phase = bound_phase(*phase + dt_s * params.freq_hz);
    let poses = synthesize(params, new_phase);
    let geom = LegGeometry::from(params);

    let left = solve_leg(&geom, &poses.trunk, &poses.left_foot, LegSide::Left)?;
    let right = solve_leg(&geom, &poses.trunk, &poses.right_foot, LegSide::Right)?;

    *phase = new_phase;
    *angles = LegJointAngles { left, right };

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn pose(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_euler_angles(roll, pitch, yaw),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn walking_params() -> GaitParams {
        GaitParams {
            enabled_gain: 1.0,
            step_gain_m: 0.03,
            lateral_gain_m: 0.01,
            turn_gain_rad: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_advance() {
        let params = walking_params();
        let dt_s = 0.01;
        let mut phase = 0.0;
        let mut angles = LegJointAngles::default();

        for i in 1..=500 {
            walk(&params, dt_s, &mut phase, &mut angles).unwrap();

            let expected = bound_phase(i as f64 * dt_s * params.freq_hz);
            let diff = (phase - expected).abs();
            assert!(diff < 1e-9 || (1.0 - diff) < 1e-9, "{} != {}", phase, expected);
            assert!(phase >= 0.0 && phase < 1.0);
        }

        assert_eq!(bound_phase(-0.25), 0.75);
        assert_eq!(bound_phase(1.0), 0.0);
    }

    #[test]
    fn test_zero_gain_is_static() {
        let params = GaitParams {
            step_gain_m: 0.05,
            ..Default::default()
        };

        let a = synthesize(&params, 0.1);
        let b = synthesize(&params, 0.7);
        assert_eq!(a, b);
        assert_eq!(a.left_foot.translation.z, 0.0);
        assert!((a.left_foot.translation.y - a.right_foot.translation.y - 0.16).abs() < 1e-12);
    }

    #[test]
    fn test_feet_alternate() {
        let params = walking_params();

        // Mid swing of the left foot, the right foot is in support
        let swing_phase = 0.5 * (1.0 + 0.5 * params.support_phase_ratio + 0.5);
        let poses = synthesize(&params, swing_phase);
        assert!((poses.left_foot.translation.z - params.rise_gain_m).abs() < 1e-12);
        assert_eq!(poses.right_foot.translation.z, 0.0);

        // Support foot moves backwards
        let early = synthesize(&params, 0.1).left_foot.translation.x;
        let late = synthesize(&params, 0.3).left_foot.translation.x;
        assert!(late < early);
    }

    #[test]
    fn test_ik_failure_leaves_state() {
        let params = GaitParams {
            trunk_z_offset_m: -0.2,
            ..walking_params()
        };
        let mut phase = 0.3;
        let mut angles = LegJointAngles::default();
        angles.left.knee_rad = 0.7;
        let before = angles;

        assert!(walk(&params, 0.01, &mut phase, &mut angles).is_err());
        assert_eq!(phase.to_bits(), 0.3f64.to_bits());
        assert_eq!(angles, before);
    }
}
