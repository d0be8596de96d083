//! Analytic leg inverse kinematics
//!
//! Each leg is a six joint chain: hip yaw, hip roll, hip pitch, knee, ankle pitch, ankle roll.
//! The hip yaw, roll and pitch axes intersect at the hip point and the two ankle axes intersect
//! at the ankle point, which makes the chain solvable in closed form by working backwards from
//! the ankle (see Kajita et al., "Introduction to Humanoid Robotics", chapter 2).
//!
//! Zero angles put the leg straight down with the foot flat. Positive knee angles bend the
//! shank backwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, PI};

use super::GaitParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on the reachable hip to ankle distance, so that the fully extended zero pose is not
/// rejected by round off.
const REACH_EPSILON_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Joint angles of one leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LegAngles {
    pub hip_yaw_rad: f64,
    pub hip_roll_rad: f64,
    pub hip_pitch_rad: f64,
    pub knee_rad: f64,
    pub ankle_pitch_rad: f64,
    pub ankle_roll_rad: f64,
}

/// Joint angles of both legs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LegJointAngles {
    pub left: LegAngles,
    pub right: LegAngles,
}

/// Segment lengths of a leg.
#[derive(Debug, Clone, Copy)]
pub struct LegGeometry {
    pub hip_to_knee_m: f64,
    pub knee_to_ankle_m: f64,
    pub ankle_to_ground_m: f64,
    pub hip_lateral_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which leg is being solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegSide {
    Left,
    Right,
}

/// Errors raised by the leg solver.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum IkError {
    #[error("{0:?} leg target is unreachable (hip to ankle distance {1:.4} m)")]
    Unreachable(LegSide, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LegSide {
    /// Sign of the lateral hip offset, left is positive Y.
    pub fn sign(&self) -> f64 {
        match self {
            LegSide::Left => 1.0,
            LegSide::Right => -1.0,
        }
    }
}

impl From<&GaitParams> for LegGeometry {
    fn from(p: &GaitParams) -> Self {
        Self {
            hip_to_knee_m: p.dist_hip_to_knee_m,
            knee_to_ankle_m: p.dist_knee_to_ankle_m,
            ankle_to_ground_m: p.dist_ankle_to_ground_m,
            hip_lateral_m: p.dist_feet_lateral_m,
        }
    }
}

impl LegGeometry {
    /// Position of the hip joint centre in the trunk frame.
    pub fn hip_in_trunk(&self, side: LegSide) -> Point3<f64> {
        Point3::new(0.0, side.sign() * self.hip_lateral_m / 2.0, 0.0)
    }

    /// Forward kinematics, returning the foot pose for the given joint angles.
    pub fn forward(&self, trunk: &Isometry3<f64>, side: LegSide, q: &LegAngles) -> Isometry3<f64> {
        let hip = trunk * self.hip_in_trunk(side);

        let thigh = trunk.rotation.to_rotation_matrix()
            * rot_z(q.hip_yaw_rad)
            * rot_x(q.hip_roll_rad)
            * rot_y(q.hip_pitch_rad);
        let knee = hip + thigh * Vector3::new(0.0, 0.0, -self.hip_to_knee_m);

        let shank = thigh * rot_y(q.knee_rad);
        let ankle = knee + shank * Vector3::new(0.0, 0.0, -self.knee_to_ankle_m);

        let foot_rot = shank * rot_y(q.ankle_pitch_rad) * rot_x(q.ankle_roll_rad);
        let foot = ankle - foot_rot * Vector3::new(0.0, 0.0, self.ankle_to_ground_m);

        Isometry3::from_parts(
            Translation3::from(foot.coords),
            UnitQuaternion::from_rotation_matrix(&foot_rot),
        )
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the joint angles placing the foot of `side` at `foot`, with the trunk at `trunk`.
///
/// Both poses are expressed in the same (ground) frame. Fails if the ankle cannot be reached
/// from the hip with the configured segment lengths.
pub fn solve_leg(
    geom: &LegGeometry,
    trunk: &Isometry3<f64>,
    foot: &Isometry3<f64>,
    side: LegSide,
) -> Result<LegAngles, IkError> {
    let a = geom.hip_to_knee_m;
    let b = geom.knee_to_ankle_m;

    let foot_rot = foot.rotation.to_rotation_matrix();
    let hip = trunk * geom.hip_in_trunk(side);
    let ankle = Point3::from(foot.translation.vector)
        + foot_rot * Vector3::new(0.0, 0.0, geom.ankle_to_ground_m);

    // Ankle to hip, in the foot frame
    let r = foot_rot.inverse() * (hip - ankle);
    let c = r.norm();

    if !c.is_finite() || c > a + b + REACH_EPSILON_M || c < (a - b).abs() - REACH_EPSILON_M {
        return Err(IkError::Unreachable(side, c));
    }

    let cos_knee = ((c * c - a * a - b * b) / (2.0 * a * b)).max(-1.0).min(1.0);
    let knee = cos_knee.acos();

    // Angle between the ankle to hip line and the shank
    let q6a = (a * knee.sin()).atan2(a * cos_knee + b);

    let mut ankle_roll = r.y.atan2(r.z);
    if ankle_roll > FRAC_PI_2 {
        ankle_roll -= PI;
    } else if ankle_roll < -FRAC_PI_2 {
        ankle_roll += PI;
    }

    let ankle_pitch =
        -r.x.atan2(r.z.signum() * (r.y * r.y + r.z * r.z).sqrt()) - q6a;

    // Hip rotation relative to the trunk
    let hip_rot = trunk.rotation.to_rotation_matrix().inverse()
        * foot_rot
        * rot_x(-ankle_roll)
        * rot_y(-ankle_pitch - knee);
    let m = hip_rot.matrix();

    let hip_yaw = (-m[(0, 1)]).atan2(m[(1, 1)]);
    let hip_roll = m[(2, 1)].atan2(-m[(0, 1)] * hip_yaw.sin() + m[(1, 1)] * hip_yaw.cos());
    let hip_pitch = (-m[(2, 0)]).atan2(m[(2, 2)]);

    Ok(LegAngles {
        hip_yaw_rad: hip_yaw,
        hip_roll_rad: hip_roll,
        hip_pitch_rad: hip_pitch,
        knee_rad: knee,
        ankle_pitch_rad: ankle_pitch,
        ankle_roll_rad: ankle_roll,
    })
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn rot_x(angle_rad: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), angle_rad)
}

fn rot_y(angle_rad: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), angle_rad)
}

fn rot_z(angle_rad: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), angle_rad)
}
