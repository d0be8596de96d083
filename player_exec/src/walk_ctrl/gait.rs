//! Gait parameter record

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Full set of parameters driving the trajectory synthesiser.
///
/// `step_gain_m`, `lateral_gain_m`, `turn_gain_rad` and `enabled_gain` are the dynamic fields
/// which WalkCtrl overwrites before every stride, everything else is the baseline loaded from
/// `walk_ctrl.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitParams {
    // ---- GEOMETRY ----
    /// Distance between the hip pitch and knee axes.
    ///
    /// Units: meters
    pub dist_hip_to_knee_m: f64,

    /// Distance between the knee and ankle pitch axes.
    ///
    /// Units: meters
    pub dist_knee_to_ankle_m: f64,

    /// Distance between the ankle axes and the sole.
    ///
    /// Units: meters
    pub dist_ankle_to_ground_m: f64,

    /// Lateral distance between the two hips, and so between the feet in the zero pose.
    ///
    /// Units: meters
    pub dist_feet_lateral_m: f64,

    // ---- TIMING ----
    /// Frequency of a complete (two step) cycle.
    ///
    /// Units: hertz
    pub freq_hz: f64,

    /// Gain multiplying every time dependent movement, 0 disables the walk and 1 fully enables
    /// it.
    pub enabled_gain: f64,

    /// Fraction of the cycle spent in double support, in `[0, 1]`.
    pub support_phase_ratio: f64,

    // ---- STEP ----
    /// Lateral offset added to the default foot position, positive moves the feet outward.
    ///
    /// Units: meters
    pub foot_y_offset_m: f64,

    /// Forward length of each step, positive walks forward.
    ///
    /// Units: meters
    pub step_gain_m: f64,

    /// Height each foot is lifted during swing.
    ///
    /// Units: meters
    pub rise_gain_m: f64,

    /// Yaw rotation of each foot per step, positive turns left.
    ///
    /// Units: radians
    pub turn_gain_rad: f64,

    /// Lateral length of each step, positive walks left.
    ///
    /// Units: meters
    pub lateral_gain_m: f64,

    // ---- TRUNK ----
    /// How far the trunk is lowered from the fully extended leg height.
    ///
    /// Units: meters
    pub trunk_z_offset_m: f64,

    /// Amplitude of the lateral trunk oscillation.
    ///
    /// Units: meters
    pub swing_gain_m: f64,

    /// Amplitude of the trunk roll oscillation.
    ///
    /// Units: radians
    pub swing_roll_gain_rad: f64,

    /// Phase shift of the trunk oscillation relative to the feet, in `[0, 1]`.
    pub swing_phase: f64,

    /// Part of the cycle during which the trunk holds on one side, in `[0, 0.5]`.
    pub swing_pause: f64,

    /// Velocity of the trunk swing spline, controls how smooth the oscillation is.
    pub swing_vel: f64,

    /// Forward trunk offset relative to the feet.
    ///
    /// Units: meters
    pub trunk_x_offset_m: f64,

    /// Lateral trunk offset relative to the feet.
    ///
    /// Units: meters
    pub trunk_y_offset_m: f64,

    /// Forward lean of the trunk.
    ///
    /// Units: radians
    pub trunk_pitch_rad: f64,

    /// Roll of the trunk.
    ///
    /// Units: radians
    pub trunk_roll_rad: f64,

    // ---- SPLINE VELOCITIES ----
    /// Forward foot velocity at take off.
    pub step_up_vel: f64,

    /// Forward foot velocity at landing.
    pub step_down_vel: f64,

    /// Vertical foot velocity at take off.
    pub rise_up_vel: f64,

    /// Vertical foot velocity at landing.
    pub rise_down_vel: f64,

    // ---- EXTRA FOOT OFFSETS ----
    pub extra_left_x_m: f64,
    pub extra_left_y_m: f64,
    pub extra_left_z_m: f64,
    pub extra_right_x_m: f64,
    pub extra_right_y_m: f64,
    pub extra_right_z_m: f64,

    pub extra_left_yaw_rad: f64,
    pub extra_left_pitch_rad: f64,
    pub extra_left_roll_rad: f64,
    pub extra_right_yaw_rad: f64,
    pub extra_right_pitch_rad: f64,
    pub extra_right_roll_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GaitParams {
    /// Baseline tuning for a kid size robot, starting at rest.
    fn default() -> Self {
        Self {
            dist_hip_to_knee_m: 0.14,
            dist_knee_to_ankle_m: 0.14,
            dist_ankle_to_ground_m: 0.04,
            dist_feet_lateral_m: 0.09,

            freq_hz: 1.5,
            enabled_gain: 0.0,
            support_phase_ratio: 0.0,

            foot_y_offset_m: 0.035,
            step_gain_m: 0.0,
            rise_gain_m: 0.04,
            turn_gain_rad: 0.0,
            lateral_gain_m: 0.0,

            trunk_z_offset_m: 0.03,
            swing_gain_m: 0.02,
            swing_roll_gain_rad: 0.0,
            swing_phase: 0.25,
            swing_pause: 0.0,
            swing_vel: 4.0,
            trunk_x_offset_m: 0.01,
            trunk_y_offset_m: 0.0,
            trunk_pitch_rad: 0.15,
            trunk_roll_rad: 0.0,

            step_up_vel: 4.0,
            step_down_vel: 4.0,
            rise_up_vel: 4.0,
            rise_down_vel: 4.0,

            extra_left_x_m: 0.0,
            extra_left_y_m: 0.0,
            extra_left_z_m: 0.0,
            extra_right_x_m: 0.0,
            extra_right_y_m: 0.0,
            extra_right_z_m: 0.0,
            extra_left_yaw_rad: 0.0,
            extra_left_pitch_rad: 0.0,
            extra_left_roll_rad: 0.0,
            extra_right_yaw_rad: 0.0,
            extra_right_pitch_rad: 0.0,
            extra_right_roll_rad: 0.0,
        }
    }
}

impl GaitParams {
    /// Duration of one complete cycle.
    ///
    /// Units: seconds
    pub fn period_s(&self) -> f64 {
        1.0 / self.freq_hz
    }

    /// Height of the trunk origin above the ground when standing.
    ///
    /// Units: meters
    pub fn trunk_height_m(&self) -> f64 {
        self.dist_hip_to_knee_m + self.dist_knee_to_ankle_m + self.dist_ankle_to_ground_m
            - self.trunk_z_offset_m
    }

    /// Clamp the ratios to their valid ranges.
    pub fn sanitised(mut self) -> Self {
        self.enabled_gain = self.enabled_gain.max(0.0).min(1.0);
        self.support_phase_ratio = self.support_phase_ratio.max(0.0).min(1.0);
        self.swing_pause = self.swing_pause.max(0.0).min(0.5);
        self
    }
}
