//! Parameters structure for WalkCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::mech::JointId;
use serde::Deserialize;
use std::collections::HashMap;

use super::GaitParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for walk control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Baseline gait, the dynamic gains in this table are ignored.
    pub gait: GaitParams,

    // ---- DYNAMIC GAIN BOUNDS ----
    /// Range of the forward step request.
    ///
    /// Units: meters
    pub x_range_m: [f64; 2],

    /// Range of the lateral step request.
    ///
    /// Units: meters
    pub y_range_m: [f64; 2],

    /// Range of the turn request.
    ///
    /// Units: degrees
    pub dir_range_deg: [f64; 2],

    // ---- CALIBRATION ----
    /// Offset added to every forward step request so that a zero request walks on the spot.
    ///
    /// Units: meters
    pub x_offset_m: f64,

    /// Offset added to every lateral step request.
    ///
    /// Units: meters
    pub y_offset_m: f64,

    /// Offset subtracted from every turn request.
    ///
    /// Units: degrees
    pub dir_offset_deg: f64,

    // ---- DEAD RECKONING ----
    /// Ratio of actual to commanded displacement, forward then lateral.
    pub nav_coef: [f64; 2],

    /// Ratio of actual to commanded heading change per stride.
    pub nav_turn_coef: f64,

    // ---- RAMPS ----
    /// Sub-cycles executed by the start ramp, in order.
    pub start_ramp: Vec<RampStage>,

    /// Strides walked on the spot before the enable gain is ramped down.
    pub stop_settle_strides: u32,

    /// Foot lateral offset used while settling.
    ///
    /// Units: meters
    pub stop_foot_y_offset_m: f64,

    // ---- POSTURE ----
    /// Arm joint positions sent alongside every gait frame.
    ///
    /// Units: degrees
    pub arm_posture_deg: HashMap<JointId, f64>,

    /// Period to wait for a new command when the gait is stopped.
    ///
    /// Units: milliseconds
    pub idle_poll_ms: u64,
}

/// One sub-cycle of the start ramp.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RampStage {
    /// Foot lateral offset for this stage, `None` uses the baseline.
    ///
    /// Units: meters
    pub foot_y_offset_m: Option<f64>,

    /// Foot lift for this stage.
    ///
    /// Units: meters
    pub rise_gain_m: f64,

    /// Length of the stage in complete cycles.
    pub strides: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        let mut arm_posture_deg = HashMap::new();
        arm_posture_deg.insert(JointId::LeftShoulder, 0.0);
        arm_posture_deg.insert(JointId::LeftElbow, -170.0);
        arm_posture_deg.insert(JointId::RightShoulder, 0.0);
        arm_posture_deg.insert(JointId::RightElbow, 170.0);

        Self {
            gait: GaitParams::default(),
            x_range_m: [-0.03, 0.04],
            y_range_m: [-0.02, 0.02],
            dir_range_deg: [-15.0, 15.0],
            x_offset_m: 0.0,
            y_offset_m: 0.0,
            dir_offset_deg: 0.0,
            nav_coef: [1.0, 1.0],
            nav_turn_coef: 1.0,
            start_ramp: vec![
                RampStage {
                    foot_y_offset_m: Some(0.025),
                    rise_gain_m: 0.02,
                    strides: 1.0,
                },
                RampStage {
                    foot_y_offset_m: Some(0.0325),
                    rise_gain_m: 0.03,
                    strides: 1.0,
                },
                RampStage {
                    foot_y_offset_m: None,
                    rise_gain_m: 0.04,
                    strides: 2.0,
                },
            ],
            stop_settle_strides: 2,
            stop_foot_y_offset_m: 0.025,
            arm_posture_deg,
            idle_poll_ms: 10,
        }
    }
}
