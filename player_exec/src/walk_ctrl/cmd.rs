//! Commands passed into WalkCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{bound, deg2rad};

use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The externally writable part of the gait, shared between the think loop and the gait thread.
///
/// Gains stored here are already bounded and calibrated, ready to be copied into the gait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WalkCmd {
    /// Units: meters
    pub step_gain_m: f64,

    /// Units: meters
    pub lateral_gain_m: f64,

    /// Units: radians
    pub turn_gain_rad: f64,

    /// Whether walking is requested.
    pub enable: bool,

    /// Set when a discrete action wants the legs, cleared by the gait thread once it has stopped.
    pub yield_to_action: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WalkCmd {
    /// Build the command for a walk request.
    ///
    /// The requested values are bounded to the configured ranges before the calibration offsets
    /// are applied. `dir_deg` is converted to radians. The yield flag is left clear.
    pub fn from_request(
        params: &Params,
        x_m: f64,
        y_m: f64,
        dir_deg: f64,
        enable: bool,
    ) -> Self {
        let x = bound(params.x_range_m[0], params.x_range_m[1], x_m);
        let y = bound(params.y_range_m[0], params.y_range_m[1], y_m);
        let d = bound(params.dir_range_deg[0], params.dir_range_deg[1], dir_deg);

        Self {
            step_gain_m: x + params.x_offset_m,
            lateral_gain_m: y + params.y_offset_m,
            turn_gain_rad: deg2rad(d) - deg2rad(params.dir_offset_deg),
            enable,
            yield_to_action: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_request() {
        let params = Params {
            x_offset_m: 0.005,
            y_offset_m: -0.002,
            dir_offset_deg: 1.0,
            ..Default::default()
        };

        let cmd = WalkCmd::from_request(&params, 1.0, -1.0, 90.0, true);
        assert!((cmd.step_gain_m - 0.045).abs() < 1e-12);
        assert!((cmd.lateral_gain_m + 0.022).abs() < 1e-12);
        assert!((cmd.turn_gain_rad - deg2rad(14.0)).abs() < 1e-12);
        assert!(cmd.enable);

        let cmd = WalkCmd::from_request(&params, 0.01, 0.0, -3.0, false);
        assert!((cmd.step_gain_m - 0.015).abs() < 1e-12);
        assert!((cmd.turn_gain_rad - deg2rad(-4.0)).abs() < 1e-12);
        assert!(!cmd.enable);
    }
}
