//! Parameters structure for the behaviour FSM

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Behaviour thresholds and gains.
///
/// Walk gains are given as `[x_m, y_m, dir_deg]` triplets, in the units of
/// [`crate::task::WalkTask`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// What GotoBall hands over to once the ball is in range.
    pub strike_mode: StrikeMode,

    // ---- FIELD ----
    /// Global position of the left opponent goal post.
    ///
    /// Units: meters
    pub opp_post_left_m: Vector2<f64>,

    /// Global position of the right opponent goal post.
    ///
    /// Units: meters
    pub opp_post_right_m: Vector2<f64>,

    /// Target the ball is dribbled towards.
    ///
    /// Units: meters
    pub dribble_target_m: Vector2<f64>,

    // ---- READY ----
    /// Head pitch while standing ready.
    ///
    /// Units: degrees
    pub ready_look_pitch_deg: f64,

    // ---- SEARCH BALL ----
    /// Largest ball bearing from which the robot walks straight to the ball.
    ///
    /// Units: degrees
    pub can_goto_dir_deg: f64,

    /// Turn used to rotate the body once the head scan has found nothing.
    ///
    /// Units: degrees
    pub search_turn_deg: f64,

    // ---- GOTO BALL ----
    /// Ball distance under which a kick may be started.
    ///
    /// Units: meters
    pub enter_kick_dis_m: f64,

    /// Ball bearing above which GotoBall turns on the spot instead of walking.
    ///
    /// Units: degrees
    pub goto_turn_threshold_deg: f64,

    pub goto_turn_deg: f64,

    pub goto_forward_m: f64,

    /// Correction walked when the heading is outside the post bracket, for the left post side.
    /// The lateral and turn components are mirrored for the right.
    pub goto_post_correction: [f64; 3],

    /// Ball closer than this along X, and further than `retreat_y_m` along Y, makes GotoBall
    /// back away.
    ///
    /// Units: meters
    pub retreat_x_m: f64,

    /// Units: meters
    pub retreat_y_m: f64,

    pub goto_retreat_m: f64,

    // ---- KICK BALL ----
    /// Ball distance above which KickBall gives up and goes back to GotoBall.
    ///
    /// Units: meters
    pub exit_kick_dis_m: f64,

    /// Lateral image position above which (in magnitude) the ball is too far off centre.
    pub retreat_alpha: f64,

    /// Depth image position above which the ball is too close.
    pub retreat_beta: f64,

    pub kick_retreat_m: f64,

    /// Added to the left post bearing to widen the kick bracket.
    ///
    /// Units: degrees
    pub kick_left_margin_deg: f64,

    /// Added to the right post bearing to widen the kick bracket.
    ///
    /// Units: degrees
    pub kick_right_margin_deg: f64,

    /// Turn correction while outside the kick bracket, for the left post side.
    pub kick_post_correction: [f64; 3],

    /// Window of `alpha` in which the ball is lined up with the kicking foot.
    pub kick_alpha_window: [f64; 2],

    pub kick_sidestep_m: f64,

    /// Window of `beta` in which the ball is at kicking depth.
    pub kick_beta_window: [f64; 2],

    pub kick_creep_forward_m: f64,

    pub kick_creep_back_m: f64,

    /// Head pitch while lining up a kick.
    ///
    /// Units: degrees
    pub kick_look_pitch_deg: f64,

    pub kick_action: String,

    // ---- DRIBBLE ----
    /// `alpha` above which (in magnitude) the robot sidesteps to recentre the ball.
    pub dribble_alpha: f64,

    pub dribble_sidestep_m: f64,

    /// Heading error to the target above which the robot turns instead of pushing.
    ///
    /// Units: degrees
    pub dribble_turn_threshold_deg: f64,

    pub dribble_forward_m: f64,

    pub dribble_retreat_m: f64,

    // ---- GETUP ----
    pub front_getup_action: String,
    pub back_getup_action: String,

    /// Action used after falling to the left.
    pub left_fall_action: String,

    /// Action used after falling to the right.
    pub right_fall_action: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeMode {
    Kick,
    Dribble,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            strike_mode: StrikeMode::Kick,

            opp_post_left_m: Vector2::new(4.5, 1.3),
            opp_post_right_m: Vector2::new(4.5, -1.3),
            dribble_target_m: Vector2::new(4.5, 0.0),

            ready_look_pitch_deg: 40.0,

            can_goto_dir_deg: 30.0,
            search_turn_deg: 10.0,

            enter_kick_dis_m: 0.4,
            goto_turn_threshold_deg: 10.0,
            goto_turn_deg: 8.0,
            goto_forward_m: 0.035,
            goto_post_correction: [-0.008, 0.015, -8.0],
            retreat_x_m: 0.1,
            retreat_y_m: 0.15,
            goto_retreat_m: -0.02,

            exit_kick_dis_m: 0.45,
            retreat_alpha: 0.3,
            retreat_beta: 0.45,
            kick_retreat_m: -0.015,
            kick_left_margin_deg: 5.0,
            kick_right_margin_deg: -10.0,
            kick_post_correction: [-0.008, 0.008, -10.0],
            kick_alpha_window: [-0.15, -0.05],
            kick_sidestep_m: 0.012,
            kick_beta_window: [0.33, 0.45],
            kick_creep_forward_m: 0.012,
            kick_creep_back_m: -0.01,
            kick_look_pitch_deg: 60.0,
            kick_action: "left_little_kick".into(),

            dribble_alpha: 0.1,
            dribble_sidestep_m: 0.01,
            dribble_turn_threshold_deg: 15.0,
            dribble_forward_m: 0.035,
            dribble_retreat_m: -0.02,

            front_getup_action: "front_getup".into(),
            back_getup_action: "back_getup".into(),
            left_fall_action: "right_arm".into(),
            right_fall_action: "left_arm".into(),
        }
    }
}

impl Params {
    /// Check the parameters are consistent, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.exit_kick_dis_m < self.enter_kick_dis_m {
            return Err(format!(
                "exit_kick_dis_m ({}) is smaller than enter_kick_dis_m ({})",
                self.exit_kick_dis_m, self.enter_kick_dis_m
            ));
        }
        if self.kick_alpha_window[0] > self.kick_alpha_window[1] {
            return Err("kick_alpha_window is inverted".into());
        }
        if self.kick_beta_window[0] > self.kick_beta_window[1] {
            return Err("kick_beta_window is inverted".into());
        }
        if self.can_goto_dir_deg <= 0.0 {
            return Err("can_goto_dir_deg must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let params: Params = util::params::from_str(
            r#"
            strike_mode = "dribble"
            enter_kick_dis_m = 0.35
            opp_post_left_m = [3.0, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(params.strike_mode, StrikeMode::Dribble);
        assert_eq!(params.enter_kick_dis_m, 0.35);
        assert_eq!(params.opp_post_left_m, Vector2::new(3.0, 1.0));
        assert_eq!(params.kick_action, "left_little_kick");
        assert!(params.validate().is_ok());

        let bad = Params {
            exit_kick_dis_m: 0.1,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
