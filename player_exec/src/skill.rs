//! Stand-alone skills used outside of the behaviour FSM

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

use crate::{
    task::Task,
    world_model::{BallInfo, SelfPose},
};
use util::maths::{azimuth_deg, bound, normalize_deg};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Skill tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillParams {
    // ---- GOTO ----
    /// Forward step used while walking to a target.
    ///
    /// Units: meters
    pub goto_speed_m: f64,

    /// Distance to the target under which the robot only turns.
    ///
    /// Units: meters
    pub goto_stop_distance_m: f64,

    /// Heading error under which the robot stops.
    ///
    /// Units: degrees
    pub goto_stop_direction_deg: f64,

    /// Largest turn request.
    ///
    /// Units: degrees
    pub goto_max_turn_deg: f64,

    // ---- PENALTY KICK ----
    pub penalty_alpha_window: [f64; 2],

    /// Units: meters
    pub penalty_sidestep_m: f64,

    pub penalty_beta_window: [f64; 2],

    /// Units: meters
    pub penalty_creep_m: f64,

    pub penalty_kick_action: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SkillParams {
    fn default() -> Self {
        Self {
            goto_speed_m: 0.035,
            goto_stop_distance_m: 0.2,
            goto_stop_direction_deg: 10.0,
            goto_max_turn_deg: 10.0,

            penalty_alpha_window: [-0.15, -0.05],
            penalty_sidestep_m: 0.01,
            penalty_beta_window: [0.32, 0.4],
            penalty_creep_m: 0.01,
            penalty_kick_action: "left_little_kick".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Walk to `target_m_global` and then turn to face `dir_deg`.
///
/// Returns a disabled walk once both the position and heading are reached.
pub fn skill_goto(
    params: &SkillParams,
    pose: &SelfPose,
    target_m_global: &Vector2<f64>,
    dir_deg: f64,
) -> Task {
    let max_turn = params.goto_max_turn_deg;
    let to_target = target_m_global - pose.pos_m_global;

    if to_target.norm() > params.goto_stop_distance_m {
        let turn = normalize_deg(azimuth_deg(&to_target) - pose.heading_deg);
        return Task::walk(params.goto_speed_m, 0.0, bound(-max_turn, max_turn, turn), true);
    }

    let turn = normalize_deg(dir_deg - pose.heading_deg);
    if turn.abs() > params.goto_stop_direction_deg {
        return Task::walk(0.0, 0.0, bound(-max_turn, max_turn, turn), true);
    }

    Task::stand()
}

/// Line up on the ball from its image position and kick.
pub fn skill_penalty_kick(params: &SkillParams, ball: &BallInfo) -> Task {
    let [alpha_min, alpha_max] = params.penalty_alpha_window;
    let [beta_min, beta_max] = params.penalty_beta_window;

    if ball.alpha > alpha_max {
        Task::walk(0.0, -params.penalty_sidestep_m, 0.0, true)
    } else if ball.alpha < alpha_min {
        Task::walk(0.0, params.penalty_sidestep_m, 0.0, true)
    } else if ball.beta < beta_min {
        Task::walk(params.penalty_creep_m, 0.0, 0.0, true)
    } else if ball.beta > beta_max {
        Task::walk(-params.penalty_creep_m, 0.0, 0.0, true)
    } else {
        Task::action(params.penalty_kick_action.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_goto() {
        let params = SkillParams::default();
        let target = Vector2::new(1.0, 1.0);

        // Far away, target at 45 deg, turn capped
        let pose = SelfPose::default();
        assert_eq!(
            skill_goto(&params, &pose, &target, 0.0),
            Task::walk(0.035, 0.0, 10.0, true)
        );

        // Facing the target, straight on
        let pose = SelfPose {
            heading_deg: 45.0,
            ..Default::default()
        };
        let walk = *skill_goto(&params, &pose, &target, 0.0).as_walk().unwrap();
        assert_eq!(walk.x_m, 0.035);
        assert!(walk.dir_deg.abs() < 1e-9);

        // Arrived, turn to face the attack direction
        let pose = SelfPose {
            pos_m_global: Vector2::new(0.95, 1.05),
            heading_deg: 45.0,
        };
        assert_eq!(
            skill_goto(&params, &pose, &target, 0.0),
            Task::walk(0.0, 0.0, -10.0, true)
        );

        let pose = SelfPose {
            pos_m_global: Vector2::new(0.95, 1.05),
            heading_deg: 5.0,
        };
        assert_eq!(skill_goto(&params, &pose, &target, 0.0), Task::stand());
    }

    #[test]
    fn test_penalty_kick() {
        let params = SkillParams::default();
        let ball = |alpha, beta| BallInfo {
            visible: true,
            alpha,
            beta,
            ..Default::default()
        };

        assert_eq!(
            skill_penalty_kick(&params, &ball(0.0, 0.35)),
            Task::walk(0.0, -0.01, 0.0, true)
        );
        assert_eq!(
            skill_penalty_kick(&params, &ball(-0.3, 0.35)),
            Task::walk(0.0, 0.01, 0.0, true)
        );
        assert_eq!(
            skill_penalty_kick(&params, &ball(-0.1, 0.2)),
            Task::walk(0.01, 0.0, 0.0, true)
        );
        assert_eq!(
            skill_penalty_kick(&params, &ball(-0.1, 0.5)),
            Task::walk(-0.01, 0.0, 0.0, true)
        );
        assert_eq!(
            skill_penalty_kick(&params, &ball(-0.1, 0.35)),
            Task::action("left_little_kick")
        );
    }
}
