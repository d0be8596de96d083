//! Parameters for the player executable

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

use crate::{sim::SimParams, skill::SkillParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Top level parameters of `player_exec`, loaded from `player_exec.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerExecParams {
    /// Period of the think loop.
    ///
    /// Units: milliseconds
    pub think_period_ms: u64,

    /// Control period of the actuators, and so the gait tick.
    ///
    /// Units: milliseconds
    pub motor_period_ms: u64,

    /// Number of demand frames that may wait for the actuators.
    pub dems_queue_capacity: usize,

    /// Stop after this long, zero runs until killed.
    ///
    /// Units: seconds
    pub run_time_s: f64,

    pub play_mode: PlayMode,

    pub loc_timer: LocTimerParams,

    pub entrance: EntranceParams,

    /// Head pitch used in the penalty mode.
    ///
    /// Units: degrees
    pub penalty_look_pitch_deg: f64,

    pub skill: SkillParams,

    pub sim: SimParams,
}

/// Periodic relocalisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocTimerParams {
    /// Units: seconds
    pub period_s: f64,

    /// Relocalisation only happens once the robot is further up the field than this.
    ///
    /// Units: meters
    pub min_x_m: f64,
}

/// Where the entrance mode walks to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntranceParams {
    /// Units: meters
    pub target_m: Vector2<f64>,

    /// Heading to face once there.
    ///
    /// Units: degrees
    pub dir_deg: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the think loop does each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Step the behaviour FSM.
    Normal,

    /// Run the penalty kick skill.
    Penalty,

    /// Walk on to the field.
    Entrance,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PlayerExecParams {
    fn default() -> Self {
        Self {
            think_period_ms: 50,
            motor_period_ms: 10,
            dems_queue_capacity: 1,
            run_time_s: 0.0,
            play_mode: PlayMode::Normal,
            loc_timer: LocTimerParams::default(),
            entrance: EntranceParams::default(),
            penalty_look_pitch_deg: 60.0,
            skill: SkillParams::default(),
            sim: SimParams::default(),
        }
    }
}

impl Default for LocTimerParams {
    fn default() -> Self {
        Self {
            period_s: 90.0,
            min_x_m: 1.5,
        }
    }
}

impl Default for EntranceParams {
    fn default() -> Self {
        Self {
            target_m: Vector2::new(-0.5, 0.0),
            dir_deg: 0.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load() {
        let params: PlayerExecParams = util::params::from_str(
            r#"
            think_period_ms = 20
            play_mode = "penalty"

            [loc_timer]
            period_s = 30.0

            [sim]
            ball_m_global = [1.0, 0.5]
            "#,
        )
        .unwrap();

        assert_eq!(params.think_period_ms, 20);
        assert_eq!(params.motor_period_ms, 10);
        assert_eq!(params.play_mode, PlayMode::Penalty);
        assert_eq!(params.loc_timer.period_s, 30.0);
        assert_eq!(params.loc_timer.min_x_m, 1.5);
        assert_eq!(params.sim.ball_m_global, Vector2::new(1.0, 0.5));
    }
}
