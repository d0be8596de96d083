//! # [`Fsm<Dribble>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{ball_too_close, bearing_to, FsmStateId, Params, StepOutput};
use crate::{task::Task, world_model::WorldSnapshot};
use util::maths::normalize_deg;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Dribble;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Dribble {
    /// Keep the ball centred and push it towards the dribble target.
    pub fn step(&mut self, params: &Params, world: &WorldSnapshot) -> StepOutput {
        if !world.ball.visible {
            return StepOutput::Trans(FsmStateId::SearchBall, Vec::new());
        }
        if world.localization_due {
            return StepOutput::Trans(FsmStateId::SelfLocalize, Vec::new());
        }
        if world.ball.distance_m() > params.exit_kick_dis_m {
            return StepOutput::Trans(FsmStateId::GotoBall, Vec::new());
        }

        let alpha = world.ball.alpha;

        let task = if ball_too_close(params, world) {
            Task::walk(params.dribble_retreat_m, 0.0, 0.0, true)
        } else if alpha > params.dribble_alpha {
            Task::walk(0.0, -params.dribble_sidestep_m, 0.0, true)
        } else if alpha < -params.dribble_alpha {
            Task::walk(0.0, params.dribble_sidestep_m, 0.0, true)
        } else {
            let pose = &world.self_pose;
            let target_dir_deg = bearing_to(&pose.pos_m_global, &params.dribble_target_m);
            let err_deg = normalize_deg(pose.heading_deg - target_dir_deg);

            if err_deg.abs() > params.dribble_turn_threshold_deg {
                Task::walk(0.0, 0.0, -err_deg, true)
            } else {
                Task::walk(params.dribble_forward_m, 0.0, 0.0, true)
            }
        };

        StepOutput::Tasks(vec![task])
    }
}
