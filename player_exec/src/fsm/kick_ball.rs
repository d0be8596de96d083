//! # [`Fsm<KickBall>`] implementation
//!
//! Lines the ball up in three stages, each only looked at once the previous one is satisfied:
//! heading between the (widened) posts, ball lateral image position inside the alpha window, then
//! ball depth inside the beta window.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{ball_too_close, BracketSide, FsmStateId, Params, PostBracket, StepOutput};
use crate::{task::Task, world_model::WorldSnapshot};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct KickBall;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl KickBall {
    /// Look down at the ball.
    pub fn on_enter(&mut self, params: &Params, _world: &WorldSnapshot) -> Vec<Task> {
        vec![Task::look_at(0.0, params.kick_look_pitch_deg)]
    }

    pub fn step(&mut self, params: &Params, world: &WorldSnapshot) -> StepOutput {
        if !world.ball.visible {
            return StepOutput::Trans(FsmStateId::SearchBall, Vec::new());
        }
        if world.ball.distance_m() > params.exit_kick_dis_m {
            return StepOutput::Trans(FsmStateId::GotoBall, Vec::new());
        }

        let ball = &world.ball;

        let task = if ball_too_close(params, world) {
            debug!("Ball too close, backing off");
            Task::walk(params.kick_retreat_m, 0.0, 0.0, true)
        } else {
            let bracket = PostBracket::new(
                params,
                &world.self_pose,
                params.kick_left_margin_deg,
                params.kick_right_margin_deg,
            );
            let [x, y, dir] = params.kick_post_correction;

            match bracket.side(world.self_pose.heading_deg) {
                BracketSide::LeftOf => Task::walk(x, y, dir, true),
                BracketSide::RightOf => Task::walk(x, -y, -dir, true),
                BracketSide::Inside => {
                    let [alpha_min, alpha_max] = params.kick_alpha_window;
                    let [beta_min, beta_max] = params.kick_beta_window;

                    if ball.alpha > alpha_max {
                        Task::walk(0.0, -params.kick_sidestep_m, 0.0, true)
                    } else if ball.alpha < alpha_min {
                        Task::walk(0.0, params.kick_sidestep_m, 0.0, true)
                    } else if ball.beta < beta_min {
                        Task::walk(params.kick_creep_forward_m, 0.0, 0.0, true)
                    } else if ball.beta > beta_max {
                        Task::walk(params.kick_creep_back_m, 0.0, 0.0, true)
                    } else {
                        debug!("Ball lined up, kicking");
                        Task::action(params.kick_action.as_str())
                    }
                }
            }
        };

        StepOutput::Tasks(vec![task])
    }
}
