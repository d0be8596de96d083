//! # [`Fsm<SearchBall>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{FsmStateId, Params, StepOutput};
use crate::{
    task::{HeadScan, Task},
    world_model::WorldSnapshot,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct SearchBall {
    /// Set until the first step after entering the state.
    first_in: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SearchBall {
    pub fn new() -> Self {
        Self { first_in: true }
    }

    pub fn step(&mut self, params: &Params, world: &WorldSnapshot) -> StepOutput {
        if world.localization_due {
            return StepOutput::Trans(FsmStateId::SelfLocalize, Vec::new());
        }

        if world.ball.visible {
            let dir_deg = world.ball.bearing_deg();

            if dir_deg.abs() < params.can_goto_dir_deg {
                return StepOutput::Trans(FsmStateId::GotoBall, Vec::new());
            }

            // Turn on the spot towards the ball
            return StepOutput::Tasks(vec![Task::walk(0.0, 0.0, dir_deg, true)]);
        }

        if self.first_in {
            self.first_in = false;
            return StepOutput::Tasks(vec![Task::scan(HeadScan::Ball), Task::stand()]);
        }

        if world.head_scan.ball_search_done {
            debug!("Head scan found nothing, rotating the body");
            return StepOutput::Tasks(vec![
                Task::scan(HeadScan::Ball),
                Task::walk(0.0, 0.0, params.search_turn_deg, true),
            ]);
        }

        StepOutput::Tasks(Vec::new())
    }
}

impl Default for SearchBall {
    fn default() -> Self {
        Self::new()
    }
}
