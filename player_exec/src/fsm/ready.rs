//! # [`Fsm<Ready>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{FsmStateId, Params, StepOutput};
use crate::{task::Task, world_model::WorldSnapshot};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Ready;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Ready {
    /// Stand still looking ahead, and move straight on to searching.
    pub fn step(&mut self, params: &Params, _world: &WorldSnapshot) -> StepOutput {
        StepOutput::Trans(
            FsmStateId::SearchBall,
            vec![Task::stand(), Task::look_at(0.0, params.ready_look_pitch_deg)],
        )
    }
}
