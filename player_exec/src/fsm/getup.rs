//! # [`Fsm<Getup>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{FsmStateId, Params, StepOutput};
use crate::{
    task::Task,
    world_model::{FallDirection, WorldSnapshot},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct Getup;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Getup {
    pub fn on_enter(&mut self, params: &Params, world: &WorldSnapshot) -> Vec<Task> {
        recovery_action(params, world.fall).into_iter().collect()
    }

    /// Keep asking for the recovery action until the robot is up again.
    ///
    /// The think loop drops action requests while an action is already playing, so repeating
    /// the request does not restart it.
    pub fn step(&mut self, params: &Params, world: &WorldSnapshot) -> StepOutput {
        match recovery_action(params, world.fall) {
            Some(t) => StepOutput::Tasks(vec![t]),
            None => StepOutput::Trans(FsmStateId::Ready, Vec::new()),
        }
    }
}

/// Recovery action for a fall direction.
fn recovery_action(params: &Params, fall: FallDirection) -> Option<Task> {
    let name = match fall {
        FallDirection::None => return None,
        FallDirection::Forward => &params.front_getup_action,
        FallDirection::Backward => &params.back_getup_action,
        FallDirection::Left => &params.left_fall_action,
        FallDirection::Right => &params.right_fall_action,
    };

    Some(Task::action(name.as_str()))
}
