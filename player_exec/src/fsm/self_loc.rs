//! # [`Fsm<SelfLocalize>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{FsmStateId, Params, StepOutput};
use crate::{
    task::{HeadScan, Task},
    world_model::WorldSnapshot,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct SelfLocalize;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SelfLocalize {
    /// Stand still and scan for the posts until the scan reports completion.
    pub fn step(&mut self, _params: &Params, world: &WorldSnapshot) -> StepOutput {
        if world.head_scan.post_search_done {
            return StepOutput::Trans(FsmStateId::SearchBall, Vec::new());
        }

        StepOutput::Tasks(vec![Task::stand(), Task::scan(HeadScan::Post)])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_self_loc() {
        let params = Params::default();
        let mut world = WorldSnapshot::default();

        assert_eq!(
            SelfLocalize.step(&params, &world),
            StepOutput::Tasks(vec![Task::stand(), Task::scan(HeadScan::Post)])
        );

        world.head_scan.post_search_done = true;
        assert_eq!(
            SelfLocalize.step(&params, &world),
            StepOutput::Trans(FsmStateId::SearchBall, Vec::new())
        );
    }
}
