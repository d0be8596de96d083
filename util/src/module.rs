//! Cyclic module interface
//!
//! Modules stepped by the think loop (the behaviour FSM for one) are set up once from a
//! parameter file and then fed one input per cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A module's internal state.
pub trait State {
    /// Passed to [`State::init`], usually the parameter file path relative to the params
    /// directory.
    type InitData;

    /// One cycle's input.
    type InputData;

    /// One cycle's output.
    type OutputData;

    /// Summary of the module after a cycle.
    type StatusReport;

    /// Shared by initialisation and processing.
    type Error;

    /// Set the module up, replacing any previous state.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::Error>;

    /// Process one cycle.
    ///
    /// On error the module keeps its previous state, so the caller may carry on with the next
    /// cycle.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::Error>;
}
