//! Walk control module
//!
//! Turns a walk request (forward step, lateral step, turn, enable) into a continuous stream of
//! leg joint demands. The gait runs on its own thread at the motor period, see [`WalkCtrl`], and
//! is paced by the bounded demands queue in [`crate::mech_client`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod gait;
mod params;
mod state;
mod worker;

pub mod ik;
pub mod spline;
pub mod traj;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use gait::*;
pub use params::*;
pub use state::*;
pub use worker::*;

use crate::mech_client::MechClientError;
use util::params::LoadError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during WalkCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum WalkCtrlError {
    #[error("Failed to load WalkCtrl parameters: {0}")]
    ParamLoadError(#[from] LoadError),

    #[error("Invalid WalkCtrl parameters: {0}")]
    InvalidParams(String),

    #[error("Could not send demands to the actuators: {0}")]
    MechClientError(#[from] MechClientError),

    #[error("The WalkCtrl shared state lock was poisoned")]
    LockPoisoned,

    #[error("Could not spawn the gait thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The gait thread panicked")]
    ThreadPanic,
}
