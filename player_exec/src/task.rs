//! Tasks emitted by the behaviour layer
//!
//! A task asks one of the motion executors to do something: walk with the given gains, point
//! the head, or play a named discrete action. The executors sit behind [`WalkIf`] and
//! [`MotionIf`] so that the think loop can be driven against the real gait or a test double.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::walk_ctrl::WalkCtrlError;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Continuous walking executor.
pub trait WalkIf {
    /// Update the walk request, last write wins.
    fn set_walk(&self, task: &WalkTask) -> Result<(), WalkCtrlError>;

    /// Ask the gait to stop so that a discrete action can take the legs.
    fn request_yield(&self) -> Result<(), WalkCtrlError>;
}

/// Head and discrete action executor.
pub trait MotionIf {
    fn look(&self, task: &LookTask);

    /// Start playing the named action.
    ///
    /// The caller marks the action as busy before calling this, the executor clears it when the
    /// action completes.
    fn start_action(&self, name: &str);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Walk request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WalkTask {
    /// Forward step.
    ///
    /// Units: meters
    pub x_m: f64,

    /// Lateral step, positive left.
    ///
    /// Units: meters
    pub y_m: f64,

    /// Turn per step, positive left.
    ///
    /// Units: degrees
    pub dir_deg: f64,

    pub enable: bool,
}

/// Named discrete action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionTask {
    pub name: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Task {
    Walk(WalkTask),
    Look(LookTask),
    Action(ActionTask),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LookTask {
    /// Point the head at a fixed pan and tilt.
    At { yaw_deg: f64, pitch_deg: f64 },

    /// Run a scanning behaviour.
    Scan(HeadScan),
}

/// Head scanning behaviours, completion is reported through the world model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeadScan {
    Ball,
    Post,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Task {
    pub fn walk(x_m: f64, y_m: f64, dir_deg: f64, enable: bool) -> Self {
        Task::Walk(WalkTask {
            x_m,
            y_m,
            dir_deg,
            enable,
        })
    }

    /// Stand still with the gait stopped.
    pub fn stand() -> Self {
        Task::walk(0.0, 0.0, 0.0, false)
    }

    pub fn look_at(yaw_deg: f64, pitch_deg: f64) -> Self {
        Task::Look(LookTask::At { yaw_deg, pitch_deg })
    }

    pub fn scan(scan: HeadScan) -> Self {
        Task::Look(LookTask::Scan(scan))
    }

    pub fn action<S: Into<String>>(name: S) -> Self {
        Task::Action(ActionTask { name: name.into() })
    }

    /// The walk request carried by this task, if any.
    pub fn as_walk(&self) -> Option<&WalkTask> {
        match self {
            Task::Walk(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&str> {
        match self {
            Task::Action(a) => Some(&a.name),
            _ => None,
        }
    }
}
