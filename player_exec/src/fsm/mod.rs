//! # Behaviour FSM
//!
//! This module implements the [`Fsm`] state machine, which decides what the player should do
//! from one snapshot of the world model per think cycle. The states are:
//!
//! - `Ready` - Stand still and look ahead, then start searching.
//! - `Getup` - Play the recovery action matching the fall direction until the robot is up.
//! - `SearchBall` - Scan with the head, then rotate the body, until the ball is seen ahead.
//! - `GotoBall` - Walk to the ball while keeping the heading between the opponent posts.
//! - `KickBall` - Line the ball up with the kicking foot and kick.
//! - `Dribble` - Push the ball towards a target.
//! - `SelfLocalize` - Stand still and scan for the goal posts.
//!
//! A detected fall sends every state except `Getup` to `Getup` before the state itself is
//! stepped.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod dribble;
mod getup;
mod goto_ball;
mod kick_ball;
mod params;
mod ready;
mod search_ball;
mod self_loc;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use nalgebra::Vector2;
use serde::Serialize;
use std::fmt::Display;

pub use self::params::{Params, StrikeMode};

use crate::{
    task::Task,
    world_model::{FallDirection, SelfPose, WorldSnapshot},
};
use util::{
    maths::{azimuth_deg, normalize_deg},
    module::State,
    params::LoadError,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub mod states {
    pub use super::dribble::Dribble;
    pub use super::getup::Getup;
    pub use super::goto_ball::GotoBall;
    pub use super::kick_ball::KickBall;
    pub use super::ready::Ready;
    pub use super::search_ball::SearchBall;
    pub use super::self_loc::SelfLocalize;
}

use states::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Behaviour state machine.
pub struct Fsm {
    params: Params,
    state: FsmState,
    report: StatusReport,
}

/// Status report for FSM processing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub state: FsmStateId,
    pub num_transitions: u64,
}

/// Bearings of the opponent posts from the robot, widened by the given margins.
#[derive(Debug, Clone, Copy)]
pub struct PostBracket {
    /// Units: degrees
    pub left_deg: f64,

    /// Units: degrees
    pub right_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FsmError {
    #[error("Failed to load FSM parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid FSM parameters: {0}")]
    InvalidParams(String),

    #[error("The self pose in the world snapshot is not finite: {0:?}")]
    NonFiniteSelfPose(SelfPose),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FsmStateId {
    Ready,
    Getup,
    SearchBall,
    GotoBall,
    KickBall,
    Dribble,
    SelfLocalize,
}

/// Active state along with its local data.
#[derive(Debug)]
pub enum FsmState {
    Ready(Ready),
    Getup(Getup),
    SearchBall(SearchBall),
    GotoBall(GotoBall),
    KickBall(KickBall),
    Dribble(Dribble),
    SelfLocalize(SelfLocalize),
}

/// Output of a state's step function.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// Stay in the state and perform these tasks.
    Tasks(Vec<Task>),

    /// Move to another state. The tasks are performed before the entry tasks of the new state.
    Trans(FsmStateId, Vec<Task>),
}

/// Which side of a [`PostBracket`] a heading lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketSide {
    /// Turned too far left, past the left post.
    LeftOf,
    Inside,
    RightOf,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Fsm {
    fn default() -> Self {
        Self {
            params: Params::default(),
            state: FsmState::Ready(Ready),
            report: StatusReport {
                state: FsmStateId::Ready,
                num_transitions: 0,
            },
        }
    }
}

impl Fsm {
    /// Create a new FSM in `Ready`.
    pub fn new(params: Params) -> Result<Self, FsmError> {
        params.validate().map_err(FsmError::InvalidParams)?;

        Ok(Self {
            params,
            ..Default::default()
        })
    }

    pub fn state_id(&self) -> FsmStateId {
        self.state.id()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Step the active state once.
    pub fn step(&mut self, world: &WorldSnapshot) -> Result<Vec<Task>, FsmError> {
        let pose = world.self_pose;
        if !(pose.pos_m_global.iter().all(|v| v.is_finite()) && pose.heading_deg.is_finite()) {
            return Err(FsmError::NonFiniteSelfPose(pose));
        }

        // A ball reading that can't be used is treated as not seen
        let mut world = *world;
        if world.ball.visible
            && !(world.ball.pos_m_rel.iter().all(|v| v.is_finite())
                && world.ball.alpha.is_finite()
                && world.ball.beta.is_finite())
        {
            debug!("Non-finite ball observation discarded");
            world.ball.visible = false;
        }

        let id = self.state.id();

        let mut output = if world.fall != FallDirection::None && id != FsmStateId::Getup {
            StepOutput::Trans(FsmStateId::Getup, Vec::new())
        } else {
            self.state.step(&self.params, &world)
        };

        // Never walk over the top of a playing action
        if world.action_busy
            && matches!(
                id,
                FsmStateId::GotoBall | FsmStateId::KickBall | FsmStateId::Dribble
            )
        {
            if let StepOutput::Tasks(tasks) = &mut output {
                tasks.retain(|t| t.as_walk().is_none());
            }
        }

        Ok(match output {
            StepOutput::Tasks(tasks) => tasks,
            StepOutput::Trans(to, mut tasks) => {
                tasks.extend(self.trans(to, &world));
                tasks
            }
        })
    }

    /// Move to `to`, returning the entry tasks of the new state.
    fn trans(&mut self, to: FsmStateId, world: &WorldSnapshot) -> Vec<Task> {
        info!("FSM state change: {} -> {:?}", self.state, to);

        self.state = FsmState::new(to);
        self.report.state = to;
        self.report.num_transitions += 1;

        self.state.on_enter(&self.params, world)
    }
}

impl State for Fsm {
    type InitData = &'static str;
    type InputData = WorldSnapshot;
    type OutputData = Vec<Task>;
    type StatusReport = StatusReport;
    type Error = FsmError;

    /// Load the parameter file and restart in `Ready`.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::Error> {
        let params: Params = util::params::load(init_data).map_err(FsmError::ParamLoadError)?;
        *self = Fsm::new(params)?;

        Ok(())
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::Error> {
        let tasks = self.step(input_data)?;
        Ok((tasks, self.report))
    }
}

impl FsmState {
    /// Fresh instance of the given state.
    fn new(id: FsmStateId) -> Self {
        match id {
            FsmStateId::Ready => FsmState::Ready(Ready),
            FsmStateId::Getup => FsmState::Getup(Getup),
            FsmStateId::SearchBall => FsmState::SearchBall(SearchBall::new()),
            FsmStateId::GotoBall => FsmState::GotoBall(GotoBall),
            FsmStateId::KickBall => FsmState::KickBall(KickBall),
            FsmStateId::Dribble => FsmState::Dribble(Dribble),
            FsmStateId::SelfLocalize => FsmState::SelfLocalize(SelfLocalize),
        }
    }

    pub fn id(&self) -> FsmStateId {
        match self {
            FsmState::Ready(_) => FsmStateId::Ready,
            FsmState::Getup(_) => FsmStateId::Getup,
            FsmState::SearchBall(_) => FsmStateId::SearchBall,
            FsmState::GotoBall(_) => FsmStateId::GotoBall,
            FsmState::KickBall(_) => FsmStateId::KickBall,
            FsmState::Dribble(_) => FsmStateId::Dribble,
            FsmState::SelfLocalize(_) => FsmStateId::SelfLocalize,
        }
    }

    fn step(&mut self, params: &Params, world: &WorldSnapshot) -> StepOutput {
        match self {
            FsmState::Ready(s) => s.step(params, world),
            FsmState::Getup(s) => s.step(params, world),
            FsmState::SearchBall(s) => s.step(params, world),
            FsmState::GotoBall(s) => s.step(params, world),
            FsmState::KickBall(s) => s.step(params, world),
            FsmState::Dribble(s) => s.step(params, world),
            FsmState::SelfLocalize(s) => s.step(params, world),
        }
    }

    fn on_enter(&mut self, params: &Params, world: &WorldSnapshot) -> Vec<Task> {
        match self {
            FsmState::Getup(s) => s.on_enter(params, world),
            FsmState::KickBall(s) => s.on_enter(params, world),
            _ => Vec::new(),
        }
    }
}

impl Display for FsmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FsmState::{:?}", self.id())
    }
}

impl PostBracket {
    /// Bracket seen from `pose`, with the margins added to the left and right post bearings.
    pub fn new(
        params: &Params,
        pose: &SelfPose,
        left_margin_deg: f64,
        right_margin_deg: f64,
    ) -> Self {
        Self {
            left_deg: bearing_to(&pose.pos_m_global, &params.opp_post_left_m) + left_margin_deg,
            right_deg: bearing_to(&pose.pos_m_global, &params.opp_post_right_m)
                + right_margin_deg,
        }
    }

    pub fn side(&self, heading_deg: f64) -> BracketSide {
        if normalize_deg(heading_deg - self.left_deg) > 0.0 {
            BracketSide::LeftOf
        } else if normalize_deg(heading_deg - self.right_deg) < 0.0 {
            BracketSide::RightOf
        } else {
            BracketSide::Inside
        }
    }
}

/// Global bearing from `from` to `to`.
///
/// Units: degrees
pub fn bearing_to(from: &Vector2<f64>, to: &Vector2<f64>) -> f64 {
    azimuth_deg(&(to - from))
}

/// Whether the ball is so close and off centre that the robot should back away first.
fn ball_too_close(params: &Params, world: &WorldSnapshot) -> bool {
    world.ball.beta > params.retreat_beta && world.ball.alpha.abs() > params.retreat_alpha
}
