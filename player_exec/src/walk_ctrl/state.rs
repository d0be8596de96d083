//! Gait state machine
//!
//! [`WalkEngine`] owns the phase and time accumulators and decides, once per batch, which gait
//! to run next. A batch is one stride (or one ramp sub-cycle) worth of control ticks, so enable
//! and disable requests only take effect on stride boundaries.
//!
//! ```text
//!            enable & !busy            ramp done
//!  Stopped ----------------> Starting ----------> Normal
//!     ^                         |                   |  !enable
//!     |   ramp done, !enable    |                   v
//!     +-------------------------+               Stopping
//!     ^                                             |
//!     +---------------------------------------------+ ramp done
//!     ^
//!     +------------------ TransitionToAction <-- yield (from any state but Stopped)
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::mech::{JointId, MechDems};
use log::{debug, info, trace, warn};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{
    ik::{LegAngles, LegJointAngles},
    traj, GaitParams, Params, WalkCmd, WalkCtrlError,
};
use crate::{mech_client::MechClientError, world_model::SelfPose};
use util::maths::{frame_rotation_2d_deg, mean_heading_deg, rad2deg};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Everything the gait engine needs from the outside world.
///
/// The worker thread implements this over the shared command, the world model and the demands
/// queue.
pub trait GaitIo {
    /// Snapshot of the externally written command.
    fn latest_cmd(&mut self) -> WalkCmd;

    /// Whether a discrete action is playing.
    fn action_busy(&mut self) -> bool;

    /// Push one joint demand frame, blocking while the actuators are behind.
    fn send_frame(&mut self, dems: MechDems) -> Result<(), MechClientError>;

    /// Called in place of `send_frame` when a tick produced no frame.
    fn tick_skipped(&mut self, _dt_s: f64) {}

    fn self_pose(&mut self) -> SelfPose;

    fn set_self_position(&mut self, pos_m_global: Vector2<f64>);

    fn apply_odometry_turn(&mut self, turn_deg: f64);

    /// Called on every state change.
    fn publish_state(&mut self, state: GaitState);

    /// Clear the yield request once the legs are free.
    fn ack_yield(&mut self);

    /// Abandon the current stride as soon as possible.
    fn should_stop(&mut self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gait generation engine.
pub struct WalkEngine {
    params: Params,

    /// Control tick period.
    ///
    /// Units: seconds
    dt_s: f64,

    state: GaitState,

    /// Index of the next sub-cycle within the current ramp.
    ramp_stage: usize,

    /// Position in the cycle, in `[0, 1)`.
    phase: f64,

    /// Gait time, advanced only on successful ticks.
    ///
    /// Units: seconds
    time_s: f64,

    angles: LegJointAngles,

    /// Parameters used for the most recent tick.
    last_gait: GaitParams,

    report: StatusReport,
}

/// Status report for the gait engine.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub state: GaitState,
    pub phase: f64,
    pub time_s: f64,
    pub num_frames: u64,
    pub num_ik_failures: u64,
    pub num_strides: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating state of the gait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GaitState {
    /// Idle, the phase is frozen.
    Stopped,

    /// Walking on the spot through the start ramp.
    Starting,

    /// Walking with the commanded gains.
    Normal,

    /// Ramping down after a disable request.
    Stopping,

    /// Ramping down so a discrete action can take the legs.
    TransitionToAction,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GaitState {
    fn default() -> Self {
        GaitState::Stopped
    }
}

impl WalkEngine {
    /// Create a new stopped engine, ticking every `dt_s` seconds.
    pub fn new(params: Params, dt_s: f64) -> Self {
        let last_gait = params.gait.sanitised();

        Self {
            params,
            dt_s,
            state: GaitState::Stopped,
            ramp_stage: 0,
            phase: 0.0,
            time_s: 0.0,
            angles: LegJointAngles::default(),
            last_gait,
            report: StatusReport::default(),
        }
    }

    pub fn state(&self) -> GaitState {
        self.state
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn last_gait(&self) -> &GaitParams {
        &self.last_gait
    }

    pub fn report(&self) -> StatusReport {
        StatusReport {
            state: self.state,
            phase: self.phase,
            time_s: self.time_s,
            ..self.report
        }
    }

    /// Evaluate the transitions and run one batch of the resulting state.
    ///
    /// Returns the state after the batch. In `Stopped` no ticks are run and the call returns
    /// immediately.
    pub fn step(&mut self, io: &mut dyn GaitIo) -> Result<GaitState, WalkCtrlError> {
        let cmd = io.latest_cmd();

        match self.state {
            GaitState::Stopped => {
                if cmd.yield_to_action {
                    // Nothing to ramp down
                    io.ack_yield();
                    return Ok(self.state);
                }
                if !cmd.enable || io.action_busy() {
                    return Ok(self.state);
                }
                self.set_state(io, GaitState::Starting);
            }
            GaitState::Normal => {
                if cmd.yield_to_action {
                    self.set_state(io, GaitState::TransitionToAction);
                } else if !cmd.enable {
                    self.set_state(io, GaitState::Stopping);
                }
            }
            GaitState::Stopping => {
                if cmd.yield_to_action {
                    // Same ramp, carry on from the current stage
                    let stage = self.ramp_stage;
                    self.set_state(io, GaitState::TransitionToAction);
                    self.ramp_stage = stage;
                }
            }
            // A yield during the start ramp is honoured once the ramp completes
            GaitState::Starting | GaitState::TransitionToAction => (),
        }

        match self.state {
            GaitState::Starting => self.step_starting(io),
            GaitState::Normal => self.step_normal(io, &cmd),
            GaitState::Stopping | GaitState::TransitionToAction => self.step_stopping(io),
            GaitState::Stopped => Ok(self.state),
        }
    }

    /// Run the next sub-cycle of the start ramp.
    fn step_starting(&mut self, io: &mut dyn GaitIo) -> Result<GaitState, WalkCtrlError> {
        if let Some(stage) = self.params.start_ramp.get(self.ramp_stage).copied() {
            let mut gait = self.on_spot_gait();
            if let Some(y) = stage.foot_y_offset_m {
                gait.foot_y_offset_m = y;
            }
            gait.rise_gain_m = stage.rise_gain_m;

            debug!(
                "Start ramp stage {}: foot_y_offset {:.4} m, rise {:.4} m",
                self.ramp_stage, gait.foot_y_offset_m, gait.rise_gain_m
            );

            if !self.run_stride(io, &gait, stage.strides, None)? {
                return Ok(self.state);
            }
            self.ramp_stage += 1;
        }

        if self.ramp_stage >= self.params.start_ramp.len() {
            // Requests made during the ramp are only looked at now
            let cmd = io.latest_cmd();
            let next = if cmd.yield_to_action {
                GaitState::TransitionToAction
            } else if !cmd.enable {
                GaitState::Stopped
            } else {
                GaitState::Normal
            };
            self.set_state(io, next);
        }

        Ok(self.state)
    }

    /// Walk one stride with the commanded gains, then update the dead reckoned position.
    fn step_normal(
        &mut self,
        io: &mut dyn GaitIo,
        cmd: &WalkCmd,
    ) -> Result<GaitState, WalkCtrlError> {
        let mut gait = self.params.gait;
        gait.step_gain_m = cmd.step_gain_m;
        gait.lateral_gain_m = cmd.lateral_gain_m;
        gait.turn_gain_rad = cmd.turn_gain_rad;
        gait.enabled_gain = 1.0;

        let start_heading_deg = io.self_pose().heading_deg;

        if !self.run_stride(io, &gait, 1.0, None)? {
            return Ok(self.state);
        }

        let turn_deg = (rad2deg(gait.turn_gain_rad) + self.params.dir_offset_deg)
            * self.params.nav_turn_coef;
        io.apply_odometry_turn(turn_deg);

        let pose = io.self_pose();
        let pos = dead_reckon(
            &self.params,
            &gait,
            pose.pos_m_global,
            start_heading_deg,
            pose.heading_deg,
            1.0,
        );
        io.set_self_position(pos);

        trace!(
            "Dead reckoned position ({:.3}, {:.3}) m, heading {:.1} deg",
            pos.x,
            pos.y,
            pose.heading_deg
        );

        Ok(self.state)
    }

    /// Run the next sub-cycle of the stop ramp.
    fn step_stopping(&mut self, io: &mut dyn GaitIo) -> Result<GaitState, WalkCtrlError> {
        let settle_strides = self.params.stop_settle_strides as usize;

        let mut gait = self.on_spot_gait();
        gait.foot_y_offset_m = self.params.stop_foot_y_offset_m;

        let enable_ramp = if self.ramp_stage < settle_strides {
            None
        } else {
            Some((1.0, 0.0))
        };

        if !self.run_stride(io, &gait, 1.0, enable_ramp)? {
            return Ok(self.state);
        }
        self.ramp_stage += 1;

        if self.ramp_stage > settle_strides {
            if self.state == GaitState::TransitionToAction {
                io.ack_yield();
            }
            self.set_state(io, GaitState::Stopped);
        }

        Ok(self.state)
    }

    /// Run `strides` cycles worth of ticks with the given gait.
    ///
    /// `enable_ramp` linearly moves the enabled gain between the two values across the batch.
    /// Returns `false` if the batch was abandoned.
    fn run_stride(
        &mut self,
        io: &mut dyn GaitIo,
        gait: &GaitParams,
        strides: f64,
        enable_ramp: Option<(f64, f64)>,
    ) -> Result<bool, WalkCtrlError> {
        let num_ticks = ((strides * gait.period_s()) / self.dt_s).round().max(1.0) as u64;

        for i in 0..num_ticks {
            if io.should_stop() {
                return Ok(false);
            }

            let mut tick_gait = *gait;
            if let Some((from, to)) = enable_ramp {
                let frac = (i + 1) as f64 / num_ticks as f64;
                tick_gait.enabled_gain = from + (to - from) * frac;
            }
            let tick_gait = tick_gait.sanitised();

            match traj::walk(&tick_gait, self.dt_s, &mut self.phase, &mut self.angles) {
                Ok(()) => {
                    self.time_s += self.dt_s;
                    self.last_gait = tick_gait;
                    io.send_frame(self.frame())?;
                    self.report.num_frames += 1;
                }
                Err(e) => {
                    self.report.num_ik_failures += 1;
                    warn!("{:.3} s: frame skipped, {}", self.time_s, e);
                    io.tick_skipped(self.dt_s);
                }
            }
        }

        self.report.num_strides += 1;

        Ok(true)
    }

    /// Baseline gait walking on the spot.
    fn on_spot_gait(&self) -> GaitParams {
        GaitParams {
            step_gain_m: 0.0,
            lateral_gain_m: 0.0,
            turn_gain_rad: 0.0,
            enabled_gain: 1.0,
            ..self.params.gait
        }
    }

    /// Build the joint demand frame for the current angles.
    fn frame(&self) -> MechDems {
        let mut dems = MechDems::default();

        insert_leg(&mut dems, &self.angles.left, &LEFT_LEG);
        insert_leg(&mut dems, &self.angles.right, &RIGHT_LEG);

        for (id, deg) in self.params.arm_posture_deg.iter() {
            dems.pos_deg.insert(*id, *deg);
        }

        dems
    }

    fn set_state(&mut self, io: &mut dyn GaitIo, state: GaitState) {
        if state != self.state {
            info!("WalkCtrl state change: {:?} -> {:?}", self.state, state);
        }

        self.state = state;
        self.ramp_stage = 0;
        self.report.state = state;
        io.publish_state(state);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Integrate the displacement of `strides` cycles of `gait` onto `pos_m_global`.
///
/// The calibration offsets are removed from the gains first, the result is scaled by the
/// navigation coefficients and moved into the global frame using the mean heading over the
/// stride.
pub fn dead_reckon(
    params: &Params,
    gait: &GaitParams,
    pos_m_global: Vector2<f64>,
    start_heading_deg: f64,
    end_heading_deg: f64,
    strides: f64,
) -> Vector2<f64> {
    let avg_heading_deg = mean_heading_deg(start_heading_deg, end_heading_deg);

    let disp_m_body = Vector2::new(
        (gait.step_gain_m - params.x_offset_m) * strides * params.nav_coef[0],
        (gait.lateral_gain_m - params.y_offset_m) * strides * params.nav_coef[1],
    );

    pos_m_global + frame_rotation_2d_deg(-avg_heading_deg) * disp_m_body
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

const LEFT_LEG: [JointId; 6] = [
    JointId::LeftHipYaw,
    JointId::LeftHipRoll,
    JointId::LeftHipPitch,
    JointId::LeftKnee,
    JointId::LeftAnklePitch,
    JointId::LeftAnkleRoll,
];

const RIGHT_LEG: [JointId; 6] = [
    JointId::RightHipYaw,
    JointId::RightHipRoll,
    JointId::RightHipPitch,
    JointId::RightKnee,
    JointId::RightAnklePitch,
    JointId::RightAnkleRoll,
];

fn insert_leg(dems: &mut MechDems, leg: &LegAngles, ids: &[JointId; 6]) {
    let values = [
        leg.hip_yaw_rad,
        leg.hip_roll_rad,
        leg.hip_pitch_rad,
        leg.knee_rad,
        leg.ankle_pitch_rad,
        leg.ankle_roll_rad,
    ];

    for (id, rad) in ids.iter().zip(values.iter()) {
        dems.pos_deg.insert(*id, rad2deg(*rad));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Records everything the engine does.
    #[derive(Default)]
    struct MockIo {
        cmd: WalkCmd,
        busy: bool,
        frames: Vec<MechDems>,
        pose: SelfPose,
        states: Vec<GaitState>,
        num_acks: u32,
    }

    impl GaitIo for MockIo {
        fn latest_cmd(&mut self) -> WalkCmd {
            self.cmd
        }
        fn action_busy(&mut self) -> bool {
            self.busy
        }
        fn send_frame(&mut self, dems: MechDems) -> Result<(), MechClientError> {
            self.frames.push(dems);
            Ok(())
        }
        fn self_pose(&mut self) -> SelfPose {
            self.pose
        }
        fn set_self_position(&mut self, pos_m_global: Vector2<f64>) {
            self.pose.pos_m_global = pos_m_global;
        }
        fn apply_odometry_turn(&mut self, turn_deg: f64) {
            self.pose.heading_deg += turn_deg;
        }
        fn publish_state(&mut self, state: GaitState) {
            self.states.push(state);
        }
        fn ack_yield(&mut self) {
            self.cmd.yield_to_action = false;
            self.num_acks += 1;
        }
    }

    fn engine() -> WalkEngine {
        WalkEngine::new(Params::default(), 0.01)
    }

    fn enabled_cmd(step_gain_m: f64) -> WalkCmd {
        WalkCmd {
            step_gain_m,
            enable: true,
            ..Default::default()
        }
    }

    /// Step until the engine is in `target`, returning the number of steps.
    fn step_until(engine: &mut WalkEngine, io: &mut MockIo, target: GaitState) -> usize {
        for i in 1..=20 {
            if engine.step(io).unwrap() == target {
                return i;
            }
        }
        panic!("{:?} never reached, stuck in {:?}", target, engine.state());
    }

    #[test]
    fn test_stopped_is_idle() {
        let mut engine = engine();
        let mut io = MockIo::default();

        for _ in 0..5 {
            assert_eq!(engine.step(&mut io).unwrap(), GaitState::Stopped);
        }
        assert!(io.frames.is_empty());
        assert_eq!(engine.phase(), 0.0);

        // Action in progress blocks the start
        io.cmd = enabled_cmd(0.02);
        io.busy = true;
        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Stopped);
        assert!(io.frames.is_empty());
    }

    #[test]
    fn test_start_goes_through_starting() {
        let mut engine = engine();
        let mut io = MockIo {
            cmd: enabled_cmd(0.02),
            ..Default::default()
        };

        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Starting);
        assert_eq!(io.states, vec![GaitState::Starting]);
        assert!(!io.frames.is_empty());

        let steps = step_until(&mut engine, &mut io, GaitState::Normal);
        assert_eq!(steps, 2);
        assert_eq!(io.states, vec![GaitState::Starting, GaitState::Normal]);

        // Starting walks on the spot
        assert_eq!(engine.last_gait().step_gain_m, 0.0);
        assert_eq!(engine.last_gait().rise_gain_m, 0.04);

        // Every frame carries all legs and the arm posture
        for f in io.frames.iter() {
            assert!(f.has_all_legs());
            assert_eq!(f.pos_deg[&JointId::LeftElbow], -170.0);
        }

        engine.step(&mut io).unwrap();
        assert_eq!(engine.last_gait().step_gain_m, 0.02);
        assert_eq!(engine.state(), GaitState::Normal);
    }

    #[test]
    fn test_disable_stops_through_stopping() {
        let mut engine = engine();
        let mut io = MockIo {
            cmd: enabled_cmd(0.02),
            ..Default::default()
        };
        step_until(&mut engine, &mut io, GaitState::Normal);
        engine.step(&mut io).unwrap();

        io.cmd.enable = false;
        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Stopping);
        assert_eq!(engine.last_gait().step_gain_m, 0.0);
        assert_eq!(engine.last_gait().turn_gain_rad, 0.0);

        let steps = step_until(&mut engine, &mut io, GaitState::Stopped);
        assert_eq!(steps, Params::default().stop_settle_strides as usize);
        assert_eq!(engine.last_gait().enabled_gain, 0.0);

        // Phase frozen once stopped
        let phase = engine.phase();
        let num_frames = io.frames.len();
        engine.step(&mut io).unwrap();
        assert_eq!(engine.phase(), phase);
        assert_eq!(io.frames.len(), num_frames);
    }

    #[test]
    fn test_pending_stop_during_start() {
        let mut engine = engine();
        let mut io = MockIo {
            cmd: enabled_cmd(0.0),
            ..Default::default()
        };

        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Starting);
        io.cmd.enable = false;

        step_until(&mut engine, &mut io, GaitState::Stopped);
        assert_eq!(io.states, vec![GaitState::Starting, GaitState::Stopped]);
    }

    #[test]
    fn test_yield_to_action() {
        let mut engine = engine();
        let mut io = MockIo {
            cmd: enabled_cmd(0.02),
            ..Default::default()
        };
        step_until(&mut engine, &mut io, GaitState::Normal);

        io.cmd.yield_to_action = true;
        assert_eq!(
            engine.step(&mut io).unwrap(),
            GaitState::TransitionToAction
        );
        step_until(&mut engine, &mut io, GaitState::Stopped);
        assert_eq!(io.num_acks, 1);
        assert!(!io.cmd.yield_to_action);

        // A yield while stopped is acknowledged straight away
        io.cmd = WalkCmd {
            yield_to_action: true,
            ..Default::default()
        };
        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Stopped);
        assert_eq!(io.num_acks, 2);
    }

    #[test]
    fn test_yield_during_start_ramp() {
        let mut engine = engine();
        let mut io = MockIo {
            cmd: enabled_cmd(0.02),
            ..Default::default()
        };

        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Starting);
        io.cmd.yield_to_action = true;

        // The ramp runs to completion first
        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Starting);
        assert_eq!(io.num_acks, 0);
        assert_eq!(
            engine.step(&mut io).unwrap(),
            GaitState::TransitionToAction
        );

        // Then the whole stop ramp
        let steps = step_until(&mut engine, &mut io, GaitState::Stopped);
        assert_eq!(steps, Params::default().stop_settle_strides as usize + 1);
        assert_eq!(
            io.states,
            vec![
                GaitState::Starting,
                GaitState::TransitionToAction,
                GaitState::Stopped
            ]
        );
        assert_eq!(io.num_acks, 1);
        assert!(!io.cmd.yield_to_action);
        assert_eq!(engine.report().num_strides, 6);
        assert_eq!(engine.last_gait().enabled_gain, 0.0);
    }

    #[test]
    fn test_yield_during_stop_ramp() {
        let mut engine = engine();
        let mut io = MockIo {
            cmd: enabled_cmd(0.02),
            ..Default::default()
        };
        step_until(&mut engine, &mut io, GaitState::Normal);

        io.cmd.enable = false;
        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Stopping);

        // Switches over without restarting the ramp
        io.cmd.yield_to_action = true;
        assert_eq!(
            engine.step(&mut io).unwrap(),
            GaitState::TransitionToAction
        );
        assert_eq!(engine.last_gait().enabled_gain, 1.0);
        assert_eq!(io.num_acks, 0);

        assert_eq!(engine.step(&mut io).unwrap(), GaitState::Stopped);
        assert_eq!(
            io.states,
            vec![
                GaitState::Starting,
                GaitState::Normal,
                GaitState::Stopping,
                GaitState::TransitionToAction,
                GaitState::Stopped
            ]
        );
        assert_eq!(io.num_acks, 1);
        assert_eq!(engine.report().num_strides, 6);
        assert_eq!(engine.last_gait().enabled_gain, 0.0);
    }

    #[test]
    fn test_ik_failure_skips_frames() {
        let mut params = Params::default();
        params.gait.trunk_z_offset_m = -0.3;
        let mut engine = WalkEngine::new(params, 0.01);
        let mut io = MockIo {
            cmd: enabled_cmd(0.0),
            ..Default::default()
        };

        engine.step(&mut io).unwrap();
        assert!(io.frames.is_empty());
        assert_eq!(engine.phase(), 0.0);
        assert!(engine.report().num_ik_failures > 0);
    }

    #[test]
    fn test_dead_reckoning() {
        let params = Params {
            x_offset_m: 0.005,
            nav_coef: [0.8, 1.0],
            ..Default::default()
        };
        let gait = GaitParams {
            step_gain_m: 0.025,
            ..Default::default()
        };

        // Forward only, heading 90 deg moves along global +Y
        let pos = dead_reckon(&params, &gait, Vector2::new(1.0, 2.0), 90.0, 90.0, 1.0);
        assert!((pos - Vector2::new(1.0, 2.016)).norm() < 1e-12);

        // Mean heading across the wrap
        let pos = dead_reckon(&params, &gait, Vector2::zeros(), 170.0, -170.0, 1.0);
        assert!((pos - Vector2::new(-0.016, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_normal_stride_updates_position() {
        let mut engine = engine();
        let mut io = MockIo {
            cmd: enabled_cmd(0.03),
            ..Default::default()
        };
        step_until(&mut engine, &mut io, GaitState::Normal);
        assert_eq!(io.pose.pos_m_global, Vector2::zeros());

        engine.step(&mut io).unwrap();
        assert!((io.pose.pos_m_global - Vector2::new(0.03, 0.0)).norm() < 1e-12);
        assert_eq!(engine.report().num_strides, 4);
    }
}
