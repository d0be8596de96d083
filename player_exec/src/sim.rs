//! # Kinematic stand-in world
//!
//! Lets `player_exec` run the whole think, gait and actuator chain without a robot. The robot's
//! pose is whatever the gait dead reckons, the ball sits at a fixed global position until kicked,
//! and observations are derived from the two with a simple camera model:
//!
//! - the ball is seen when it lies inside the field of view and range,
//! - `alpha` is the lateral offset normalised by `lateral_ref_m`, positive to the right,
//! - `beta` grows from 0 at `depth_ref_m` in front of the robot to 1 at the robot.
//!
//! Actions start once the gait has stopped, last `action_duration_s` and then clear the busy
//! flag. Any action clears a fall, and an action played with the ball within reach kicks it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::{
    task::{HeadScan, LookTask, MotionIf},
    walk_ctrl::GaitState,
    world_model::{
        ActionStatus, BallInfo, FallDirection, HeadScanStatus, SelfPose, WorldModel,
        WorldSnapshot,
    },
};
use util::maths::{frame_rotation_2d_deg, normalize_deg};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stand-in world parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Units: meters
    pub ball_m_global: Vector2<f64>,

    /// Units: meters
    pub start_pos_m: Vector2<f64>,

    /// Units: degrees
    pub start_heading_deg: f64,

    /// Field of view with the head still.
    ///
    /// Units: degrees
    pub fov_deg: f64,

    /// Field of view while the head scans for the ball.
    ///
    /// Units: degrees
    pub scan_fov_deg: f64,

    /// Units: meters
    pub max_range_m: f64,

    /// Distance in front of the robot at which `beta` is zero.
    ///
    /// Units: meters
    pub depth_ref_m: f64,

    /// Lateral offset at which `alpha` is one.
    ///
    /// Units: meters
    pub lateral_ref_m: f64,

    /// Duration of a full ball head scan.
    ///
    /// Units: seconds
    pub ball_scan_s: f64,

    /// Units: seconds
    pub post_scan_s: f64,

    /// Units: seconds
    pub action_duration_s: f64,

    /// Largest ball distance from which an action moves the ball.
    ///
    /// Units: meters
    pub kick_reach_m: f64,

    /// How far a kick sends the ball along the robot's heading.
    ///
    /// Units: meters
    pub kick_distance_m: f64,

    /// Make the robot fall forward this long after the start.
    ///
    /// Units: seconds
    pub fall_at_s: Option<f64>,
}

/// World model backed by the kinematic simulation.
pub struct SimWorld {
    params: SimParams,
    start: Instant,
    state: Mutex<SimState>,
    action_status: ActionStatus,
}

/// Head and action executor acting on a [`SimWorld`].
pub struct SimMotion {
    world: Arc<SimWorld>,
}

struct SimState {
    pose: SelfPose,
    ball_m_global: Vector2<f64>,
    fall: FallDirection,
    fall_triggered: bool,
    look: LookTask,
    look_since_s: f64,
    action: Option<SimAction>,
    num_kicks: u64,
}

struct SimAction {
    name: String,
    started_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            ball_m_global: Vector2::new(1.5, 0.3),
            start_pos_m: Vector2::zeros(),
            start_heading_deg: 0.0,
            fov_deg: 70.0,
            scan_fov_deg: 180.0,
            max_range_m: 5.0,
            depth_ref_m: 0.5,
            lateral_ref_m: 0.2,
            ball_scan_s: 3.0,
            post_scan_s: 3.0,
            action_duration_s: 1.0,
            kick_reach_m: 0.5,
            kick_distance_m: 1.0,
            fall_at_s: None,
        }
    }
}

impl SimWorld {
    pub fn new(params: SimParams) -> Self {
        let state = SimState {
            pose: SelfPose {
                pos_m_global: params.start_pos_m,
                heading_deg: params.start_heading_deg,
            },
            ball_m_global: params.ball_m_global,
            fall: FallDirection::None,
            fall_triggered: false,
            look: LookTask::At {
                yaw_deg: 0.0,
                pitch_deg: 0.0,
            },
            look_since_s: 0.0,
            action: None,
            num_kicks: 0,
        };

        Self {
            params,
            start: Instant::now(),
            state: Mutex::new(state),
            action_status: ActionStatus::new(),
        }
    }

    /// Seconds since the world was created.
    pub fn now_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Number of actions which moved the ball.
    pub fn num_kicks(&self) -> u64 {
        self.lock().num_kicks
    }

    pub fn ball_m_global(&self) -> Vector2<f64> {
        self.lock().ball_m_global
    }

    /// Advance the scripted events and any playing action.
    pub fn update(&self, gait_state: GaitState) {
        let now_s = self.now_s();
        let mut state = self.lock();

        if let Some(t) = self.params.fall_at_s {
            if !state.fall_triggered && now_s >= t {
                warn!("Sim: robot fell forward");
                state.fall_triggered = true;
                state.fall = FallDirection::Forward;
            }
        }

        let mut finished = None;
        if let Some(action) = state.action.as_mut() {
            // The legs are only free once the gait has stopped
            if action.started_s.is_none() && gait_state == GaitState::Stopped {
                debug!("Sim: action {} started", action.name);
                action.started_s = Some(now_s);
            }

            if let Some(s) = action.started_s {
                if now_s - s >= self.params.action_duration_s {
                    finished = Some(action.name.clone());
                }
            }
        }

        if let Some(name) = finished {
            state.action = None;

            if state.fall != FallDirection::None {
                info!("Sim: recovered from fall with {}", name);
                state.fall = FallDirection::None;
            } else {
                let ball = observe_ball(&self.params, &state, &state.look);
                if ball.visible && ball.distance_m() <= self.params.kick_reach_m {
                    let kick = frame_rotation_2d_deg(-state.pose.heading_deg)
                        * Vector2::new(self.params.kick_distance_m, 0.0);
                    state.ball_m_global += kick;
                    state.num_kicks += 1;
                    info!(
                        "Sim: {} moved the ball to ({:.2}, {:.2})",
                        name, state.ball_m_global.x, state.ball_m_global.y
                    );
                }
            }

            drop(state);
            self.action_status.end();
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // Plain data, a poisoned lock still holds a valid world
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WorldModel for SimWorld {
    fn snapshot(&self) -> WorldSnapshot {
        let now_s = self.now_s();
        let state = self.lock();
        let scan_done = |scan: HeadScan, duration_s: f64| {
            state.look == LookTask::Scan(scan) && now_s - state.look_since_s >= duration_s
        };

        WorldSnapshot {
            ball: observe_ball(&self.params, &state, &state.look),
            self_pose: state.pose,
            fall: state.fall,
            localization_due: false,
            action_busy: self.action_status.is_busy(),
            head_scan: HeadScanStatus {
                ball_search_done: scan_done(HeadScan::Ball, self.params.ball_scan_s),
                post_search_done: scan_done(HeadScan::Post, self.params.post_scan_s),
            },
        }
    }

    fn self_pose(&self) -> SelfPose {
        self.lock().pose
    }

    fn set_self_position(&self, pos_m_global: Vector2<f64>) {
        self.lock().pose.pos_m_global = pos_m_global;
    }

    fn apply_odometry_turn(&self, turn_deg: f64) {
        let mut state = self.lock();
        state.pose.heading_deg = normalize_deg(state.pose.heading_deg + turn_deg);
    }

    fn action_status(&self) -> &ActionStatus {
        &self.action_status
    }
}

impl SimMotion {
    pub fn new(world: Arc<SimWorld>) -> Self {
        Self { world }
    }
}

impl MotionIf for SimMotion {
    fn look(&self, task: &LookTask) {
        let now_s = self.world.now_s();
        let mut state = self.world.lock();

        if state.look != *task {
            state.look = *task;
            state.look_since_s = now_s;
        }
    }

    fn start_action(&self, name: &str) {
        info!("Sim: action {} requested", name);
        self.world.lock().action = Some(SimAction {
            name: name.into(),
            started_s: None,
        });
    }
}

/// What the camera sees of the ball from the current pose.
fn observe_ball(params: &SimParams, state: &SimState, look: &LookTask) -> BallInfo {
    let pose = &state.pose;
    let pos_m_rel =
        frame_rotation_2d_deg(pose.heading_deg) * (state.ball_m_global - pose.pos_m_global);

    let half_fov_deg = match look {
        LookTask::Scan(HeadScan::Ball) => params.scan_fov_deg / 2.0,
        _ => params.fov_deg / 2.0,
    };

    let mut ball = BallInfo {
        visible: false,
        pos_m_rel,
        alpha: -pos_m_rel.y / params.lateral_ref_m,
        beta: (params.depth_ref_m - pos_m_rel.x) / params.depth_ref_m,
    };
    ball.visible =
        ball.bearing_deg().abs() <= half_fov_deg && ball.distance_m() <= params.max_range_m;

    ball
}

#[cfg(test)]
mod test {
    use super::*;

    fn world(params: SimParams) -> Arc<SimWorld> {
        Arc::new(SimWorld::new(params))
    }

    #[test]
    fn test_observation() {
        let w = world(SimParams {
            ball_m_global: Vector2::new(0.3, 0.02),
            ..Default::default()
        });

        let ball = w.snapshot().ball;
        assert!(ball.visible);
        assert!((ball.alpha + 0.1).abs() < 1e-9);
        assert!((ball.beta - 0.4).abs() < 1e-9);

        // Facing away
        w.apply_odometry_turn(180.0);
        assert!(!w.snapshot().ball.visible);

        // Turned left by 90 deg, the ball is now on the right
        w.apply_odometry_turn(-90.0);
        let ball = w.snapshot().ball;
        assert!(ball.pos_m_rel.y < 0.0);
        assert!(!ball.visible);

        // A ball scan widens the view
        SimMotion::new(w.clone()).look(&LookTask::Scan(HeadScan::Ball));
        assert!(w.snapshot().ball.visible);
    }

    #[test]
    fn test_head_scan_completion() {
        let w = world(SimParams {
            post_scan_s: 0.0,
            ..Default::default()
        });
        let motion = SimMotion::new(w.clone());

        assert!(!w.snapshot().head_scan.post_search_done);
        motion.look(&LookTask::Scan(HeadScan::Post));
        assert!(w.snapshot().head_scan.post_search_done);
        assert!(!w.snapshot().head_scan.ball_search_done);
    }

    #[test]
    fn test_action_waits_for_gait() {
        let w = world(SimParams {
            ball_m_global: Vector2::new(0.3, 0.0),
            action_duration_s: 0.0,
            ..Default::default()
        });
        let motion = SimMotion::new(w.clone());

        w.action_status().begin();
        motion.start_action("left_little_kick");

        w.update(GaitState::Normal);
        assert!(w.action_status().is_busy());

        w.update(GaitState::Stopped);
        assert!(!w.action_status().is_busy());
        assert_eq!(w.num_kicks(), 1);
        assert!((w.ball_m_global() - Vector2::new(1.3, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_fall_and_recovery() {
        let w = world(SimParams {
            fall_at_s: Some(0.0),
            action_duration_s: 0.0,
            ..Default::default()
        });

        w.update(GaitState::Stopped);
        assert_eq!(w.snapshot().fall, FallDirection::Forward);

        w.action_status().begin();
        SimMotion::new(w.clone()).start_action("front_getup");
        w.update(GaitState::Stopped);
        assert_eq!(w.snapshot().fall, FallDirection::None);
        assert_eq!(w.num_kicks(), 0);

        // Only falls once
        w.update(GaitState::Stopped);
        assert_eq!(w.snapshot().fall, FallDirection::None);
    }
}
