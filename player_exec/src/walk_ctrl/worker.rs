//! Gait thread handle
//!
//! The think loop only ever writes the walk command and reads the gait state. Everything else,
//! including the phase, is owned by the gait thread.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info};
use nalgebra::Vector2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use super::{GaitIo, GaitState, Params, StatusReport, WalkCmd, WalkCtrlError, WalkEngine};
use crate::{
    mech_client::{DemsQueue, MechClientError},
    task::{WalkIf, WalkTask},
    world_model::{SelfPose, WorldModel},
};
use comms_if::eqpt::mech::MechDems;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle onto the running gait thread.
pub struct WalkCtrl {
    params: Params,
    shared: Arc<Shared>,
    queue: Arc<DemsQueue>,
    world: Arc<dyn WorldModel>,
    handle: Option<JoinHandle<Result<StatusReport, WalkCtrlError>>>,
}

/// State shared between the handle and the gait thread.
struct Shared {
    cmd: Mutex<WalkCmd>,
    cmd_cv: Condvar,
    state: Mutex<GaitState>,
    state_cv: Condvar,
    stop: AtomicBool,
}

/// Gait thread side of the engine interface.
struct ThreadIo {
    shared: Arc<Shared>,
    queue: Arc<DemsQueue>,
    world: Arc<dyn WorldModel>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WalkCtrl {
    /// Start the gait thread, which ticks every `motor_period_s` and pushes its frames into
    /// `queue`.
    pub fn start(
        params: Params,
        motor_period_s: f64,
        queue: Arc<DemsQueue>,
        world: Arc<dyn WorldModel>,
    ) -> Result<Self, WalkCtrlError> {
        if !(motor_period_s.is_finite() && motor_period_s > 0.0) {
            return Err(WalkCtrlError::InvalidParams(format!(
                "motor period must be positive, got {} s",
                motor_period_s
            )));
        }
        if !(params.gait.freq_hz.is_finite() && params.gait.freq_hz > 0.0) {
            return Err(WalkCtrlError::InvalidParams(format!(
                "gait frequency must be positive, got {} Hz",
                params.gait.freq_hz
            )));
        }

        let shared = Arc::new(Shared {
            cmd: Mutex::new(WalkCmd::default()),
            cmd_cv: Condvar::new(),
            state: Mutex::new(GaitState::Stopped),
            state_cv: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let mut io = ThreadIo {
            shared: shared.clone(),
            queue: queue.clone(),
            world: world.clone(),
        };
        let mut engine = WalkEngine::new(params.clone(), motor_period_s);
        let idle_poll = Duration::from_millis(params.idle_poll_ms.max(1));

        let handle = thread::Builder::new()
            .name("walk_ctrl".into())
            .spawn(move || {
                info!("Gait thread started");

                while !io.shared.stop.load(Ordering::SeqCst) {
                    match engine.step(&mut io) {
                        Ok(GaitState::Stopped) => io.wait_while_stopped(idle_poll),
                        Ok(_) => (),
                        Err(WalkCtrlError::MechClientError(MechClientError::Closed)) => {
                            debug!("Demands queue closed, gait thread stopping");
                            break;
                        }
                        Err(e) => {
                            error!("Gait thread stopped on error: {}", e);
                            return Err(e);
                        }
                    }
                }

                let report = engine.report();
                info!(
                    "Gait thread stopped after {} strides, {} frames ({} skipped)",
                    report.num_strides, report.num_frames, report.num_ik_failures
                );
                Ok(report)
            })
            .map_err(WalkCtrlError::SpawnError)?;

        Ok(Self {
            params,
            shared,
            queue,
            world,
            handle: Some(handle),
        })
    }

    /// Set the walk request.
    ///
    /// Ignored while a discrete action is playing. A pending yield request is preserved.
    pub fn set_walk(
        &self,
        x_m: f64,
        y_m: f64,
        dir_deg: f64,
        enable: bool,
    ) -> Result<(), WalkCtrlError> {
        if self.world.action_status().is_busy() {
            debug!("Walk request ignored, action in progress");
            return Ok(());
        }

        let mut cmd = self.shared.lock_cmd()?;
        let yield_to_action = cmd.yield_to_action;
        *cmd = WalkCmd::from_request(&self.params, x_m, y_m, dir_deg, enable);
        cmd.yield_to_action = yield_to_action;
        self.shared.cmd_cv.notify_all();

        Ok(())
    }

    /// Ask the gait to ramp down and free the legs for an action.
    pub fn request_yield(&self) -> Result<(), WalkCtrlError> {
        self.shared.lock_cmd()?.yield_to_action = true;
        self.shared.cmd_cv.notify_all();
        Ok(())
    }

    /// Current command as seen by the gait thread.
    pub fn cmd(&self) -> Result<WalkCmd, WalkCtrlError> {
        Ok(*self.shared.lock_cmd()?)
    }

    pub fn gait_state(&self) -> Result<GaitState, WalkCtrlError> {
        self.shared
            .state
            .lock()
            .map(|s| *s)
            .map_err(|_| WalkCtrlError::LockPoisoned)
    }

    /// Block until the gait reaches `target` or the timeout elapses.
    ///
    /// Returns `true` if the gait is in `target` on return.
    pub fn wait_for_state(
        &self,
        target: GaitState,
        timeout: Duration,
    ) -> Result<bool, WalkCtrlError> {
        let deadline = Instant::now() + timeout;
        let mut state = self
            .shared
            .state
            .lock()
            .map_err(|_| WalkCtrlError::LockPoisoned)?;

        while *state != target {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            state = self
                .shared
                .state_cv
                .wait_timeout(state, deadline - now)
                .map_err(|_| WalkCtrlError::LockPoisoned)?
                .0;
        }

        Ok(true)
    }

    pub fn wait_stopped(&self, timeout: Duration) -> Result<bool, WalkCtrlError> {
        self.wait_for_state(GaitState::Stopped, timeout)
    }

    /// Stop the gait thread and close the demands queue.
    ///
    /// Any partial stride is abandoned.
    pub fn stop(mut self) -> Result<StatusReport, WalkCtrlError> {
        self.join()
    }

    fn join(&mut self) -> Result<StatusReport, WalkCtrlError> {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.queue.close();

        // Taking the lock orders the notify after any waiter's check of the stop flag
        drop(self.shared.cmd.lock());
        self.shared.cmd_cv.notify_all();
        self.world.action_status().wake();

        match self.handle.take() {
            Some(h) => h.join().map_err(|_| WalkCtrlError::ThreadPanic)?,
            None => Ok(StatusReport::default()),
        }
    }
}

impl Drop for WalkCtrl {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.join().ok();
        }
    }
}

impl WalkIf for WalkCtrl {
    fn set_walk(&self, task: &WalkTask) -> Result<(), WalkCtrlError> {
        WalkCtrl::set_walk(self, task.x_m, task.y_m, task.dir_deg, task.enable)
    }

    fn request_yield(&self) -> Result<(), WalkCtrlError> {
        WalkCtrl::request_yield(self)
    }
}

impl Shared {
    fn lock_cmd(&self) -> Result<MutexGuard<'_, WalkCmd>, WalkCtrlError> {
        self.cmd.lock().map_err(|_| WalkCtrlError::LockPoisoned)
    }

    /// Sleep until the command changes, or the timeout elapses.
    fn wait_cmd(&self, timeout: Duration) {
        if let Ok(cmd) = self.cmd.lock() {
            if !self.stop.load(Ordering::SeqCst) {
                self.cmd_cv.wait_timeout(cmd, timeout).ok();
            }
        }
    }
}

impl ThreadIo {
    /// Sleep in `Stopped` until there is something to do, or the timeout elapses.
    ///
    /// When an action holds the gait down the wait is on the action ending, otherwise on a new
    /// command.
    fn wait_while_stopped(&mut self, timeout: Duration) {
        let enable = self.latest_cmd().enable;
        let status = self.world.action_status();

        if enable && status.is_busy() {
            let shared = &self.shared;
            status.wait_idle_while(timeout, || !shared.stop.load(Ordering::SeqCst));
        } else {
            self.shared.wait_cmd(timeout);
        }
    }
}

impl GaitIo for ThreadIo {
    fn latest_cmd(&mut self) -> WalkCmd {
        // Plain data, a poisoned lock still holds a valid command
        *self.shared.cmd.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn action_busy(&mut self) -> bool {
        self.world.action_status().is_busy()
    }

    fn send_frame(&mut self, dems: MechDems) -> Result<(), MechClientError> {
        self.queue.push(dems)
    }

    fn tick_skipped(&mut self, dt_s: f64) {
        // Keep the tick rate when no frame is pushed
        thread::sleep(Duration::from_secs_f64(dt_s));
    }

    fn self_pose(&mut self) -> SelfPose {
        self.world.self_pose()
    }

    fn set_self_position(&mut self, pos_m_global: Vector2<f64>) {
        self.world.set_self_position(pos_m_global)
    }

    fn apply_odometry_turn(&mut self, turn_deg: f64) {
        self.world.apply_odometry_turn(turn_deg)
    }

    fn publish_state(&mut self, state: GaitState) {
        *self.shared.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
        self.shared.state_cv.notify_all();
    }

    fn ack_yield(&mut self) {
        self.shared
            .cmd
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .yield_to_action = false;
    }

    fn should_stop(&mut self) -> bool {
        self.shared.stop.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mech_client::spawn_drain;
    use crate::world_model::{ActionStatus, WorldSnapshot};

    #[derive(Default)]
    struct TestWorld {
        pose: Mutex<SelfPose>,
        status: ActionStatus,
    }

    impl WorldModel for TestWorld {
        fn snapshot(&self) -> WorldSnapshot {
            WorldSnapshot {
                self_pose: self.self_pose(),
                action_busy: self.status.is_busy(),
                ..Default::default()
            }
        }
        fn self_pose(&self) -> SelfPose {
            *self.pose.lock().unwrap()
        }
        fn set_self_position(&self, pos_m_global: Vector2<f64>) {
            self.pose.lock().unwrap().pos_m_global = pos_m_global;
        }
        fn action_status(&self) -> &ActionStatus {
            &self.status
        }
    }

    fn start() -> (WalkCtrl, Arc<TestWorld>, JoinHandle<u64>) {
        start_with(Params::default())
    }

    fn start_with(params: Params) -> (WalkCtrl, Arc<TestWorld>, JoinHandle<u64>) {
        let queue = Arc::new(DemsQueue::new(4));
        let world = Arc::new(TestWorld::default());
        let drain = spawn_drain(queue.clone(), Duration::from_micros(200), |_| ()).unwrap();
        let walk = WalkCtrl::start(params, 0.01, queue, world.clone()).unwrap();
        (walk, world, drain)
    }

    /// Walk, then yield to an action, leaving the gait stopped with enable still set.
    fn hold_for_action(walk: &WalkCtrl, world: &TestWorld) {
        walk.set_walk(0.0, 0.0, 0.0, true).unwrap();
        assert!(walk
            .wait_for_state(GaitState::Normal, Duration::from_secs(10))
            .unwrap());

        world.status.begin();
        walk.request_yield().unwrap();
        assert!(walk.wait_stopped(Duration::from_secs(10)).unwrap());
        assert!(walk.cmd().unwrap().enable);
    }

    #[test]
    fn test_start_and_stop() {
        let (walk, _world, drain) = start();
        assert_eq!(walk.gait_state().unwrap(), GaitState::Stopped);

        walk.set_walk(0.02, 0.0, 0.0, true).unwrap();
        assert!(walk
            .wait_for_state(GaitState::Normal, Duration::from_secs(10))
            .unwrap());

        walk.set_walk(0.0, 0.0, 0.0, false).unwrap();
        assert!(walk.wait_stopped(Duration::from_secs(10)).unwrap());

        let report = walk.stop().unwrap();
        assert!(report.num_frames > 0);
        assert_eq!(report.state, GaitState::Stopped);
        assert_eq!(drain.join().unwrap(), report.num_frames);
    }

    #[test]
    fn test_request_ignored_during_action() {
        let (walk, world, _drain) = start();

        world.status.begin();
        walk.set_walk(0.02, 0.0, 0.0, true).unwrap();
        assert!(!walk.cmd().unwrap().enable);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(walk.gait_state().unwrap(), GaitState::Stopped);

        world.status.end();
        walk.set_walk(0.02, 0.0, 0.0, true).unwrap();
        assert!(walk.cmd().unwrap().enable);
        walk.stop().unwrap();
    }

    #[test]
    fn test_yield_stops_gait() {
        let (walk, world, _drain) = start();

        walk.set_walk(0.0, 0.0, 5.0, true).unwrap();
        assert!(walk
            .wait_for_state(GaitState::Normal, Duration::from_secs(10))
            .unwrap());

        world.status.begin();
        walk.request_yield().unwrap();
        assert!(walk.wait_stopped(Duration::from_secs(10)).unwrap());
        assert!(!walk.cmd().unwrap().yield_to_action);

        // Enable is still set, the busy action holds the gait down
        assert!(walk.cmd().unwrap().enable);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(walk.gait_state().unwrap(), GaitState::Stopped);

        world.status.end();
        walk.stop().unwrap();
    }

    #[test]
    fn test_action_end_wakes_gait() {
        let (walk, world, _drain) = start_with(Params {
            idle_poll_ms: 5000,
            ..Default::default()
        });
        hold_for_action(&walk, &world);

        // Let the gait thread settle into its wait
        thread::sleep(Duration::from_millis(50));
        assert_eq!(walk.gait_state().unwrap(), GaitState::Stopped);

        let end = Instant::now();
        world.status.end();
        assert!(walk
            .wait_for_state(GaitState::Starting, Duration::from_secs(10))
            .unwrap());
        assert!(end.elapsed() < Duration::from_millis(1000));

        walk.stop().unwrap();
    }

    #[test]
    fn test_stop_while_held_by_action() {
        let (walk, world, _drain) = start_with(Params {
            idle_poll_ms: 5000,
            ..Default::default()
        });
        hold_for_action(&walk, &world);
        thread::sleep(Duration::from_millis(50));

        let begin = Instant::now();
        let report = walk.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_millis(1000));
        assert_eq!(report.state, GaitState::Stopped);
        assert!(world.status.is_busy());
    }

    #[test]
    fn test_stop_mid_stride() {
        let (walk, _world, _drain) = start();

        walk.set_walk(0.02, 0.0, 0.0, true).unwrap();
        assert!(walk
            .wait_for_state(GaitState::Starting, Duration::from_secs(10))
            .unwrap());

        let begin = Instant::now();
        walk.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_period() {
        let queue = Arc::new(DemsQueue::new(1));
        let world: Arc<dyn WorldModel> = Arc::new(TestWorld::default());
        assert!(matches!(
            WalkCtrl::start(Params::default(), 0.0, queue, world),
            Err(WalkCtrlError::InvalidParams(_))
        ));
    }
}
