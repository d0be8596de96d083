//! # World model interface
//!
//! The estimator which fuses perception, the inertial sensor and odometry lives outside this
//! crate. The gait and behaviour layers only pull snapshots from it through [`WorldModel`], and
//! push back the dead reckoned position.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use util::maths::azimuth_deg;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Thread safe query interface onto the world model.
pub trait WorldModel: Send + Sync {
    /// Consistent copy of everything the behaviour layer needs for one tick.
    fn snapshot(&self) -> WorldSnapshot;

    /// Current global pose of the robot.
    fn self_pose(&self) -> SelfPose;

    /// Overwrite the robot's global position with a dead reckoned estimate.
    fn set_self_position(&self, pos_m_global: Vector2<f64>);

    /// Report the heading change commanded over the last stride.
    ///
    /// Estimators with an inertial heading ignore this.
    fn apply_odometry_turn(&self, _turn_deg: f64) {}

    /// Status of the discrete action player.
    fn action_status(&self) -> &ActionStatus;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything the behaviour layer reads from the world model in one tick.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WorldSnapshot {
    pub ball: BallInfo,
    pub self_pose: SelfPose,
    pub fall: FallDirection,

    /// The robot should stop and look for the goal posts to relocalise.
    pub localization_due: bool,

    /// A discrete action is currently playing.
    pub action_busy: bool,

    pub head_scan: HeadScanStatus,
}

/// Ball observation relative to the robot.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BallInfo {
    /// Whether the ball is currently seen.
    pub visible: bool,

    /// Ball position in the robot frame, X forward and Y left.
    ///
    /// Units: meters
    pub pos_m_rel: Vector2<f64>,

    /// Normalised lateral image position of the ball, positive to the right.
    pub alpha: f64,

    /// Normalised vertical image position of the ball, larger when closer.
    pub beta: f64,
}

/// Global pose of the robot on the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SelfPose {
    /// Units: meters
    pub pos_m_global: Vector2<f64>,

    /// Heading counter clockwise from the global X axis.
    ///
    /// Units: degrees
    pub heading_deg: f64,
}

/// Completion flags of the head scan behaviours.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HeadScanStatus {
    pub ball_search_done: bool,
    pub post_search_done: bool,
}

/// Shared flag marking a discrete action as playing.
///
/// Waiters block on a condition variable rather than polling.
#[derive(Debug, Default)]
pub struct ActionStatus {
    busy: Mutex<bool>,
    idle_cv: Condvar,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of a detected fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FallDirection {
    None,
    Forward,
    Backward,
    Left,
    Right,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for FallDirection {
    fn default() -> Self {
        FallDirection::None
    }
}

impl BallInfo {
    /// Bearing of the ball from the robot's forward axis, positive to the left.
    ///
    /// Units: degrees
    pub fn bearing_deg(&self) -> f64 {
        azimuth_deg(&self.pos_m_rel)
    }

    /// Units: meters
    pub fn distance_m(&self) -> f64 {
        self.pos_m_rel.norm()
    }
}

impl ActionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an action as started.
    pub fn begin(&self) {
        *self.lock() = true;
    }

    /// Mark the action as finished, waking any waiters.
    pub fn end(&self) {
        *self.lock() = false;
        self.idle_cv.notify_all();
    }

    pub fn is_busy(&self) -> bool {
        *self.lock()
    }

    /// Block until no action is playing or the timeout elapses.
    ///
    /// Returns `true` if idle on return.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.wait_idle_while(timeout, || true)
    }

    /// As [`ActionStatus::wait_idle`], but give up early once `keep_waiting` returns `false`.
    ///
    /// `keep_waiting` is checked on every wake up, see [`ActionStatus::wake`].
    pub fn wait_idle_while<F>(&self, timeout: Duration, keep_waiting: F) -> bool
    where
        F: Fn() -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut busy = self.lock();

        while *busy && keep_waiting() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            busy = match self.idle_cv.wait_timeout(busy, deadline - now) {
                Ok((b, _)) => b,
                Err(e) => e.into_inner().0,
            };
        }

        !*busy
    }

    /// Wake the waiters without changing the flag, so they recheck their exit condition.
    pub fn wake(&self) {
        let _busy = self.lock();
        self.idle_cv.notify_all();
    }

    // The flag is plain data, a poisoned lock still holds a valid value
    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.busy.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ball_geometry() {
        let ball = BallInfo {
            visible: true,
            pos_m_rel: Vector2::new(0.6, 0.6 * 5f64.to_radians().tan()),
            ..Default::default()
        };

        assert!((ball.bearing_deg() - 5.0).abs() < 1e-9);
        assert!(ball.distance_m() > 0.6);
    }

    #[test]
    fn test_action_status() {
        let status = Arc::new(ActionStatus::new());
        assert!(!status.is_busy());
        assert!(status.wait_idle(Duration::from_millis(1)));

        status.begin();
        assert!(status.is_busy());
        assert!(!status.wait_idle(Duration::from_millis(5)));

        let s = status.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            s.end();
        });

        assert!(status.wait_idle(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_wake_cancels_wait() {
        let status = Arc::new(ActionStatus::new());
        let cancel = Arc::new(AtomicBool::new(false));
        status.begin();

        let (s, c) = (status.clone(), cancel.clone());
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            c.store(true, Ordering::SeqCst);
            s.wake();
        });

        let begin = Instant::now();
        let keep_waiting = || !cancel.load(Ordering::SeqCst);
        assert!(!status.wait_idle_while(Duration::from_secs(10), keep_waiting));
        assert!(begin.elapsed() < Duration::from_secs(5));
        assert!(status.is_busy());
        handle.join().unwrap();
    }
}
