//! # Player
//!
//! The think loop: each cycle turns one world snapshot into tasks according to the play mode,
//! then hands the tasks to the motion executors.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use serde::Serialize;

use crate::{
    fsm::{Fsm, FsmError, FsmStateId},
    params::{LocTimerParams, PlayMode, PlayerExecParams},
    skill::{skill_goto, skill_penalty_kick},
    task::{MotionIf, Task, WalkIf},
    walk_ctrl::WalkCtrlError,
    world_model::{ActionStatus, SelfPose, WorldSnapshot},
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Think loop state.
pub struct Player {
    params: PlayerExecParams,
    fsm: Fsm,
    loc_timer: LocTimer,
    report: StatusReport,
}

/// Raises the periodic relocalisation request.
#[derive(Debug, Clone)]
pub struct LocTimer {
    params: LocTimerParams,

    /// Time of the last request, or of the start.
    ///
    /// Units: seconds
    last_s: f64,
}

/// Running totals of the think loop.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub play_mode: PlayMode,
    pub fsm_state: Option<FsmStateId>,
    pub num_cycles: u64,
    pub num_fsm_transitions: u64,
    pub num_localizations: u64,
    pub num_actions: u64,
    pub num_dropped_actions: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Behaviour FSM error: {0}")]
    FsmError(#[from] FsmError),

    #[error("Could not command the gait: {0}")]
    WalkCtrlError(#[from] WalkCtrlError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Player {
    pub fn new(params: PlayerExecParams, fsm: Fsm) -> Self {
        let report = StatusReport {
            play_mode: params.play_mode,
            fsm_state: None,
            num_cycles: 0,
            num_fsm_transitions: 0,
            num_localizations: 0,
            num_actions: 0,
            num_dropped_actions: 0,
        };

        Self {
            loc_timer: LocTimer::new(params.loc_timer.clone(), 0.0),
            params,
            fsm,
            report,
        }
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Decide what to do this cycle.
    ///
    /// `now_s` is the time since the start of the run.
    pub fn think(&mut self, world: &WorldSnapshot, now_s: f64) -> Result<Vec<Task>, PlayerError> {
        self.report.num_cycles += 1;

        let tasks = match self.params.play_mode {
            PlayMode::Normal => {
                let mut world = *world;

                let in_search = self.fsm.state_id() == FsmStateId::SearchBall;
                if self
                    .loc_timer
                    .poll(now_s, &world.self_pose, in_search, world.action_busy)
                {
                    info!("Relocalisation due");
                    world.localization_due = true;
                    self.report.num_localizations += 1;
                }

                let (tasks, fsm_report) = self.fsm.proc(&world)?;
                self.report.fsm_state = Some(fsm_report.state);
                self.report.num_fsm_transitions = fsm_report.num_transitions;

                tasks
            }
            PlayMode::Penalty => {
                let look = Task::look_at(0.0, self.params.penalty_look_pitch_deg);
                if world.ball.visible {
                    vec![look, skill_penalty_kick(&self.params.skill, &world.ball)]
                } else {
                    vec![look, Task::stand()]
                }
            }
            PlayMode::Entrance => {
                let e = &self.params.entrance;
                vec![skill_goto(
                    &self.params.skill,
                    &world.self_pose,
                    &e.target_m,
                    e.dir_deg,
                )]
            }
        };

        debug!("Think tasks: {:?}", tasks);

        Ok(tasks)
    }

    /// Hand the tasks to the executors, in order.
    ///
    /// An action is dropped if another one is still playing. Otherwise it is marked busy, the gait
    /// is asked to yield, and the action is started.
    pub fn perform(
        &mut self,
        tasks: &[Task],
        walk: &dyn WalkIf,
        motion: &dyn MotionIf,
        action_status: &ActionStatus,
    ) -> Result<(), PlayerError> {
        for task in tasks {
            match task {
                Task::Walk(w) => walk.set_walk(w)?,
                Task::Look(l) => motion.look(l),
                Task::Action(a) => {
                    if action_status.is_busy() {
                        debug!("Action {} dropped, another is playing", a.name);
                        self.report.num_dropped_actions += 1;
                        continue;
                    }

                    info!("Starting action {}", a.name);
                    action_status.begin();
                    walk.request_yield()?;
                    motion.start_action(&a.name);
                    self.report.num_actions += 1;
                }
            }
        }

        Ok(())
    }
}

impl LocTimer {
    pub fn new(params: LocTimerParams, start_s: f64) -> Self {
        Self {
            params,
            last_s: start_s,
        }
    }

    /// Returns `true` when a relocalisation should start now, restarting the timer.
    ///
    /// Requests are held back while searching for the ball or playing an action, and while the
    /// robot is still in its own part of the field.
    pub fn poll(&mut self, now_s: f64, pose: &SelfPose, in_search: bool, action_busy: bool) -> bool {
        if now_s - self.last_s < self.params.period_s
            || pose.pos_m_global.x <= self.params.min_x_m
            || in_search
            || action_busy
        {
            return false;
        }

        self.last_s = now_s;
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::task::{LookTask, WalkTask};
    use crate::world_model::{BallInfo, FallDirection};
    use nalgebra::Vector2;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockWalk {
        walks: Mutex<Vec<WalkTask>>,
        yields: Mutex<u32>,
    }

    impl WalkIf for MockWalk {
        fn set_walk(&self, task: &WalkTask) -> Result<(), WalkCtrlError> {
            self.walks.lock().unwrap().push(*task);
            Ok(())
        }
        fn request_yield(&self) -> Result<(), WalkCtrlError> {
            *self.yields.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockMotion {
        looks: Mutex<Vec<LookTask>>,
        actions: Mutex<Vec<String>>,
    }

    impl MotionIf for MockMotion {
        fn look(&self, task: &LookTask) {
            self.looks.lock().unwrap().push(*task);
        }
        fn start_action(&self, name: &str) {
            self.actions.lock().unwrap().push(name.into());
        }
    }

    fn player(play_mode: PlayMode) -> Player {
        Player::new(
            PlayerExecParams {
                play_mode,
                ..Default::default()
            },
            Fsm::default(),
        )
    }

    #[test]
    fn test_perform() {
        let mut player = player(PlayMode::Normal);
        let walk = MockWalk::default();
        let motion = MockMotion::default();
        let status = ActionStatus::new();

        let tasks = vec![
            Task::walk(0.01, 0.0, 0.0, true),
            Task::look_at(0.0, 40.0),
            Task::action("front_getup"),
            Task::action("front_getup"),
        ];
        player.perform(&tasks, &walk, &motion, &status).unwrap();

        assert_eq!(walk.walks.lock().unwrap().len(), 1);
        assert_eq!(*walk.yields.lock().unwrap(), 1);
        assert_eq!(motion.looks.lock().unwrap().len(), 1);
        assert_eq!(*motion.actions.lock().unwrap(), vec!["front_getup".to_string()]);
        assert!(status.is_busy());
        assert_eq!(player.report().num_actions, 1);
        assert_eq!(player.report().num_dropped_actions, 1);
    }

    #[test]
    fn test_loc_timer() {
        let mut timer = LocTimer::new(
            LocTimerParams {
                period_s: 10.0,
                min_x_m: 1.5,
            },
            0.0,
        );
        let up_field = SelfPose {
            pos_m_global: Vector2::new(2.0, 0.0),
            heading_deg: 0.0,
        };

        assert!(!timer.poll(5.0, &up_field, false, false));
        assert!(!timer.poll(11.0, &SelfPose::default(), false, false));
        assert!(!timer.poll(11.0, &up_field, true, false));
        assert!(!timer.poll(11.0, &up_field, false, true));
        assert!(timer.poll(11.0, &up_field, false, false));

        // Restarted
        assert!(!timer.poll(12.0, &up_field, false, false));
        assert!(timer.poll(21.0, &up_field, false, false));
    }

    #[test]
    fn test_normal_mode_runs_fsm() {
        let mut player = player(PlayMode::Normal);
        let world = WorldSnapshot {
            fall: FallDirection::Left,
            ..Default::default()
        };

        let tasks = player.think(&world, 0.0).unwrap();
        assert_eq!(tasks, vec![Task::action("right_arm")]);
        assert_eq!(player.report().fsm_state, Some(FsmStateId::Getup));
    }

    #[test]
    fn test_penalty_mode() {
        let mut player = player(PlayMode::Penalty);
        let world = WorldSnapshot {
            ball: BallInfo {
                visible: true,
                pos_m_rel: Vector2::new(0.3, 0.0),
                alpha: -0.1,
                beta: 0.35,
            },
            ..Default::default()
        };

        let tasks = player.think(&world, 0.0).unwrap();
        assert_eq!(
            tasks,
            vec![Task::look_at(0.0, 60.0), Task::action("left_little_kick")]
        );

        let tasks = player.think(&WorldSnapshot::default(), 0.0).unwrap();
        assert_eq!(tasks[1], Task::stand());
    }
}
