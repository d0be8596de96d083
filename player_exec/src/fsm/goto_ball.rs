//! # [`Fsm<GotoBall>`] implementation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{BracketSide, FsmStateId, Params, PostBracket, StepOutput, StrikeMode};
use crate::{task::Task, world_model::WorldSnapshot};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub struct GotoBall;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GotoBall {
    pub fn step(&mut self, params: &Params, world: &WorldSnapshot) -> StepOutput {
        if !world.ball.visible {
            return StepOutput::Trans(FsmStateId::SearchBall, Vec::new());
        }
        if world.localization_due {
            return StepOutput::Trans(FsmStateId::SelfLocalize, Vec::new());
        }

        let ball = &world.ball;
        let ball_dir_deg = ball.bearing_deg();
        let ball_dis_m = ball.distance_m();

        let bracket = PostBracket::new(params, &world.self_pose, 0.0, 0.0);
        let side = bracket.side(world.self_pose.heading_deg);

        let mut tasks = Vec::new();

        if ball_dis_m <= params.enter_kick_dis_m && side == BracketSide::Inside {
            let to = match params.strike_mode {
                StrikeMode::Kick => FsmStateId::KickBall,
                StrikeMode::Dribble => FsmStateId::Dribble,
            };
            return StepOutput::Trans(to, tasks);
        }

        if ball_dis_m > params.enter_kick_dis_m {
            // Face the ball first, then walk at it
            if ball_dir_deg > params.goto_turn_threshold_deg {
                tasks.push(Task::walk(0.0, 0.0, params.goto_turn_deg, true));
            } else if ball_dir_deg < -params.goto_turn_threshold_deg {
                tasks.push(Task::walk(0.0, 0.0, -params.goto_turn_deg, true));
            } else {
                tasks.push(Task::walk(params.goto_forward_m, 0.0, 0.0, true));
            }
        } else {
            // Close enough, circle round the ball until facing between the posts
            let [x, y, dir] = params.goto_post_correction;
            match side {
                BracketSide::LeftOf => tasks.push(Task::walk(x, y, dir, true)),
                BracketSide::RightOf => tasks.push(Task::walk(x, -y, -dir, true)),
                BracketSide::Inside => (),
            }
        }

        if ball.pos_m_rel.x < params.retreat_x_m && ball.pos_m_rel.y.abs() > params.retreat_y_m {
            debug!("Ball too close to the side, backing off");
            tasks.clear();
            tasks.push(Task::walk(params.goto_retreat_m, 0.0, 0.0, true));
        }

        StepOutput::Tasks(tasks)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fsm::test::world_with_ball;
    use nalgebra::Vector2;

    fn tasks(params: &Params, world: &WorldSnapshot) -> Vec<Task> {
        match GotoBall.step(params, world) {
            StepOutput::Tasks(t) => t,
            s => panic!("Expected tasks, got {:?}", s),
        }
    }

    #[test]
    fn test_approach() {
        let params = Params::default();

        // Ball far away on the left, turn towards it
        let world = world_with_ball(Vector2::new(1.0, 1.0));
        assert_eq!(tasks(&params, &world), vec![Task::walk(0.0, 0.0, 8.0, true)]);

        // And on the right
        let world = world_with_ball(Vector2::new(1.0, -1.0));
        assert_eq!(tasks(&params, &world), vec![Task::walk(0.0, 0.0, -8.0, true)]);
    }

    #[test]
    fn test_post_correction() {
        let params = Params::default();

        // Close to the ball but facing left of the left post
        let mut world = world_with_ball(Vector2::new(0.3, 0.0));
        world.self_pose.heading_deg = 70.0;
        assert_eq!(
            tasks(&params, &world),
            vec![Task::walk(-0.008, 0.015, -8.0, true)]
        );

        world.self_pose.heading_deg = -70.0;
        assert_eq!(
            tasks(&params, &world),
            vec![Task::walk(-0.008, -0.015, 8.0, true)]
        );
    }

    #[test]
    fn test_retreat_override() {
        let params = Params::default();
        let mut world = world_with_ball(Vector2::new(0.05, 0.3));
        world.self_pose.heading_deg = 70.0;

        assert_eq!(
            tasks(&params, &world),
            vec![Task::walk(-0.02, 0.0, 0.0, true)]
        );
    }

    #[test]
    fn test_lost_ball() {
        let params = Params::default();
        let mut world = world_with_ball(Vector2::new(0.3, 0.0));
        world.ball.visible = false;

        assert_eq!(
            GotoBall.step(&params, &world),
            StepOutput::Trans(FsmStateId::SearchBall, Vec::new())
        );

        world.ball.visible = true;
        world.localization_due = true;
        assert_eq!(
            GotoBall.step(&params, &world),
            StepOutput::Trans(FsmStateId::SelfLocalize, Vec::new())
        );
    }
}
