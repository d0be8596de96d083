//! Main player executable entry point.
//!
//! # Architecture
//!
//! Two loops run side by side:
//!
//!     - The gait thread (`walk_ctrl`) ticks at the motor period, generating leg joint frames
//!       and pushing them to the actuators.
//!     - The think loop below runs at the think period:
//!         - Advance the world
//!         - Take a world snapshot
//!         - Decide on the tasks for this cycle
//!         - Hand the tasks to the gait, head and action executors
//!
//! Without hardware the world and the actuators are simulated by `player_lib::sim` and a
//! draining consumer on the demands queue.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, trace, warn};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use player_lib::{
    fsm::Fsm,
    mech_client::{spawn_drain, DemsQueue},
    params::PlayerExecParams,
    player::{self, Player},
    sim::{SimMotion, SimWorld},
    walk_ctrl::{self, GaitState, WalkCtrl},
    world_model::WorldModel,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
    time,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest wait for the gait to come to rest on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Saved into the session directory at the end of the run.
#[derive(Serialize)]
struct RunSummary {
    player: player::StatusReport,
    walk_ctrl: walk_ctrl::StatusReport,
    num_frames_sent: u64,
    num_kicks: u64,
    run_time_s: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let session = Session::new("player_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Biped Player Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: PlayerExecParams =
        util::params::load("player_exec.toml").wrap_err("Could not load player_exec params")?;
    let walk_params: walk_ctrl::Params =
        util::params::load("walk_ctrl.toml").wrap_err("Could not load walk_ctrl params")?;

    info!("Exec parameters loaded, play mode {:?}", params.play_mode);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut fsm = Fsm::default();
    fsm.init("fsm.toml", &session)
        .wrap_err("Failed to initialise the FSM")?;
    info!("FSM init complete");

    let sim = Arc::new(SimWorld::new(params.sim.clone()));
    let motion = SimMotion::new(sim.clone());

    let motor_rate_hz = time::period_ms_to_hz(params.motor_period_ms)
        .ok_or_else(|| eyre!("The motor period must be non-zero"))?;
    info!("Gait ticking at {:.1} Hz", motor_rate_hz);

    let motor_period = Duration::from_millis(params.motor_period_ms);
    let queue = Arc::new(DemsQueue::new(params.dems_queue_capacity));
    let drain = spawn_drain(queue.clone(), motor_period, |dems| {
        trace!("Dems: {:?}", dems)
    })
    .wrap_err("Failed to start the actuator drain")?;

    let walk = WalkCtrl::start(
        walk_params,
        1.0 / motor_rate_hz,
        queue,
        sim.clone(),
    )
    .wrap_err("Failed to start WalkCtrl")?;
    info!("WalkCtrl init complete");

    let mut player = Player::new(params.clone(), fsm);

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let think_period = Duration::from_millis(params.think_period_ms);
    let run_start = Instant::now();

    loop {
        let cycle_start = Instant::now();

        if params.run_time_s > 0.0 && run_start.elapsed().as_secs_f64() >= params.run_time_s {
            info!("Run time of {} s reached", params.run_time_s);
            break;
        }

        // ---- DATA INPUT ----

        sim.update(walk.gait_state().wrap_err("Could not read the gait state")?);
        let world = sim.snapshot();

        // ---- THINK ----

        match player.think(&world, sim.now_s()) {
            Ok(tasks) => {
                if let Err(e) = player.perform(&tasks, &walk, &motion, sim.action_status()) {
                    warn!("Could not perform tasks: {}", e);
                }
            }
            Err(e) => warn!("Think cycle failed: {}", e),
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = cycle_start.elapsed();
        match think_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Think cycle overran by {:.06} s",
                (cycle_dur - think_period).as_secs_f64()
            ),
        }
    }

    // ---- SHUTDOWN ----

    info!("Stopping the gait");

    walk.set_walk(0.0, 0.0, 0.0, false)
        .wrap_err("Could not disable the gait")?;
    match walk.wait_stopped(SHUTDOWN_TIMEOUT) {
        Ok(true) => (),
        Ok(false) => warn!("Gait still in {:?} at shutdown", walk.gait_state().ok()),
        Err(e) => warn!("Could not wait for the gait to stop: {}", e),
    }

    let walk_report = walk.stop().wrap_err("WalkCtrl did not stop cleanly")?;
    let num_frames_sent = match drain.join() {
        Ok(n) => n,
        Err(_) => {
            warn!("Actuator drain panicked");
            0
        }
    };

    let summary = RunSummary {
        player: player.report(),
        walk_ctrl: walk_report,
        num_frames_sent,
        num_kicks: sim.num_kicks(),
        run_time_s: run_start.elapsed().as_secs_f64(),
    };
    info!(
        "Ran {} think cycles and {} strides, gait ended {}",
        summary.player.num_cycles,
        summary.walk_ctrl.num_strides,
        if summary.walk_ctrl.state == GaitState::Stopped {
            "at rest"
        } else {
            "mid-motion"
        }
    );
    session.save("player_summary.json", summary);

    info!("End of execution");

    session.exit();

    Ok(())
}
