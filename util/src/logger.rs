//! Logging setup
//!
//! Records are formatted with the time since the session started and a short colored level tag.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target prefix of every record emitted by the gait engine.
pub const WALK_CTRL_TARGET: &str = "player_lib::walk_ctrl";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Two outputs are set up:
///
/// - stdout and the session log file get everything at `min_level`, except the gait engine
///   which is capped at `Info` there,
/// - the session's gait log file gets only the gait engine's records, at `walk_ctrl_level`.
///
/// # Notes
///
/// - `min_level` must be at least `log::Level::Info`.
/// - Only one logger can be installed per process, a second call returns
///   `LoggerInitError::FernInitError`.
pub fn logger_init(
    min_level: LevelFilter,
    walk_ctrl_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let main_log =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;
    let gait_log =
        fern::log_file(&session.gait_log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let main = fern::Dispatch::new()
        .format(format_record)
        .level(min_level)
        .level_for(WALK_CTRL_TARGET, LevelFilter::Info)
        .chain(std::io::stdout())
        .chain(main_log);

    let gait = fern::Dispatch::new()
        .format(format_record)
        .filter(|meta| meta.target().starts_with(WALK_CTRL_TARGET))
        .level(walk_ctrl_level)
        .chain(gait_log);

    fern::Dispatch::new()
        .chain(main)
        .chain(gait)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?} (walk_ctrl: {:?})", min_level, walk_ctrl_level);
    info!("    Log file path: {:?}", session.log_file_path);
    info!("    Gait log file path: {:?}", session.gait_log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn format_record(out: fern::FormatCallback, message: &fmt::Arguments, record: &log::Record) {
    // Targets are only useful when digging through debug output
    if record.level() > log::Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            level_tag(record.level()),
            record.target(),
            message
        ))
    } else {
        out.finish(format_args!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            level_tag(record.level()),
            message
        ))
    }
}

fn level_tag(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}
