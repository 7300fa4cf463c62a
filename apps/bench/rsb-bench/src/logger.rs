//! Logging for the bench console.
//!
//! Provides dual output (stdout with colors + file) with thread-safe initialization.
//! Driver records are tagged with the driver component that emitted them
//! (`session`, `device::actor`, ...) instead of the full module path, and the
//! driver's level can be raised or lowered with `RSB_LOG` without touching the
//! bench's own output.

use crate::error::BenchError;

use common::ErrorLocation;

use std::env;
use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::str::FromStr;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::{format_rfc3339, format_rfc3339_millis};
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "rsb-bench.log";

/// Overrides the driver's log level (`trace`, `debug`, `info`, `warn`, `error`, `off`).
pub const DRIVER_LEVEL_VAR: &str = "RSB_LOG";

const DRIVER_CRATE: &str = "rsb_core";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Short tag for a record's target: the driver component for driver records,
/// the target unchanged for everything else.
pub fn component(target: &str) -> &str {
    target
        .strip_prefix(DRIVER_CRATE)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(target)
}

/// Driver level from `value`, falling back to the build's default level.
pub fn driver_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|value| LevelFilter::from_str(value.trim()).ok())
        .unwrap_or(LOG_LEVEL)
}

/// Initialize the logger with dual output (stdout + `{log_dir}/rsb-bench.log`).
///
/// Safe to call more than once: later calls log a warning and return Ok.
///
/// # Errors
///
/// Returns [`BenchError::Bench`] if the log file cannot be created or another
/// logger is already installed.
pub fn initialize(log_dir: &Path) -> Result<(), BenchError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let driver = driver_level(env::var(DRIVER_LEVEL_VAR).ok().as_deref());
    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir, driver);
        if result.is_ok() {
            info!("Logger initialized: bench {LOG_LEVEL:?}, driver {driver:?}");
        }
    });

    result
}

#[track_caller]
fn initialize_internal(log_dir: &Path, driver: LevelFilter) -> Result<(), BenchError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{date} {level:<5} {component:>14} | {message}",
                date = format_rfc3339_millis(SystemTime::now()),
                level = color_configuration.color(record.level()),
                component = component(record.target()),
            ))
        })
        .chain(stdout());

    // Plain text, with source positions for post-mortem reading.
    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{date} {level:<5} {component} | {message} ({file}:{line})",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                component = component(record.target()),
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| BenchError::Bench {
                message: format!("Failed to create log file {}: {e}", log_file_path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?,
        );

    Dispatch::new()
        .level(LOG_LEVEL)
        .level_for(DRIVER_CRATE, driver)
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| BenchError::Bench {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(())
}
