//! Where the bench reads its config and writes its log.
//!
//! Lookup order for each directory:
//! 1. `RSB_CONFIG_DIR` / `RSB_LOG_DIR` environment variable (a `.env` file is
//!    loaded first, so it may set them)
//! 2. Platform directory via `dirs` (`~/.config/rsb-bench`, `~/.local/share/rsb-bench/logs` on Linux)

use crate::error::BenchError;

use common::ErrorLocation;

use std::env;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::path::PathBuf;

use log::{debug, info};

pub const CONFIG_DIR_VAR: &str = "RSB_CONFIG_DIR";
pub const LOG_DIR_VAR: &str = "RSB_LOG_DIR";
const APP_DIR_NAME: &str = "rsb-bench";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    EnvVar,
    PlatformDefault,
}

impl Display for PathSource {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            PathSource::EnvVar => write!(formatter, "environment"),
            PathSource::PlatformDefault => write!(formatter, "platform default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchPaths {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
    pub source: PathSource,
}

/// Load `.env` from the working directory, if there is one.
pub fn load_env() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("No .env loaded: {e}");
            None
        }
    }
}

/// Resolve the config and log directories.
///
/// # Errors
///
/// Returns [`BenchError::Bench`] when neither the environment nor the platform
/// names a directory.
pub fn resolve() -> Result<BenchPaths, BenchError> {
    let config_override = env::var(CONFIG_DIR_VAR).ok().map(PathBuf::from);
    let log_override = env::var(LOG_DIR_VAR).ok().map(PathBuf::from);
    let source = if config_override.is_some() || log_override.is_some() {
        PathSource::EnvVar
    } else {
        PathSource::PlatformDefault
    };

    let config_dir = match config_override {
        Some(dir) => dir,
        None => dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| missing(CONFIG_DIR_VAR))?,
    };

    let log_dir = match log_override {
        Some(dir) => dir,
        None => dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
            .ok_or_else(|| missing(LOG_DIR_VAR))?,
    };

    info!(
        "Bench paths ({source}): config {}, logs {}",
        config_dir.display(),
        log_dir.display()
    );

    Ok(BenchPaths {
        config_dir,
        log_dir,
        source,
    })
}

#[track_caller]
fn missing(var: &str) -> BenchError {
    BenchError::Bench {
        message: format!("Cannot determine directory. Set {var}."),
        location: ErrorLocation::from(Location::caller()),
    }
}
