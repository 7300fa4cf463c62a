use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the bench console.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum BenchError {
    /// Error from the bench itself (paths, logging, I/O)
    #[error("Bench Error: {message} {location}")]
    Bench {
        message: String,
        location: ErrorLocation,
    },

    /// Error from rsb-core (config, attach, transitions)
    #[error("Driver Error: {message} {location}")]
    Driver {
        message: String,
        location: ErrorLocation,
    },

    /// A console line that is not a command
    #[error("Command Error: {message} {location}")]
    Command {
        message: String,
        location: ErrorLocation,
    },
}
