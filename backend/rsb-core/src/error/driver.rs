use crate::error::config::ConfigError;
use crate::error::device::DeviceError;
use crate::ports::Fault;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Regulator Error: {message} {location}")]
    Regulator {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Fault,
    },

    #[error("Registration Error: {message} {location}")]
    Registration {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Fault,
    },
}
