use crate::ports::Fault;

use common::ErrorLocation;
use models::Rail;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RailError {
    #[error("Rail Voltage Error: {rail}: {message} {location}")]
    SetVoltage {
        rail: Rail,
        message: String,
        location: ErrorLocation,
        #[source]
        source: Fault,
    },

    #[error("Rail Enable Error: {rail}: {message} {location}")]
    Enable {
        rail: Rail,
        message: String,
        location: ErrorLocation,
        #[source]
        source: Fault,
    },

    #[error("Rail Disable Error: {rail}: {message} {location}")]
    Disable {
        rail: Rail,
        message: String,
        location: ErrorLocation,
        #[source]
        source: Fault,
    },
}

impl RailError {
    pub fn rail(&self) -> Rail {
        match self {
            RailError::SetVoltage { rail, .. }
            | RailError::Enable { rail, .. }
            | RailError::Disable { rail, .. } => *rail,
        }
    }
}
