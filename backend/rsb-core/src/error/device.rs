use crate::error::protocol::ProtocolError;
use crate::error::rail::RailError;
use crate::error::session::SessionError;

use common::ErrorLocation;
use models::OperatingState;

use serde::Serialize;
use thiserror::Error as ThisError;

/// Coarse classification of a device-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotConnected,
    Timeout,
    ProtocolNack,
    RailFailure,
    InvalidArgument,
    /// The request was a no-op; not a failure.
    AlreadyInState,
    InvalidState,
    Preempted,
    Transport,
    Unavailable,
}

#[derive(Debug, ThisError)]
pub enum DeviceError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Rail(#[from] RailError),

    #[error("Already In State: {state}: {message} {location}")]
    AlreadyInState {
        state: OperatingState,
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid State Error: {state}: {message} {location}")]
    InvalidState {
        state: OperatingState,
        message: String,
        location: ErrorLocation,
    },

    #[error("Preempted Error: {message} {location}")]
    Preempted {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unavailable Error: {message} {location}")]
    Unavailable {
        message: String,
        location: ErrorLocation,
    },
}

impl DeviceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeviceError::Protocol(ProtocolError::Nack { .. }) => ErrorKind::ProtocolNack,
            DeviceError::Protocol(ProtocolError::Session(session))
            | DeviceError::Session(session) => match session {
                SessionError::NotConnected { .. } => ErrorKind::NotConnected,
                SessionError::Timeout { .. } => ErrorKind::Timeout,
                SessionError::Transport { .. } => ErrorKind::Transport,
            },
            DeviceError::Rail(_) => ErrorKind::RailFailure,
            DeviceError::AlreadyInState { .. } => ErrorKind::AlreadyInState,
            DeviceError::InvalidState { .. } => ErrorKind::InvalidState,
            DeviceError::Preempted { .. } => ErrorKind::Preempted,
            DeviceError::Unavailable { .. } => ErrorKind::Unavailable,
        }
    }

    /// False for outcomes that left the device exactly where the caller wanted it.
    pub fn is_failure(&self) -> bool {
        self.kind() != ErrorKind::AlreadyInState
    }
}
