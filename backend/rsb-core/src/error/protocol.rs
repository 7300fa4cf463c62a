use crate::error::session::SessionError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Protocol Nack Error: {message} {location}")]
    Nack {
        value: u32,
        message: String,
        location: ErrorLocation,
    },
}
