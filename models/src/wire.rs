//! Wire format of the RSB control channel.
//!
//! Requests are 8 bytes, little-endian `{command_id: u32, data: u32}`. The only
//! response the protocol inspects is the 4-byte little-endian acknowledgement
//! to configure, whose success value is `0x01`.

use crate::ErrorLocation;
use crate::error::model_error::ModelError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

use serde::Serialize;

/// Size of an encoded request.
pub const MESSAGE_SIZE: usize = 8;

/// Size of the single receive intent queued per exchange.
pub const RX_INTENT_SIZE: usize = 4;

/// Response value meaning "configure applied".
pub const CONFIGURE_ACK: u32 = 0x01;

const DATA_ENABLE: u32 = 0x01;
const DATA_DISABLE: u32 = 0x00;

/// Command identifiers understood by the companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RsbCommand {
    /// Power the sensor bus logic on the companion side up or down.
    Configure,
    /// Start or stop delivery of motion events.
    Delivery,
}

impl RsbCommand {
    pub const fn id(&self) -> u32 {
        match self {
            RsbCommand::Configure => 0x01,
            RsbCommand::Delivery => 0x02,
        }
    }

    pub const fn from_id(id: u32) -> Option<Self> {
        match id {
            0x01 => Some(RsbCommand::Configure),
            0x02 => Some(RsbCommand::Delivery),
            _ => None,
        }
    }
}

impl Display for RsbCommand {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            RsbCommand::Configure => formatter.write_str("configure"),
            RsbCommand::Delivery => formatter.write_str("delivery"),
        }
    }
}

/// One request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RsbMessage {
    pub command_id: u32,
    pub data: u32,
}

impl RsbMessage {
    pub const fn new(command: RsbCommand, enable: bool) -> Self {
        Self {
            command_id: command.id(),
            data: if enable { DATA_ENABLE } else { DATA_DISABLE },
        }
    }

    pub fn command(&self) -> Option<RsbCommand> {
        RsbCommand::from_id(self.command_id)
    }

    pub const fn enables(&self) -> bool {
        self.data == DATA_ENABLE
    }

    pub fn encode(&self) -> [u8; MESSAGE_SIZE] {
        let mut buf = [0u8; MESSAGE_SIZE];
        buf[..4].copy_from_slice(&self.command_id.to_le_bytes());
        buf[4..].copy_from_slice(&self.data.to_le_bytes());
        buf
    }

    #[track_caller]
    pub fn decode(bytes: &[u8]) -> Result<Self, ModelError> {
        let raw: [u8; MESSAGE_SIZE] = bytes.try_into().map_err(|_| ModelError::Decode {
            message: format!(
                "Request must be {MESSAGE_SIZE} bytes, got {}",
                bytes.len()
            ),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self {
            command_id: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            data: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
        })
    }
}

impl Display for RsbMessage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self.command() {
            Some(command) => write!(formatter, "{command}({})", self.data),
            None => write!(formatter, "cmd#{:#04x}({})", self.command_id, self.data),
        }
    }
}

/// Raw 4-byte response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RsbResponse(pub [u8; RX_INTENT_SIZE]);

impl RsbResponse {
    pub const fn from_value(value: u32) -> Self {
        RsbResponse(value.to_le_bytes())
    }

    /// Copy a received payload into a fresh intent-sized buffer.
    ///
    /// Payloads shorter than the intent are zero-padded. Longer payloads do not
    /// fit the intent and are rejected without copying.
    #[track_caller]
    pub fn from_payload(payload: &[u8]) -> Result<Self, ModelError> {
        if payload.len() > RX_INTENT_SIZE {
            return Err(ModelError::Decode {
                message: format!(
                    "Response of {} bytes exceeds the {RX_INTENT_SIZE}-byte intent",
                    payload.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut buf = [0u8; RX_INTENT_SIZE];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(RsbResponse(buf))
    }

    pub const fn value(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub const fn is_configure_ack(&self) -> bool {
        self.value() == CONFIGURE_ACK
    }
}
