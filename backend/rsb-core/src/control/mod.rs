//! The user-facing `enable` attribute.
//!
//! Writing `1` asks for delivery to be enabled, `0` for it to be disabled.
//! Writes only queue the request; a failing transition is logged by the
//! delivery actor and never reflected back to the writer. Reads return nothing.

use crate::DRIVER_NAME;
use crate::device::DeviceHandle;
use crate::error::control::ControlError;

use common::ErrorLocation;
use models::OperatingState;

use std::panic::Location;

use const_format::concatcp;
use log::{debug, warn};

pub const ATTRIBUTE_NAME: &str = "enable";
pub const ATTRIBUTE_MODE: u32 = 0o660;
pub const ATTRIBUTE_PATH: &str = concatcp!(DRIVER_NAME, "/", ATTRIBUTE_NAME);

const POWER_ENABLE: i64 = 1;
const POWER_DISABLE: i64 = 0;

pub struct EnableAttribute {
    device: DeviceHandle,
}

impl EnableAttribute {
    pub fn new(device: DeviceHandle) -> Self {
        Self { device }
    }

    /// Handle a write. Returns the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidArgument`] if `buf` is not a decimal integer.
    pub fn store(&self, buf: &str) -> Result<usize, ControlError> {
        let value: i64 = buf.trim().parse().map_err(|e| ControlError::InvalidArgument {
            message: format!("{ATTRIBUTE_PATH} expects an integer, got {buf:?}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let enable = match value {
            POWER_ENABLE => true,
            POWER_DISABLE => false,
            other => {
                debug!("Ignoring {ATTRIBUTE_PATH} value {other}");
                return Ok(buf.len());
            }
        };

        let settled = if enable {
            OperatingState::RsbEnabled
        } else {
            OperatingState::RsbConfigured
        };
        if self.device.state() == settled {
            debug!("RSB already {settled}");
            return Ok(buf.len());
        }

        if let Err(e) = self.device.request_delivery(enable) {
            warn!("Dropping {ATTRIBUTE_PATH} write: {e}");
        }

        Ok(buf.len())
    }

    /// Handle a read. Always empty.
    pub fn show(&self) -> String {
        String::new()
    }
}
