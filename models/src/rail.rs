//! Power rail identities and their nominal voltages.

use crate::ErrorLocation;
use crate::error::model_error::ModelError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// The two rails gating the peripheral.
///
/// `Control` (LDO-A, LDO-11) must outlive `Bus` (LDO-B, LDO-15): it is enabled
/// first and disabled last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rail {
    Control,
    Bus,
}

impl Display for Rail {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            Rail::Control => formatter.write_str("LDO-11"),
            Rail::Bus => formatter.write_str("LDO-15"),
        }
    }
}

/// Inclusive voltage window requested from a regulator, in microvolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoltageRange {
    pub min_uv: u32,
    pub max_uv: u32,
}

impl VoltageRange {
    /// Nominal window for the control rail.
    pub const CONTROL_NOMINAL: VoltageRange = VoltageRange::fixed(1_800_000);

    /// Nominal window for the bus rail.
    pub const BUS_NOMINAL: VoltageRange = VoltageRange::fixed(3_300_000);

    pub const fn fixed(uv: u32) -> Self {
        Self {
            min_uv: uv,
            max_uv: uv,
        }
    }

    #[track_caller]
    pub fn new(min_uv: u32, max_uv: u32) -> Result<Self, ModelError> {
        let range = Self { min_uv, max_uv };
        range.validate()?;
        Ok(range)
    }

    #[track_caller]
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.min_uv == 0 {
            return Err(ModelError::Validation {
                message: String::from("Minimum voltage must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.min_uv > self.max_uv {
            return Err(ModelError::Validation {
                message: format!(
                    "Minimum voltage {}uV exceeds maximum {}uV",
                    self.min_uv, self.max_uv
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}
