//! Power sequencing for the control (LDO-A) and bus (LDO-B) rails.
//!
//! The sequencer performs single-rail operations only. Ordering across rails
//! (control up before bus, bus down before control) and rollback on failure
//! belong to the device state machine, which is the only caller.

use crate::config::RailsConfig;
use crate::error::rail::RailError;
use crate::ports::Regulator;

use common::ErrorLocation;
use models::{Rail, VoltageRange};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, warn};

/// Load hint requested from the bus regulator after it is switched off.
const BUS_IDLE_LOAD_UA: u32 = 0;

struct RailHandle {
    rail: Rail,
    supply: String,
    nominal: VoltageRange,
    regulator: Arc<dyn Regulator>,
    enabled: AtomicBool,
}

pub struct PowerSequencer {
    control: RailHandle,
    bus: RailHandle,
}

impl PowerSequencer {
    pub fn new(
        rails: &RailsConfig,
        control: Arc<dyn Regulator>,
        bus: Arc<dyn Regulator>,
    ) -> Self {
        Self {
            control: RailHandle {
                rail: Rail::Control,
                supply: rails.control.supply.clone(),
                nominal: rails.control.voltage(),
                regulator: control,
                enabled: AtomicBool::new(false),
            },
            bus: RailHandle {
                rail: Rail::Bus,
                supply: rails.bus.supply.clone(),
                nominal: rails.bus.voltage(),
                regulator: bus,
                enabled: AtomicBool::new(false),
            },
        }
    }

    fn handle(&self, rail: Rail) -> &RailHandle {
        match rail {
            Rail::Control => &self.control,
            Rail::Bus => &self.bus,
        }
    }

    /// Whether the last successful operation on `rail` left it enabled.
    pub fn is_enabled(&self, rail: Rail) -> bool {
        self.handle(rail).enabled.load(Ordering::SeqCst)
    }

    /// Switch `rail` on or off.
    ///
    /// Enabling programs the nominal voltage, then enables. Either step failing
    /// fails the call and leaves the rail as the failing step left it. A rail
    /// already tracked as enabled is not enabled a second time.
    /// Disabling the bus rail also drops it to its idle load mode; failure of
    /// that hint is only logged.
    pub(crate) fn set(&self, rail: Rail, enabled: bool) -> Result<(), RailError> {
        let handle = self.handle(rail);
        if enabled {
            Self::enable(handle)
        } else {
            Self::disable(handle)
        }
    }

    fn enable(handle: &RailHandle) -> Result<(), RailError> {
        let rail = handle.rail;
        if handle.enabled.load(Ordering::SeqCst) {
            debug!("{rail} already enabled");
            return Ok(());
        }

        handle
            .regulator
            .set_voltage(handle.nominal)
            .map_err(|fault| {
                error!("Failed to request {rail} voltage: {fault}");
                RailError::SetVoltage {
                    rail,
                    message: format!(
                        "{} rejected {}-{}uV",
                        handle.supply, handle.nominal.min_uv, handle.nominal.max_uv
                    ),
                    location: ErrorLocation::from(Location::caller()),
                    source: fault,
                }
            })?;

        handle.regulator.enable().map_err(|fault| {
            error!("Failed to enable {rail}: {fault}");
            RailError::Enable {
                rail,
                message: format!("{} enable failed", handle.supply),
                location: ErrorLocation::from(Location::caller()),
                source: fault,
            }
        })?;

        handle.enabled.store(true, Ordering::SeqCst);
        debug!("{rail} enabled");
        Ok(())
    }

    fn disable(handle: &RailHandle) -> Result<(), RailError> {
        let rail = handle.rail;

        handle.regulator.disable().map_err(|fault| {
            error!("Failed to disable {rail}: {fault}");
            RailError::Disable {
                rail,
                message: format!("{} disable failed", handle.supply),
                location: ErrorLocation::from(Location::caller()),
                source: fault,
            }
        })?;

        handle.enabled.store(false, Ordering::SeqCst);
        debug!("{rail} disabled");

        if rail == Rail::Bus {
            if let Err(fault) = handle.regulator.set_optimum_mode(BUS_IDLE_LOAD_UA) {
                warn!("Failed to set {rail} idle mode: {fault}");
            }
        }

        Ok(())
    }
}
