//! Simulated platform the bench attaches the driver to.

use crate::error::BenchError;

use rsb_core::config::DriverConfig;
use rsb_core::driver::RsbDriver;
use rsb_core::sim::{RecordingSink, SimRegulators, SimSubsystem, SimTransport};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::info;

pub struct SimPlatform {
    pub transport: Arc<SimTransport>,
    pub subsystem: Arc<SimSubsystem>,
    pub regulators: Arc<SimRegulators>,
    pub sink: Arc<RecordingSink>,
}

impl SimPlatform {
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            transport: Arc::new(SimTransport::new()),
            subsystem: Arc::new(SimSubsystem::new()),
            regulators: Arc::new(SimRegulators::for_rails(&config.rails)),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    /// Attach a driver instance to this platform.
    pub async fn attach(&self, config: DriverConfig) -> Result<RsbDriver, BenchError> {
        let driver = RsbDriver::builder()
            .with_config(config)
            .with_transport(self.transport.clone())
            .with_subsystem(self.subsystem.clone())
            .with_regulators(self.regulators.clone())
            .with_motion_sink(self.sink.clone())
            .attach()
            .await
            .map_err(|e| BenchError::Driver {
                message: format!("Attach failed: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("Driver attached to simulated platform");
        Ok(driver)
    }
}
