//! Driver instance lifecycle: attach, suspend/resume and detach.

mod builder;

pub use builder::RsbDriverBuilder;

use crate::DRIVER_COMPATIBLE;
use crate::config::DriverConfig;
use crate::control::EnableAttribute;
use crate::device::{DeviceHandle, DeviceTasks};
use crate::error::device::DeviceError;
use crate::input::MotionReporter;
use crate::ports::{LinkTransport, SubsystemRestart};
use crate::recovery::RecoveryCoordinator;
use crate::session::IpcSession;

use models::OperatingState;

use std::sync::Arc;

use log::{info, warn};

/// One attached RSB driver instance.
pub struct RsbDriver {
    config: DriverConfig,
    transport: Arc<dyn LinkTransport>,
    subsystem: Arc<dyn SubsystemRestart>,
    session: Arc<IpcSession>,
    device: DeviceHandle,
    tasks: DeviceTasks,
    recovery: RecoveryCoordinator,
    attribute: EnableAttribute,
    reporter: MotionReporter,
}

impl RsbDriver {
    pub fn builder() -> RsbDriverBuilder {
        RsbDriverBuilder::default()
    }

    /// Whether a platform device with `compatible` should bind to this driver.
    pub fn matches(compatible: &str) -> bool {
        compatible == DRIVER_COMPATIBLE
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn session(&self) -> &Arc<IpcSession> {
        &self.session
    }

    pub fn attribute(&self) -> &EnableAttribute {
        &self.attribute
    }

    pub fn reporter(&self) -> &MotionReporter {
        &self.reporter
    }

    pub async fn suspend(&self) -> Result<OperatingState, DeviceError> {
        self.device.suspend().await
    }

    pub async fn resume(&self) -> Result<OperatingState, DeviceError> {
        self.device.resume().await
    }

    /// Unsubscribe from notifications, power the rails down, stop every actor
    /// and close the channel.
    pub async fn detach(self) -> OperatingState {
        self.transport
            .unregister_link_state(&self.config.channel.edge, &self.config.channel.transport);
        self.subsystem.unregister_notifier(&self.config.subsystem.name);

        let state = match self.device.shutdown().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Shutdown on detach failed: {e}");
                self.device.state()
            }
        };

        self.recovery.stop().await;
        self.tasks.stop().await;

        info!("RSB driver detached");
        state
    }
}
