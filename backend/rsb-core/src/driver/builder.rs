use crate::config::DriverConfig;
use crate::control::EnableAttribute;
use crate::device::{DeviceHandle, DeviceStateMachine, DeviceTasks};
use crate::driver::RsbDriver;
use crate::error::driver::DriverError;
use crate::input::MotionReporter;
use crate::ports::{LinkTransport, MotionSink, Regulator, RegulatorProvider, SubsystemRestart};
use crate::power::PowerSequencer;
use crate::recovery::RecoveryCoordinator;
use crate::session::IpcSession;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::{error, info};

/// Collects the platform collaborators and attaches a driver instance.
#[derive(Default)]
pub struct RsbDriverBuilder {
    config: Option<DriverConfig>,
    transport: Option<Arc<dyn LinkTransport>>,
    subsystem: Option<Arc<dyn SubsystemRestart>>,
    regulators: Option<Arc<dyn RegulatorProvider>>,
    motion_sink: Option<Arc<dyn MotionSink>>,
}

impl RsbDriverBuilder {
    /// Defaults to [`DriverConfig::default`] when not given.
    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn LinkTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_subsystem(mut self, subsystem: Arc<dyn SubsystemRestart>) -> Self {
        self.subsystem = Some(subsystem);
        self
    }

    pub fn with_regulators(mut self, regulators: Arc<dyn RegulatorProvider>) -> Self {
        self.regulators = Some(regulators);
        self
    }

    pub fn with_motion_sink(mut self, sink: Arc<dyn MotionSink>) -> Self {
        self.motion_sink = Some(sink);
        self
    }

    /// Acquire the rails, register the input device, start the actors and
    /// subscribe to link and companion notifications.
    ///
    /// Must be called from within a tokio runtime. Anything set up before a
    /// failing step is torn down again.
    pub async fn attach(self) -> Result<RsbDriver, DriverError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let transport = self.transport.ok_or_else(|| DriverError::Validation {
            message: String::from("Link transport is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let subsystem = self.subsystem.ok_or_else(|| DriverError::Validation {
            message: String::from("Subsystem restart service is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let regulators = self.regulators.ok_or_else(|| DriverError::Validation {
            message: String::from("Regulator provider is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let motion_sink = self.motion_sink.ok_or_else(|| DriverError::Validation {
            message: String::from("Motion sink is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let control = acquire(regulators.as_ref(), &config.rails.control.supply)?;
        let bus = acquire(regulators.as_ref(), &config.rails.bus.supply)?;

        motion_sink
            .register(&config.input.device_name)
            .map_err(|fault| DriverError::Registration {
                message: format!("Input device {} registration failed", config.input.device_name),
                location: ErrorLocation::from(Location::caller()),
                source: fault,
            })?;

        let session = Arc::new(IpcSession::new(
            config.channel.clone(),
            config.timeouts,
            Arc::clone(&transport),
        ));
        let power = PowerSequencer::new(&config.rails, control, bus);
        let machine = Arc::new(DeviceStateMachine::new(power, Arc::clone(&session)));
        machine.initialize().await;

        let (device, tasks) = DeviceHandle::spawn(machine);
        let recovery = RecoveryCoordinator::start(Arc::clone(&session), device.clone());

        if let Err(fault) =
            subsystem.register_notifier(&config.subsystem.name, recovery.subsystem_notifier())
        {
            error!("Failed to register for {} restarts: {fault}", config.subsystem.name);
            abandon(tasks, recovery).await;
            return Err(DriverError::Registration {
                message: format!("Subsystem {} notifier registration failed", config.subsystem.name),
                location: ErrorLocation::from(Location::caller()),
                source: fault,
            });
        }

        if let Err(fault) = transport.register_link_state(
            &config.channel.edge,
            &config.channel.transport,
            recovery.link_notifier(),
        ) {
            error!("Failed to register link state callback: {fault}");
            subsystem.unregister_notifier(&config.subsystem.name);
            abandon(tasks, recovery).await;
            return Err(DriverError::Registration {
                message: format!(
                    "Link state registration for {}/{} failed",
                    config.channel.edge, config.channel.transport
                ),
                location: ErrorLocation::from(Location::caller()),
                source: fault,
            });
        }

        info!("RSB driver attached");

        Ok(RsbDriver {
            attribute: EnableAttribute::new(device.clone()),
            reporter: MotionReporter::new(motion_sink),
            config,
            transport,
            subsystem,
            session,
            device,
            tasks,
            recovery,
        })
    }
}

#[track_caller]
fn acquire(
    regulators: &dyn RegulatorProvider,
    supply: &str,
) -> Result<Arc<dyn Regulator>, DriverError> {
    regulators.get(supply).map_err(|fault| {
        error!("Failed to get {supply} regulator: {fault}");
        DriverError::Regulator {
            message: format!("Regulator {supply} unavailable"),
            location: ErrorLocation::from(Location::caller()),
            source: fault,
        }
    })
}

async fn abandon(tasks: DeviceTasks, recovery: RecoveryCoordinator) {
    recovery.stop().await;
    tasks.stop().await;
}
