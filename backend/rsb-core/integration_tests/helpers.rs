//! Test helpers for driver integration tests.
//!
//! - Building a driver against the simulated collaborators
//! - Driving it to a given operating state through the public notifiers
//! - Waiting on conditions with a bounded budget

use rsb_core::config::DriverConfig;
use rsb_core::driver::RsbDriver;
use rsb_core::sim::{RecordingSink, SimRegulator, SimRegulators, SimSubsystem, SimTransport};

use models::OperatingState;

use std::sync::Arc;
use std::time::Duration;

/// Upper bound for any wait in these tests.
pub const WAIT_BUDGET: Duration = Duration::from_secs(10);

/// The simulated platform a driver attaches to.
pub struct Bench {
    pub config: DriverConfig,
    pub transport: Arc<SimTransport>,
    pub subsystem: Arc<SimSubsystem>,
    pub regulators: Arc<SimRegulators>,
    pub sink: Arc<RecordingSink>,
    pub control: Arc<SimRegulator>,
    pub bus: Arc<SimRegulator>,
}

impl Bench {
    pub fn new() -> Self {
        let config = DriverConfig::default();
        let regulators = Arc::new(SimRegulators::for_rails(&config.rails));
        let control = regulators
            .regulator(&config.rails.control.supply)
            .expect("control supply");
        let bus = regulators
            .regulator(&config.rails.bus.supply)
            .expect("bus supply");

        Self {
            config,
            transport: Arc::new(SimTransport::new()),
            subsystem: Arc::new(SimSubsystem::new()),
            regulators,
            sink: Arc::new(RecordingSink::new()),
            control,
            bus,
        }
    }

    pub async fn attach(&self) -> RsbDriver {
        RsbDriver::builder()
            .with_config(self.config.clone())
            .with_transport(self.transport.clone())
            .with_subsystem(self.subsystem.clone())
            .with_regulators(self.regulators.clone())
            .with_motion_sink(self.sink.clone())
            .attach()
            .await
            .expect("attach")
    }

    /// Attached driver with the link up and the companion powered: `RsbConfigured`.
    pub async fn configured(&self) -> RsbDriver {
        let driver = self.attach().await;
        self.transport.link_up();
        self.subsystem.after_powerup();
        wait_for_state(&driver, OperatingState::RsbConfigured).await;
        driver
    }

    /// Attached driver with delivery running: `RsbEnabled`.
    pub async fn enabled(&self) -> RsbDriver {
        let driver = self.configured().await;
        let state = driver
            .device()
            .set_delivery(true)
            .await
            .expect("enable delivery");
        assert_eq!(state, OperatingState::RsbEnabled);
        driver
    }
}

/// Wait until the published state equals `state`.
pub async fn wait_for_state(driver: &RsbDriver, state: OperatingState) {
    let mut states = driver.device().subscribe();
    tokio::time::timeout(WAIT_BUDGET, states.wait_for(|current| *current == state))
        .await
        .unwrap_or_else(|_| panic!("Device never reached {state}"))
        .expect("state channel closed");
}

/// Poll `condition` until it holds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let polled = tokio::time::timeout(WAIT_BUDGET, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "Timed out waiting until {what}");
}
