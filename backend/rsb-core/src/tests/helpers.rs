//! Shared rig for unit tests: a session on a simulated transport plus two
//! recording regulators, wired the way attach wires them.

use crate::config::DriverConfig;
use crate::device::DeviceStateMachine;
use crate::ports::Regulator;
use crate::power::PowerSequencer;
use crate::session::IpcSession;
use crate::sim::{SimRegulator, SimRegulators, SimTransport};

use models::OperatingState;

use std::sync::Arc;

pub(crate) struct Rig {
    pub(crate) config: DriverConfig,
    pub(crate) transport: Arc<SimTransport>,
    pub(crate) control: Arc<SimRegulator>,
    pub(crate) bus: Arc<SimRegulator>,
    pub(crate) session: Arc<IpcSession>,
}

impl Rig {
    pub(crate) fn new() -> Self {
        let config = DriverConfig::default();
        let transport = Arc::new(SimTransport::new());
        let regulators = SimRegulators::for_rails(&config.rails);
        let control = regulators
            .regulator(&config.rails.control.supply)
            .expect("control supply");
        let bus = regulators
            .regulator(&config.rails.bus.supply)
            .expect("bus supply");
        let session = Arc::new(IpcSession::new(
            config.channel.clone(),
            config.timeouts,
            Arc::clone(&transport) as Arc<dyn crate::ports::LinkTransport>,
        ));

        Self {
            config,
            transport,
            control,
            bus,
            session,
        }
    }

    pub(crate) fn power(&self) -> PowerSequencer {
        PowerSequencer::new(
            &self.config.rails,
            Arc::clone(&self.control) as Arc<dyn Regulator>,
            Arc::clone(&self.bus) as Arc<dyn Regulator>,
        )
    }

    /// State machine already moved to `Init`.
    pub(crate) async fn machine(&self) -> DeviceStateMachine {
        let machine = DeviceStateMachine::new(self.power(), Arc::clone(&self.session));
        machine.initialize().await;
        machine
    }

    /// State machine brought up to `RsbConfigured` over an open channel.
    pub(crate) async fn configured_machine(&self) -> DeviceStateMachine {
        self.session.open().await.expect("open channel");
        let machine = self.machine().await;
        let state = machine.bring_up().await.expect("bring-up");
        assert_eq!(state, OperatingState::RsbConfigured);
        machine
    }

    pub(crate) async fn enabled_machine(&self) -> DeviceStateMachine {
        let machine = self.configured_machine().await;
        let state = machine.enable_delivery().await.expect("enable delivery");
        assert_eq!(state, OperatingState::RsbEnabled);
        machine
    }
}
