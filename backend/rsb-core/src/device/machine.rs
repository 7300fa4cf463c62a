use crate::error::device::DeviceError;
use crate::error::rail::RailError;
use crate::power::PowerSequencer;
use crate::protocol::ProtocolClient;
use crate::session::{ChannelState, IpcSession};
use crate::sync::lock;

use common::ErrorLocation;
use models::{LinkState, OperatingState, Rail};

use std::future::{Future, pending};
use std::panic::Location;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, watch};

/// Transition currently holding the state lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PendingAction {
    Attach,
    BringUp,
    Shutdown,
    EnableDelivery,
    DisableDelivery,
    Suspend,
    Resume,
}

/// Point-in-time view of the device, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    pub state: OperatingState,
    pub pending: Option<PendingAction>,
    pub channel: ChannelState,
    pub link: LinkState,
    pub control_rail: bool,
    pub bus_rail: bool,
}

/// Single source of truth for the operating state.
pub struct DeviceStateMachine {
    state: Mutex<OperatingState>,
    power: PowerSequencer,
    protocol: ProtocolClient,
    session: Arc<IpcSession>,
    link_wait: Duration,
    published: watch::Sender<OperatingState>,
    shutdown_epoch: watch::Sender<u64>,
    pending: StdMutex<Option<PendingAction>>,
}

/// Holds the state lock for one transition.
///
/// Dropping it, including by cancellation, clears the pending marker and
/// publishes the state if it came to rest in a stable one.
struct Transition<'a> {
    machine: &'a DeviceStateMachine,
    state: MutexGuard<'a, OperatingState>,
}

impl Transition<'_> {
    fn current(&self) -> OperatingState {
        *self.state
    }

    fn set(&mut self, next: OperatingState) {
        if *self.state != next {
            debug!("State {} -> {}", *self.state, next);
            *self.state = next;
        }
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        *lock(&self.machine.pending) = None;

        let state = *self.state;
        let power = &self.machine.power;
        for (rail, expected) in [
            (Rail::Control, state.requires_control_rail()),
            (Rail::Bus, state.requires_bus_rail()),
        ] {
            if power.is_enabled(rail) != expected {
                warn!(
                    "{rail} is {} in {state}",
                    if expected { "off" } else { "still on" }
                );
            }
        }

        if !state.is_stable() {
            warn!("Transition abandoned in {state}");
            return;
        }

        self.machine.published.send_if_modified(|published| {
            if *published != state {
                *published = state;
                true
            } else {
                false
            }
        });
    }
}

impl DeviceStateMachine {
    pub fn new(power: PowerSequencer, session: Arc<IpcSession>) -> Self {
        let (published, _) = watch::channel(OperatingState::Unknown);
        let (shutdown_epoch, _) = watch::channel(0);

        Self {
            state: Mutex::new(OperatingState::Unknown),
            power,
            protocol: ProtocolClient::new(Arc::clone(&session)),
            link_wait: session.timeouts().link_wait(),
            session,
            published,
            shutdown_epoch,
            pending: StdMutex::new(None),
        }
    }

    async fn begin(&self, action: PendingAction) -> Transition<'_> {
        let state = self.state.lock().await;
        *lock(&self.pending) = Some(action);
        Transition {
            machine: self,
            state,
        }
    }

    /// Last stable state reached.
    pub fn state(&self) -> OperatingState {
        *self.published.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperatingState> {
        self.published.subscribe()
    }

    pub fn power(&self) -> &PowerSequencer {
        &self.power
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            state: self.state(),
            pending: *lock(&self.pending),
            channel: self.session.channel_state(),
            link: self.session.link_state(),
            control_rail: self.power.is_enabled(Rail::Control),
            bus_rail: self.power.is_enabled(Rail::Bus),
        }
    }

    /// Move from `Unknown` to `Init`. Called once at attach.
    pub async fn initialize(&self) -> OperatingState {
        let mut transition = self.begin(PendingAction::Attach).await;
        if transition.current() == OperatingState::Unknown {
            transition.set(OperatingState::Init);
        }
        transition.current()
    }

    pub(crate) fn epoch(&self) -> u64 {
        *self.shutdown_epoch.borrow()
    }

    /// Abort bring-up and delivery work started before now.
    pub(crate) fn preempt(&self) {
        self.shutdown_epoch.send_modify(|epoch| *epoch += 1);
    }

    async fn preemptible<T>(
        &self,
        epoch: u64,
        work: impl Future<Output = Result<T, DeviceError>>,
    ) -> Result<T, DeviceError> {
        let mut epochs = self.shutdown_epoch.subscribe();
        let preempted = async move {
            loop {
                if *epochs.borrow_and_update() != epoch {
                    return;
                }
                if epochs.changed().await.is_err() {
                    pending::<()>().await;
                }
            }
        };

        tokio::select! {
            biased;
            () = preempted => {
                warn!("Transition preempted by companion shutdown");
                Err(DeviceError::Preempted {
                    message: "Companion is shutting down".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            result = work => result,
        }
    }

    /// Forced power-down after the companion announced a shutdown.
    ///
    /// Rails are switched off bus first, each on a best-effort basis. The state
    /// always ends at `Init`.
    pub async fn shutdown(&self) -> OperatingState {
        let mut transition = self.begin(PendingAction::Shutdown).await;

        for rail in [Rail::Bus, Rail::Control] {
            if self.power.is_enabled(rail) {
                if let Err(e) = self.power.set(rail, false) {
                    warn!("Ignoring {rail} failure during shutdown: {e}");
                }
            }
        }

        transition.set(OperatingState::Init);
        info!("RSB shut down");
        OperatingState::Init
    }

    /// Power the control rail, wait for the channel and configure the RSB.
    ///
    /// Only valid from `Init`. On any failure the control rail is switched off
    /// again and the state stays `Init`, unless switching it off fails too.
    pub async fn bring_up(&self) -> Result<OperatingState, DeviceError> {
        self.bring_up_within(self.epoch()).await
    }

    pub(crate) async fn bring_up_within(&self, epoch: u64) -> Result<OperatingState, DeviceError> {
        self.preemptible(epoch, self.run_bring_up()).await
    }

    async fn run_bring_up(&self) -> Result<OperatingState, DeviceError> {
        let mut transition = self.begin(PendingAction::BringUp).await;
        match transition.current() {
            OperatingState::Init => {}
            state @ (OperatingState::RsbConfigured | OperatingState::RsbEnabled) => {
                return Err(DeviceError::AlreadyInState {
                    state,
                    message: "RSB is already configured".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            state => {
                return Err(DeviceError::InvalidState {
                    state,
                    message: "Bring-up requires init".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        self.power.set(Rail::Control, true)?;
        transition.set(OperatingState::Ldo11Enabled);

        if let Err(e) = self.session.wait_connected(self.link_wait).await {
            error!("Channel connection time out");
            let _ = self.roll_back(&mut transition, Rail::Control, OperatingState::Init);
            return Err(e.into());
        }

        if let Err(e) = self.protocol.configure(true).await {
            error!("Companion failed to configure RSB: {e}");
            let _ = self.roll_back(&mut transition, Rail::Control, OperatingState::Init);
            return Err(e.into());
        }

        transition.set(OperatingState::RsbConfigured);
        info!("RSB configured");
        Ok(OperatingState::RsbConfigured)
    }

    /// Switch `rail` back off after a failed step and settle in `fallback`.
    ///
    /// If the disable fails the rail is still on, so the state stays on the
    /// transient label that says so. It is not published; the next shutdown
    /// retries the rail and settles in `Init`.
    fn roll_back(
        &self,
        transition: &mut Transition<'_>,
        rail: Rail,
        fallback: OperatingState,
    ) -> Result<(), RailError> {
        self.power.set(rail, false).inspect_err(|e| {
            error!("Rollback of {rail} failed, staying in {}: {e}", transition.current());
        })?;
        transition.set(fallback);
        Ok(())
    }

    /// Power the bus rail and start delivery. Only valid from `RsbConfigured`.
    pub async fn enable_delivery(&self) -> Result<OperatingState, DeviceError> {
        self.set_delivery_within(true, self.epoch()).await
    }

    /// Stop delivery and power the bus rail down. Only meaningful from `RsbEnabled`.
    pub async fn disable_delivery(&self) -> Result<OperatingState, DeviceError> {
        self.set_delivery_within(false, self.epoch()).await
    }

    pub(crate) async fn set_delivery_within(
        &self,
        enable: bool,
        epoch: u64,
    ) -> Result<OperatingState, DeviceError> {
        if enable {
            self.preemptible(epoch, self.run_enable_delivery()).await
        } else {
            self.preemptible(epoch, self.run_disable_delivery()).await
        }
    }

    async fn run_enable_delivery(&self) -> Result<OperatingState, DeviceError> {
        let mut transition = self.begin(PendingAction::EnableDelivery).await;
        match transition.current() {
            OperatingState::RsbConfigured => {}
            state @ OperatingState::RsbEnabled => {
                return Err(DeviceError::AlreadyInState {
                    state,
                    message: "RSB delivery already enabled".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            state => {
                error!("Companion is not yet configured for RSB");
                return Err(DeviceError::InvalidState {
                    state,
                    message: "Enabling delivery requires a configured RSB".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        self.power.set(Rail::Bus, true)?;
        transition.set(OperatingState::Ldo15Enabled);

        if let Err(e) = self.protocol.set_delivery(true).await {
            error!("Failed to send enable command to companion: {e}");
            let _ = self.roll_back(&mut transition, Rail::Bus, OperatingState::RsbConfigured);
            return Err(e.into());
        }

        transition.set(OperatingState::RsbEnabled);
        info!("RSB enabled");
        Ok(OperatingState::RsbEnabled)
    }

    async fn run_disable_delivery(&self) -> Result<OperatingState, DeviceError> {
        let mut transition = self.begin(PendingAction::DisableDelivery).await;
        match transition.current() {
            OperatingState::RsbEnabled => {}
            state @ (OperatingState::Init | OperatingState::RsbConfigured) => {
                return Err(DeviceError::AlreadyInState {
                    state,
                    message: "RSB delivery already disabled".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            state => {
                return Err(DeviceError::InvalidState {
                    state,
                    message: "Disabling delivery requires an enabled RSB".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        self.power.set(Rail::Bus, false)?;
        transition.set(OperatingState::RsbConfigured);

        if let Err(e) = self.protocol.set_delivery(false).await {
            error!("Failed to send disable command to companion: {e}");
            return Err(e.into());
        }

        info!("RSB disabled");
        Ok(OperatingState::RsbConfigured)
    }

    /// Platform suspend. Runs directly under the state lock.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::Rail`] if a rail refuses to switch off; when the bus
    ///   rail fails the control rail is left untouched and the state unchanged
    /// - [`DeviceError::InvalidState`] from a transient state
    pub async fn suspend(&self) -> Result<OperatingState, DeviceError> {
        let mut transition = self.begin(PendingAction::Suspend).await;
        match transition.current() {
            state @ (OperatingState::Unknown | OperatingState::Init) => return Ok(state),
            OperatingState::RsbEnabled => {
                self.power.set(Rail::Bus, false)?;
                transition.set(OperatingState::RsbConfigured);
            }
            OperatingState::RsbConfigured => {}
            state => {
                return Err(DeviceError::InvalidState {
                    state,
                    message: "Cannot suspend mid-transition".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        if let Err(e) = self.power.set(Rail::Control, false) {
            error!("RSB failed to suspend");
            return Err(e.into());
        }

        transition.set(OperatingState::Init);
        debug!("RSB suspended");
        Ok(OperatingState::Init)
    }

    /// Platform resume. Re-powers the control rail after a suspend from `Init`.
    pub async fn resume(&self) -> Result<OperatingState, DeviceError> {
        let mut transition = self.begin(PendingAction::Resume).await;
        match transition.current() {
            state @ OperatingState::RsbConfigured => return Ok(state),
            OperatingState::Init => {}
            state => {
                return Err(DeviceError::InvalidState {
                    state,
                    message: "Resume expects init or a configured RSB".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        if let Err(e) = self.power.set(Rail::Control, true) {
            error!("RSB failed to resume");
            return Err(e.into());
        }

        transition.set(OperatingState::RsbConfigured);
        debug!("RSB resumed");
        Ok(OperatingState::RsbConfigured)
    }
}
