use crate::device::DeviceStateMachine;
use crate::device::actor::{DeliveryRequest, LifecycleCommand, delivery_actor, lifecycle_actor};
use crate::device::machine::DeviceSnapshot;
use crate::error::device::DeviceError;

use common::ErrorLocation;
use models::OperatingState;

use std::panic::Location;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const DELIVERY_QUEUE_DEPTH: usize = 100;

/// Cloneable front door to the device.
///
/// All clones feed the same two actors. Notification methods never wait, so
/// they are safe to call from transport and subsystem callbacks.
#[derive(Clone)]
pub struct DeviceHandle {
    machine: Arc<DeviceStateMachine>,
    lifecycle_tx: mpsc::UnboundedSender<LifecycleCommand>,
    delivery_tx: mpsc::Sender<DeliveryRequest>,
}

/// Join handles of the device actors.
pub struct DeviceTasks {
    lifecycle: JoinHandle<()>,
    delivery: JoinHandle<()>,
}

impl DeviceTasks {
    /// Stop both actors, abandoning any queued work.
    pub async fn stop(self) {
        self.lifecycle.abort();
        self.delivery.abort();
        let _ = self.lifecycle.await;
        let _ = self.delivery.await;
        info!("Device actors stopped");
    }
}

impl DeviceHandle {
    /// Spawn the lifecycle and delivery actors for `machine`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(machine: Arc<DeviceStateMachine>) -> (Self, DeviceTasks) {
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);

        let tasks = DeviceTasks {
            lifecycle: tokio::spawn(lifecycle_actor(lifecycle_rx, Arc::clone(&machine))),
            delivery: tokio::spawn(delivery_actor(delivery_rx, Arc::clone(&machine))),
        };

        let handle = Self {
            machine,
            lifecycle_tx,
            delivery_tx,
        };

        (handle, tasks)
    }

    pub fn machine(&self) -> &Arc<DeviceStateMachine> {
        &self.machine
    }

    pub fn state(&self) -> OperatingState {
        self.machine.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperatingState> {
        self.machine.subscribe()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.machine.snapshot()
    }

    /// Companion is going down: abort in-flight work and queue the shutdown.
    pub fn notify_shutdown(&self) {
        self.machine.preempt();
        if self
            .lifecycle_tx
            .send(LifecycleCommand::Shutdown { reply: None })
            .is_err()
        {
            warn!("Lifecycle actor gone, shutdown notice dropped");
        }
    }

    /// Companion powered up: queue a bring-up. Ignored by the actor unless the
    /// device is in `Init` when it gets there.
    pub fn notify_powerup(&self) {
        let command = LifecycleCommand::BringUp {
            epoch: self.machine.epoch(),
            reply: None,
        };
        if self.lifecycle_tx.send(command).is_err() {
            warn!("Lifecycle actor gone, power-up notice dropped");
        }
    }

    /// Queue a delivery change without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unavailable`] if the queue is full or the actor is gone.
    pub fn request_delivery(&self, enable: bool) -> Result<(), DeviceError> {
        let request = DeliveryRequest {
            enable,
            epoch: self.machine.epoch(),
            reply: None,
        };

        self.delivery_tx.try_send(request).map_err(|e| {
            let reason = match e {
                TrySendError::Full(_) => "Delivery queue is full",
                TrySendError::Closed(_) => "Delivery actor died",
            };
            DeviceError::Unavailable {
                message: reason.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }

    /// Run a delivery change on the delivery actor and wait for its outcome.
    pub async fn set_delivery(&self, enable: bool) -> Result<OperatingState, DeviceError> {
        let (reply, outcome) = oneshot::channel();
        let request = DeliveryRequest {
            enable,
            epoch: self.machine.epoch(),
            reply: Some(reply),
        };

        self.delivery_tx
            .send(request)
            .await
            .map_err(|_| Self::unavailable("Delivery actor died"))?;

        Self::outcome(outcome).await
    }

    /// Run a bring-up on the lifecycle actor and wait for its outcome.
    pub async fn bring_up(&self) -> Result<OperatingState, DeviceError> {
        let (reply, outcome) = oneshot::channel();
        self.send_lifecycle(LifecycleCommand::BringUp {
            epoch: self.machine.epoch(),
            reply: Some(reply),
        })?;

        Self::outcome(outcome).await
    }

    /// Preempt in-flight work, then run a shutdown and wait for it.
    pub async fn shutdown(&self) -> Result<OperatingState, DeviceError> {
        let (reply, outcome) = oneshot::channel();
        self.machine.preempt();
        self.send_lifecycle(LifecycleCommand::Shutdown { reply: Some(reply) })?;

        Self::outcome(outcome).await
    }

    pub async fn suspend(&self) -> Result<OperatingState, DeviceError> {
        self.machine.suspend().await
    }

    pub async fn resume(&self) -> Result<OperatingState, DeviceError> {
        self.machine.resume().await
    }

    #[track_caller]
    fn send_lifecycle(&self, command: LifecycleCommand) -> Result<(), DeviceError> {
        self.lifecycle_tx
            .send(command)
            .map_err(|_| Self::unavailable("Lifecycle actor died"))
    }

    async fn outcome(
        outcome: oneshot::Receiver<Result<OperatingState, DeviceError>>,
    ) -> Result<OperatingState, DeviceError> {
        outcome
            .await
            .map_err(|_| Self::unavailable("Actor stopped before replying"))?
    }

    #[track_caller]
    fn unavailable(reason: &str) -> DeviceError {
        DeviceError::Unavailable {
            message: reason.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
