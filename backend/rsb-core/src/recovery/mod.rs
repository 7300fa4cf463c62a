//! Recovery coordination.
//!
//! Turns link-state and companion lifecycle notifications into work:
//!
//! - link up/down → open/close the session on the channel-lifecycle actor
//! - before-shutdown → preempt and queue a forced shutdown
//! - after-powerup → queue a bring-up
//!
//! The notifiers handed to the transport and to the subsystem restart service
//! are plain handles bound to this coordinator; calling them never blocks.

use crate::device::DeviceHandle;
use crate::session::IpcSession;

use models::{LinkState, SubsystemEvent};

use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Link-state callback handle given to the transport.
#[derive(Clone)]
pub struct LinkNotifier {
    session: Arc<IpcSession>,
    link_tx: mpsc::UnboundedSender<LinkState>,
}

impl LinkNotifier {
    pub fn notify(&self, state: LinkState) {
        info!("Link state changed to {state:?}");
        self.session.record_link_state(state);
        if self.link_tx.send(state).is_err() {
            warn!("Channel lifecycle actor gone, link {state:?} dropped");
        }
    }
}

/// Lifecycle callback handle given to the subsystem restart service.
#[derive(Clone)]
pub struct SubsystemNotifier {
    device: DeviceHandle,
}

impl SubsystemNotifier {
    pub fn notify(&self, event: SubsystemEvent) {
        info!("Companion event {event:?}");
        match event {
            SubsystemEvent::BeforeShutdown => self.device.notify_shutdown(),
            SubsystemEvent::AfterPowerup => self.device.notify_powerup(),
        }
    }
}

pub struct RecoveryCoordinator {
    session: Arc<IpcSession>,
    device: DeviceHandle,
    link_tx: mpsc::UnboundedSender<LinkState>,
    channel_task: JoinHandle<()>,
}

impl RecoveryCoordinator {
    /// Spawn the channel-lifecycle actor. Must be called from within a tokio runtime.
    pub fn start(session: Arc<IpcSession>, device: DeviceHandle) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let channel_task = tokio::spawn(channel_actor(link_rx, Arc::clone(&session)));

        Self {
            session,
            device,
            link_tx,
            channel_task,
        }
    }

    pub fn link_notifier(&self) -> LinkNotifier {
        LinkNotifier {
            session: Arc::clone(&self.session),
            link_tx: self.link_tx.clone(),
        }
    }

    pub fn subsystem_notifier(&self) -> SubsystemNotifier {
        SubsystemNotifier {
            device: self.device.clone(),
        }
    }

    /// Stop the channel-lifecycle actor and close the session.
    pub async fn stop(self) {
        self.channel_task.abort();
        let _ = self.channel_task.await;
        self.session.close();
        info!("Recovery coordinator stopped");
    }
}

async fn channel_actor(mut link_rx: mpsc::UnboundedReceiver<LinkState>, session: Arc<IpcSession>) {
    info!("Channel lifecycle actor started");

    while let Some(state) = link_rx.recv().await {
        match state {
            LinkState::Up => {
                if let Err(e) = session.open().await {
                    error!("Channel open failed: {e}");
                }
            }
            LinkState::Down => session.close(),
        }
    }

    warn!("Channel lifecycle actor stopped");
}
