//! Single-consumer tasks serializing lifecycle and delivery work.

use crate::device::DeviceStateMachine;
use crate::error::device::DeviceError;

use models::OperatingState;

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};

pub(crate) type Reply = oneshot::Sender<Result<OperatingState, DeviceError>>;

/// Work for the lifecycle actor.
pub(crate) enum LifecycleCommand {
    /// Companion announced a shutdown. Always runs to completion.
    Shutdown { reply: Option<Reply> },

    /// Companion powered up; `epoch` is the shutdown epoch at the time of the notice.
    BringUp { epoch: u64, reply: Option<Reply> },
}

/// Work for the delivery actor.
pub(crate) struct DeliveryRequest {
    pub(crate) enable: bool,
    pub(crate) epoch: u64,
    pub(crate) reply: Option<Reply>,
}

/// Hand the outcome to the waiting caller, or log it for fire-and-forget work.
fn settle(what: &str, result: Result<OperatingState, DeviceError>, reply: Option<Reply>) {
    match reply {
        Some(reply) => {
            if reply.send(result).is_err() {
                debug!("Caller stopped waiting for {what}");
            }
        }
        None => match result {
            Ok(state) => debug!("{what} finished in {state}"),
            Err(e) if !e.is_failure() => debug!("{what} skipped: {e}"),
            Err(e) => error!("{what} failed: {e}"),
        },
    }
}

pub(crate) async fn lifecycle_actor(
    mut command_rx: mpsc::UnboundedReceiver<LifecycleCommand>,
    machine: Arc<DeviceStateMachine>,
) {
    info!("Lifecycle actor started");

    while let Some(command) = command_rx.recv().await {
        match command {
            LifecycleCommand::Shutdown { reply } => {
                let state = machine.shutdown().await;
                settle("Shutdown", Ok(state), reply);
            }
            LifecycleCommand::BringUp { epoch, reply } => {
                let result = machine.bring_up_within(epoch).await;
                settle("Bring-up", result, reply);
            }
        }
    }

    warn!("Lifecycle actor stopped");
}

pub(crate) async fn delivery_actor(
    mut request_rx: mpsc::Receiver<DeliveryRequest>,
    machine: Arc<DeviceStateMachine>,
) {
    info!("Delivery actor started");

    while let Some(request) = request_rx.recv().await {
        let what = if request.enable {
            "Delivery enable"
        } else {
            "Delivery disable"
        };
        let result = machine
            .set_delivery_within(request.enable, request.epoch)
            .await;
        settle(what, result, request.reply);
    }

    warn!("Delivery actor stopped");
}
