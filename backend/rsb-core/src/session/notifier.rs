use crate::ports::ExchangeId;
use crate::session::{ChannelState, SessionShared};
use crate::sync::lock;

use models::RsbResponse;
use models::wire::RX_INTENT_SIZE;

use std::sync::Arc;

use log::{debug, info, warn};

/// Which side tore the channel down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCause {
    Remote,
    Local,
}

/// Callback handle given to the transport for one channel.
///
/// Every method is synchronous, never blocks on the session's async work and
/// may be called from any thread. Calls from a channel the session has since
/// closed or replaced are ignored.
#[derive(Clone)]
pub struct ChannelNotifier {
    shared: Arc<SessionShared>,
    generation: u64,
}

impl ChannelNotifier {
    pub(crate) fn new(shared: Arc<SessionShared>, generation: u64) -> Self {
        Self { shared, generation }
    }

    fn is_stale(&self, what: &str) -> bool {
        let stale = !self.shared.is_current(self.generation);
        if stale {
            debug!("Ignoring {what} from stale channel generation {}", self.generation);
        }
        stale
    }

    pub fn connected(&self) {
        if self.is_stale("connected") {
            return;
        }

        let signal = {
            let mut slot = lock(&self.shared.connect_signal);
            match slot.take() {
                Some((generation, tx)) if generation == self.generation => Some(tx),
                other => {
                    *slot = other;
                    None
                }
            }
        };

        match signal {
            Some(tx) => {
                let _ = tx.send(());
            }
            None => {
                self.shared.status.send_replace(ChannelState::Connected);
                info!("Channel reconnected");
            }
        }
    }

    pub fn disconnected(&self, cause: DisconnectCause) {
        if self.is_stale("disconnect") {
            return;
        }

        self.shared.status.send_replace(ChannelState::Disconnected);
        self.shared.abort_pending();
        info!("Channel disconnected ({cause:?})");
    }

    /// The transmit for `exchange` left the local side.
    pub fn tx_done(&self, exchange: ExchangeId) {
        if self.is_stale("tx done") {
            return;
        }

        let sender = lock(&self.shared.pending)
            .as_mut()
            .filter(|pending| pending.id == exchange)
            .and_then(|pending| pending.tx_done.take());

        match sender {
            Some(tx) => {
                let _ = tx.send(());
            }
            None => debug!("Discarding late tx done for exchange {exchange}"),
        }
    }

    /// The peer's reply landed in the intent queued for `exchange`.
    ///
    /// Payloads longer than the intent are dropped without copying. The
    /// receive buffer goes back to the transport whether or not the payload
    /// was used.
    pub fn rx(&self, exchange: ExchangeId, payload: &[u8]) {
        if self.is_stale("rx") {
            return;
        }

        self.deliver(exchange, payload);
        self.shared.release(exchange);
    }

    fn deliver(&self, exchange: ExchangeId, payload: &[u8]) {
        let response = match RsbResponse::from_payload(payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Dropping {} byte response for exchange {exchange}, intent is {RX_INTENT_SIZE}: {e}",
                    payload.len()
                );
                return;
            }
        };

        let sender = lock(&self.shared.pending)
            .as_mut()
            .filter(|pending| pending.id == exchange)
            .and_then(|pending| pending.response.take());

        match sender {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => debug!("Discarding late response for exchange {exchange}"),
        }
    }
}
