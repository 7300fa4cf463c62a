use crate::error::session::SessionError;
use crate::ports::{Channel, ExchangeId};
use crate::session::{IpcSession, PendingExchange};
use crate::sync::lock;

use common::ErrorLocation;
use models::wire::RX_INTENT_SIZE;
use models::{RsbMessage, RsbResponse};

use std::panic::Location;
use std::sync::Arc;

use log::{debug, error};
use tokio::sync::{MutexGuard, oneshot};
use tokio::time::timeout as TokioTimeout;

/// One request/optional-response round trip.
///
/// Holds the session's exchange lock until dropped. Dropping the exchange,
/// including cancelling the future that owns it, clears its completion slot so
/// late completions cannot reach the next exchange.
pub struct Exchange<'a> {
    session: &'a IpcSession,
    id: ExchangeId,
    channel: Arc<dyn Channel>,
    tx_done: Option<oneshot::Receiver<()>>,
    response: Option<oneshot::Receiver<RsbResponse>>,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> Exchange<'a> {
    pub(crate) fn new(
        session: &'a IpcSession,
        channel: Arc<dyn Channel>,
        guard: MutexGuard<'a, ()>,
    ) -> Self {
        let id = ExchangeId::new();
        let (tx_done_tx, tx_done_rx) = oneshot::channel();
        let (response_tx, response_rx) = oneshot::channel();

        *lock(&session.shared().pending) = Some(PendingExchange {
            id,
            tx_done: Some(tx_done_tx),
            response: Some(response_tx),
        });

        Self {
            session,
            id,
            channel,
            tx_done: Some(tx_done_rx),
            response: Some(response_rx),
            _guard: guard,
        }
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    /// Queue the single receive intent this exchange may be answered into.
    pub fn queue_intent(&self) -> Result<(), SessionError> {
        self.channel
            .queue_rx_intent(self.id, RX_INTENT_SIZE)
            .map_err(|fault| {
                error!("Failed to queue intent: {fault}");
                SessionError::Transport {
                    message: format!("Failed to queue receive intent: {fault}"),
                    location: ErrorLocation::from(Location::caller()),
                }
            })
    }

    /// Transmit `message` and wait for the send acknowledgement.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Transport`] if the transport rejects the transmit
    /// - [`SessionError::Timeout`] if no acknowledgement arrives within `send_ack`
    /// - [`SessionError::NotConnected`] if the channel drops while waiting
    pub async fn send(&mut self, message: &RsbMessage) -> Result<(), SessionError> {
        let Some(tx_done) = self.tx_done.take() else {
            return Err(SessionError::Transport {
                message: format!("Exchange {} already sent", self.id),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        debug!("Exchange {} sending {message}", self.id);
        self.channel.tx(self.id, &message.encode()).map_err(|fault| {
            error!("Failed to send command: {fault}");
            SessionError::Transport {
                message: format!("Failed to send {message}: {fault}"),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let budget = self.session.timeouts().send_ack();
        match TokioTimeout(budget, tx_done).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(self.dropped("send acknowledgement")),
            Err(_) => {
                error!("Timed out waiting for {message} to send");
                Err(SessionError::Timeout {
                    message: format!("No send acknowledgement for {message} within {budget:?}"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    /// Wait for the peer's reply to the transmitted request.
    pub async fn await_response(&mut self) -> Result<RsbResponse, SessionError> {
        let Some(response) = self.response.take() else {
            return Err(SessionError::Transport {
                message: format!("Exchange {} response already consumed", self.id),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let budget = self.session.timeouts().response();
        match TokioTimeout(budget, response).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(self.dropped("response")),
            Err(_) => {
                error!("Timed out waiting for response");
                Err(SessionError::Timeout {
                    message: format!("No response within {budget:?}"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    #[track_caller]
    fn dropped(&self, what: &str) -> SessionError {
        SessionError::NotConnected {
            message: format!("Channel went down awaiting {what} for exchange {}", self.id),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        let mut pending = lock(&self.session.shared().pending);
        if pending.as_ref().is_some_and(|p| p.id == self.id) {
            *pending = None;
        }
    }
}
