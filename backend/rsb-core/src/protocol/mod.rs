//! Request/response commands understood by the companion's RSB service.

use crate::error::protocol::ProtocolError;
use crate::session::IpcSession;

use common::ErrorLocation;
use models::{RsbCommand, RsbMessage};

use std::panic::Location;
use std::sync::Arc;

use log::{debug, error};

pub struct ProtocolClient {
    session: Arc<IpcSession>,
}

impl ProtocolClient {
    pub fn new(session: Arc<IpcSession>) -> Self {
        Self { session }
    }

    /// Ask the companion to bring its RSB logic up or down.
    ///
    /// Waits for the send acknowledgement, then for the 4-byte reply, which must
    /// be `0x01`. Any failure means the command is treated as not applied.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Session`] for a missing channel, transport failure or timeout
    /// - [`ProtocolError::Nack`] if the reply is anything other than `0x01`
    pub async fn configure(&self, enable: bool) -> Result<(), ProtocolError> {
        let message = RsbMessage::new(RsbCommand::Configure, enable);

        let mut exchange = self.session.begin_exchange().await?;
        exchange.queue_intent()?;
        exchange.send(&message).await?;
        let response = exchange.await_response().await?;

        if !response.is_configure_ack() {
            error!("Bad RSB configure response {:#x}", response.value());
            return Err(ProtocolError::Nack {
                value: response.value(),
                message: format!("{message} answered with {:#x}", response.value()),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        debug!("{message} acknowledged");
        Ok(())
    }

    /// Start or stop motion delivery. Only the send acknowledgement is awaited.
    pub async fn set_delivery(&self, enable: bool) -> Result<(), ProtocolError> {
        let message = RsbMessage::new(RsbCommand::Delivery, enable);

        let mut exchange = self.session.begin_exchange().await?;
        exchange.queue_intent()?;
        exchange.send(&message).await?;

        debug!("{message} sent");
        Ok(())
    }
}
