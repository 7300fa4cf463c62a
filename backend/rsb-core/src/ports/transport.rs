use crate::config::ChannelConfig;
use crate::ports::Fault;
use crate::recovery::LinkNotifier;
use crate::session::ChannelNotifier;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::Arc;

use uuid::Uuid;

/// Identity of one exchange, handed to the transport with every intent and
/// transmit and echoed back in the matching completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    pub fn new() -> Self {
        ExchangeId(Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ExchangeId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.0)
    }
}

/// IPC link layer towards the companion processor.
pub trait LinkTransport: Send + Sync {
    /// Subscribe to up/down changes of the link identified by `edge`/`transport`.
    fn register_link_state(
        &self,
        edge: &str,
        transport: &str,
        notifier: LinkNotifier,
    ) -> Result<(), Fault>;

    fn unregister_link_state(&self, edge: &str, transport: &str);

    /// Start opening a channel. Readiness is reported later through
    /// [`ChannelNotifier::connected`].
    fn open(
        &self,
        config: &ChannelConfig,
        notifier: ChannelNotifier,
    ) -> Result<Arc<dyn Channel>, Fault>;
}

/// An opened channel.
///
/// Completions for calls made here arrive on the [`ChannelNotifier`] passed to
/// [`LinkTransport::open`], possibly from another thread and possibly before
/// the call returns.
pub trait Channel: Send + Sync {
    /// Queue one single-use receive buffer of `size` bytes for the peer's reply.
    fn queue_rx_intent(&self, exchange: ExchangeId, size: usize) -> Result<(), Fault>;

    /// Transmit `payload`, requesting the peer to have an intent ready.
    fn tx(&self, exchange: ExchangeId, payload: &[u8]) -> Result<(), Fault>;

    /// Return the receive buffer used for `exchange`'s reply.
    fn rx_done(&self, exchange: ExchangeId);

    fn close(&self);
}
