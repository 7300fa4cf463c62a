use crate::config::ChannelConfig;
use crate::ports::{Channel, ExchangeId, Fault, LinkTransport};
use crate::recovery::LinkNotifier;
use crate::session::{ChannelNotifier, DisconnectCause};
use crate::sim::{EIO, ENODEV, ENOTCONN};
use crate::sync::lock;

use models::wire::CONFIGURE_ACK;
use models::{LinkState, RsbCommand, RsbMessage};

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

/// When the peer acknowledges a transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// From inside the transmit call.
    Immediate,
    /// Never.
    Never,
    /// After the given delay, from a spawned task.
    Delayed(Duration),
}

/// How the peer answers a configure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureReply {
    Value(u32),
    /// No reply at all.
    Silent,
    /// An 8-byte reply, larger than any intent.
    Oversized,
}

#[derive(Debug, Clone, Copy)]
struct PeerScript {
    auto_connect: bool,
    refuse_open: bool,
    fail_tx: bool,
    ack: AckMode,
    configure_reply: ConfigureReply,
}

impl Default for PeerScript {
    fn default() -> Self {
        Self {
            auto_connect: true,
            refuse_open: false,
            fail_tx: false,
            ack: AckMode::Immediate,
            configure_reply: ConfigureReply::Value(CONFIGURE_ACK),
        }
    }
}

#[derive(Default)]
struct Peer {
    script: Mutex<PeerScript>,
    sent: Mutex<Vec<RsbMessage>>,
    intents: Mutex<usize>,
    released: Mutex<usize>,
}

/// Loopback transport with a scriptable companion on the other end.
///
/// By default the peer connects as soon as a channel is opened, acknowledges
/// every transmit immediately and answers configure with `0x01`.
#[derive(Default)]
pub struct SimTransport {
    peer: Arc<Peer>,
    link: Mutex<Option<LinkNotifier>>,
    channels: Mutex<Vec<Arc<SimChannel>>>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, change: impl FnOnce(&mut PeerScript)) {
        change(&mut lock(&self.peer.script));
    }

    pub fn set_auto_connect(&self, auto_connect: bool) {
        self.script(|script| script.auto_connect = auto_connect);
    }

    pub fn set_refuse_open(&self, refuse: bool) {
        self.script(|script| script.refuse_open = refuse);
    }

    pub fn set_fail_tx(&self, fail: bool) {
        self.script(|script| script.fail_tx = fail);
    }

    pub fn set_ack(&self, ack: AckMode) {
        self.script(|script| script.ack = ack);
    }

    pub fn set_configure_reply(&self, reply: ConfigureReply) {
        self.script(|script| script.configure_reply = reply);
    }

    pub fn is_link_registered(&self) -> bool {
        lock(&self.link).is_some()
    }

    /// Announce the link as up, as the link layer would.
    pub fn link_up(&self) {
        self.announce(LinkState::Up);
    }

    pub fn link_down(&self) {
        self.announce(LinkState::Down);
    }

    fn announce(&self, state: LinkState) {
        let notifier = lock(&self.link).clone();
        match notifier {
            Some(notifier) => notifier.notify(state),
            None => warn!("No link listener for {state:?}"),
        }
    }

    /// Every message transmitted so far, in order.
    pub fn sent(&self) -> Vec<RsbMessage> {
        lock(&self.peer.sent).clone()
    }

    pub fn sent_count(&self, command: RsbCommand) -> usize {
        lock(&self.peer.sent)
            .iter()
            .filter(|message| message.command() == Some(command))
            .count()
    }

    pub fn intents_queued(&self) -> usize {
        *lock(&self.peer.intents)
    }

    /// Receive buffers handed back by the session.
    pub fn rx_released(&self) -> usize {
        *lock(&self.peer.released)
    }

    pub fn open_count(&self) -> usize {
        lock(&self.channels).len()
    }

    /// Most recently opened channel.
    pub fn channel(&self) -> Option<Arc<SimChannel>> {
        lock(&self.channels).last().cloned()
    }
}

impl LinkTransport for SimTransport {
    fn register_link_state(
        &self,
        edge: &str,
        transport: &str,
        notifier: LinkNotifier,
    ) -> Result<(), Fault> {
        debug!("Link listener registered for {edge}/{transport}");
        *lock(&self.link) = Some(notifier);
        Ok(())
    }

    fn unregister_link_state(&self, edge: &str, transport: &str) {
        debug!("Link listener removed for {edge}/{transport}");
        *lock(&self.link) = None;
    }

    fn open(
        &self,
        config: &ChannelConfig,
        notifier: ChannelNotifier,
    ) -> Result<Arc<dyn Channel>, Fault> {
        let script = *lock(&self.peer.script);
        if script.refuse_open {
            return Err(Fault::new(ENODEV, format!("Cannot open {}", config.name)));
        }

        let channel = Arc::new(SimChannel {
            notifier,
            peer: Arc::clone(&self.peer),
            closed: AtomicBool::new(false),
            intents: Mutex::new(HashSet::new()),
        });
        lock(&self.channels).push(Arc::clone(&channel));

        if script.auto_connect {
            channel.notifier.connected();
        }

        Ok(channel)
    }
}

/// Channel end held by the session.
pub struct SimChannel {
    notifier: ChannelNotifier,
    peer: Arc<Peer>,
    closed: AtomicBool,
    intents: Mutex<HashSet<ExchangeId>>,
}

impl SimChannel {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Report the channel connected (when auto-connect is off).
    pub fn connect(&self) {
        self.notifier.connected();
    }

    /// The companion tore the channel down.
    pub fn remote_disconnect(&self) {
        self.notifier.disconnected(DisconnectCause::Remote);
    }

    /// Deliver `payload` as the reply to `exchange`, bypassing the script.
    pub fn reply(&self, exchange: ExchangeId, payload: &[u8]) {
        self.notifier.rx(exchange, payload);
    }

    /// Acknowledge the transmit of `exchange`, bypassing the script.
    pub fn ack(&self, exchange: ExchangeId) {
        self.notifier.tx_done(exchange);
    }

    fn answer(notifier: &ChannelNotifier, exchange: ExchangeId, reply: Option<ConfigureReply>) {
        notifier.tx_done(exchange);
        match reply {
            Some(ConfigureReply::Value(value)) => notifier.rx(exchange, &value.to_le_bytes()),
            Some(ConfigureReply::Oversized) => notifier.rx(exchange, &[0u8; 8]),
            Some(ConfigureReply::Silent) | None => {}
        }
    }
}

impl Channel for SimChannel {
    fn queue_rx_intent(&self, exchange: ExchangeId, size: usize) -> Result<(), Fault> {
        if self.is_closed() {
            return Err(Fault::new(ENOTCONN, "Channel closed"));
        }
        debug!("Intent of {size} bytes queued for {exchange}");
        lock(&self.intents).insert(exchange);
        *lock(&self.peer.intents) += 1;
        Ok(())
    }

    fn tx(&self, exchange: ExchangeId, payload: &[u8]) -> Result<(), Fault> {
        if self.is_closed() {
            return Err(Fault::new(ENOTCONN, "Channel closed"));
        }

        let script = *lock(&self.peer.script);
        if script.fail_tx {
            return Err(Fault::new(EIO, "Transmit failed"));
        }

        let message = RsbMessage::decode(payload)
            .map_err(|e| Fault::new(EIO, format!("Peer cannot decode request: {e}")))?;
        lock(&self.peer.sent).push(message);

        // Only configure is answered, and only into an intent queued for it.
        let reply = match message.command() {
            Some(RsbCommand::Configure) if lock(&self.intents).remove(&exchange) => {
                Some(script.configure_reply)
            }
            _ => None,
        };

        match script.ack {
            AckMode::Immediate => Self::answer(&self.notifier, exchange, reply),
            AckMode::Never => {}
            AckMode::Delayed(delay) => {
                let notifier = self.notifier.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    Self::answer(&notifier, exchange, reply);
                });
            }
        }

        Ok(())
    }

    fn rx_done(&self, exchange: ExchangeId) {
        debug!("Rx buffer of {exchange} released");
        *lock(&self.peer.released) += 1;
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.notifier.disconnected(DisconnectCause::Local);
        }
    }
}
