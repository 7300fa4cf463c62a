//! IPC session towards the companion processor.
//!
//! The session owns the channel handle and the per-exchange completion slots.
//!
//! # Channel lifecycle
//!
//! `Disconnected → Connecting → Connected → Disconnected`. [`IpcSession::open`]
//! asks the transport for a channel and waits for its connected notification;
//! [`IpcSession::close`] closes the handle, including one still waiting to
//! connect when the opening future was cancelled. Every open attempt gets a new
//! generation number, and the [`ChannelNotifier`] handed to the transport is
//! stamped with it, so notifications from a closed or abandoned channel are
//! recognised and discarded.
//!
//! # Exchanges
//!
//! An [`Exchange`] holds the session-wide exchange lock for its whole lifetime,
//! so two request/response round trips never interleave. Completions name the
//! exchange they belong to; a completion that arrives after its exchange was
//! abandoned finds a different (or no) exchange in the slot and is dropped.

mod exchange;
mod notifier;

pub use exchange::Exchange;
pub use notifier::{ChannelNotifier, DisconnectCause};

use crate::config::{ChannelConfig, TimeoutConfig};
use crate::error::session::SessionError;
use crate::ports::{Channel, ExchangeId, LinkTransport};
use crate::sync::lock;

use common::ErrorLocation;
use models::{LinkState, RsbResponse};

use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::time::timeout as TokioTimeout;

/// Usability of the channel as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Completion senders for the exchange currently holding the lock.
pub(crate) struct PendingExchange {
    pub(crate) id: ExchangeId,
    pub(crate) tx_done: Option<oneshot::Sender<()>>,
    pub(crate) response: Option<oneshot::Sender<RsbResponse>>,
}

/// Channel handle held by the session.
pub(crate) enum HeldChannel {
    /// Opened, connected notification not yet seen.
    Connecting(Arc<dyn Channel>),
    Open(Arc<dyn Channel>),
}

impl HeldChannel {
    fn handle(&self) -> &Arc<dyn Channel> {
        match self {
            HeldChannel::Connecting(channel) | HeldChannel::Open(channel) => channel,
        }
    }
}

/// State reachable from transport callbacks.
pub(crate) struct SessionShared {
    pub(crate) status: watch::Sender<ChannelState>,
    pub(crate) generation: AtomicU64,
    pub(crate) pending: StdMutex<Option<PendingExchange>>,
    pub(crate) connect_signal: StdMutex<Option<(u64, oneshot::Sender<()>)>>,
    pub(crate) channel: StdMutex<Option<HeldChannel>>,
}

impl SessionShared {
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Hand the receive buffer for `exchange` back to the transport.
    pub(crate) fn release(&self, exchange: ExchangeId) {
        let channel = lock(&self.channel)
            .as_ref()
            .map(|held| Arc::clone(held.handle()));
        match channel {
            Some(channel) => channel.rx_done(exchange),
            None => debug!("No channel to release rx buffer of exchange {exchange}"),
        }
    }

    /// Drop the waiting exchange's senders so it fails immediately.
    pub(crate) fn abort_pending(&self) {
        if let Some(pending) = lock(&self.pending).take() {
            debug!("Aborting in-flight exchange {}", pending.id);
        }
    }
}

/// Session owning the RSB control channel.
///
/// Shared as `Arc<IpcSession>` between the channel-lifecycle task, the
/// protocol client and the device state machine.
pub struct IpcSession {
    config: ChannelConfig,
    timeouts: TimeoutConfig,
    transport: Arc<dyn LinkTransport>,
    shared: Arc<SessionShared>,
    link_state: StdMutex<LinkState>,
    exchange_lock: Mutex<()>,
}

impl IpcSession {
    pub fn new(
        config: ChannelConfig,
        timeouts: TimeoutConfig,
        transport: Arc<dyn LinkTransport>,
    ) -> Self {
        let (status, _) = watch::channel(ChannelState::Disconnected);
        Self {
            config,
            timeouts,
            transport,
            shared: Arc::new(SessionShared {
                status,
                generation: AtomicU64::new(0),
                pending: StdMutex::new(None),
                connect_signal: StdMutex::new(None),
                channel: StdMutex::new(None),
            }),
            link_state: StdMutex::new(LinkState::Down),
            exchange_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Open the channel and wait for the transport to report it connected.
    ///
    /// A no-op if a channel handle is already held. The handle is held from the
    /// moment the transport returns it, so [`close`](Self::close) reaches it
    /// even if this future is dropped while waiting.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Transport`] if the transport refuses to open
    /// - [`SessionError::Timeout`] if no connected notification arrives within
    ///   the `channel_open` budget; the half-open channel is closed again
    /// - [`SessionError::NotConnected`] if the session was closed while waiting
    pub async fn open(&self) -> Result<(), SessionError> {
        if lock(&self.shared.channel).is_some() {
            debug!("Channel {} already open", self.config.name);
            return Ok(());
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (signal_tx, signal_rx) = oneshot::channel();
        *lock(&self.shared.connect_signal) = Some((generation, signal_tx));
        self.shared.status.send_replace(ChannelState::Connecting);

        let notifier = ChannelNotifier::new(Arc::clone(&self.shared), generation);
        match self.transport.open(&self.config, notifier) {
            Ok(channel) => *lock(&self.shared.channel) = Some(HeldChannel::Connecting(channel)),
            Err(fault) => {
                error!("Channel open failed [{}]: {}", self.config.name, fault);
                self.abandon_attempt();
                return Err(SessionError::Transport {
                    message: format!("Failed to open channel {}: {fault}", self.config.name),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        let budget = self.timeouts.channel_open();
        match TokioTimeout(budget, signal_rx).await {
            Ok(Ok(())) => {
                if !self.promote() {
                    return Err(self.closed_while_connecting());
                }
                let published = self.shared.status.send_if_modified(|state| {
                    if *state == ChannelState::Connecting {
                        *state = ChannelState::Connected;
                        true
                    } else {
                        false
                    }
                });
                if published {
                    info!("Channel {} connected", self.config.name);
                } else {
                    warn!("Channel {} went down while connecting", self.config.name);
                }
                Ok(())
            }
            Ok(Err(_)) => Err(self.closed_while_connecting()),
            Err(_) => {
                error!("Channel open failed. Time out after {budget:?}");
                self.close();
                Err(SessionError::Timeout {
                    message: format!(
                        "No connected notification for {} within {budget:?}",
                        self.config.name
                    ),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    /// Mark the connecting handle open. False if `close` already took it.
    fn promote(&self) -> bool {
        let mut held = lock(&self.shared.channel);
        match held.take() {
            Some(HeldChannel::Connecting(channel)) | Some(HeldChannel::Open(channel)) => {
                *held = Some(HeldChannel::Open(channel));
                true
            }
            None => false,
        }
    }

    #[track_caller]
    fn closed_while_connecting(&self) -> SessionError {
        warn!("Channel {} closed while connecting", self.config.name);
        SessionError::NotConnected {
            message: format!("Channel {} was closed while connecting", self.config.name),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    fn abandon_attempt(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        *lock(&self.shared.connect_signal) = None;
        self.shared.status.send_replace(ChannelState::Disconnected);
    }

    /// Release the channel handle, connected or not. Safe to call when already
    /// closed.
    pub fn close(&self) {
        let held = lock(&self.shared.channel).take();
        self.abandon_attempt();
        self.shared.abort_pending();

        match held {
            Some(HeldChannel::Open(channel)) => {
                channel.close();
                info!("Channel {} closed", self.config.name);
            }
            Some(HeldChannel::Connecting(channel)) => {
                channel.close();
                info!("Half-open channel {} closed", self.config.name);
            }
            None => {}
        }
    }

    pub fn channel_state(&self) -> ChannelState {
        *self.shared.status.borrow()
    }

    /// True when a handle is held and the transport reports it connected.
    pub fn is_connected(&self) -> bool {
        self.channel_state() == ChannelState::Connected
            && matches!(*lock(&self.shared.channel), Some(HeldChannel::Open(_)))
    }

    pub fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.shared.status.subscribe()
    }

    /// Wait until the channel is connected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] if it does not connect within `budget`.
    pub async fn wait_connected(&self, budget: Duration) -> Result<(), SessionError> {
        let mut status = self.shared.status.subscribe();
        let connected = TokioTimeout(
            budget,
            status.wait_for(|state| *state == ChannelState::Connected),
        )
        .await;

        match connected {
            Ok(Ok(_)) => Ok(()),
            _ => Err(SessionError::Timeout {
                message: format!("Channel {} not connected within {budget:?}", self.config.name),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    pub fn record_link_state(&self, state: LinkState) {
        *lock(&self.link_state) = state;
    }

    pub fn link_state(&self) -> LinkState {
        *lock(&self.link_state)
    }

    /// Start an exchange, waiting for any exchange already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if there is no usable channel.
    pub async fn begin_exchange(&self) -> Result<Exchange<'_>, SessionError> {
        let guard = self.exchange_lock.lock().await;

        let channel = match &*lock(&self.shared.channel) {
            Some(HeldChannel::Open(channel)) => Some(Arc::clone(channel)),
            _ => None,
        };
        let channel = match channel {
            Some(channel) if self.channel_state() == ChannelState::Connected => channel,
            _ => {
                return Err(SessionError::NotConnected {
                    message: format!("Channel {} is not connected", self.config.name),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        Ok(Exchange::new(self, channel, guard))
    }

    pub(crate) fn shared(&self) -> &SessionShared {
        &self.shared
    }
}
