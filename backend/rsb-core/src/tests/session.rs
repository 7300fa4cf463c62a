use crate::error::session::SessionError;
use crate::session::ChannelState;
use crate::sim::AckMode;
use crate::tests::helpers::Rig;

use models::{LinkState, RsbCommand, RsbMessage};

use std::sync::Arc;
use std::time::Duration;

/// **VALUE**: Verifies the happy path of opening the control channel.
///
/// **WHY THIS MATTERS**: Every protocol exchange requires a connected channel; if open
/// never publishes `Connected`, bring-up waits out its full budget on every power-up.
///
/// **BUG THIS CATCHES**: Would catch the connected notification being lost when the
/// transport fires it from inside `open()`, before the session starts waiting.
#[tokio::test]
async fn given_auto_connecting_peer_when_open_then_channel_connected() {
    // GIVEN: A peer that connects immediately
    let rig = Rig::new();

    // WHEN: Opening the session
    rig.session.open().await.expect("open");

    // THEN: The channel is connected and a handle is held
    assert_eq!(rig.session.channel_state(), ChannelState::Connected);
    assert!(rig.session.is_connected());
    assert_eq!(rig.transport.open_count(), 1);
}

/// **VALUE**: Verifies that a channel which never reports connected fails the attempt.
///
/// **WHY THIS MATTERS**: The channel must stay unusable until the next link-up, and
/// the half-open handle must not leak.
///
/// **BUG THIS CATCHES**: Would catch an unbounded wait for the connected notification,
/// or a timed-out channel left open and marked `Connecting` forever.
#[tokio::test(start_paused = true)]
async fn given_silent_peer_when_open_then_times_out_and_closes_channel() {
    // GIVEN: A peer that never reports connected
    let rig = Rig::new();
    rig.transport.set_auto_connect(false);

    // WHEN: Opening the session
    let result = rig.session.open().await;

    // THEN: Timeout, disconnected, and the half-open channel closed
    assert!(matches!(result, Err(SessionError::Timeout { .. })));
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);
    let channel = rig.transport.channel().expect("channel was opened");
    assert!(channel.is_closed());

    // AND: A connected notification arriving afterwards is ignored
    channel.connect();
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);
}

/// **VALUE**: Verifies that open failures from the transport surface as `Transport`.
///
/// **WHY THIS MATTERS**: The channel-lifecycle actor logs and carries on; a panic or a
/// stuck `Connecting` state would block every later link-up.
///
/// **BUG THIS CATCHES**: Would catch the session staying in `Connecting` after the
/// transport refused to open.
#[tokio::test]
async fn given_refusing_transport_when_open_then_transport_error() {
    // GIVEN: A transport that refuses to open channels
    let rig = Rig::new();
    rig.transport.set_refuse_open(true);

    // WHEN: Opening the session
    let result = rig.session.open().await;

    // THEN: Transport error and the session is back to disconnected
    assert!(matches!(result, Err(SessionError::Transport { .. })));
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);
}

/// **VALUE**: Verifies that exchanges fail fast when no channel is held.
///
/// **BUG THIS CATCHES**: Would catch an exchange waiting on the send acknowledgement
/// of a channel that does not exist.
#[tokio::test]
async fn given_closed_session_when_begin_exchange_then_not_connected() {
    let rig = Rig::new();

    let result = rig.session.begin_exchange().await;

    assert!(matches!(result, Err(SessionError::NotConnected { .. })));
}

/// **VALUE**: Verifies the send-acknowledgement timeout leaves the channel untouched.
///
/// **WHY THIS MATTERS**: A slow peer must not tear down a channel that is still
/// connected; the next request should be able to use it.
///
/// **BUG THIS CATCHES**: Would catch a timeout path that marks the channel
/// disconnected or closes the handle.
#[tokio::test(start_paused = true)]
async fn given_peer_never_acks_when_send_then_timeout_and_channel_still_connected() {
    // GIVEN: A connected channel whose peer never acknowledges
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_ack(AckMode::Never);

    // WHEN: Sending a request
    let mut exchange = rig.session.begin_exchange().await.expect("exchange");
    let result = exchange
        .send(&RsbMessage::new(RsbCommand::Delivery, true))
        .await;

    // THEN: Timeout, channel state unchanged
    assert!(matches!(result, Err(SessionError::Timeout { .. })));
    assert_eq!(rig.session.channel_state(), ChannelState::Connected);
    assert!(rig.session.is_connected());
}

/// **VALUE**: Verifies that an acknowledgement for an abandoned exchange cannot
/// complete a later one.
///
/// **WHY THIS MATTERS**: After a timeout the transport may still deliver the old
/// completion. If it reached the next exchange, that exchange would report success
/// for a message the peer never acknowledged.
///
/// **BUG THIS CATCHES**: Would catch completions matched by slot instead of by
/// exchange id.
#[tokio::test(start_paused = true)]
async fn given_timed_out_exchange_when_late_ack_arrives_then_next_exchange_unaffected() {
    // GIVEN: A first exchange that timed out waiting for its ack
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_ack(AckMode::Never);
    let message = RsbMessage::new(RsbCommand::Delivery, true);

    let stale_id = {
        let mut first = rig.session.begin_exchange().await.expect("first exchange");
        let id = first.id();
        assert!(first.send(&message).await.is_err());
        id
    };

    // WHEN: A second exchange is in flight and the first one's ack shows up
    let channel = rig.transport.channel().expect("channel");
    let mut second = rig.session.begin_exchange().await.expect("second exchange");
    assert_ne!(second.id(), stale_id);
    channel.ack(stale_id);
    let result = second.send(&message).await;

    // THEN: The second exchange still times out on its own ack
    assert!(matches!(result, Err(SessionError::Timeout { .. })));
}

/// **VALUE**: Verifies a remote disconnect aborts the exchange waiting on it.
///
/// **WHY THIS MATTERS**: A peer crash mid-exchange must not hold the state lock for
/// the full timeout budget while the shutdown notice waits behind it.
///
/// **BUG THIS CATCHES**: Would catch the disconnect callback clearing the connected
/// flag without waking the waiting exchange.
#[tokio::test]
async fn given_waiting_exchange_when_remote_disconnects_then_not_connected() {
    // GIVEN: An exchange waiting for an ack that will never come
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_ack(AckMode::Never);
    let channel = rig.transport.channel().expect("channel");
    let mut exchange = rig.session.begin_exchange().await.expect("exchange");
    let message = RsbMessage::new(RsbCommand::Delivery, false);

    // WHEN: The peer drops the channel while the exchange waits
    let (result, ()) = tokio::join!(exchange.send(&message), async {
        tokio::task::yield_now().await;
        channel.remote_disconnect();
    });

    // THEN: The exchange fails with NotConnected and the flag is cleared
    assert!(matches!(result, Err(SessionError::NotConnected { .. })));
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);
}

/// **VALUE**: Verifies a connected notification after a remote disconnect restores
/// the channel.
///
/// **BUG THIS CATCHES**: Would catch reconnects on the same channel being treated
/// as stale and leaving the session disconnected until the next link flap.
#[tokio::test]
async fn given_remote_disconnect_when_peer_reconnects_then_connected_again() {
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    let channel = rig.transport.channel().expect("channel");

    channel.remote_disconnect();
    assert!(!rig.session.is_connected());
    channel.connect();

    assert!(rig.session.is_connected());
}

/// **VALUE**: Verifies close is idempotent and silences the old channel.
///
/// **WHY THIS MATTERS**: Link-down and detach can both close the session; the
/// second close must be harmless. Callbacks from the closed channel must not
/// flip the state of a later one.
///
/// **BUG THIS CATCHES**: Would catch a double close calling into the transport
/// twice, or a stale connected callback marking a closed session connected.
#[tokio::test]
async fn given_open_session_when_closed_twice_then_disconnected_and_stale_callbacks_ignored() {
    // GIVEN: An open session
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    let old = rig.transport.channel().expect("channel");

    // WHEN: Closing it twice
    rig.session.close();
    rig.session.close();

    // THEN: Disconnected, channel closed, old callbacks ignored
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);
    assert!(old.is_closed());
    old.connect();
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);

    // AND: Reopening yields a fresh channel
    rig.session.open().await.expect("reopen");
    assert_eq!(rig.transport.open_count(), 2);
    assert!(rig.session.is_connected());
}

/// **VALUE**: Verifies `wait_connected` is bounded and returns once connected.
///
/// **BUG THIS CATCHES**: Would catch bring-up hanging when the channel never comes up.
#[tokio::test(start_paused = true)]
async fn given_no_channel_when_wait_connected_then_times_out_after_budget() {
    let rig = Rig::new();
    let started = tokio::time::Instant::now();

    let result = rig.session.wait_connected(Duration::from_millis(2000)).await;

    assert!(matches!(result, Err(SessionError::Timeout { .. })));
    assert!(started.elapsed() >= Duration::from_millis(2000));

    rig.session.open().await.expect("open");
    assert!(
        rig.session
            .wait_connected(Duration::from_millis(2000))
            .await
            .is_ok()
    );
}

#[test]
fn given_new_session_when_link_recorded_then_reported_back() {
    let rig = Rig::new();
    assert_eq!(rig.session.link_state(), LinkState::Down);

    rig.session.record_link_state(LinkState::Up);

    assert_eq!(rig.session.link_state(), LinkState::Up);
}

/// **VALUE**: Verifies closing the session reaches a channel whose open was cancelled
/// before it connected.
///
/// **WHY THIS MATTERS**: The channel task can be stopped while `open()` waits for the
/// connected notification. The transport already handed out a channel at that point.
///
/// **BUG THIS CATCHES**: Would catch the pending handle being owned only by the open
/// future, so that dropping the future leaks the transport channel.
#[tokio::test(start_paused = true)]
async fn given_cancelled_open_when_closed_then_half_open_channel_closed() {
    // GIVEN: An open that is abandoned while waiting for the peer
    let rig = Rig::new();
    rig.transport.set_auto_connect(false);
    let cancelled = tokio::time::timeout(Duration::from_millis(100), rig.session.open()).await;
    assert!(cancelled.is_err(), "open should still be waiting");
    let channel = rig.transport.channel().expect("channel was opened");
    assert!(!channel.is_closed());

    // WHEN: Closing the session
    rig.session.close();

    // THEN: The half-open channel is closed and late notifications are ignored
    assert!(channel.is_closed());
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);
    channel.connect();
    assert_eq!(rig.session.channel_state(), ChannelState::Disconnected);
}

/// **VALUE**: Verifies an open interrupted by `close()` reports `NotConnected`.
///
/// **BUG THIS CATCHES**: Would catch the open storing a handle that close already
/// released, leaving a closed channel marked open.
#[tokio::test(start_paused = true)]
async fn given_open_waiting_when_session_closed_then_not_connected() {
    // GIVEN: An open waiting for a peer that has not connected
    let rig = Rig::new();
    rig.transport.set_auto_connect(false);
    let session = Arc::clone(&rig.session);
    let opening = tokio::spawn(async move { session.open().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // WHEN: The session is closed underneath it
    rig.session.close();

    // THEN: The open fails and nothing is held
    let result = opening.await.expect("open task");
    assert!(matches!(result, Err(SessionError::NotConnected { .. })));
    assert!(!rig.session.is_connected());
    assert!(rig.transport.channel().expect("channel").is_closed());
}
