use crate::error::protocol::ProtocolError;
use crate::error::session::SessionError;
use crate::ports::ExchangeId;
use crate::protocol::ProtocolClient;
use crate::sim::{AckMode, ConfigureReply};
use crate::tests::helpers::Rig;

use models::{RsbCommand, RsbMessage};

use std::sync::Arc;
use std::time::Duration;

fn client(rig: &Rig) -> ProtocolClient {
    ProtocolClient::new(Arc::clone(&rig.session))
}

/// **VALUE**: Verifies configure succeeds on a `0x01` reply and sends the right record.
///
/// **WHY THIS MATTERS**: Configure is the gate from `Init` to `RsbConfigured`; the
/// companion only acts on the exact 8-byte `{1, 1}` request.
///
/// **BUG THIS CATCHES**: Would catch a wrong command id, a wrong data word, or a
/// missing receive intent (the peer only answers into a queued intent).
#[tokio::test]
async fn given_acking_peer_when_configure_then_ok_with_one_intent() {
    // GIVEN: A connected peer answering 0x01
    let rig = Rig::new();
    rig.session.open().await.expect("open");

    // WHEN: Configuring
    let result = client(&rig).configure(true).await;

    // THEN: Success, one configure(1) on the wire, one intent queued
    assert!(result.is_ok(), "configure failed: {result:?}");
    assert_eq!(
        rig.transport.sent(),
        vec![RsbMessage::new(RsbCommand::Configure, true)]
    );
    assert_eq!(rig.transport.intents_queued(), 1);
    assert_eq!(rig.transport.rx_released(), 1);
}

/// **VALUE**: Verifies any reply other than `0x01` is a negative acknowledgement.
///
/// **BUG THIS CATCHES**: Would catch treating any reply as success, which would leave
/// the driver believing the RSB is configured when the companion refused.
#[tokio::test]
async fn given_peer_answers_zero_when_configure_then_nack_with_value() {
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_configure_reply(ConfigureReply::Value(0));

    let result = client(&rig).configure(true).await;

    match result {
        Err(ProtocolError::Nack { value, .. }) => assert_eq!(value, 0),
        other => panic!("Expected Nack, got {other:?}"),
    }
}

/// **VALUE**: Verifies a missing reply times out after the acknowledgement.
///
/// **BUG THIS CATCHES**: Would catch configure returning success once the transmit
/// is acknowledged without waiting for the reply.
#[tokio::test(start_paused = true)]
async fn given_silent_peer_when_configure_then_timeout() {
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_configure_reply(ConfigureReply::Silent);

    let result = client(&rig).configure(true).await;

    assert!(matches!(
        result,
        Err(ProtocolError::Session(SessionError::Timeout { .. }))
    ));
}

/// **VALUE**: Verifies an oversized reply is dropped rather than copied.
///
/// **WHY THIS MATTERS**: A reply larger than the 4-byte intent is a protocol
/// violation; copying it would overrun the response buffer.
///
/// **BUG THIS CATCHES**: Would catch a truncating copy that happens to read `0x01`
/// from the first four bytes and reports success.
#[tokio::test(start_paused = true)]
async fn given_oversized_reply_when_configure_then_dropped_and_times_out() {
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_configure_reply(ConfigureReply::Oversized);

    let result = client(&rig).configure(true).await;

    assert!(matches!(
        result,
        Err(ProtocolError::Session(SessionError::Timeout { .. }))
    ));
    assert_eq!(
        rig.transport.rx_released(),
        1,
        "Rejected buffer must still go back to the transport"
    );
}

/// **VALUE**: Verifies a late reply to an abandoned exchange still returns its buffer.
///
/// **WHY THIS MATTERS**: The transport lends one buffer per queued intent. A reply
/// the session discards must hand that buffer back, or the transport runs out.
///
/// **BUG THIS CATCHES**: Would catch the release being tied to a waiting exchange
/// rather than to every payload received.
#[tokio::test]
async fn given_no_waiting_exchange_when_reply_arrives_then_buffer_released() {
    // GIVEN: A connected channel with no exchange in flight
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    let channel = rig.transport.channel().expect("channel");

    // WHEN: A stray reply arrives
    channel.reply(ExchangeId::new(), &1u32.to_le_bytes());

    // THEN: Its buffer is returned
    assert_eq!(rig.transport.rx_released(), 1);
}

/// **VALUE**: Verifies delivery only needs the send acknowledgement.
///
/// **BUG THIS CATCHES**: Would catch delivery waiting for a reply the companion never
/// sends, turning every enable into a timeout.
#[tokio::test(start_paused = true)]
async fn given_peer_never_replies_when_set_delivery_then_ok_after_ack() {
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_configure_reply(ConfigureReply::Silent);

    let result = client(&rig).set_delivery(false).await;

    assert!(result.is_ok(), "set_delivery failed: {result:?}");
    assert_eq!(
        rig.transport.sent(),
        vec![RsbMessage::new(RsbCommand::Delivery, false)]
    );
}

/// **VALUE**: Verifies transmit failures surface as `Transport`.
#[tokio::test]
async fn given_failing_transmit_when_set_delivery_then_transport_error() {
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport.set_fail_tx(true);

    let result = client(&rig).set_delivery(true).await;

    assert!(matches!(
        result,
        Err(ProtocolError::Session(SessionError::Transport { .. }))
    ));
}

/// **VALUE**: Verifies commands fail immediately without a channel.
#[tokio::test]
async fn given_no_channel_when_configure_then_not_connected() {
    let rig = Rig::new();

    let result = client(&rig).configure(true).await;

    assert!(matches!(
        result,
        Err(ProtocolError::Session(SessionError::NotConnected { .. }))
    ));
    assert!(rig.transport.sent().is_empty());
}

/// **VALUE**: Verifies concurrent exchanges are serialized.
///
/// **WHY THIS MATTERS**: There is a single completion slot per session. If two
/// exchanges overlapped, the second would steal the first one's slot and the first
/// would time out even though the peer answered it.
///
/// **BUG THIS CATCHES**: Would catch the exchange lock being released before the
/// reply is consumed.
#[tokio::test(start_paused = true)]
async fn given_slow_peer_when_two_configures_race_then_both_succeed() {
    // GIVEN: A peer that acknowledges and answers after 100 ms
    let rig = Rig::new();
    rig.session.open().await.expect("open");
    rig.transport
        .set_ack(AckMode::Delayed(Duration::from_millis(100)));
    let client = client(&rig);

    // WHEN: Two configures run concurrently
    let (first, second) = tokio::join!(client.configure(true), client.configure(false));

    // THEN: Both complete and both reached the peer
    assert!(first.is_ok(), "first failed: {first:?}");
    assert!(second.is_ok(), "second failed: {second:?}");
    assert_eq!(rig.transport.sent_count(RsbCommand::Configure), 2);
}
