use crate::helpers::{Bench, wait_for_state, wait_until};

use rsb_core::session::ChannelState;

use models::{LinkState, OperatingState, RsbCommand};

// ============================================================================
// Link state
// ============================================================================

/// **VALUE**: Verifies link notifications open and close the channel.
///
/// **WHY THIS MATTERS**: The channel only exists while the link is up; every
/// companion restart flaps the link and the driver must follow it both ways.
///
/// **BUG THIS CATCHES**: Would catch a second link-up reusing a closed handle, or a
/// link-down that leaves the session marked connected.
#[tokio::test]
async fn given_attached_driver_when_link_flaps_then_channel_follows() {
    // GIVEN: An attached driver
    let bench = Bench::new();
    let driver = bench.attach().await;
    let session = driver.session().clone();

    // WHEN/THEN: Link up opens a connected channel
    bench.transport.link_up();
    wait_until("channel connected", || session.is_connected()).await;
    assert_eq!(session.link_state(), LinkState::Up);

    // WHEN/THEN: Link down closes it
    bench.transport.link_down();
    wait_until("channel closed", || {
        session.channel_state() == ChannelState::Disconnected
    })
    .await;
    assert_eq!(session.link_state(), LinkState::Down);
    assert!(bench.transport.channel().expect("channel").is_closed());

    // WHEN/THEN: Link up again opens a fresh channel
    bench.transport.link_up();
    wait_until("channel reconnected", || session.is_connected()).await;
    assert_eq!(bench.transport.open_count(), 2);
}

/// **VALUE**: Verifies callbacks from a channel closed by a link flap are ignored.
///
/// **WHY THIS MATTERS**: The transport may deliver a late disconnect for the old
/// channel after the new one is up.
///
/// **BUG THIS CATCHES**: Would catch a stale disconnect marking the new channel
/// down, which fails every following exchange with `NotConnected`.
#[tokio::test]
async fn given_relinked_driver_when_old_channel_disconnects_then_new_channel_unaffected() {
    let bench = Bench::new();
    let driver = bench.configured().await;
    let session = driver.session().clone();
    let old = bench.transport.channel().expect("channel");

    bench.transport.link_down();
    wait_until("channel closed", || !session.is_connected()).await;
    bench.transport.link_up();
    wait_until("channel reconnected", || session.is_connected()).await;

    old.remote_disconnect();

    assert!(session.is_connected());
    let state = driver.device().set_delivery(true).await;
    assert_eq!(state.expect("enable"), OperatingState::RsbEnabled);
}

// ============================================================================
// Companion restart
// ============================================================================

/// **VALUE**: Verifies a full companion crash and restart cycle.
///
/// **WHY THIS MATTERS**: This is the recovery path: before-shutdown forces the rails
/// off, the link flaps, and after-powerup configures the RSB again from scratch.
///
/// **BUG THIS CATCHES**: Would catch the driver staying in `RsbEnabled` after a
/// crash, or refusing to bring the RSB back after the restart.
#[tokio::test]
async fn given_enabled_driver_when_companion_restarts_then_reconfigured() {
    // GIVEN: Delivery running
    let bench = Bench::new();
    let driver = bench.enabled().await;

    // WHEN: The companion crashes
    bench.subsystem.before_shutdown();
    bench.transport.link_down();

    // THEN: Init with both rails off
    wait_for_state(&driver, OperatingState::Init).await;
    assert!(!bench.bus.is_enabled());
    assert!(!bench.control.is_enabled());

    // WHEN: It comes back
    bench.transport.link_up();
    bench.subsystem.after_powerup();

    // THEN: Configured again, with a second configure exchange
    wait_for_state(&driver, OperatingState::RsbConfigured).await;
    assert!(bench.control.is_enabled());
    assert!(!bench.bus.is_enabled());
    assert_eq!(bench.transport.sent_count(RsbCommand::Configure), 2);
}

/// **VALUE**: Verifies a power-up notice outside `Init` changes nothing.
///
/// **BUG THIS CATCHES**: Would catch a duplicate power-up re-running configure and
/// power-cycling a running RSB.
#[tokio::test]
async fn given_configured_driver_when_powerup_repeated_then_ignored() {
    let bench = Bench::new();
    let driver = bench.configured().await;

    bench.subsystem.after_powerup();
    // Queued behind the power-up on the lifecycle actor.
    let barrier = driver.device().bring_up().await;

    assert!(barrier.is_err());
    assert_eq!(driver.device().state(), OperatingState::RsbConfigured);
    assert_eq!(bench.transport.sent_count(RsbCommand::Configure), 1);
}
