use crate::helpers::{Bench, wait_for_state, wait_until};

use rsb_core::error::ErrorKind;
use rsb_core::sim::{AckMode, ConfigureReply, RegulatorOp};

use models::{OperatingState, RsbCommand};

use std::time::Duration;

/// **VALUE**: Verifies the full sequence returns to `Init` with both rails off.
///
/// **WHY THIS MATTERS**: Bring-up, enable, disable and shutdown are the four
/// transitions every session goes through. Any rail left on at the end is a leak.
///
/// **BUG THIS CATCHES**: Would catch a transition that forgets to switch a rail off,
/// or a shutdown that only handles the state it expected.
#[tokio::test]
async fn given_attached_driver_when_full_cycle_runs_then_init_with_rails_off() {
    // GIVEN: A configured driver
    let bench = Bench::new();
    let driver = bench.configured().await;
    let device = driver.device();

    // WHEN: Enable, disable, shutdown
    assert_eq!(
        device.set_delivery(true).await.expect("enable"),
        OperatingState::RsbEnabled
    );
    assert_eq!(
        device.set_delivery(false).await.expect("disable"),
        OperatingState::RsbConfigured
    );
    let state = device.shutdown().await.expect("shutdown");

    // THEN: Init, both rails off
    assert_eq!(state, OperatingState::Init);
    assert!(!bench.control.is_enabled());
    assert!(!bench.bus.is_enabled());
    assert_eq!(bench.transport.sent_count(RsbCommand::Delivery), 2);
}

/// **VALUE**: Verifies an enable whose exchange times out leaves the RSB configured
/// with LDO-B off.
#[tokio::test(start_paused = true)]
async fn given_configured_when_enable_times_out_then_configured_with_bus_off() {
    let bench = Bench::new();
    let driver = bench.configured().await;
    bench.transport.set_ack(AckMode::Never);

    let result = driver.device().set_delivery(true).await;

    assert_eq!(result.expect_err("timeout").kind(), ErrorKind::Timeout);
    assert_eq!(driver.device().state(), OperatingState::RsbConfigured);
    assert!(!bench.bus.is_enabled());
    assert_eq!(bench.bus.count(RegulatorOp::Disable), 1);
}

/// **VALUE**: Verifies a shutdown notice during bring-up wins.
///
/// **WHY THIS MATTERS**: The companion can crash again while the driver is still
/// waiting for the channel after the previous power-up.
///
/// **BUG THIS CATCHES**: Would catch the shutdown queuing behind the full link-wait
/// budget, or bring-up completing after the shutdown and leaving LDO-A on.
#[tokio::test(start_paused = true)]
async fn given_bring_up_in_progress_when_shutdown_notice_then_init_without_waiting() {
    // GIVEN: A bring-up blocked on a channel that never connects
    let bench = Bench::new();
    bench.transport.set_auto_connect(false);
    let driver = bench.attach().await;
    bench.transport.link_up();
    bench.subsystem.after_powerup();
    wait_until("control rail powered", || bench.control.is_enabled()).await;

    // WHEN: The companion announces a shutdown
    let noticed = tokio::time::Instant::now();
    bench.subsystem.before_shutdown();

    // THEN: Init with LDO-A off, well inside the link-wait budget
    wait_until("shutdown finished", || {
        let snapshot = driver.device().snapshot();
        !snapshot.control_rail && snapshot.pending.is_none()
    })
    .await;
    assert!(noticed.elapsed() < Duration::from_millis(2000));
    assert_eq!(driver.device().state(), OperatingState::Init);
    assert!(!bench.control.is_enabled());
    assert_eq!(bench.transport.sent_count(RsbCommand::Configure), 0);
}

/// **VALUE**: Verifies two racing enables produce exactly one exchange.
///
/// **BUG THIS CATCHES**: Would catch the precondition being checked outside the state
/// lock, letting both requests see `RsbConfigured` and both send.
#[tokio::test]
async fn given_configured_when_two_enables_race_then_one_exchange_and_one_no_op() {
    let bench = Bench::new();
    let driver = bench.configured().await;
    let device = driver.device();

    let (first, second) = tokio::join!(device.set_delivery(true), device.set_delivery(true));

    let outcomes = [first, second];
    let enabled = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Ok(OperatingState::RsbEnabled)))
        .count();
    let no_ops = outcomes
        .iter()
        .filter(|outcome| {
            matches!(outcome, Err(e) if e.kind() == ErrorKind::AlreadyInState)
        })
        .count();
    assert_eq!((enabled, no_ops), (1, 1));
    assert_eq!(bench.transport.sent_count(RsbCommand::Delivery), 1);
    assert_eq!(bench.bus.count(RegulatorOp::Enable), 1);
}

/// **VALUE**: Verifies configure replies other than `0x01` keep the device in `Init`.
#[tokio::test]
async fn given_peer_refuses_configure_when_powered_up_then_nack_and_init() {
    let bench = Bench::new();
    bench.transport.set_configure_reply(ConfigureReply::Value(0));
    let driver = bench.attach().await;
    bench.transport.link_up();
    wait_until("channel connected", || driver.session().is_connected()).await;

    let result = driver.device().bring_up().await;

    assert_eq!(result.expect_err("nack").kind(), ErrorKind::ProtocolNack);
    assert_eq!(driver.device().state(), OperatingState::Init);
    assert!(!bench.control.is_enabled());
}

/// **VALUE**: Verifies suspend leaves LDO-A alone when LDO-B cannot be disabled.
#[tokio::test]
async fn given_enabled_and_bus_stuck_when_suspended_then_enabled_and_control_untouched() {
    let bench = Bench::new();
    let driver = bench.enabled().await;
    bench.bus.fail(RegulatorOp::Disable);
    bench.control.clear_calls();

    let result = driver.suspend().await;

    assert_eq!(result.expect_err("rail").kind(), ErrorKind::RailFailure);
    assert_eq!(driver.device().state(), OperatingState::RsbEnabled);
    assert!(bench.control.calls().is_empty());
    wait_for_state(&driver, OperatingState::RsbEnabled).await;
}
