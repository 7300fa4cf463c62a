use crate::helpers::{Bench, wait_for_state, wait_until};

use rsb_core::DRIVER_COMPATIBLE;
use rsb_core::config::DriverConfig;
use rsb_core::driver::RsbDriver;
use rsb_core::error::ErrorKind;
use rsb_core::error::driver::DriverError;
use rsb_core::session::ChannelState;
use rsb_core::sim::{SimRegulators, SinkEvent};

use models::{MotionEvent, OperatingState};

use std::sync::Arc;

// ============================================================================
// Attach
// ============================================================================

/// **VALUE**: Verifies attach registers with every collaborator and lands in `Init`.
///
/// **WHY THIS MATTERS**: A driver that attaches without its link or subsystem
/// subscription never sees a power-up and stays idle forever.
///
/// **BUG THIS CATCHES**: Would catch a missing registration, or notifications arriving
/// before the state machine left `Unknown`.
#[tokio::test]
async fn given_simulated_platform_when_attached_then_registered_and_init() {
    // GIVEN: A simulated platform
    let bench = Bench::new();

    // WHEN: Attaching
    let driver = bench.attach().await;

    // THEN: Everything registered, no rail touched, state Init
    assert_eq!(driver.device().state(), OperatingState::Init);
    assert!(bench.transport.is_link_registered());
    assert!(bench.subsystem.is_registered("bg-wear"));
    assert_eq!(bench.sink.registered_name().as_deref(), Some("bg-spi"));
    assert!(bench.control.calls().is_empty());
    assert!(bench.bus.calls().is_empty());
    assert_eq!(driver.session().channel_state(), ChannelState::Disconnected);
}

/// **VALUE**: Verifies attach validates its collaborators.
#[tokio::test]
async fn given_no_transport_when_attached_then_validation_error() {
    let bench = Bench::new();

    let result = RsbDriver::builder()
        .with_subsystem(bench.subsystem.clone())
        .with_regulators(bench.regulators.clone())
        .with_motion_sink(bench.sink.clone())
        .attach()
        .await;

    assert!(matches!(result, Err(DriverError::Validation { .. })));
}

/// **VALUE**: Verifies a missing supply fails attach before anything is registered.
#[tokio::test]
async fn given_missing_bus_supply_when_attached_then_regulator_error() {
    let bench = Bench::new();
    let regulators = Arc::new(SimRegulators::new(["vdd-ldo1"]));

    let result = RsbDriver::builder()
        .with_transport(bench.transport.clone())
        .with_subsystem(bench.subsystem.clone())
        .with_regulators(regulators)
        .with_motion_sink(bench.sink.clone())
        .attach()
        .await;

    assert!(matches!(result, Err(DriverError::Regulator { .. })));
    assert!(!bench.subsystem.is_registered("bg-wear"));
    assert!(!bench.transport.is_link_registered());
}

/// **VALUE**: Verifies a failed registration leaves nothing half-subscribed.
///
/// **BUG THIS CATCHES**: Would catch the link listener staying registered with a
/// driver instance that failed to attach.
#[tokio::test]
async fn given_subsystem_refuses_when_attached_then_registration_error_and_no_link_listener() {
    let bench = Bench::new();
    bench.subsystem.refuse_registration(true);

    let result = RsbDriver::builder()
        .with_transport(bench.transport.clone())
        .with_subsystem(bench.subsystem.clone())
        .with_regulators(bench.regulators.clone())
        .with_motion_sink(bench.sink.clone())
        .attach()
        .await;

    assert!(matches!(result, Err(DriverError::Registration { .. })));
    assert!(!bench.transport.is_link_registered());
}

#[tokio::test]
async fn given_invalid_config_when_attached_then_config_error() {
    let bench = Bench::new();
    let mut config = DriverConfig::default();
    config.subsystem.name.clear();

    let result = RsbDriver::builder()
        .with_config(config)
        .with_transport(bench.transport.clone())
        .with_subsystem(bench.subsystem.clone())
        .with_regulators(bench.regulators.clone())
        .with_motion_sink(bench.sink.clone())
        .attach()
        .await;

    assert!(matches!(result, Err(DriverError::Config(_))));
}

#[test]
fn given_compatible_strings_when_matched_then_only_own_compatible_binds() {
    assert_eq!(DRIVER_COMPATIBLE, "qcom,bg-rsb");
    assert!(RsbDriver::matches("qcom,bg-rsb"));
    assert!(!RsbDriver::matches("qcom,bg-spi"));
}

// ============================================================================
// Detach
// ============================================================================

/// **VALUE**: Verifies detach powers down, unsubscribes and closes the channel.
///
/// **WHY THIS MATTERS**: After detach no notification may reach the old instance,
/// and no rail may stay powered without an owner.
///
/// **BUG THIS CATCHES**: Would catch rails left on after detach, or callbacks still
/// registered against the detached instance.
#[tokio::test]
async fn given_enabled_driver_when_detached_then_rails_off_and_unsubscribed() {
    // GIVEN: A driver with delivery running
    let bench = Bench::new();
    let driver = bench.enabled().await;
    let session = Arc::clone(driver.session());

    // WHEN: Detaching
    let state = driver.detach().await;

    // THEN: Init, rails off, subscriptions gone, channel closed
    assert_eq!(state, OperatingState::Init);
    assert!(!bench.control.is_enabled());
    assert!(!bench.bus.is_enabled());
    assert!(!bench.subsystem.is_registered("bg-wear"));
    assert!(!bench.transport.is_link_registered());
    assert_eq!(session.channel_state(), ChannelState::Disconnected);
    assert!(bench.transport.channel().expect("channel").is_closed());
}

/// **VALUE**: Verifies detach closes a channel that is still waiting to connect.
///
/// **WHY THIS MATTERS**: Detach stops the channel task wherever it is. If that is in
/// the middle of an open, the transport has already handed out a channel that only
/// the session knows about.
///
/// **BUG THIS CATCHES**: Would catch the half-open handle living only in the
/// cancelled open future, so that closing the session finds nothing to close.
#[tokio::test]
async fn given_channel_opening_when_detached_then_half_open_channel_closed() {
    // GIVEN: A link that came up towards a peer that has not connected yet
    let bench = Bench::new();
    bench.transport.set_auto_connect(false);
    let driver = bench.attach().await;
    bench.transport.link_up();
    wait_until("channel opened", || bench.transport.open_count() == 1).await;

    // WHEN: Detaching mid-open
    driver.detach().await;

    // THEN: The transport's channel was closed
    let channel = bench.transport.channel().expect("channel");
    assert!(channel.is_closed());
}

// ============================================================================
// Attribute and input surfaces
// ============================================================================

/// **VALUE**: Verifies the attribute drives delivery end to end.
#[tokio::test]
async fn given_configured_driver_when_attribute_toggled_then_delivery_follows() {
    let bench = Bench::new();
    let driver = bench.configured().await;

    assert_eq!(driver.attribute().store("1").expect("store"), 1);
    wait_for_state(&driver, OperatingState::RsbEnabled).await;
    assert!(bench.bus.is_enabled());

    assert_eq!(driver.attribute().store("0").expect("store"), 1);
    wait_for_state(&driver, OperatingState::RsbConfigured).await;
    assert!(!bench.bus.is_enabled());
    assert_eq!(driver.attribute().show(), "");
}

/// **VALUE**: Verifies a failing transition is not reflected to the attribute writer.
///
/// **BUG THIS CATCHES**: Would catch the write path waiting for, or reporting, the
/// outcome of the transition it queued.
#[tokio::test]
async fn given_init_driver_when_one_written_then_write_succeeds_and_state_unchanged() {
    let bench = Bench::new();
    let driver = bench.attach().await;

    let result = driver.attribute().store("1");

    assert_eq!(result.expect("store"), 1);
    // Queued behind the write, so it completes after the write's transition ran.
    let barrier = driver.device().set_delivery(false).await;
    assert_eq!(
        barrier.expect_err("no-op").kind(),
        ErrorKind::AlreadyInState
    );
    assert_eq!(driver.device().state(), OperatingState::Init);
    assert!(bench.bus.calls().is_empty());
}

#[tokio::test]
async fn given_attached_driver_when_wheel_event_reported_then_sink_receives_sample() {
    let bench = Bench::new();
    let driver = bench.attach().await;

    driver
        .reporter()
        .send_input(Some(&MotionEvent::new(1, 2)))
        .expect("send");

    assert_eq!(bench.sink.events(), vec![SinkEvent::Wheel(2), SinkEvent::Sync]);
}

/// **VALUE**: Verifies platform suspend/resume through the driver.
#[tokio::test]
async fn given_enabled_driver_when_suspended_and_resumed_then_configured() {
    let bench = Bench::new();
    let driver = bench.enabled().await;

    assert_eq!(driver.suspend().await.expect("suspend"), OperatingState::Init);
    assert!(!bench.bus.is_enabled());
    assert!(!bench.control.is_enabled());

    assert_eq!(
        driver.resume().await.expect("resume"),
        OperatingState::RsbConfigured
    );
    assert!(bench.control.is_enabled());
}
