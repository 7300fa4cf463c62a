use crate::control::{ATTRIBUTE_MODE, ATTRIBUTE_PATH, EnableAttribute};
use crate::device::DeviceHandle;
use crate::error::control::ControlError;
use crate::tests::helpers::Rig;

use models::{OperatingState, RsbCommand};

use std::sync::Arc;
use std::time::Duration;

async fn attribute(rig: &Rig) -> (EnableAttribute, DeviceHandle) {
    let machine = Arc::new(rig.configured_machine().await);
    let (device, _tasks) = DeviceHandle::spawn(machine);
    (EnableAttribute::new(device.clone()), device)
}

/// **VALUE**: Verifies writing `1` enables delivery asynchronously.
///
/// **WHY THIS MATTERS**: The write returns before the transition runs; callers rely on
/// the full byte count being consumed and the enable happening in the background.
///
/// **BUG THIS CATCHES**: Would catch the write blocking on the exchange, or the
/// request never reaching the delivery actor.
#[tokio::test]
async fn given_configured_when_one_written_then_delivery_enabled_in_background() {
    // GIVEN: A configured device behind the attribute
    let rig = Rig::new();
    let (attribute, device) = attribute(&rig).await;
    let mut states = device.subscribe();

    // WHEN: Writing "1\n"
    let consumed = attribute.store("1\n").expect("store");

    // THEN: Whole buffer consumed and the device reaches RsbEnabled
    assert_eq!(consumed, 2);
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == OperatingState::RsbEnabled),
    )
    .await
    .expect("enable did not complete")
    .expect("state channel closed");
    assert_eq!(rig.transport.sent_count(RsbCommand::Delivery), 1);
}

/// **VALUE**: Verifies non-integer input is rejected.
#[tokio::test]
async fn given_garbage_when_written_then_invalid_argument() {
    let rig = Rig::new();
    let (attribute, _device) = attribute(&rig).await;

    let result = attribute.store("on");

    assert!(matches!(result, Err(ControlError::InvalidArgument { .. })));
}

/// **VALUE**: Verifies integers other than 0 and 1 are accepted and ignored.
///
/// **BUG THIS CATCHES**: Would catch `2` being treated as "non-zero means enable".
#[tokio::test]
async fn given_other_integer_when_written_then_ignored() {
    let rig = Rig::new();
    let (attribute, device) = attribute(&rig).await;

    let consumed = attribute.store("2").expect("store");
    tokio::task::yield_now().await;

    assert_eq!(consumed, 1);
    assert_eq!(device.state(), OperatingState::RsbConfigured);
    assert_eq!(rig.transport.sent_count(RsbCommand::Delivery), 0);
}

/// **VALUE**: Verifies writing the state the device is already in queues nothing.
#[tokio::test]
async fn given_configured_when_zero_written_then_nothing_queued() {
    let rig = Rig::new();
    let (attribute, device) = attribute(&rig).await;

    attribute.store("0").expect("store");
    tokio::task::yield_now().await;

    assert_eq!(device.snapshot().pending, None);
    assert_eq!(rig.transport.sent_count(RsbCommand::Delivery), 0);
}

#[tokio::test]
async fn given_attribute_when_read_then_empty() {
    let rig = Rig::new();
    let (attribute, _device) = attribute(&rig).await;

    assert_eq!(attribute.show(), "");
    assert_eq!(ATTRIBUTE_PATH, "bg-rsb/enable");
    assert_eq!(ATTRIBUTE_MODE, 0o660);
}
