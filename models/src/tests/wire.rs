use crate::wire::{MESSAGE_SIZE, RX_INTENT_SIZE};
use crate::{ModelError, RsbCommand, RsbMessage, RsbResponse};

/// **VALUE**: Pins the exact byte layout of a configure-enable request.
///
/// **WHY THIS MATTERS**: The companion firmware parses the request as two
/// little-endian words. A byte-order slip makes it ignore every command.
///
/// **BUG THIS CATCHES**: Would catch big-endian encoding or swapped fields.
#[test]
fn given_configure_enable_when_encoded_then_matches_little_endian_layout() {
    // GIVEN: configure(true)
    let message = RsbMessage::new(RsbCommand::Configure, true);

    // WHEN: Encoding
    let bytes = message.encode();

    // THEN: command id word then data word, both little-endian
    assert_eq!(bytes.len(), MESSAGE_SIZE);
    assert_eq!(bytes, [0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
}

/// **VALUE**: Verifies delivery-disable carries command 0x02 and data 0.
///
/// **BUG THIS CATCHES**: Would catch the enable flag leaking into the data word
/// as a non-zero value on disable.
#[test]
fn given_delivery_disable_when_encoded_then_data_is_zero() {
    let message = RsbMessage::new(RsbCommand::Delivery, false);

    assert_eq!(message.encode(), [0x02, 0, 0, 0, 0, 0, 0, 0]);
    assert!(!message.enables());
    assert_eq!(message.command(), Some(RsbCommand::Delivery));
    assert_eq!(message.to_string(), "delivery(0)");
}

/// **VALUE**: Verifies that short or long request buffers are rejected on decode.
///
/// **WHY THIS MATTERS**: The simulated peer decodes what the driver sends; a
/// lenient decoder would hide a truncated transmit.
#[test]
fn given_wrong_length_request_when_decoded_then_returns_decode_error() {
    // GIVEN: Buffers that are not 8 bytes
    for bytes in [&[0u8; 7][..], &[0u8; 9][..], &[][..]] {
        // WHEN: Decoding
        let result = RsbMessage::decode(bytes);

        // THEN: Decode error
        assert!(
            matches!(result, Err(ModelError::Decode { .. })),
            "len {} should fail",
            bytes.len()
        );
    }
}

/// **VALUE**: Verifies that an unknown command id survives decode and prints
/// in a diagnostic form.
#[test]
fn given_unknown_command_id_when_decoded_then_command_is_none() {
    let bytes = [0x7f, 0, 0, 0, 0x01, 0, 0, 0];

    let message = RsbMessage::decode(&bytes).expect("8 bytes decode");

    assert_eq!(message.command(), None);
    assert_eq!(message.to_string(), "cmd#0x7f(1)");
}

/// **VALUE**: Verifies only the value 0x01 counts as a configure acknowledgement.
///
/// **WHY THIS MATTERS**: Bring-up moves to `RsbConfigured` solely on this check.
///
/// **BUG THIS CATCHES**: Would catch a check that accepts any non-zero value.
#[test]
fn given_response_values_when_checked_then_only_one_is_ack() {
    assert!(RsbResponse::from_value(0x01).is_configure_ack());
    assert!(!RsbResponse::from_value(0x00).is_configure_ack());
    assert!(!RsbResponse::from_value(0x02).is_configure_ack());
    assert!(!RsbResponse::from_value(0x0100).is_configure_ack());
}

/// **VALUE**: Verifies that a payload larger than the receive intent is refused
/// without touching the buffer.
///
/// **WHY THIS MATTERS**: The receive path must fail closed; copying an oversized
/// payload into the 4-byte buffer is the overflow this guards against.
#[test]
fn given_oversized_payload_when_copied_then_rejected() {
    let payload = [1u8; RX_INTENT_SIZE + 1];

    let result = RsbResponse::from_payload(&payload);

    assert!(matches!(result, Err(ModelError::Decode { .. })));
}

/// **VALUE**: Verifies that a short payload is zero-padded into the intent buffer.
#[test]
fn given_short_payload_when_copied_then_zero_padded() {
    let response = RsbResponse::from_payload(&[0x01]).expect("short payload fits");

    assert_eq!(response.0, [0x01, 0, 0, 0]);
    assert!(response.is_configure_ack());
}
