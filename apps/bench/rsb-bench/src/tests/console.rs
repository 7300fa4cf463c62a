use crate::console::BenchCommand;
use crate::error::BenchError;

use models::MotionEvent;
use rsb_core::sim::{AckMode, ConfigureReply};

use std::time::Duration;

/// **VALUE**: Verifies the command words map to the right bench actions.
///
/// **WHY THIS MATTERS**: Scripts drive the bench line by line. A misparsed word
/// would inject the wrong notification and the run would test something else.
///
/// **BUG THIS CATCHES**: Would catch swapped link directions, a lost argument on
/// `enable`, or `wheel` not using the wheel sub-id.
#[test]
fn given_command_lines_when_parsed_then_map_to_commands() {
    // GIVEN / WHEN / THEN: Each line parses to its command
    let cases = [
        ("link up", BenchCommand::LinkUp),
        ("link down", BenchCommand::LinkDown),
        ("  crash  ", BenchCommand::Crash),
        ("powerup", BenchCommand::Powerup),
        ("enable 1", BenchCommand::Enable("1".to_string())),
        ("suspend", BenchCommand::Suspend),
        ("resume", BenchCommand::Resume),
        ("wheel -3", BenchCommand::Event(MotionEvent::new(1, -3))),
        ("event 7 42", BenchCommand::Event(MotionEvent::new(7, 42))),
        ("status", BenchCommand::Status),
        ("quit", BenchCommand::Quit),
    ];

    for (line, expected) in cases {
        let parsed = BenchCommand::parse(line).expect("line should parse");
        assert_eq!(parsed, Some(expected), "line: {line:?}");
    }
}

/// **VALUE**: Verifies peer scripting commands carry their parameters.
///
/// **WHY THIS MATTERS**: Timeout and nack scenarios depend on `ack` and `reply`
/// reaching the simulated peer with the exact value typed.
///
/// **BUG THIS CATCHES**: Would catch `ack <ms>` parsed as seconds, or a keyword
/// like `silent` falling through to the numeric branch.
#[test]
fn given_peer_script_lines_when_parsed_then_carry_parameters() {
    // GIVEN / WHEN / THEN
    assert_eq!(
        BenchCommand::parse("ack never").expect("parse"),
        Some(BenchCommand::Ack(AckMode::Never))
    );
    assert_eq!(
        BenchCommand::parse("ack 250").expect("parse"),
        Some(BenchCommand::Ack(AckMode::Delayed(Duration::from_millis(250))))
    );
    assert_eq!(
        BenchCommand::parse("reply silent").expect("parse"),
        Some(BenchCommand::Reply(ConfigureReply::Silent))
    );
    assert_eq!(
        BenchCommand::parse("reply 2").expect("parse"),
        Some(BenchCommand::Reply(ConfigureReply::Value(2)))
    );
}

/// **VALUE**: Verifies blank lines are skipped and bad lines are errors.
///
/// **WHY THIS MATTERS**: A typo in a script must be reported, not silently
/// ignored, while blank separator lines are normal.
///
/// **BUG THIS CATCHES**: Would catch a parser that treats unknown input as `help`
/// or that panics on a non-numeric argument.
#[test]
fn given_blank_or_bad_lines_when_parsed_then_none_or_command_error() {
    // GIVEN / WHEN
    let blank = BenchCommand::parse("   ").expect("blank parses");
    let unknown = BenchCommand::parse("reboot now");
    let not_a_number = BenchCommand::parse("wheel lots");

    // THEN
    assert_eq!(blank, None);
    assert!(matches!(unknown, Err(BenchError::Command { .. })));
    assert!(matches!(not_a_number, Err(BenchError::Command { .. })));
}
