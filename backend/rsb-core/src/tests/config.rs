use crate::config::{CONFIG_FILE_NAME, DriverConfig};
use crate::error::config::ConfigError;

use common::Millis;

use std::fs;

use tempfile::TempDir;

/// **VALUE**: Verifies a missing config file yields the reference-hardware defaults.
///
/// **WHY THIS MATTERS**: Most installs ship no config file; attach must still work.
///
/// **BUG THIS CATCHES**: Would catch a missing file being reported as a read error.
#[test]
fn given_missing_file_when_load_then_defaults() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Loading
    let config = DriverConfig::load(dir.path()).expect("load");

    // THEN: Defaults
    assert_eq!(config, DriverConfig::default());
    assert_eq!(config.channel.name, "RSB_CTRL");
    assert_eq!(config.channel.edge, "bg");
    assert_eq!(config.channel.transport, "bgcom");
    assert_eq!(config.rails.control.supply, "vdd-ldo1");
    assert_eq!(config.rails.control.min_uv, 1_800_000);
    assert_eq!(config.rails.bus.supply, "vdd-ldo2");
    assert_eq!(config.rails.bus.max_uv, 3_300_000);
    assert_eq!(config.timeouts.send_ack, Millis(500));
    assert_eq!(config.timeouts.link_wait, Millis(2000));
    assert_eq!(config.subsystem.name, "bg-wear");
    assert_eq!(config.input.device_name, "bg-spi");
}

/// **VALUE**: Verifies partial files override only what they name.
#[test]
fn given_partial_file_when_load_then_overrides_merged_with_defaults() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[timeouts]\nresponse = 750\n\n[subsystem]\nname = \"bg-lab\"\n",
    )
    .expect("write config");

    let config = DriverConfig::load(dir.path()).expect("load");

    assert_eq!(config.timeouts.response, Millis(750));
    assert_eq!(config.timeouts.send_ack, Millis(500));
    assert_eq!(config.subsystem.name, "bg-lab");
    assert_eq!(config.channel.name, "RSB_CTRL");
}

#[test]
fn given_malformed_file_when_load_then_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join(CONFIG_FILE_NAME), "[timeouts\nsend_ack = ").expect("write");

    let result = DriverConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies a zero budget is rejected.
///
/// **BUG THIS CATCHES**: Would catch a zero send-ack budget slipping through, which
/// fails every exchange immediately.
#[test]
fn given_zero_timeout_when_load_then_validation_error() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join(CONFIG_FILE_NAME), "[timeouts]\nsend_ack = 0\n").expect("write");

    let result = DriverConfig::load(dir.path());

    match result {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains("timeouts.send_ack"), "reason: {reason}");
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn given_inverted_voltage_range_when_validated_then_rejected() {
    let mut config = DriverConfig::default();
    config.rails.bus.min_uv = 3_400_000;

    let result = config.validate();

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_empty_channel_name_when_validated_then_rejected() {
    let mut config = DriverConfig::default();
    config.channel.name.clear();

    let result = config.validate();

    match result {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains("channel.name"), "reason: {reason}");
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}
