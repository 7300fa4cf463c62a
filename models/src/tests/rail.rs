use crate::{ModelError, Rail, VoltageRange};

/// **VALUE**: Verifies the nominal rail windows are the fixed 1.8 V / 3.3 V points.
///
/// **WHY THIS MATTERS**: These values are programmed into the regulators before
/// enable; a wrong constant could over-volt the sensor bus.
#[test]
fn given_nominal_ranges_then_match_rail_voltages() {
    assert_eq!(VoltageRange::CONTROL_NOMINAL, VoltageRange::fixed(1_800_000));
    assert_eq!(VoltageRange::BUS_NOMINAL.min_uv, 3_300_000);
    assert_eq!(VoltageRange::BUS_NOMINAL.max_uv, 3_300_000);
}

/// **VALUE**: Verifies inverted or zero windows are rejected.
///
/// **BUG THIS CATCHES**: Would catch a config file swapping min and max.
#[test]
fn given_invalid_range_when_built_then_returns_validation_error() {
    assert!(matches!(
        VoltageRange::new(3_300_000, 1_800_000),
        Err(ModelError::Validation { .. })
    ));
    assert!(matches!(
        VoltageRange::new(0, 1_800_000),
        Err(ModelError::Validation { .. })
    ));
    assert!(VoltageRange::new(1_800_000, 1_850_000).is_ok());
}

#[test]
fn given_rails_when_displayed_then_use_regulator_names() {
    assert_eq!(Rail::Control.to_string(), "LDO-11");
    assert_eq!(Rail::Bus.to_string(), "LDO-15");
}
