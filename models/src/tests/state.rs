use crate::OperatingState;

/// **VALUE**: Verifies which states may be observed at rest.
///
/// **WHY THIS MATTERS**: The state machine only publishes stable states; if a
/// transient label were considered stable it could leak to the attribute reader.
#[test]
fn given_all_states_when_checked_then_only_three_are_stable() {
    let stable: Vec<_> = [
        OperatingState::Unknown,
        OperatingState::Init,
        OperatingState::Ldo11Enabled,
        OperatingState::RsbConfigured,
        OperatingState::Ldo15Enabled,
        OperatingState::RsbEnabled,
    ]
    .into_iter()
    .filter(OperatingState::is_stable)
    .collect();

    assert_eq!(
        stable,
        vec![
            OperatingState::Init,
            OperatingState::RsbConfigured,
            OperatingState::RsbEnabled
        ]
    );
}

/// **VALUE**: Verifies rail preconditions per state follow the nesting order.
///
/// **BUG THIS CATCHES**: Would catch a state that requires the bus rail without
/// the control rail, which would violate LDO-A outliving LDO-B.
#[test]
fn given_states_when_bus_rail_required_then_control_rail_also_required() {
    for state in [
        OperatingState::Init,
        OperatingState::Ldo11Enabled,
        OperatingState::RsbConfigured,
        OperatingState::Ldo15Enabled,
        OperatingState::RsbEnabled,
    ] {
        if state.requires_bus_rail() {
            assert!(state.requires_control_rail(), "{state} breaks nesting");
        }
    }
    assert!(!OperatingState::Init.requires_control_rail());
    assert!(OperatingState::RsbConfigured.requires_control_rail());
    assert!(!OperatingState::RsbConfigured.requires_bus_rail());
}

#[test]
fn given_default_state_then_unknown() {
    assert_eq!(OperatingState::default(), OperatingState::Unknown);
}
