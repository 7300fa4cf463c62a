//! Operating state of the RSB peripheral.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Where the peripheral sits in its power/configuration sequence.
///
/// The sequence is `Unknown → Init → Ldo11Enabled → RsbConfigured →
/// Ldo15Enabled → RsbEnabled`. Only [`Init`](Self::Init),
/// [`RsbConfigured`](Self::RsbConfigured) and [`RsbEnabled`](Self::RsbEnabled)
/// are stable; the two `Ldo*Enabled` labels exist only while a transition is
/// being sequenced and are never published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum OperatingState {
    /// Before attach has completed.
    #[default]
    Unknown,
    /// Attached, both rails off.
    Init,
    /// Control rail up, configure not yet acknowledged.
    Ldo11Enabled,
    /// Control rail up and the companion acknowledged configure.
    RsbConfigured,
    /// Bus rail up, delivery not yet acknowledged.
    Ldo15Enabled,
    /// Both rails up and delivery enabled.
    RsbEnabled,
}

impl OperatingState {
    /// True for the states a transition may come to rest in.
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::Init | Self::RsbConfigured | Self::RsbEnabled)
    }

    /// Control rail (LDO-A) is expected to be enabled in this state.
    pub const fn requires_control_rail(&self) -> bool {
        matches!(
            self,
            Self::Ldo11Enabled | Self::RsbConfigured | Self::Ldo15Enabled | Self::RsbEnabled
        )
    }

    /// Bus rail (LDO-B) is expected to be enabled in this state.
    pub const fn requires_bus_rail(&self) -> bool {
        matches!(self, Self::Ldo15Enabled | Self::RsbEnabled)
    }
}

impl Display for OperatingState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Init => "init",
            Self::Ldo11Enabled => "ldo11-enabled",
            Self::RsbConfigured => "rsb-configured",
            Self::Ldo15Enabled => "ldo15-enabled",
            Self::RsbEnabled => "rsb-enabled",
        };
        formatter.write_str(label)
    }
}
