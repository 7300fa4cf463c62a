//! Millisecond durations as they appear in configuration files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A timeout budget expressed in whole milliseconds.
///
/// Serialized as a bare integer so config files read `send_ack = 500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millis(pub u64);

impl Millis {
    pub const fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Millis {
    fn from(ms: u64) -> Self {
        Millis(ms)
    }
}

impl From<Millis> for Duration {
    fn from(ms: Millis) -> Self {
        ms.as_duration()
    }
}

impl std::fmt::Display for Millis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
