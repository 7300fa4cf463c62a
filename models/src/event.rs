//! Notifications and samples exchanged with external collaborators.

use serde::Serialize;

/// Link state reported by the IPC transport for the companion edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum LinkState {
    #[default]
    Down,
    Up,
}

/// Companion-processor lifecycle notices from the subsystem restart service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubsystemEvent {
    /// The companion is about to go down (crash or orderly restart).
    BeforeShutdown,
    /// The companion finished powering up.
    AfterPowerup,
}

/// One decoded event pushed by the companion on its unsolicited path.
///
/// `sub_id == 1` is a relative wheel movement of `value` detents; every other
/// sub-id is diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionEvent {
    pub sub_id: u32,
    pub value: i32,
}

impl MotionEvent {
    pub const WHEEL_SUB_ID: u32 = 1;

    pub const fn new(sub_id: u32, value: i32) -> Self {
        Self { sub_id, value }
    }

    pub const fn is_wheel(&self) -> bool {
        self.sub_id == Self::WHEEL_SUB_ID
    }
}
