//! Capabilities the driver consumes from its surroundings.
//!
//! The platform hands the driver one implementation of each trait at attach
//! time. Every registration receives an explicit notifier bound to the driver
//! instance that registered it; there is no process-wide driver pointer.

pub mod input;
pub mod regulator;
pub mod subsystem;
pub mod transport;

pub use input::MotionSink;
pub use regulator::{Regulator, RegulatorProvider};
pub use subsystem::SubsystemRestart;
pub use transport::{Channel, ExchangeId, LinkTransport};

use thiserror::Error as ThisError;

/// Failure reported by an external capability.
///
/// `code` carries the collaborator's native status (typically a negative errno).
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{reason} (code {code})")]
pub struct Fault {
    pub code: i32,
    pub reason: String,
}

impl Fault {
    pub fn new(code: i32, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}
