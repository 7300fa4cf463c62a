//! In-process stand-ins for the platform collaborators.
//!
//! Used by the test suites and by the bench console. Every simulator records
//! what the driver asked of it and can be told to fail specific calls.

mod input;
mod regulator;
mod subsystem;
mod transport;

pub use input::{RecordingSink, SinkEvent};
pub use regulator::{RegulatorCall, RegulatorOp, SimRegulator, SimRegulators};
pub use subsystem::SimSubsystem;
pub use transport::{AckMode, ConfigureReply, SimChannel, SimTransport};

/// Status codes reported through [`Fault`](crate::ports::Fault).
pub const EIO: i32 = -5;
pub const ENODEV: i32 = -19;
pub const ENOTCONN: i32 = -107;
