//! Device state machine and the actors that feed it.
//!
//! # Architecture
//!
//! - [`DeviceStateMachine`] owns the operating state behind one async mutex;
//!   every transition, and every state-changing rail or protocol call, happens
//!   while that mutex is held
//! - The lifecycle actor runs bring-up and shutdown, the delivery actor runs
//!   enable/disable requests; both are single-consumer tasks fed by mpsc queues
//! - [`DeviceHandle`] is the cloneable front door used by notifiers, the control
//!   attribute and the platform's suspend/resume hooks
//!
//! A before-shutdown notice bumps the machine's shutdown epoch before it is
//! queued. Bring-up and delivery work started under an older epoch is aborted
//! with [`DeviceError::Preempted`](crate::error::DeviceError::Preempted), so the
//! shutdown never waits behind an exchange that is going to fail anyway.

mod actor;
mod handle;
mod machine;

pub use handle::{DeviceHandle, DeviceTasks};
pub use machine::{DeviceSnapshot, DeviceStateMachine, PendingAction};
