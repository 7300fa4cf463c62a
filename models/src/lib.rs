//! Domain models for the RSB companion driver.
//!
//! This crate contains pure data: the operating-state enumeration, the 8-byte
//! request record exchanged with the companion processor, rail descriptions and
//! the event values that flow between collaborators. Nothing here performs I/O.
//!
//! ## Architecture
//!
//! - **models** (this crate): pure data structures and the wire codec
//! - **rsb-core**: sequencing, protocol and recovery logic operating on models
//! - **rsb-bench**: bench console wiring everything to a simulated peer

pub mod error;
pub mod event;
pub mod rail;
pub mod state;
pub mod wire;

pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use event::{LinkState, MotionEvent, SubsystemEvent};
pub use rail::{Rail, VoltageRange};
pub use state::OperatingState;
pub use wire::{RsbCommand, RsbMessage, RsbResponse};

#[cfg(test)]
mod tests;
