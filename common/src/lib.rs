//! Shared building blocks for the RSB driver workspace.
//!
//! Every error type in the workspace records where it was raised through
//! [`ErrorLocation`], captured with `#[track_caller]` at the construction site.

pub mod error;
pub mod millis;

pub use error::error_location::ErrorLocation;
pub use millis::Millis;
