pub mod config;
pub mod control;
pub mod device;
pub mod driver;
pub mod error;
pub mod input;
pub mod ports;
pub mod power;
pub mod protocol;
pub mod recovery;
pub mod session;
pub mod sim;

mod sync;
#[cfg(test)]
mod tests;

pub const DRIVER_NAME: &str = "bg-rsb";
pub const DRIVER_COMPATIBLE: &str = "qcom,bg-rsb";
