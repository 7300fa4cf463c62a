pub mod config;
pub mod control;
pub mod device;
pub mod driver;
pub mod input;
pub mod protocol;
pub mod rail;
pub mod session;

pub use config::ConfigError;
pub use control::ControlError;
pub use device::{DeviceError, ErrorKind};
pub use driver::DriverError;
pub use input::InputError;
pub use protocol::ProtocolError;
pub use rail::RailError;
pub use session::SessionError;
