//! Driver configuration.
//!
//! Loaded from `{config_dir}/bgrsb.toml`. Every field has a default matching
//! the reference hardware, so a missing file is not an error.

use crate::error::config::ConfigError;

use common::{ErrorLocation, Millis};
use models::VoltageRange;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "bgrsb.toml";
const CONFIG_VERSION: u32 = 1;

// ============================================
// CONFIG STRUCTS
// ============================================

/// Identity of the IPC channel towards the companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_name")]
    pub name: String,
    #[serde(default = "default_channel_edge")]
    pub edge: String,
    #[serde(default = "default_channel_transport")]
    pub transport: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: default_channel_name(),
            edge: default_channel_edge(),
            transport: default_channel_transport(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailConfig {
    pub supply: String,
    pub min_uv: u32,
    pub max_uv: u32,
}

impl RailConfig {
    pub fn voltage(&self) -> VoltageRange {
        VoltageRange {
            min_uv: self.min_uv,
            max_uv: self.max_uv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailsConfig {
    #[serde(default = "default_control_rail")]
    pub control: RailConfig,
    #[serde(default = "default_bus_rail")]
    pub bus: RailConfig,
}

impl Default for RailsConfig {
    fn default() -> Self {
        Self {
            control: default_control_rail(),
            bus: default_bus_rail(),
        }
    }
}

/// Wait budgets, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Transmit acknowledgement for any request.
    #[serde(default = "default_exchange_timeout")]
    pub send_ack: Millis,
    /// Reply to configure, counted after the acknowledgement.
    #[serde(default = "default_exchange_timeout")]
    pub response: Millis,
    /// Connected notification after opening the channel.
    #[serde(default = "default_exchange_timeout")]
    pub channel_open: Millis,
    /// Channel readiness during bring-up.
    #[serde(default = "default_link_wait")]
    pub link_wait: Millis,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            send_ack: default_exchange_timeout(),
            response: default_exchange_timeout(),
            channel_open: default_exchange_timeout(),
            link_wait: default_link_wait(),
        }
    }
}

impl TimeoutConfig {
    pub fn send_ack(&self) -> Duration {
        self.send_ack.as_duration()
    }

    pub fn response(&self) -> Duration {
        self.response.as_duration()
    }

    pub fn channel_open(&self) -> Duration {
        self.channel_open.as_duration()
    }

    pub fn link_wait(&self) -> Duration {
        self.link_wait.as_duration()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemConfig {
    #[serde(default = "default_subsystem_name")]
    pub name: String,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            name: default_subsystem_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_name")]
    pub device_name: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_name: default_input_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub rails: RailsConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub subsystem: SubsystemConfig,

    #[serde(default)]
    pub input: InputConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            channel: ChannelConfig::default(),
            rails: RailsConfig::default(),
            timeouts: TimeoutConfig::default(),
            subsystem: SubsystemConfig::default(),
            input: InputConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_channel_name() -> String {
    "RSB_CTRL".to_string()
}
fn default_channel_edge() -> String {
    "bg".to_string()
}
fn default_channel_transport() -> String {
    "bgcom".to_string()
}
fn default_control_rail() -> RailConfig {
    RailConfig {
        supply: "vdd-ldo1".to_string(),
        min_uv: VoltageRange::CONTROL_NOMINAL.min_uv,
        max_uv: VoltageRange::CONTROL_NOMINAL.max_uv,
    }
}
fn default_bus_rail() -> RailConfig {
    RailConfig {
        supply: "vdd-ldo2".to_string(),
        min_uv: VoltageRange::BUS_NOMINAL.min_uv,
        max_uv: VoltageRange::BUS_NOMINAL.max_uv,
    }
}
fn default_exchange_timeout() -> Millis {
    Millis(500)
}
fn default_link_wait() -> Millis {
    Millis(2000)
}
fn default_subsystem_name() -> String {
    "bg-wear".to_string()
}
fn default_input_name() -> String {
    "bg-spi".to_string()
}

// ============================================
// IMPLEMENTATION
// ============================================

impl DriverConfig {
    /// Load config from {config_dir}/bgrsb.toml.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    /// Returns `Err(ConfigError)` if the file exists but cannot be read, parsed or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config = Self::parse(&contents).map_err(|reason| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            reason,
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        let names = [
            ("channel.name", &self.channel.name),
            ("channel.edge", &self.channel.edge),
            ("channel.transport", &self.channel.transport),
            ("rails.control.supply", &self.rails.control.supply),
            ("rails.bus.supply", &self.rails.bus.supply),
            ("subsystem.name", &self.subsystem.name),
            ("input.device_name", &self.input.device_name),
        ];
        if let Some((field, _)) = names.iter().find(|(_, value)| value.is_empty()) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("{field} cannot be empty"),
            });
        }

        for (field, rail) in [("control", &self.rails.control), ("bus", &self.rails.bus)] {
            if let Err(e) = rail.voltage().validate() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("rails.{field}: {e}"),
                });
            }
        }

        let timeouts = [
            ("timeouts.send_ack", self.timeouts.send_ack),
            ("timeouts.response", self.timeouts.response),
            ("timeouts.channel_open", self.timeouts.channel_open),
            ("timeouts.link_wait", self.timeouts.link_wait),
        ];
        if let Some((field, _)) = timeouts.iter().find(|(_, value)| value.is_zero()) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("{field} must be greater than zero"),
            });
        }

        Ok(())
    }
}
