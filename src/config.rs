//! Configuration loading using Figment.
//!
//! Tools built on this crate find the instrument address and log level in a
//! TOML file, optionally overridden by `GPIB_`-prefixed environment
//! variables (nested keys separated by `__`):
//!
//! ```text
//! GPIB_DEVICE__PRIMARY_ADDRESS=22
//! GPIB_LOGGING__LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```toml
//! [device]
//! board = 0
//! primary_address = 13
//! secondary_address = 0
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    Load(#[from] figment::Error),
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GpibConfig {
    /// Instrument address
    #[serde(default)]
    pub device: DeviceConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Address of the instrument to open
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Interface board index (minor number of /dev/gpibN)
    #[serde(default)]
    pub board: i32,
    /// Primary address, 0-30
    #[serde(default = "default_primary_address")]
    pub primary_address: i32,
    /// Secondary address: 0 for none, otherwise 96-126
    #[serde(default)]
    pub secondary_address: i32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_primary_address() -> i32 {
    13
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            board: 0,
            primary_address: default_primary_address(),
            secondary_address: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl GpibConfig {
    /// Load from `gpib.toml` in the working directory and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("gpib.toml")
    }

    /// Load from a specific file path and the environment.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("GPIB_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Check address ranges and the log level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let device = &self.device;
        if !(0..=15).contains(&device.board) {
            return Err(ConfigError::Validation(format!(
                "Invalid board {}. Must be 0-15",
                device.board
            )));
        }
        if !(0..=30).contains(&device.primary_address) {
            return Err(ConfigError::Validation(format!(
                "Invalid primary_address {}. Must be 0-30",
                device.primary_address
            )));
        }
        if device.secondary_address != 0 && !(96..=126).contains(&device.secondary_address) {
            return Err(ConfigError::Validation(format!(
                "Invalid secondary_address {}. Must be 0 (none) or 96-126",
                device.secondary_address
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}
