//! # Settings Module
//!
//! Handles loading and validating tool settings from TOML files.
//!
//! Every section and field is optional; an absent settings file means
//! defaults throughout.
//!
//! ```toml
//! [serial]
//! port = ""                       # empty: auto-detect
//! baud_rate = 115200
//! usb_vendor_ids = [0x2E8A, 0x2341]
//!
//! [device]
//! snapshot_path = "haybox-device.json"
//!
//! [logging]
//! level = "info"
//! file = ""                       # empty: stderr only
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{HayBoxError, Result};
use crate::serial::{DEFAULT_BAUD_RATE, DEFAULT_VENDOR_IDS};

/// Main settings structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub serial: SerialSettings,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Serial port discovery settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialSettings {
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_usb_vendor_ids")]
    pub usb_vendor_ids: Vec<u16>,
}

/// Device backend settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeviceSettings {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

/// Logging settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub file: String,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            usb_vendor_ids: default_usb_vendor_ids(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

// Default value functions
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_usb_vendor_ids() -> Vec<u16> { DEFAULT_VENDOR_IDS.to_vec() }
fn default_snapshot_path() -> String { "haybox-device.json".to_string() }
fn default_log_level() -> String { "info".to_string() }

const VALID_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the settings file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use haybox_config::settings::Settings;
    ///
    /// let settings = Settings::load("haybox-config.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Configured serial port, if one was set
    pub fn serial_port(&self) -> Option<&str> {
        Some(self.serial.port.as_str()).filter(|p| !p.is_empty())
    }

    /// Validate settings values
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of its valid range
    pub fn validate(&self) -> Result<()> {
        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                VALID_BAUD_RATES
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.serial.usb_vendor_ids.is_empty() {
            return Err(invalid("usb_vendor_ids cannot be empty"));
        }

        if self.device.snapshot_path.trim().is_empty() {
            return Err(invalid("snapshot_path cannot be empty"));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> HayBoxError {
    HayBoxError::Config(toml::de::Error::custom(message))
}
