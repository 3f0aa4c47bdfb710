//! Driver configuration
//!
//! Settings a host driver tunes per robot, loaded from YAML:
//!
//! ```yaml
//! max_power: 100          # percent applied at max_speed
//! max_speed: 0.5          # m/s the model reaches at max_power
//! period: 0.05            # seconds between motor state polls
//! battery_poll_interval: 60
//! usb:
//!   write_timeout_ms: 0   # 0 waits forever
//!   read_timeout_ms: 0
//! ```
//!
//! Every field is optional and falls back to the defaults above.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating a [`DriverConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// USB transfer timeouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsbConfig {
    pub write_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl UsbConfig {
    /// Bulk OUT timeout; zero means no timeout.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Bulk IN timeout; zero means no timeout.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Host driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Power in percent applied when `max_speed` is requested.
    pub max_power: f64,
    /// Linear speed in m/s the model reaches at `max_power`.
    pub max_speed: f64,
    /// Seconds between motor encoder polls. About 2 ms of USB round trip per motor.
    pub period: f64,
    /// Minimum seconds between battery level polls.
    pub battery_poll_interval: f64,
    pub usb: UsbConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_power: 100.0,
            max_speed: 0.5,
            period: 0.05,
            battery_poll_interval: 60.0,
            usb: UsbConfig::default(),
        }
    }
}

impl DriverConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: DriverConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io { path: path.as_ref().to_path_buf(), source: e })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_power > 0.0 && self.max_power <= 100.0) {
            return Err(ConfigError::Invalid {
                field: "max_power",
                reason: format!("{} is outside (0, 100]", self.max_power),
            });
        }
        if !(self.max_speed > 0.0 && self.max_speed.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "max_speed",
                reason: format!("{} must be a positive speed", self.max_speed),
            });
        }
        if !(self.period > 0.0 && self.period.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "period",
                reason: format!("{} must be a positive number of seconds", self.period),
            });
        }
        if !(self.battery_poll_interval >= 0.0 && self.battery_poll_interval.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "battery_poll_interval",
                reason: format!("{} must not be negative", self.battery_poll_interval),
            });
        }
        Ok(())
    }

    /// `period` as a [`Duration`]; out-of-range values saturate instead of panicking.
    pub fn period_duration(&self) -> Duration {
        saturating_secs(self.period)
    }

    /// `battery_poll_interval` as a [`Duration`]; out-of-range values saturate.
    pub fn battery_poll_duration(&self) -> Duration {
        saturating_secs(self.battery_poll_interval)
    }
}

/// Seconds to a [`Duration`] for configs that skipped [`DriverConfig::validate`].
///
/// Negative and NaN values become zero; values too large to represent become
/// [`Duration::MAX`].
fn saturating_secs(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => duration,
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}
