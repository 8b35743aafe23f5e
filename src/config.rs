// Serial link and heartbeat configuration
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// Serial port for the drive motor controller
pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyACM0";
pub const DEFAULT_BAUDRATE: u32 = 115_200;

// Per-exchange I/O timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

// Host heartbeat period; must stay below the controller's watchdog timeout
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_millis(250);
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub path: String,
    pub baudrate: u32,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SERIAL_PATH.to_string(),
            baudrate: DEFAULT_BAUDRATE,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub period_ms: u64,
    /// Watchdog timeout configured on the controller
    pub watchdog_timeout_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_HEARTBEAT_PERIOD.as_millis() as u64,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT.as_millis() as u64,
        }
    }
}

impl HeartbeatConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub serial: SerialConfig,
    pub heartbeat: HeartbeatConfig,
}

impl DriveConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.path.is_empty() {
            return Err(ConfigError::Invalid("serial.path is empty".to_string()));
        }
        if self.serial.baudrate == 0 {
            return Err(ConfigError::Invalid("serial.baudrate must be > 0".to_string()));
        }
        if self.serial.timeout_ms == 0 {
            return Err(ConfigError::Invalid("serial.timeout_ms must be > 0".to_string()));
        }
        if self.heartbeat.period_ms == 0 {
            return Err(ConfigError::Invalid("heartbeat.period_ms must be > 0".to_string()));
        }
        if self.heartbeat.period_ms >= self.heartbeat.watchdog_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "heartbeat.period_ms ({}) must be shorter than heartbeat.watchdog_timeout_ms ({})",
                self.heartbeat.period_ms, self.heartbeat.watchdog_timeout_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DriveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.path, "/dev/ttyACM0");
        assert_eq!(config.serial.baudrate, 115_200);
        assert_eq!(config.serial.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DriveConfig =
            serde_json::from_str(r#"{"serial": {"path": "/dev/ttyUSB1"}}"#).unwrap();
        assert_eq!(config.serial.path, "/dev/ttyUSB1");
        assert_eq!(config.serial.baudrate, DEFAULT_BAUDRATE);
        assert_eq!(config.heartbeat, HeartbeatConfig::default());
    }

    #[test]
    fn test_heartbeat_must_beat_watchdog() {
        let mut config = DriveConfig::default();
        config.heartbeat.period_ms = 1000;
        config.heartbeat.watchdog_timeout_ms = 1000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.heartbeat.period_ms = 999;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = DriveConfig::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
