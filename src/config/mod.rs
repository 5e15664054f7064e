use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;
pub const DEFAULT_WRITE_WRITE_DELAY_MS: u64 = 50;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serial link settings shared by sessions and discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Per-line read timeout
    pub read_timeout_ms: u64,
    /// Minimum spacing between two writes to the same port
    pub write_write_delay_ms: u64,
    /// Wait after opening a port while the device resets
    pub settle_delay_ms: u64,
    /// Probe only these ports instead of enumerating the system's ports
    pub try_ports: Option<Vec<String>>,
    /// Log every request and reply at info level
    pub debug: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            write_write_delay_ms: DEFAULT_WRITE_WRITE_DELAY_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            try_ports: None,
            debug: false,
        }
    }
}

impl SerialConfig {
    /// Load a config from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_write_delay(&self) -> Duration {
        Duration::from_millis(self.write_write_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_device_settings() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout(), Duration::from_millis(50));
        assert_eq!(config.write_write_delay(), Duration::from_millis(50));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert!(config.try_ports.is_none());
        assert!(!config.debug);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SerialConfig::from_json_str(
            r#"{ "baud_rate": 19200, "try_ports": ["/dev/ttyUSB0", "/dev/ttyUSB1"] }"#,
        )
        .unwrap();
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
        assert_eq!(
            config.try_ports,
            Some(vec!["/dev/ttyUSB0".to_string(), "/dev/ttyUSB1".to_string()])
        );
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let result = SerialConfig::from_json_str("{ baud_rate: }");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }
}
