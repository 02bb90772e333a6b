//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application types
//! where the wiring needs them.

use ausweis_application::{DEFAULT_READER, DEFAULT_TIMEOUT, ServiceConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Local kernel endpoint of a running AusweisApp.
pub const DEFAULT_SDK_URL: &str = "ws://127.0.0.1:24727/eID-Kernel";

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("timeouts.{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("sdk.url cannot be empty")]
    EmptyUrl,

    #[error("reader.name cannot be empty")]
    EmptyReaderName,
}

/// Raw SDK connection configuration (`[sdk]` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSdkConfig {
    /// WebSocket URL of the SDK kernel
    pub url: String,
    /// API level to negotiate on startup (SDK default when unset)
    pub api_level: Option<u32>,
}

impl Default for FileSdkConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SDK_URL.to_string(),
            api_level: None,
        }
    }
}

/// Raw timeout configuration in milliseconds (`[timeouts]` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTimeoutsConfig {
    pub command_ms: u64,
    pub start_ms: u64,
    pub stop_ms: u64,
}

impl Default for FileTimeoutsConfig {
    fn default() -> Self {
        let millis = DEFAULT_TIMEOUT.as_millis() as u64;
        Self {
            command_ms: millis,
            start_ms: millis,
            stop_ms: millis,
        }
    }
}

/// Raw card reader configuration (`[reader]` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReaderConfig {
    /// Reader expected to hold the card
    pub name: String,
    /// Use the SDK's simulated reader instead of `name`
    pub simulator: bool,
}

impl Default for FileReaderConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_READER.to_string(),
            simulator: false,
        }
    }
}

/// Raw traffic logging configuration (`[traffic]` section)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTrafficConfig {
    /// Log every command and message exchanged with the SDK
    pub enabled: bool,
    /// Write traffic as JSON lines to this file instead of the log output
    pub jsonl_path: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub sdk: FileSdkConfig,
    pub timeouts: FileTimeoutsConfig,
    pub reader: FileReaderConfig,
    pub traffic: FileTrafficConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("command_ms", self.timeouts.command_ms),
            ("start_ms", self.timeouts.start_ms),
            ("stop_ms", self.timeouts.stop_ms),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::InvalidTimeout(field));
            }
        }

        if self.sdk.url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyUrl);
        }

        if self.reader.name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyReaderName);
        }

        Ok(())
    }

    /// Timeouts as the command service expects them.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::from_millis(
            self.timeouts.command_ms,
            self.timeouts.start_ms,
            self.timeouts.stop_ms,
        )
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.command_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[sdk]
url = "ws://localhost:24727/eID-Kernel"
api_level = 2

[timeouts]
command_ms = 5000
start_ms = 10000
stop_ms = 2000

[reader]
name = "REINER SCT cyberJack RFID basis"
simulator = true

[traffic]
enabled = true
jsonl_path = "/tmp/ausweis.traffic.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sdk.url, "ws://localhost:24727/eID-Kernel");
        assert_eq!(config.sdk.api_level, Some(2));
        assert_eq!(config.timeouts.start_ms, 10_000);
        assert_eq!(config.reader.name, "REINER SCT cyberJack RFID basis");
        assert!(config.reader.simulator);
        assert!(config.traffic.enabled);
        assert_eq!(
            config.traffic.jsonl_path,
            Some(PathBuf::from("/tmp/ausweis.traffic.jsonl"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[timeouts]
command_ms = 500
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timeouts.command_ms, 500);
        // Defaults should apply
        assert_eq!(config.timeouts.start_ms, 40_000);
        assert_eq!(config.sdk.url, DEFAULT_SDK_URL);
        assert_eq!(config.reader.name, "NFC");
        assert!(!config.traffic.enabled);
    }

    #[test]
    fn test_service_config_uses_millis() {
        let config: FileConfig =
            toml::from_str("[timeouts]\ncommand_ms = 1500\nstop_ms = 250").unwrap();
        let service = config.service_config();
        assert_eq!(service.command_timeout, Duration::from_millis(1500));
        assert_eq!(service.start_timeout, DEFAULT_TIMEOUT);
        assert_eq!(service.stop_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config: FileConfig = toml::from_str("[timeouts]\nstart_ms = 0").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidTimeout("start_ms"))
        );
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "timeouts.start_ms cannot be 0"
        );
    }

    #[test]
    fn test_validate_empty_names() {
        let config: FileConfig = toml::from_str("[sdk]\nurl = \" \"").unwrap();
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyUrl));

        let config: FileConfig = toml::from_str("[reader]\nname = \"\"").unwrap();
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyReaderName));
    }
}
