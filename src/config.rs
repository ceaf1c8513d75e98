//! # Configuration Management
//!
//! Centralized configuration for a mesh link.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`MESH_LINK_*`)
//!
//! ## Sections
//! - `registry`: node table capacity, automatic identity registration
//! - `receive`: receive buffer size, back-off after transport errors
//! - `logging`: subscriber level and format

use crate::core::packet::{HEADER_SIZE, MAX_FRAME_SIZE};
use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default number of registry slots
pub const DEFAULT_REGISTRY_CAPACITY: usize = 20;

/// Default receive buffer, one radio MTU
pub const DEFAULT_RX_BUFFER_SIZE: usize = 1500;

/// Highest usable registry capacity; node ids are 1..=255
pub const MAX_REGISTRY_CAPACITY: usize = u8::MAX as usize;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MeshConfig {
    /// Node registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Receive loop configuration
    #[serde(default)]
    pub receive: ReceiveConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MeshConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| MeshError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| MeshError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| MeshError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(capacity) = std::env::var("MESH_LINK_REGISTRY_CAPACITY") {
            if let Ok(val) = capacity.parse::<usize>() {
                config.registry.capacity = val;
            }
        }

        if let Ok(auto) = std::env::var("MESH_LINK_AUTO_REGISTER") {
            if let Ok(val) = auto.parse::<bool>() {
                config.registry.auto_register_identities = val;
            }
        }

        if let Ok(size) = std::env::var("MESH_LINK_RX_BUFFER_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.receive.rx_buffer_size = val;
            }
        }

        if let Ok(backoff) = std::env::var("MESH_LINK_ERROR_BACKOFF_MS") {
            if let Ok(val) = backoff.parse::<u64>() {
                config.receive.error_backoff = Duration::from_millis(val);
            }
        }

        if let Ok(level) = std::env::var("MESH_LINK_LOG_LEVEL") {
            if let Ok(val) = level.parse::<Level>() {
                config.logging.log_level = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MeshError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| MeshError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.registry.validate());
        errors.extend(self.receive.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MeshError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Node registry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Maximum number of registered nodes
    pub capacity: usize,

    /// Register identity announcements heard by the root automatically
    pub auto_register_identities: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REGISTRY_CAPACITY,
            auto_register_identities: true,
        }
    }
}

impl RegistryConfig {
    /// Validate registry configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.capacity == 0 {
            errors.push("Registry capacity must be greater than 0".to_string());
        } else if self.capacity > MAX_REGISTRY_CAPACITY {
            errors.push(format!(
                "Registry capacity too large: {} (node ids only span 1-{MAX_REGISTRY_CAPACITY})",
                self.capacity
            ));
        }

        errors
    }
}

/// Receive loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReceiveConfig {
    /// Size of the single reusable receive buffer
    pub rx_buffer_size: usize,

    /// Pause after a transport receive error before waiting again
    #[serde(with = "duration_serde")]
    pub error_backoff: Duration,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            rx_buffer_size: DEFAULT_RX_BUFFER_SIZE,
            error_backoff: Duration::from_millis(10),
        }
    }
}

impl ReceiveConfig {
    /// Validate receive configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.rx_buffer_size < HEADER_SIZE {
            errors.push(format!(
                "Receive buffer too small: {} bytes (minimum: {HEADER_SIZE})",
                self.rx_buffer_size
            ));
        } else if self.rx_buffer_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Receive buffer too large: {} bytes (maximum: {MAX_FRAME_SIZE})",
                self.rx_buffer_size
            ));
        }

        if self.error_backoff.as_secs() > 10 {
            errors.push("Receive error back-off too long (maximum: 10s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,

    /// Whether to emit ANSI colour codes
    pub ansi_colors: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mesh-link"),
            log_level: Level::INFO,
            json_format: false,
            ansi_colors: true,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        level.as_str().to_lowercase().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
