//! Configuration management module.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::freestyle::{DEFAULT_MAX_STRAY_FRAMES, INIT_SEQUENCE, ProtocolOptions};
use crate::freestyle::frame::TEXT_CMD;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Meter connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// hidraw node of the meter.
    pub path: PathBuf,
    /// Message type of text commands (default: 0x60).
    #[serde(default = "default_text_cmd")]
    pub text_cmd: u8,
    /// Message type of text replies (default: 0x60).
    #[serde(default = "default_text_cmd")]
    pub text_reply_cmd: u8,
    /// Message types sent on connect (default: [0x01]).
    #[serde(default = "default_init_sequence")]
    pub init_sequence: Vec<u8>,
    /// Consecutive stray frames tolerated per read; one more fails the read (default: 64).
    #[serde(default = "default_max_stray_frames")]
    pub max_stray_frames: usize,
}

fn default_text_cmd() -> u8 {
    TEXT_CMD
}

fn default_init_sequence() -> Vec<u8> {
    INIT_SEQUENCE.to_vec()
}

fn default_max_stray_frames() -> usize {
    DEFAULT_MAX_STRAY_FRAMES
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Also write logs to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl AppConfig {
    /// Get config file path from the platform config directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "freestyle-hid")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("Device path cannot be empty".to_string()));
        }
        if self.device.max_stray_frames < 1 {
            return Err(ConfigError::Validation(
                "Stray frame limit must be at least 1".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl DeviceConfig {
    /// Protocol parameters for a device session.
    pub fn protocol_options(&self) -> ProtocolOptions {
        ProtocolOptions {
            text_cmd: self.text_cmd,
            text_reply_cmd: self.text_reply_cmd,
            init_sequence: self.init_sequence.clone(),
            max_stray_frames: self.max_stray_frames,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/hidraw0"),
            text_cmd: default_text_cmd(),
            text_reply_cmd: default_text_cmd(),
            init_sequence: default_init_sequence(),
            max_stray_frames: default_max_stray_frames(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
