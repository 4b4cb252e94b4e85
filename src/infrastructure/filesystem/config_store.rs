use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::common::error::SyncError;
use crate::domain::entities::sync_config::AppConfig;

/// File read when neither `--config` nor `GPS_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "git-provider-sync.yaml";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "GPS_CONFIG";

/// Configuration store related errors
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Configuration file not found at path: {0}")]
    ConfigFileNotFound(String),

    #[error("Configuration file read failed: {0}")]
    ReadFailed(String),

    #[error("YAML parsing failed: {0}")]
    YamlParsingFailed(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

impl From<ConfigStoreError> for SyncError {
    fn from(error: ConfigStoreError) -> Self {
        SyncError::config_error_with_source(error.to_string(), error)
    }
}

/// Loads the YAML configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    validate_on_read: bool,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            validate_on_read: true,
        }
    }

    /// Store that hands back whatever parses, for inspection.
    pub fn without_validation() -> Self {
        Self {
            validate_on_read: false,
        }
    }

    /// The explicit path if given, otherwise [`DEFAULT_CONFIG_FILE`].
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Read and validate the configuration at `config_path`.
    pub fn read_config<P: AsRef<Path>>(&self, config_path: P) -> Result<AppConfig, ConfigStoreError> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Err(ConfigStoreError::ConfigFileNotFound(
                config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(config_path)
            .map_err(|e| ConfigStoreError::ReadFailed(e.to_string()))?;

        let config = self.parse(&contents)?;
        debug!(
            path = %config_path.display(),
            configurations = config.configurations.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from YAML text.
    pub fn parse(&self, contents: &str) -> Result<AppConfig, ConfigStoreError> {
        let config: AppConfig = serde_yaml::from_str(contents)
            .map_err(|e| ConfigStoreError::YamlParsingFailed(e.to_string()))?;

        if self.validate_on_read {
            config
                .validate_all()
                .map_err(|e| ConfigStoreError::ValidationFailed(e.to_string()))?;
        }
        Ok(config)
    }
}
