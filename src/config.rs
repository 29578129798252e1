//! Bridge Configuration
//!
//! TOML-backed settings for the task bridge and the frame host.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Task bridge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Elapsed time that maps to 100% in progress estimates
    pub progress_time_base_ms: u64,
    /// Undrained events at which progress ticks are skipped
    pub progress_backlog_limit: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            progress_time_base_ms: 1000,
            progress_backlog_limit: 256,
        }
    }
}

/// Frame host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub frame_interval_ms: u64,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            log_filter: "info".to_string(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub tasks: TaskConfig,
    pub host: HostConfig,
}

impl BridgeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load `path` if given, else the user config file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config dir>/simbridge/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("simbridge").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tasks.progress_time_base_ms == 0 {
            return Err(ConfigError::Invalid(
                "tasks.progress_time_base_ms must be greater than zero".to_string(),
            ));
        }
        if self.host.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "host.frame_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [tasks]
            progress_time_base_ms = 4000
            "#,
        )
        .unwrap();

        assert_eq!(config.tasks.progress_time_base_ms, 4000);
        assert_eq!(config.tasks.progress_backlog_limit, 256);
        assert_eq!(config.host, HostConfig::default());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = BridgeConfig::from_toml_str("[host]\nframe_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[host]\nframe_interval_ms = 33\nlog_filter = \"debug\"").unwrap();

        let config = BridgeConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.host.frame_interval_ms, 33);
        assert_eq!(config.host.log_filter, "debug");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
