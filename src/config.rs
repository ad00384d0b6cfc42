//! Feature store configuration
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{Logger, Severity};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Values parse but contradict each other
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "MEMINDEX_CONFIG_IO",
            ConfigError::Parse(_) => "MEMINDEX_CONFIG_PARSE",
            ConfigError::Invalid(_) => "MEMINDEX_CONFIG_INVALID",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// Feature store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStoreConfig {
    /// Scratch write offset above which the next write starts over at 0 (default: 2000)
    #[serde(default = "default_scratch_reset_threshold_bits")]
    pub scratch_reset_threshold_bits: u64,

    /// Largest encoded record accepted by commit (default: 65536)
    #[serde(default = "default_max_record_bits")]
    pub max_record_bits: u64,

    /// Initial size of a newly activated buffer (default: 4096)
    #[serde(default = "default_min_buffer_bytes")]
    pub min_buffer_bytes: usize,

    /// Minimum severity written by the logger (default: info)
    #[serde(default)]
    pub log_level: Severity,
}

fn default_scratch_reset_threshold_bits() -> u64 {
    2000
}

fn default_max_record_bits() -> u64 {
    65536
}

fn default_min_buffer_bytes() -> usize {
    // 1024 clusters of 4 bytes
    4096
}

impl Default for FeatureStoreConfig {
    fn default() -> Self {
        Self {
            scratch_reset_threshold_bits: default_scratch_reset_threshold_bits(),
            max_record_bits: default_max_record_bits(),
            min_buffer_bytes: default_min_buffer_bytes(),
            log_level: Severity::default(),
        }
    }
}

impl FeatureStoreConfig {
    /// Create a config with a custom scratch reset threshold
    pub fn with_reset_threshold(bits: u64) -> Self {
        Self {
            scratch_reset_threshold_bits: bits,
            ..Default::default()
        }
    }

    /// Parses and validates a config from JSON text.
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Checks that the values are usable together.
    ///
    /// A record no larger than the threshold never forces a reset on its own,
    /// so the threshold must stay below the largest accepted record.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_record_bits == 0 {
            return Err(ConfigError::Invalid("max_record_bits must be positive".into()));
        }
        if self.scratch_reset_threshold_bits >= self.max_record_bits {
            return Err(ConfigError::Invalid(format!(
                "scratch_reset_threshold_bits ({}) must be below max_record_bits ({})",
                self.scratch_reset_threshold_bits, self.max_record_bits
            )));
        }
        if self.min_buffer_bytes == 0 {
            return Err(ConfigError::Invalid("min_buffer_bytes must be positive".into()));
        }
        Ok(())
    }

    /// Sets the process-wide log level.
    pub fn apply_log_level(&self) {
        Logger::set_min_severity(self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = FeatureStoreConfig::default();
        assert_eq!(config.scratch_reset_threshold_bits, 2000);
        assert_eq!(config.max_record_bits, 65536);
        assert_eq!(config.min_buffer_bytes, 4096);
        assert_eq!(config.log_level, Severity::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = FeatureStoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, FeatureStoreConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config =
            FeatureStoreConfig::from_json_str(r#"{"scratch_reset_threshold_bits": 128, "log_level": "warn"}"#)
                .unwrap();
        assert_eq!(config.scratch_reset_threshold_bits, 128);
        assert_eq!(config.log_level, Severity::Warn);
        assert_eq!(config.max_record_bits, 65536);
    }

    #[test]
    fn test_threshold_must_be_below_max_record() {
        let err = FeatureStoreConfig::from_json_str(
            r#"{"scratch_reset_threshold_bits": 4096, "max_record_bits": 4096}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "MEMINDEX_CONFIG_INVALID");
        assert!(err.to_string().contains("max_record_bits"));
    }

    #[test]
    fn test_zero_min_buffer_rejected() {
        let config = FeatureStoreConfig {
            min_buffer_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_json() {
        let err = FeatureStoreConfig::from_json_str(r#"{"max_record_bits": "lots"}"#).unwrap_err();
        assert_eq!(err.code(), "MEMINDEX_CONFIG_PARSE");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_buffer_bytes": 1024}}"#).unwrap();

        let config = FeatureStoreConfig::load(file.path()).unwrap();
        assert_eq!(config.min_buffer_bytes, 1024);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FeatureStoreConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), "MEMINDEX_CONFIG_IO");
    }
}
