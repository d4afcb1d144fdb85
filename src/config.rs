//! Engine configuration
//!
//! One JSON document with a section per subsystem. Every field has a
//! default, so an empty object (or no file at all) is a valid config.
//!
//! ```json
//! {
//!   "sandbox": { "timeout_ms": 250, "max_steps": 10000, "max_source_len": 4096 },
//!   "normalizer": { "worker_limit": 8, "continue_on_error": false },
//!   "cache": { "enabled": true }
//! }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::NormalizerConfig;
use crate::observability::{Event, Logger};
use crate::sandbox::SandboxConfig;
use crate::schema::CacheConfig;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Loads configuration from a JSON file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let display = path.display().to_string();

        let config = match fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content).map_err(|e| match e {
                ConfigError::Parse { source, .. } => ConfigError::Parse {
                    path: display.clone(),
                    source,
                },
                other => other,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: display,
                    source,
                })
            }
        };

        let timeout_ms = config.sandbox.timeout_ms.to_string();
        let worker_limit = config.normalizer.effective_worker_limit().to_string();
        Logger::event(
            Event::ConfigLoaded,
            &[
                ("path", display.as_str()),
                ("sandbox_timeout_ms", timeout_ms.as_str()),
                ("worker_limit", worker_limit.as_str()),
            ],
        );
        Ok(config)
    }

    /// Parses and validates a JSON config document.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content).map_err(|source| {
            ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.sandbox.timeout_ms == 0 {
            return Err(ConfigError::Invalid("sandbox.timeout_ms must be > 0".into()));
        }
        if self.sandbox.max_steps == 0 {
            return Err(ConfigError::Invalid("sandbox.max_steps must be > 0".into()));
        }
        if self.sandbox.max_source_len == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.max_source_len must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.sandbox.timeout_ms, 250);
        assert_eq!(config.normalizer.worker_limit, 8);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config =
            EngineConfig::from_json(r#"{"normalizer": {"continue_on_error": true}}"#).unwrap();
        assert!(config.normalizer.continue_on_error);
        assert_eq!(config.normalizer.worker_limit, 8);
        assert_eq!(config.sandbox.max_steps, 10_000);
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, "{ not json").unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("engine.json"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = EngineConfig::from_json(r#"{"sandbox": {"timeout_ms": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
