//! Runtime configuration (vireo.toml)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Runtime-wide settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Suppress all diagnostics
    #[serde(default)]
    pub silent: bool,
    /// Production mode; implies `silent`
    #[serde(default)]
    pub production: bool,
    /// Decode encoded newlines in attribute values while compiling
    #[serde(default)]
    pub decode_newlines: bool,
    /// Report a diagnostic when mounting an already mounted instance
    #[serde(default = "default_true")]
    pub warn_on_remount: bool,
    /// Runs of a single instance allowed within one flush before the flush
    /// is cut short as an infinite update loop
    #[serde(default = "default_max_update_count")]
    pub max_update_count: u32,
    /// Compiled templates kept by the compiler
    #[serde(default = "default_compile_cache_size")]
    pub compile_cache_size: usize,
    /// Interpolation delimiters for components that declare none
    #[serde(default)]
    pub delimiters: Option<(String, String)>,
}

fn default_true() -> bool {
    true
}

fn default_max_update_count() -> u32 {
    100
}

fn default_compile_cache_size() -> usize {
    128
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            silent: false,
            production: false,
            decode_newlines: false,
            warn_on_remount: true,
            max_update_count: default_max_update_count(),
            compile_cache_size: default_compile_cache_size(),
            delimiters: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Whether diagnostics are suppressed
    pub fn is_silent(&self) -> bool {
        self.silent || self.production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.max_update_count, 100);
        assert!(config.warn_on_remount);
    }

    #[test]
    fn test_partial_config() {
        let config = RuntimeConfig::from_toml_str(
            r#"
production = true
compile_cache_size = 8
delimiters = ["[[", "]]"]
"#,
        )
        .unwrap();

        assert!(config.is_silent());
        assert_eq!(config.compile_cache_size, 8);
        assert_eq!(config.delimiters, Some(("[[".to_string(), "]]".to_string())));
    }

    #[test]
    fn test_invalid_config() {
        let err = RuntimeConfig::from_toml_str("silent = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RuntimeConfig::load("/nonexistent/vireo.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vireo.toml"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = RuntimeConfig {
            silent: true,
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
    }
}
