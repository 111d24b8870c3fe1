//! `qg_config` - Configuration parsing and validation for querygate
//!
//! This crate provides:
//! - TOML configuration parsing with full defaults
//! - Path expansion (`~/` to home directory)
//! - Default database location under the platform data dir
//! - Guardrail-limit overrides resolved against engine defaults

use qg_guard::{GuardrailConfig, GuardrailOverrides};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QgConfig {
    /// Global settings
    pub global: GlobalConfig,

    /// Guardrail limit overrides; unset keys keep engine defaults
    pub guardrails: GuardrailOverrides,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Path to the `DuckDB` database file
    pub db_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Enable JSON logging
    pub json_logs: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Default database path using platform data directories
fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("querygate")
        .join("querygate.duckdb")
}

/// Default config file location under the platform config dir
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("querygate")
        .join("config.toml")
}

/// Expand tilde in path to home directory
#[must_use]
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(stripped) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if path_str == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    path.to_path_buf()
}

impl QgConfig {
    /// Load from an explicit path, the default location, or defaults.
    ///
    /// A missing default file is not an error; explicit paths must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = default_config_path();
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        info!(path = %resolved.display(), "Loading configuration");
        let text = std::fs::read_to_string(&resolved)?;
        let mut config: QgConfig = toml::from_str(&text)?;
        config.global.db_path = expand_path(&config.global.db_path);
        Ok(config)
    }

    /// Parse from a TOML string
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid TOML.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Engine defaults with this config's overrides applied
    #[must_use]
    pub fn guardrail_config(&self) -> GuardrailConfig {
        let mut config = GuardrailConfig::default();
        config.apply(&self.guardrails);
        config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Default tests
    // ========================================================================

    #[test]
    fn test_default_global() {
        let config = QgConfig::default();
        assert_eq!(config.global.log_level, "info");
        assert!(!config.global.json_logs);
        assert!(config.global.db_path.ends_with("querygate.duckdb"));
    }

    #[test]
    fn test_default_guardrails_resolve_to_engine_defaults() {
        let config = QgConfig::default();
        assert_eq!(config.guardrail_config(), GuardrailConfig::default());
    }

    // ========================================================================
    // TOML parsing tests
    // ========================================================================

    #[test]
    fn test_parse_empty_toml() {
        let config = QgConfig::from_toml("").unwrap();
        assert_eq!(config.global.log_level, "info");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = QgConfig::from_toml(
            r#"
            [global]
            log_level = "debug"

            [guardrails]
            max_joins = 2
            known_tables = ["customer_information"]
            "#,
        )
        .unwrap();

        assert_eq!(config.global.log_level, "debug");

        let resolved = config.guardrail_config();
        assert_eq!(resolved.max_joins, 2);
        assert_eq!(resolved.known_tables, vec!["customer_information"]);
        // Untouched limits keep their defaults
        assert_eq!(resolved.max_rows, 10_000);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(QgConfig::from_toml("global = [[[").is_err());
    }

    #[test]
    fn test_load_missing_explicit_path_errors() {
        let result = QgConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    // ========================================================================
    // Path expansion tests
    // ========================================================================

    #[test]
    fn test_expand_tilde_prefix() {
        let expanded = expand_path(Path::new("~/qg/data.duckdb"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("qg/data.duckdb"));
    }

    #[test]
    fn test_expand_plain_path_untouched() {
        let plain = Path::new("/var/lib/querygate.duckdb");
        assert_eq!(expand_path(plain), plain);
    }
}
