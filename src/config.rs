//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Memory store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("memoir")
                .join("memories.db")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./memoir_data/memories.db".to_string())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Analytics engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Working-set bound for module fetches
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// Payload cache lifetime in minutes; 0 disables expiry
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: i64,

    /// Whether the payload cache is enabled
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

fn default_fetch_limit() -> usize {
    500
}

fn default_cache_ttl() -> i64 {
    60
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            fetch_limit: default_fetch_limit(),
            cache_ttl_minutes: default_cache_ttl(),
            cache_enabled: default_cache_enabled(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("memoir").join("config.toml")),
            Some(PathBuf::from("/etc/memoir/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(db_path) = std::env::var("MEMOIR_DB_PATH") {
            self.store.db_path = db_path;
        }

        if let Ok(limit) = std::env::var("MEMOIR_FETCH_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.analytics.fetch_limit = l;
            }
        }
        if let Ok(ttl) = std::env::var("MEMOIR_CACHE_TTL_MINUTES") {
            if let Ok(t) = ttl.parse() {
                self.analytics.cache_ttl_minutes = t;
            }
        }

        if let Ok(level) = std::env::var("MEMOIR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MEMOIR_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            analytics: AnalyticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Memoir Configuration
#
# Environment variables override these settings:
# - MEMOIR_DB_PATH
# - MEMOIR_FETCH_LIMIT
# - MEMOIR_CACHE_TTL_MINUTES
# - MEMOIR_LOG_LEVEL
# - MEMOIR_LOG_FORMAT

[store]
# Sqlite database holding memory records
db_path = "~/.local/share/memoir/memories.db"

[analytics]
# How many of the most recent memories each module works over
fetch_limit = 500

# Payload cache lifetime (minutes); 0 disables expiry
cache_ttl_minutes = 60

# Enable the payload cache
cache_enabled = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/memoir/memoir.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analytics.fetch_limit, 500);
        assert_eq!(config.analytics.cache_ttl_minutes, 60);
        assert!(config.analytics.cache_enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
            [analytics]
            fetch_limit = 200
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.analytics.fetch_limit, 200);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.analytics.cache_ttl_minutes, 60);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_default_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.analytics.fetch_limit, 500);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = Config::load(Path::new("/nonexistent/memoir.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
