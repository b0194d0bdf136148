//! Configuration management
//!
//! This module handles loading and parsing configuration for the Blogicum server.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Template configuration
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Pagination configuration
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL (`:memory:` for an in-memory database)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/blogicum.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Optional directory whose `.html` files override the embedded templates
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Interval between expired-session sweeps, in seconds
    #[serde(default = "default_session_cleanup_secs")]
    pub session_cleanup_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
            session_cleanup_secs: default_session_cleanup_secs(),
        }
    }
}

fn default_session_days() -> i64 {
    14
}

fn default_session_cleanup_secs() -> u64 {
    3600
}

/// Pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Posts per page on every listing
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - BLOGICUM_SERVER_HOST
    /// - BLOGICUM_SERVER_PORT
    /// - BLOGICUM_DATABASE_URL
    /// - BLOGICUM_TEMPLATES_PATH
    /// - BLOGICUM_AUTH_SESSION_DAYS
    /// - BLOGICUM_PAGINATION_PAGE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "pagination.page_size must be at least 1".to_string(),
            ));
        }
        if self.auth.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("BLOGICUM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("BLOGICUM_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("BLOGICUM_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(path) = std::env::var("BLOGICUM_TEMPLATES_PATH") {
            self.templates.path = Some(PathBuf::from(path));
        }
        if let Ok(days) = std::env::var("BLOGICUM_AUTH_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.auth.session_days = days;
            }
        }
        if let Ok(size) = std::env::var("BLOGICUM_PAGINATION_PAGE_SIZE") {
            if let Ok(size) = size.parse::<u32>() {
                self.pagination.page_size = size;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z][a-z0-9]{0,10}",
            1u16..=65535,
            "[a-z][a-z0-9_/]{0,20}\\.db",
            1u32..=100,
            1i64..=365,
        )
            .prop_map(|(host, port, url, page_size, session_days)| Config {
                server: ServerConfig { host, port },
                database: DatabaseConfig {
                    url,
                    max_connections: 5,
                },
                templates: TemplatesConfig::default(),
                auth: AuthConfig {
                    session_days,
                    session_cleanup_secs: 600,
                },
                pagination: PaginationConfig { page_size },
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Serializing a valid config to YAML and loading it back yields the same values.
        #[test]
        fn config_yaml_roundtrip(config in valid_config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(config.server.host, parsed.server.host);
            prop_assert_eq!(config.server.port, parsed.server.port);
            prop_assert_eq!(config.database.url, parsed.database.url);
            prop_assert_eq!(config.auth.session_days, parsed.auth.session_days);
            prop_assert_eq!(config.pagination.page_size, parsed.pagination.page_size);
        }
    }
}
