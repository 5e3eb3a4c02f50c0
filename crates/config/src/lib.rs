//! Configuration loading and validation for patternrun.
//!
//! Loads configuration from `~/.patternrun/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.patternrun/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the generation backend (Ollama-compatible)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model used when the caller does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Log level for the binary's tracing subscriber
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-request deadline for backend calls, in seconds (0 = no deadline)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Workers allowed when the caller does not pass an explicit list
    #[serde(default)]
    pub allowed_workers: Vec<String>,

    /// Built-in worker settings
    #[serde(default)]
    pub workers: WorkersConfig,
}

fn default_api_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "qwen2.5:7b".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_request_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    #[serde(default = "default_cve_catalog_url")]
    pub cve_catalog_url: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_weather_base_url() -> String {
    "https://wttr.in".into()
}
fn default_cve_catalog_url() -> String {
    "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json".into()
}
fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            weather_base_url: default_weather_base_url(),
            cve_catalog_url: default_cve_catalog_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load configuration from the default path (~/.patternrun/config.toml).
    ///
    /// Environment variables override the file (prefixed name first):
    /// - `PATTERNRUN_API_BASE_URL` / `API_BASE_URL`
    /// - `PATTERNRUN_MODEL` / `DEFAULT_MODEL`
    /// - `PATTERNRUN_LOG_LEVEL` / `LOG_LEVEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&Self::config_path(), |key| std::env::var(key).ok())
    }

    /// Read `path`, apply overrides from `lookup`, then validate the result.
    ///
    /// Validation runs once, on the merged values, so an override can fix a
    /// bad file value.
    pub fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without validating it.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.log_level = config.log_level.to_lowercase();
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |primary: &str, fallback: &str| lookup(primary).or_else(|| lookup(fallback));

        if let Some(url) = pick("PATTERNRUN_API_BASE_URL", "API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(model) = pick("PATTERNRUN_MODEL", "DEFAULT_MODEL") {
            self.default_model = model;
        }
        if let Some(level) = pick("PATTERNRUN_LOG_LEVEL", "LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".patternrun")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "api_base_url must start with http:// or https:// (got '{}')",
                self.api_base_url
            )));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of {} (got '{}')",
                LOG_LEVELS.join(", "),
                self.log_level
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            default_model: default_model(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
            allowed_workers: vec![],
            workers: WorkersConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
