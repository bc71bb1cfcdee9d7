use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable overriding `weather.base_url`
pub const WEATHER_URL_ENV: &str = "WEATHER_URL";
/// Environment variable overriding `weather.api_key`
pub const WEATHER_API_KEY_ENV: &str = "WEATHER_API_KEY";

const API_KEY_PLACEHOLDER: &str = "YOUR_WEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (defaults to the config file's directory)
    #[serde(default)]
    pub config_dir: PathBuf,

    /// Upstream weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Forecast cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the timeline API, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Provider API key (can be set via `WEATHER_API_KEY`)
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// How long a successful forecast stays cached
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,

    /// Upper bound on a single upstream request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline"
        .to_string()
}

fn default_api_key() -> String {
    API_KEY_PLACEHOLDER.to_string()
}

fn default_cache_ttl_minutes() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    /// Check if the API key is set (not empty or the placeholder)
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.starts_with("YOUR_")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Which store backs the forecast cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map; empty on every start
    Memory,
    /// SQLite file that survives restarts
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Database file for the sqlite backend (default: `<config_dir>/forecast_cache.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,
}

impl CacheConfig {
    /// Database path to open, falling back to a file inside `config_dir`.
    pub fn effective_sqlite_path(&self, config_dir: &Path) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| config_dir.join("forecast_cache.db"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("forecast");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist.
    ///
    /// `WEATHER_URL` and `WEATHER_API_KEY` (from the environment or a `.env`
    /// file) override the file values.
    pub fn load() -> Result<Self> {
        // A missing .env is the normal case
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path, writing defaults there if absent.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;

        if config.config_dir.as_os_str().is_empty() {
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Ok(Self::load()?.into_validated()?)
    }

    /// Validate this configuration, failing on errors and logging warnings.
    pub fn into_validated(self) -> Result<(Self, ValidationResult), ConfigError> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(WEATHER_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("weather.base_url overridden by {}", WEATHER_URL_ENV);
            self.weather.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup(WEATHER_API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("weather.api_key overridden by {}", WEATHER_API_KEY_ENV);
            self.weather.api_key = key.trim().to_string();
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if !self.weather.is_configured() {
            result.add_error(
                "weather.api_key",
                format!(
                    "API key not configured - set {} or edit the config file",
                    WEATHER_API_KEY_ENV
                ),
            );
        }

        if self.weather.cache_ttl_minutes == 0 {
            result.add_warning(
                "weather.cache_ttl_minutes",
                "Forecast caching disabled (0 minutes)",
            );
        } else if self.weather.cache_ttl_minutes > 1440 {
            result.add_warning(
                "weather.cache_ttl_minutes",
                "Forecast cache TTL is more than 24 hours",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        if self.cache.backend == CacheBackend::Sqlite {
            let path = self.cache.effective_sqlite_path(&self.config_dir);
            if path.is_dir() {
                result.add_error(
                    "cache.sqlite_path",
                    format!("Path is a directory: {}", path.display()),
                );
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.query().is_some() {
                    result.add_warning(
                        field_name,
                        "Query string in base URL will end up before the location segment",
                    );
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("forecast");

        Ok(config_dir.join("config.toml"))
    }
}
