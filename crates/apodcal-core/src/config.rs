use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Directory name under the platform config directory
const APP_DIR: &str = "apodcal";

/// Config file name
const CONFIG_FILE: &str = "config.toml";

/// Environment variable that overrides `apod.api_key`
pub const API_KEY_ENV: &str = "NASA_API_KEY";

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

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the config file and the local cache database
    pub config_dir: PathBuf,

    /// Upstream APOD service
    #[serde(default)]
    pub apod: ApodConfig,

    /// Month cache and loader timing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Calendar view bounds
    #[serde(default)]
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApodConfig {
    /// Base URL; requests go to `{base_url}/apod`.
    ///
    /// Points at NASA directly by default. A proxy that injects the key
    /// server-side works too, in which case `api_key` can stay unset.
    pub base_url: String,

    /// NASA API key, appended as `api_key` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl ApodConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApodConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nasa.gov/planetary".to_string(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// SQLite file (relative to `config_dir`) backing the durable store
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// Key the whole month cache is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// How long the current month's cached data stays valid
    #[serde(default = "default_ttl_hours")]
    pub current_month_ttl_hours: u32,

    /// Quiet period after the last month change before fetching
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_db_file() -> String {
    "apod_cache.db".to_string()
}

fn default_storage_key() -> String {
    "apodCache".to_string()
}

fn default_ttl_hours() -> u32 {
    24
}

fn default_debounce_ms() -> u64 {
    200
}

impl CacheConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn current_month_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.current_month_ttl_hours))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            storage_key: default_storage_key(),
            current_month_ttl_hours: default_ttl_hours(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// First date the calendar lets the user navigate to
    #[serde(default = "default_earliest_date")]
    pub earliest_date: NaiveDate,
}

fn default_earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            earliest_date: default_earliest_date(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            config_dir,
            apod: ApodConfig::default(),
            cache: CacheConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist.
    ///
    /// `NASA_API_KEY` from the environment takes precedence over the file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?
        } else {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            config
        };

        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Fails with [`ConfigError::Invalid`] on critical errors; warnings are logged.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Replace the API key with a non-empty override.
    pub fn apply_api_key_override(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.apod.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.apod.base_url, "apod.base_url", &mut result);

        if self.apod.api_key.is_none() {
            result.add_warning(
                "apod.api_key",
                format!(
                    "No API key configured; set {} unless base_url is a proxy",
                    API_KEY_ENV
                ),
            );
        }

        if self.apod.timeout_secs == 0 {
            result.add_error("apod.timeout_secs", "Timeout must be greater than 0");
        }

        if self.cache.current_month_ttl_hours == 0 {
            result.add_error(
                "cache.current_month_ttl_hours",
                "Current month TTL must be greater than 0",
            );
        }

        if self.cache.storage_key.trim().is_empty() {
            result.add_error("cache.storage_key", "Storage key must not be empty");
        }

        if self.cache.debounce_ms == 0 {
            result.add_warning(
                "cache.debounce_ms",
                "Debounce disabled; every month change fetches immediately",
            );
        } else if self.cache.debounce_ms > 2000 {
            result.add_warning(
                "cache.debounce_ms",
                "Debounce is longer than 2 seconds",
            );
        }

        result
    }

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
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Path of the SQLite cache database.
    pub fn cache_db_path(&self) -> PathBuf {
        self.config_dir.join(&self.cache.db_file)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);

        Ok(config_dir.join(CONFIG_FILE))
    }
}
