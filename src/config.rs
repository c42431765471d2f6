//! Application configuration loading and validation.
//!
//! Configuration is loaded once at process start from a TOML file and passed
//! to the components that need it; there are no globals. Reloading happens
//! only by restarting with a new file.

use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::DEFAULT_HOLD_HOURS;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reservation hold settings.
    #[serde(default)]
    pub hold: HoldConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or a value is
    /// out of range.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    /// Returns an error if the content cannot be parsed or a value is out of
    /// range.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Initialize the tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(ConfigError::MissingField { field: "url" }.into());
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.hold.hours < 1 {
            return Err(ConfigError::InvalidValue {
                field: "hours",
                reason: format!("hold must be at least one hour, got {}", self.hold.hours),
            }
            .into());
        }
        Ok(())
    }
}

/// Database connection settings.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path (or `:memory:`).
    pub url: String,
    /// Connection pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "stockroom.db".into(),
            max_connections: 5,
        }
    }
}

/// Reservation hold settings.
#[derive(Debug, Deserialize)]
pub struct HoldConfig {
    /// How long an untouched reservation keeps its claim on stock.
    pub hours: i64,
}

impl HoldConfig {
    /// The hold window as a duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::hours(self.hours)
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            hours: DEFAULT_HOLD_HOURS,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Initialize the tracing subscriber with this logging configuration.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}
