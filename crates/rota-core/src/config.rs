use anyhow::Result;
use chrono::TimeDelta;
use config::Config;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub materializer: MaterializerConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
}

/// Tunables for the instance materialization job.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterializerConfig {
    /// How far past the window start instances are written, in days.
    pub horizon_days: u32,
    /// Seconds between scheduled runs.
    pub run_interval_secs: u64,
    /// How many series are processed at the same time within one run.
    pub concurrency: usize,
    /// Attempts per storage call before the series is given up on.
    pub storage_retry_attempts: u32,
    /// Delay before the first storage retry; later retries back off linearly.
    pub storage_retry_backoff_ms: u64,
    /// When set, a run stops launching new series after this many seconds.
    #[serde(default)]
    pub run_deadline_secs: Option<u64>,
}

impl MaterializerConfig {
    /// ## Summary
    /// Returns the materialization horizon as a chrono duration.
    #[must_use]
    pub fn horizon(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.horizon_days))
    }

    /// ## Summary
    /// Returns the pause between scheduled runs.
    #[must_use]
    pub const fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_secs)
    }

    /// ## Summary
    /// Returns the base delay between storage retries.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.storage_retry_backoff_ms)
    }

    /// ## Summary
    /// Checks that the job tunables describe a runnable job.
    ///
    /// ## Errors
    /// Returns an error if the horizon, concurrency, or retry attempts are zero.
    pub fn validate(&self) -> CoreResult<()> {
        if self.horizon_days == 0 {
            return Err(CoreError::InvalidConfiguration(
                "materializer.horizon_days must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(CoreError::InvalidConfiguration(
                "materializer.concurrency must be at least 1".to_string(),
            ));
        }
        if self.storage_retry_attempts == 0 {
            return Err(CoreError::InvalidConfiguration(
                "materializer.storage_retry_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            horizon_days: 90,
            run_interval_secs: 86_400,
            concurrency: 4,
            storage_retry_attempts: 3,
            storage_retry_backoff_ms: 250,
            run_deadline_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8745)?
            .set_default("database.max_connections", 4)?
            .set_default("logging.level", "debug")?
            .set_default("materializer.horizon_days", 90)?
            .set_default("materializer.run_interval_secs", 86_400)?
            .set_default("materializer.concurrency", 4)?
            .set_default("materializer.storage_retry_attempts", 3)?
            .set_default("materializer.storage_retry_backoff_ms", 250)?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Checks cross-field constraints that serde cannot express.
    ///
    /// ## Errors
    /// Returns an error if any section holds an unusable value.
    pub fn validate(&self) -> CoreResult<()> {
        self.materializer.validate()
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading, deserializing, or validating the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_materializer_config_is_valid() {
        let config = MaterializerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.horizon(), TimeDelta::days(90));
        assert_eq!(config.run_interval(), Duration::from_secs(86_400));
        assert_eq!(config.retry_backoff(), Duration::from_millis(250));
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let config = MaterializerConfig {
            horizon_days: 0,
            ..MaterializerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = MaterializerConfig {
            concurrency: 0,
            ..MaterializerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8745,
        };
        assert_eq!(server.bind_addr(), "127.0.0.1:8745");
    }
}
