//! Global configuration from environment variables

use std::time::Duration;

use anyhow::{ensure, Result};
use serde::Deserialize;
use service_healthcheck::worker::MAX_INTERVAL;

/// Values from environment variables
#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of seconds between two checks of the same endpoint
    pub check_interval: u64,

    /// Number of seconds a dependency may stay unhealthy before the service
    /// is considered unhealthy
    pub critical_error_timeout: u64,

    /// Number of seconds after which a check request times out
    pub request_timeout: u64,

    /// Comma-separated list of urls to check
    pub check_urls: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_interval: 30,
            critical_error_timeout: 90,
            request_timeout: 10,
            check_urls: String::new(),
        }
    }
}

impl Config {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn critical_error_timeout(&self) -> Duration {
        Duration::from_secs(self.critical_error_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Non-empty entries of `check_urls`
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.check_urls
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// load configuration from environment variables
pub fn load() -> Result<Config> {
    let config: Config = config::Config::builder()
        .add_source(config::Environment::default())
        .build()?
        .try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

/// Reject intervals the monitor cannot schedule
fn validate(config: &Config) -> Result<()> {
    ensure!(config.check_interval > 0, "CHECK_INTERVAL must be positive");
    ensure!(
        config.check_interval() <= MAX_INTERVAL,
        "CHECK_INTERVAL must not exceed {} seconds",
        MAX_INTERVAL.as_secs()
    );
    Ok(())
}
