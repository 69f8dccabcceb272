//! Tracker configuration.
//!
//! [`TrackerConfig`] holds the sensor endpoint, the API key and the two timeouts. It can be
//! built in code or read from `TIRRENO_*` environment variables.

use crate::error::{Result, TrackerError};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_EVENT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 3;

pub const ENV_API_URL: &str = "TIRRENO_API_URL";
pub const ENV_API_KEY: &str = "TIRRENO_API_KEY";
pub const ENV_EVENT_TIMEOUT: &str = "TIRRENO_EVENT_TIMEOUT";
pub const ENV_CONNECTION_TIMEOUT: &str = "TIRRENO_CONNECTION_TIMEOUT";

/// Configuration for connecting to a tirreno sensor endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub api_url: String,
    pub api_key: String,
    /// Age after which an unsubmitted event is dropped
    pub event_timeout: Duration,
    /// Request timeout for each submission
    pub connection_timeout: Duration,
}

impl TrackerConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            event_timeout: Duration::from_secs(DEFAULT_EVENT_TIMEOUT_SECS),
            connection_timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
        }
    }

    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Build a configuration from `TIRRENO_*` environment variables.
    ///
    /// URL and key are required; timeouts are whole seconds and fall back to their
    /// defaults when unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup(ENV_API_URL)
            .ok_or_else(|| TrackerError::ConfigError(format!("{} is not set", ENV_API_URL)))?;
        let api_key = lookup(ENV_API_KEY)
            .ok_or_else(|| TrackerError::ConfigError(format!("{} is not set", ENV_API_KEY)))?;

        let mut config = Self::new(api_url, api_key);
        if let Some(secs) = parse_seconds(&lookup, ENV_EVENT_TIMEOUT)? {
            config.event_timeout = secs;
        }
        if let Some(secs) = parse_seconds(&lookup, ENV_CONNECTION_TIMEOUT)? {
            config.connection_timeout = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the endpoint URL parses and an API key is present
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api_url).map_err(|e| {
            TrackerError::ConfigError(format!("invalid API URL {:?}: {}", self.api_url, e))
        })?;

        if self.api_key.trim().is_empty() {
            return Err(TrackerError::ConfigError("API key must not be empty".to_string()));
        }

        Ok(())
    }
}

fn parse_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<Duration>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };

    let secs = raw.trim().parse::<u64>().map_err(|_| {
        TrackerError::ConfigError(format!(
            "{} must be a whole number of seconds, got {:?}",
            name, raw
        ))
    })?;
    Ok(Some(Duration::from_secs(secs)))
}
