//! Configuration Module
//!
//! Handles loading and validating scheduler and cache configuration from
//! environment variables or JSON.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Longest single wait the scheduler issues, in milliseconds (`i32::MAX`).
pub const DEFAULT_MAX_CHUNK_MS: u64 = i32::MAX as u64;

/// Expiry applied to auto-created store entries, in milliseconds.
pub const DEFAULT_EXPIRY_MS: u64 = 300_000;

/// Scheduler and cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound of one scheduler wait chunk in milliseconds
    pub max_chunk_ms: u64,
    /// Expiry of entries created by a TTL store in milliseconds
    pub default_expiry_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Unparseable or zero values fall back to the defaults.
    ///
    /// # Environment Variables
    /// - `TIMEKEEP_MAX_CHUNK_MS` - Longest single wait (default: 2147483647)
    /// - `TIMEKEEP_DEFAULT_EXPIRY_MS` - Store entry expiry (default: 300000)
    pub fn from_env() -> Self {
        Self {
            max_chunk_ms: read_positive("TIMEKEEP_MAX_CHUNK_MS").unwrap_or(DEFAULT_MAX_CHUNK_MS),
            default_expiry_ms: read_positive("TIMEKEEP_DEFAULT_EXPIRY_MS")
                .unwrap_or(DEFAULT_EXPIRY_MS),
        }
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero durations.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_ms == 0 {
            return Err(Error::InvalidConfig(
                "max_chunk_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_expiry_ms == 0 {
            return Err(Error::InvalidConfig(
                "default_expiry_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_chunk(&self) -> Duration {
        Duration::from_millis(self.max_chunk_ms)
    }

    pub fn default_expiry(&self) -> Duration {
        Duration::from_millis(self.default_expiry_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_chunk_ms: DEFAULT_MAX_CHUNK_MS,
            default_expiry_ms: DEFAULT_EXPIRY_MS,
        }
    }
}

fn read_positive(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v: &u64| *v > 0)
}
