//! # Scaling Configuration Module
//!
//! This module defines configuration structures for serving-size scaling,
//! including serving bounds, debounce timing, and recovery settings for the
//! remote scaling service.

use anyhow::{Context, Result};
use log::{info, warn};
use std::env;
use std::time::Duration;

// Constants for scaling configuration
pub const MAX_SERVINGS: u32 = 20;
pub const DEFAULT_SERVINGS: u32 = 4;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Recovery configuration for remote scaling calls
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConfig {
    /// Timeout for a single remote scaling call in seconds
    pub operation_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 15,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

impl RecoveryConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Configuration structure for a scaling session
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingConfig {
    /// Upper bound for serving counts (lower bound is always 1)
    pub max_servings: u32,
    /// Serving count used when the recipe's portion text has no usable number
    pub default_servings: u32,
    /// Quiet period after the last serving change before a remote call is issued
    pub debounce_ms: u64,
    /// Recovery and error handling configuration
    pub recovery: RecoveryConfig,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            max_servings: MAX_SERVINGS,
            default_servings: DEFAULT_SERVINGS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            recovery: RecoveryConfig::default(),
        }
    }
}

impl ScalingConfig {
    /// Build a configuration from `SCALER_*` environment variables
    ///
    /// Loads a `.env` file first if one is present. Unset variables keep their
    /// default values; set but unparsable variables are an error.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `SCALER_MAX_SERVINGS` | `max_servings` |
    /// | `SCALER_DEFAULT_SERVINGS` | `default_servings` |
    /// | `SCALER_DEBOUNCE_MS` | `debounce_ms` |
    /// | `SCALER_TIMEOUT_SECS` | `recovery.operation_timeout_secs` |
    /// | `SCALER_BREAKER_THRESHOLD` | `recovery.circuit_breaker_threshold` |
    /// | `SCALER_BREAKER_RESET_SECS` | `recovery.circuit_breaker_reset_secs` |
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Some(v) = read_var("SCALER_MAX_SERVINGS")? {
            config.max_servings = v;
        }
        if let Some(v) = read_var("SCALER_DEFAULT_SERVINGS")? {
            config.default_servings = v;
        }
        if let Some(v) = read_var("SCALER_DEBOUNCE_MS")? {
            config.debounce_ms = v;
        }
        if let Some(v) = read_var("SCALER_TIMEOUT_SECS")? {
            config.recovery.operation_timeout_secs = v;
        }
        if let Some(v) = read_var("SCALER_BREAKER_THRESHOLD")? {
            config.recovery.circuit_breaker_threshold = v;
        }
        if let Some(v) = read_var("SCALER_BREAKER_RESET_SECS")? {
            config.recovery.circuit_breaker_reset_secs = v;
        }

        config.validate()?;
        info!(
            "Loaded scaling configuration: max_servings={}, debounce={}ms",
            config.max_servings, config.debounce_ms
        );
        Ok(config)
    }

    /// Check that the configuration describes a usable serving range
    pub fn validate(&self) -> Result<()> {
        if self.max_servings == 0 {
            anyhow::bail!("max_servings must be at least 1");
        }
        if self.default_servings == 0 || self.default_servings > self.max_servings {
            anyhow::bail!(
                "default_servings must be within 1..={}, got {}",
                self.max_servings,
                self.default_servings
            );
        }
        if self.recovery.operation_timeout_secs == 0 {
            warn!("operation_timeout_secs is 0, every remote call will time out");
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn read_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {name}: {raw:?}")),
        Err(_) => Ok(None),
    }
}
