//! Configuration structures for the market-data aggregation system.
//!
//! Interval and window lengths are fixed at construction; there is no
//! runtime reconfiguration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::interval_label;

/// Main configuration for the aggregators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Candle configuration.
    pub candle: CandleConfig,
    /// Rolling ticker configuration.
    pub ticker: TickerConfig,
}

impl Config {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject non-positive interval or window lengths.
    pub fn validate(&self) -> Result<()> {
        self.candle.validate()?;
        self.ticker.validate()
    }
}

/// Candle bucketing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleConfig {
    /// Bucket length in milliseconds.
    pub interval_ms: i64,
}

impl CandleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms <= 0 {
            return Err(Error::config(format!(
                "candle interval_ms must be positive, got {}",
                self.interval_ms
            )));
        }
        Ok(())
    }

    /// Interval label carried on every emitted candle.
    pub fn label(&self) -> String {
        interval_label(self.interval_ms)
    }
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000 }
    }
}

/// Rolling ticker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Trailing window length in milliseconds.
    pub window_ms: i64,
}

impl TickerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_ms <= 0 {
            return Err(Error::config(format!(
                "ticker window_ms must be positive, got {}",
                self.window_ms
            )));
        }
        Ok(())
    }
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            window_ms: 24 * 60 * 60 * 1000,
        }
    }
}
