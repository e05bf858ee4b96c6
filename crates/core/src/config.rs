//! Configuration structures for the AVWAP trend-quality system.

use crate::error::{Error, Result};
use crate::types::AnchorPolicy;
use serde::{Deserialize, Serialize};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Anchored VWAP configuration.
    pub avwap: AvwapConfig,
    /// Trend-quality signal configuration.
    pub signal: SignalConfig,
    /// Anchored screener configuration.
    pub screener: ScreenerConfig,
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.avwap.validate()?;
        self.signal.validate()?;
        self.screener.validate()
    }
}

/// Anchor search and accumulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvwapConfig {
    /// Trailing window size, shared by anchor search and regression fit.
    pub lookback: usize,
    /// Which price extreme anchors the window.
    pub anchor_policy: AnchorPolicy,
}

impl Default for AvwapConfig {
    fn default() -> Self {
        Self {
            lookback: 30,
            anchor_policy: AnchorPolicy::Min,
        }
    }
}

impl AvwapConfig {
    /// Convert a signed lookback (as received from Python) into a window size.
    pub fn checked_lookback(lookback: i64) -> Result<usize> {
        if lookback < 2 {
            return Err(Error::config(format!("lookback must be at least 2, got {lookback}")));
        }
        usize::try_from(lookback)
            .map_err(|_| Error::config(format!("lookback {lookback} is too large")))
    }

    /// Check that the lookback can support both an anchor search and a line fit.
    pub fn validate(&self) -> Result<()> {
        if self.lookback < 2 {
            return Err(Error::config(format!(
                "lookback must be at least 2, got {}",
                self.lookback
            )));
        }
        Ok(())
    }
}

/// Trend-quality signal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Minimum R² (exclusive) needed to assert the signal.
    pub r2_threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self { r2_threshold: 0.8 }
    }
}

impl SignalConfig {
    /// Threshold must be a finite value in [0, 1].
    pub fn validate(&self) -> Result<()> {
        if !self.r2_threshold.is_finite() || !(0.0..=1.0).contains(&self.r2_threshold) {
            return Err(Error::config(format!(
                "r2_threshold must be within [0, 1], got {}",
                self.r2_threshold
            )));
        }
        Ok(())
    }
}

/// Anchored screener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Number of trailing AVWAP differences averaged into the slope.
    pub slope_window: usize,
    /// Maximum premium of price over AVWAP for a candidate (0.05 = 5%).
    pub max_premium: f64,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            slope_window: 5,
            max_premium: 0.05,
        }
    }
}

impl ScreenerConfig {
    /// Convert a signed slope window into a count of differences.
    pub fn checked_slope_window(slope_window: i64) -> Result<usize> {
        if slope_window < 1 {
            return Err(Error::config(format!(
                "slope_window must be at least 1, got {slope_window}"
            )));
        }
        usize::try_from(slope_window)
            .map_err(|_| Error::config(format!("slope_window {slope_window} is too large")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.slope_window == 0 {
            return Err(Error::config("slope_window must be at least 1"));
        }
        if !self.max_premium.is_finite() || self.max_premium < 0.0 {
            return Err(Error::config(format!(
                "max_premium must be a non-negative number, got {}",
                self.max_premium
            )));
        }
        Ok(())
    }
}
