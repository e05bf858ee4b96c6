//! Trend-quality signal.
//!
//! Fits a rolling line through the AVWAP series and asserts the signal where
//! the fit explains enough of the variance.

use crate::avwap::AvwapEngine;
use crate::regression::rolling_r_squared;
use avwap_core::{AvwapConfig, Config, MarketSeries, Result, SignalConfig, TimeSeries};
use tracing::debug;

/// A strategy mapping market data to a boolean decision series.
///
/// Implementations are interchangeable; callers pick one and call `generate`.
pub trait Signal {
    /// Short identifier of the strategy.
    fn name(&self) -> &str;

    /// Produce a decision for every observation of `market`, on the same index.
    fn generate(&self, market: &MarketSeries) -> Result<TimeSeries<bool>>;
}

/// Intermediate and final outputs of the AVWAP/R² strategy.
#[derive(Debug, Clone)]
pub struct TrendQuality {
    /// Anchored VWAP per observation.
    pub avwap: TimeSeries<Option<f64>>,
    /// R² of the trailing AVWAP line fit.
    pub fit_scores: TimeSeries<Option<f64>>,
    /// Whether the fit score clears the threshold.
    pub signal: TimeSeries<bool>,
}

/// Signal asserted when the AVWAP trend is well explained by a straight line.
#[derive(Debug, Clone)]
pub struct AvwapR2Signal {
    engine: AvwapEngine,
    config: SignalConfig,
}

impl AvwapR2Signal {
    /// Create the signal. Fails if either configuration is invalid.
    pub fn new(avwap: AvwapConfig, config: SignalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: AvwapEngine::new(avwap)?,
            config,
        })
    }

    /// Create the signal from the top-level configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.avwap.clone(), config.signal.clone())
    }

    pub fn engine(&self) -> &AvwapEngine {
        &self.engine
    }

    pub fn threshold(&self) -> f64 {
        self.config.r2_threshold
    }

    /// Rolling R² of an AVWAP series over the lookback window.
    pub fn fit_scores(&self, avwap: &TimeSeries<Option<f64>>) -> Result<TimeSeries<Option<f64>>> {
        let scores = rolling_r_squared(avwap.values(), self.engine.config().lookback);
        avwap.with_values(scores)
    }

    /// Run the full pipeline, keeping the intermediate series.
    pub fn evaluate(&self, market: &MarketSeries) -> Result<TrendQuality> {
        let avwap = self.engine.compute(market)?;
        let fit_scores = self.fit_scores(&avwap)?;

        let threshold = self.config.r2_threshold;
        let flags: Vec<bool> = fit_scores
            .values()
            .iter()
            .map(|score| score.is_some_and(|r2| r2 > threshold))
            .collect();

        debug!(
            observations = market.len(),
            scored = fit_scores.values().iter().filter(|s| s.is_some()).count(),
            asserted = flags.iter().filter(|f| **f).count(),
            threshold,
            "evaluated AVWAP trend quality"
        );

        let signal = fit_scores.with_values(flags)?;
        Ok(TrendQuality {
            avwap,
            fit_scores,
            signal,
        })
    }
}

impl Signal for AvwapR2Signal {
    fn name(&self) -> &str {
        "avwap_r2"
    }

    fn generate(&self, market: &MarketSeries) -> Result<TimeSeries<bool>> {
        self.evaluate(market).map(|quality| quality.signal)
    }
}
