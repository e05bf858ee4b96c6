//! Anchored VWAP features and signals.
//!
//! This crate handles:
//! - Anchor selection over a trailing window (min or max policy)
//! - Anchored VWAP, re-anchored at every evaluation point
//! - Rolling least-squares R² of the AVWAP trend
//! - The trend-quality signal and the anchored pullback screener

pub mod anchor;
pub mod avwap;
pub mod regression;
pub mod screener;
pub mod signal;

pub use anchor::{AnchorSelector, SlidingExtreme};
pub use avwap::AvwapEngine;
pub use regression::{fit_line, rolling_r_squared, LinearFit};
pub use screener::{AvwapPullbackSignal, ScreenResult, Screener};
pub use signal::{AvwapR2Signal, Signal, TrendQuality};

use avwap_core::{AnchorPolicy, AvwapConfig, MarketSeries, Result, SignalConfig, TimeSeries};

/// Anchored VWAP of `market` for the given lookback and anchor policy.
pub fn compute_avwap(
    market: &MarketSeries,
    lookback: usize,
    anchor_policy: AnchorPolicy,
) -> Result<TimeSeries<Option<f64>>> {
    AvwapEngine::new(AvwapConfig {
        lookback,
        anchor_policy,
    })?
    .compute(market)
}

/// Trend-quality signal of `market`, anchoring at window lows.
pub fn generate_signal(
    market: &MarketSeries,
    lookback: usize,
    threshold: f64,
) -> Result<TimeSeries<bool>> {
    AvwapR2Signal::new(
        AvwapConfig {
            lookback,
            anchor_policy: AnchorPolicy::Min,
        },
        SignalConfig {
            r2_threshold: threshold,
        },
    )?
    .generate(market)
}
