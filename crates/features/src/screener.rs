//! Anchored VWAP pullback screener.
//!
//! Anchors a single AVWAP at the extreme of the last lookback window and checks
//! whether the latest price sits just above a rising AVWAP.

use crate::anchor::AnchorSelector;
use crate::signal::Signal;
use avwap_core::{
    ts_to_datetime, Anchor, AvwapConfig, Config, Error, MarketSeries, Result, ScreenerConfig,
    TimeSeries, TimestampMs,
};
use serde::Serialize;
use tracing::debug;

/// Outcome of screening one series at its latest observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenResult {
    /// Anchor in the anchor source (price or lows).
    pub anchor: Anchor,
    /// Timestamp of the latest observation.
    pub ts_ms: TimestampMs,
    /// Latest price.
    pub price: f64,
    /// Latest anchored VWAP.
    pub avwap: Option<f64>,
    /// Mean recent change of the anchored VWAP.
    pub slope: Option<f64>,
    /// Price above a rising AVWAP, within the allowed premium.
    pub is_candidate: bool,
}

impl ScreenResult {
    /// Anchor date as `YYYY-MM-DD` (UTC).
    pub fn anchor_date(&self) -> Option<String> {
        ts_to_datetime(self.anchor.ts_ms).map(|dt| dt.format("%Y-%m-%d").to_string())
    }
}

/// Anchored VWAP screener.
#[derive(Debug, Clone)]
pub struct Screener {
    lookback: usize,
    selector: AnchorSelector,
    config: ScreenerConfig,
}

impl Screener {
    /// Create a screener. Fails if either configuration is invalid.
    pub fn new(avwap: AvwapConfig, config: ScreenerConfig) -> Result<Self> {
        avwap.validate()?;
        config.validate()?;
        Ok(Self {
            lookback: avwap.lookback,
            selector: AnchorSelector::new(avwap.anchor_policy),
            config,
        })
    }

    /// Create a screener from the top-level configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.avwap.clone(), config.screener.clone())
    }

    /// Screen the latest observation of `market`.
    ///
    /// The anchor is searched in `anchor_source` (e.g. lows) when given,
    /// otherwise in the price series. Returns `Ok(None)` when the series is too
    /// short to screen.
    pub fn screen(
        &self,
        market: &MarketSeries,
        anchor_source: Option<&TimeSeries<f64>>,
    ) -> Result<Option<ScreenResult>> {
        let anchor_prices = self.anchor_prices(market, anchor_source)?;
        let result = self.screen_until(market, anchor_prices, market.len());

        if let Some(r) = &result {
            debug!(
                anchor_ts = r.anchor.ts_ms,
                price = r.price,
                avwap = ?r.avwap,
                slope = ?r.slope,
                candidate = r.is_candidate,
                "screened series"
            );
        }
        Ok(result)
    }

    fn anchor_prices<'a>(
        &self,
        market: &'a MarketSeries,
        anchor_source: Option<&'a TimeSeries<f64>>,
    ) -> Result<&'a [f64]> {
        let Some(source) = anchor_source else {
            return Ok(market.prices());
        };
        if source.timestamps() != market.timestamps() {
            return Err(Error::data("anchor source must share the market index"));
        }
        if let Some(pos) = source.values().iter().position(|v| !v.is_finite()) {
            return Err(Error::data(format!("non-finite anchor price at position {pos}")));
        }
        Ok(source.values())
    }

    /// Screen the prefix `[0, end)` of the series.
    fn screen_until(
        &self,
        market: &MarketSeries,
        anchor_prices: &[f64],
        end: usize,
    ) -> Option<ScreenResult> {
        if end < self.lookback + self.config.slope_window {
            return None;
        }

        let timestamps = market.timestamps();
        let prices = market.prices();
        let volumes = market.volumes();

        let start = end - self.lookback;
        let found = self
            .selector
            .select_anchor(&timestamps[start..end], &anchor_prices[start..end])?;
        let anchor = Anchor {
            index: start + found.offset,
            ..found
        };

        // Anchored VWAP from the single anchor through the last observation.
        let mut turnover = 0.0;
        let mut volume = 0.0;
        let anchored: Vec<Option<f64>> = (anchor.index..end)
            .map(|i| {
                turnover += prices[i] * volumes[i];
                volume += volumes[i];
                (volume > 0.0).then(|| turnover / volume)
            })
            .collect();

        let slope = self.slope(&anchored);
        let avwap = anchored.last().copied().flatten();
        let price = prices[end - 1];

        let is_candidate = match (avwap, slope) {
            (Some(avwap), Some(slope)) => {
                price > avwap && slope > 0.0 && price < avwap * (1.0 + self.config.max_premium)
            }
            _ => false,
        };

        Some(ScreenResult {
            anchor,
            ts_ms: timestamps[end - 1],
            price,
            avwap,
            slope,
            is_candidate,
        })
    }

    /// Mean of the defined first differences among the last `slope_window`.
    fn slope(&self, anchored: &[Option<f64>]) -> Option<f64> {
        let diffs: Vec<f64> = anchored
            .windows(2)
            .rev()
            .take(self.config.slope_window)
            .filter_map(|w| Some(w[1]? - w[0]?))
            .collect();
        if diffs.is_empty() {
            return None;
        }
        Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
    }
}

/// Pullback signal: the screener applied at every observation.
#[derive(Debug, Clone)]
pub struct AvwapPullbackSignal {
    screener: Screener,
}

impl AvwapPullbackSignal {
    pub fn new(screener: Screener) -> Self {
        Self { screener }
    }
}

impl Signal for AvwapPullbackSignal {
    fn name(&self) -> &str {
        "avwap_pullback"
    }

    fn generate(&self, market: &MarketSeries) -> Result<TimeSeries<bool>> {
        let prices = market.prices();
        let flags = (1..=market.len())
            .map(|end| {
                self.screener
                    .screen_until(market, prices, end)
                    .is_some_and(|r| r.is_candidate)
            })
            .collect();
        market.price().with_values(flags)
    }
}
