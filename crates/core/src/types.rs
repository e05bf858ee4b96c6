//! Core data types for the AVWAP trend-quality system.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Price type with ordering support.
pub type Price = OrderedFloat<f64>;

/// Convert a millisecond timestamp to a UTC datetime.
#[inline]
pub fn ts_to_datetime(ts_ms: TimestampMs) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_ms)
}

/// Which price extreme anchors a trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPolicy {
    /// Anchor to the lowest price (local low).
    #[default]
    Min,
    /// Anchor to the highest price (local high).
    Max,
}

impl AnchorPolicy {
    /// Whether `candidate` should replace `current` as the window extreme.
    ///
    /// Strict comparison, so an equal later price never displaces an earlier one.
    #[inline]
    pub fn prefers(self, candidate: Price, current: Price) -> bool {
        match self {
            AnchorPolicy::Min => candidate < current,
            AnchorPolicy::Max => candidate > current,
        }
    }
}

impl fmt::Display for AnchorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorPolicy::Min => write!(f, "min"),
            AnchorPolicy::Max => write!(f, "max"),
        }
    }
}

impl FromStr for AnchorPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" | "low" => Ok(AnchorPolicy::Min),
            "max" | "high" => Ok(AnchorPolicy::Max),
            other => Err(Error::config(format!(
                "unknown anchor policy '{other}', expected 'min' or 'max'"
            ))),
        }
    }
}

/// Observation chosen as the start of an anchored accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Position within the searched window.
    pub offset: usize,
    /// Position within the full series.
    pub index: usize,
    /// Timestamp of the anchor observation.
    pub ts_ms: TimestampMs,
    /// Price at the anchor.
    pub price: f64,
}

/// Ordered `(timestamp, value)` series with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries<T> {
    timestamps: Vec<TimestampMs>,
    values: Vec<T>,
}

impl<T> TimeSeries<T> {
    /// Build a series from parallel timestamp and value vectors.
    pub fn new(timestamps: Vec<TimestampMs>, values: Vec<T>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(Error::data(format!(
                "series has {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::data(format!(
                "timestamps must be strictly increasing: {} at position {} follows {}",
                timestamps[pos + 1],
                pos + 1,
                timestamps[pos]
            )));
        }
        Ok(Self { timestamps, values })
    }

    /// Build a new series on the same index with different values.
    pub fn with_values<U>(&self, values: Vec<U>) -> Result<TimeSeries<U>> {
        if values.len() != self.timestamps.len() {
            return Err(Error::data(format!(
                "expected {} values for index, got {}",
                self.timestamps.len(),
                values.len()
            )));
        }
        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
        })
    }

    pub fn timestamps(&self) -> &[TimestampMs] {
        &self.timestamps
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

}

/// Aligned price and volume series sharing one timestamp index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSeries {
    price: TimeSeries<f64>,
    volume: TimeSeries<f64>,
}

impl MarketSeries {
    /// Pair a price and a volume series.
    ///
    /// Both must have identical timestamps, finite values and non-negative volume.
    pub fn new(price: TimeSeries<f64>, volume: TimeSeries<f64>) -> Result<Self> {
        if price.len() != volume.len() {
            return Err(Error::data(format!(
                "price has {} observations but volume has {}",
                price.len(),
                volume.len()
            )));
        }
        if let Some(pos) = price
            .timestamps()
            .iter()
            .zip(volume.timestamps())
            .position(|(p, v)| p != v)
        {
            return Err(Error::data(format!(
                "price and volume timestamps differ at position {}: {} vs {}",
                pos,
                price.timestamps()[pos],
                volume.timestamps()[pos]
            )));
        }
        if let Some(pos) = price.values().iter().position(|p| !p.is_finite()) {
            return Err(Error::data(format!("non-finite price at position {pos}")));
        }
        if let Some(pos) = volume
            .values()
            .iter()
            .position(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(Error::data(format!(
                "volume must be finite and non-negative, got {} at position {}",
                volume.values()[pos],
                pos
            )));
        }
        Ok(Self { price, volume })
    }

    /// Build from a shared index and parallel price/volume vectors.
    pub fn from_vecs(
        timestamps: Vec<TimestampMs>,
        price: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self> {
        let price = TimeSeries::new(timestamps.clone(), price)?;
        let volume = TimeSeries::new(timestamps, volume)?;
        Self::new(price, volume)
    }

    pub fn price(&self) -> &TimeSeries<f64> {
        &self.price
    }

    pub fn timestamps(&self) -> &[TimestampMs] {
        self.price.timestamps()
    }

    pub fn prices(&self) -> &[f64] {
        self.price.values()
    }

    pub fn volumes(&self) -> &[f64] {
        self.volume.values()
    }

    pub fn len(&self) -> usize {
        self.price.len()
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_empty()
    }
}
