//! Anchored VWAP computation.
//!
//! For every evaluation point the anchor is re-selected from the trailing
//! lookback window, and turnover and volume are accumulated from that anchor
//! through the evaluation point.

use crate::anchor::SlidingExtreme;
use avwap_core::{Anchor, AvwapConfig, MarketSeries, Result, TimeSeries};
use tracing::{debug, trace};

/// Running anchored accumulation.
#[derive(Debug, Clone, Copy)]
struct Accumulation {
    anchor: usize,
    turnover: f64,
    volume: f64,
}

impl Accumulation {
    /// Accumulate `[anchor, end]` from scratch, in timestamp order.
    fn from_anchor(anchor: usize, end: usize, prices: &[f64], volumes: &[f64]) -> Self {
        let mut acc = Self {
            anchor,
            turnover: 0.0,
            volume: 0.0,
        };
        for i in anchor..=end {
            acc.add(prices[i], volumes[i]);
        }
        acc
    }

    #[inline]
    fn add(&mut self, price: f64, volume: f64) {
        self.turnover += price * volume;
        self.volume += volume;
    }

    /// Volume-weighted price, undefined when no volume traded.
    #[inline]
    fn vwap(&self) -> Option<f64> {
        if self.volume > 0.0 {
            Some(self.turnover / self.volume)
        } else {
            None
        }
    }
}

/// Anchored VWAP engine.
#[derive(Debug, Clone)]
pub struct AvwapEngine {
    config: AvwapConfig,
}

impl AvwapEngine {
    /// Create an engine. Fails if the configuration is invalid.
    pub fn new(config: AvwapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AvwapConfig {
        &self.config
    }

    /// Compute the AVWAP series.
    ///
    /// Positions before `lookback` are undefined, as are positions whose
    /// anchored span carries zero volume.
    pub fn compute(&self, market: &MarketSeries) -> Result<TimeSeries<Option<f64>>> {
        self.compute_with_anchors(market).map(|(avwap, _)| avwap)
    }

    /// Compute the AVWAP series together with the anchor chosen at each position.
    pub fn compute_with_anchors(
        &self,
        market: &MarketSeries,
    ) -> Result<(TimeSeries<Option<f64>>, TimeSeries<Option<Anchor>>)> {
        let lookback = self.config.lookback;
        let timestamps = market.timestamps();
        let prices = market.prices();

        let steps = self.accumulate(market);
        let avwap: Vec<Option<f64>> = steps.iter().map(|s| s.and_then(|a| a.vwap())).collect();
        let anchors: Vec<Option<Anchor>> = steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                step.map(|acc| Anchor {
                    offset: acc.anchor + lookback - 1 - i,
                    index: acc.anchor,
                    ts_ms: timestamps[acc.anchor],
                    price: prices[acc.anchor],
                })
            })
            .collect();

        debug!(
            observations = market.len(),
            lookback,
            policy = %self.config.anchor_policy,
            defined = avwap.iter().filter(|v| v.is_some()).count(),
            "computed anchored VWAP"
        );

        Ok((market.price().with_values(avwap)?, market.price().with_values(anchors)?))
    }

    /// Anchor and running sums at every evaluated position.
    fn accumulate(&self, market: &MarketSeries) -> Vec<Option<Accumulation>> {
        let lookback = self.config.lookback;
        let timestamps = market.timestamps();
        let prices = market.prices();
        let volumes = market.volumes();
        let n = market.len();

        let mut steps = vec![None; n];
        let mut extreme = SlidingExtreme::new(self.config.anchor_policy, lookback);
        let mut acc: Option<Accumulation> = None;
        let mut anchor_changes = 0usize;

        for i in 0..n {
            let anchor = extreme.push(prices[i]);
            if i < lookback {
                continue;
            }

            let next = match acc {
                // Same anchor as the previous step: extend the running sums.
                Some(mut running) if running.anchor == anchor => {
                    running.add(prices[i], volumes[i]);
                    running
                }
                _ => {
                    anchor_changes += 1;
                    trace!(index = i, anchor, ts_ms = timestamps[anchor], "anchor moved");
                    Accumulation::from_anchor(anchor, i, prices, volumes)
                }
            };
            acc = Some(next);
            steps[i] = acc;
        }

        debug!(anchor_changes, "accumulated anchored sums");
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchorSelector;
    use approx::assert_abs_diff_eq;
    use avwap_core::AnchorPolicy;

    fn market(prices: &[f64], volumes: &[f64]) -> MarketSeries {
        let ts = (0..prices.len() as i64).map(|i| i * 86_400_000).collect();
        MarketSeries::from_vecs(ts, prices.to_vec(), volumes.to_vec()).unwrap()
    }

    fn engine(lookback: usize, anchor_policy: AnchorPolicy) -> AvwapEngine {
        AvwapEngine::new(AvwapConfig {
            lookback,
            anchor_policy,
        })
        .unwrap()
    }

    /// Re-select the anchor and re-accumulate at every position.
    fn brute_force(
        market: &MarketSeries,
        lookback: usize,
        policy: AnchorPolicy,
    ) -> Vec<Option<f64>> {
        let selector = AnchorSelector::new(policy);
        let (ts, p, v) = (market.timestamps(), market.prices(), market.volumes());
        (0..market.len())
            .map(|t| {
                if t < lookback {
                    return None;
                }
                let start = t + 1 - lookback;
                let anchor = start + selector.select_anchor(&ts[start..=t], &p[start..=t])?.offset;
                let mut turnover = 0.0;
                let mut volume = 0.0;
                for i in anchor..=t {
                    turnover += p[i] * v[i];
                    volume += v[i];
                }
                (volume > 0.0).then(|| turnover / volume)
            })
            .collect()
    }

    #[test]
    fn test_rejects_short_lookback() {
        let config = AvwapConfig {
            lookback: 1,
            anchor_policy: AnchorPolicy::Min,
        };
        assert!(AvwapEngine::new(config).is_err());
    }

    #[test]
    fn test_worked_example() {
        let m = market(&[10.0, 9.0, 11.0, 12.0, 13.0], &[100.0; 5]);
        let (avwap, anchors) = engine(3, AnchorPolicy::Min).compute_with_anchors(&m).unwrap();
        let values = avwap.values();

        assert!(values[..3].iter().all(|v| v.is_none()));
        assert_abs_diff_eq!(values[3].unwrap(), 32.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[4].unwrap(), 12.0, epsilon = 1e-12);

        let a3 = anchors.values()[3].unwrap();
        assert_eq!((a3.index, a3.offset, a3.price), (1, 0, 9.0));
        let a4 = anchors.values()[4].unwrap();
        assert_eq!((a4.index, a4.offset, a4.price), (2, 0, 11.0));
    }

    #[test]
    fn test_volume_weighting() {
        // Window at position 2 is [8, 10], anchor at 8.
        let m = market(&[9.0, 8.0, 10.0], &[1.0, 1.0, 3.0]);
        let avwap = engine(2, AnchorPolicy::Min).compute(&m).unwrap();
        // (8*1 + 10*3) / 4 = 9.5
        assert_abs_diff_eq!(avwap.values()[2].unwrap(), 9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_max_policy() {
        let m = market(&[10.0, 9.0, 11.0, 12.0, 13.0], &[100.0; 5]);
        let avwap = engine(3, AnchorPolicy::Max).compute(&m).unwrap();
        // Rising tail: the max is always the current bar.
        assert_abs_diff_eq!(avwap.values()[3].unwrap(), 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(avwap.values()[4].unwrap(), 13.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_volume_is_undefined() {
        let m = market(
            &[10.0, 9.0, 11.0, 12.0, 13.0, 14.0],
            &[100.0, 0.0, 0.0, 0.0, 0.0, 50.0],
        );
        let avwap = engine(3, AnchorPolicy::Min).compute(&m).unwrap();
        let values = avwap.values();
        // Positions 3 and 4 anchor inside the zero-volume stretch.
        assert!(values[3].is_none());
        assert!(values[4].is_none());
        // Position 5 anchors at 12 (index 3) and picks up the final bar's volume.
        assert_abs_diff_eq!(values[5].unwrap(), 14.0, epsilon = 1e-12);
    }

    #[test]
    fn test_anchor_containment() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i * 37) % 17) as f64 - (i as f64 * 0.3))
            .collect();
        let volumes: Vec<f64> = (0..60).map(|i| 1_000.0 + (i % 7) as f64 * 150.0).collect();
        let m = market(&prices, &volumes);
        let lookback = 8;

        for policy in [AnchorPolicy::Min, AnchorPolicy::Max] {
            let (_, anchors) = engine(lookback, policy).compute_with_anchors(&m).unwrap();
            for (t, anchor) in anchors.values().iter().enumerate() {
                let Some(anchor) = anchor else {
                    assert!(t < lookback);
                    continue;
                };
                let start = t + 1 - lookback;
                assert!(anchor.index >= start && anchor.index <= t);
                assert_eq!(anchor.ts_ms, m.timestamps()[anchor.index]);

                let window = &prices[start..=t];
                let extreme = match policy {
                    AnchorPolicy::Min => window.iter().cloned().fold(f64::INFINITY, f64::min),
                    AnchorPolicy::Max => window.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                };
                assert_eq!(anchor.price, extreme);
                let first = window.iter().position(|p| *p == extreme).unwrap();
                assert_eq!(anchor.index, start + first);
            }
        }
    }

    #[test]
    fn test_matches_brute_force_bitwise() {
        let prices: Vec<f64> = (0..120)
            .map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.05)
            .collect();
        let volumes: Vec<f64> = (0..120)
            .map(|i| if i % 11 == 0 { 0.0 } else { 10.0 + (i % 5) as f64 * 3.3 })
            .collect();
        let m = market(&prices, &volumes);

        for policy in [AnchorPolicy::Min, AnchorPolicy::Max] {
            for lookback in [2, 5, 13, 30] {
                let fast = engine(lookback, policy).compute(&m).unwrap();
                let slow = brute_force(&m, lookback, policy);
                let fast_bits: Vec<_> = fast.values().iter().map(|v| v.map(f64::to_bits)).collect();
                let slow_bits: Vec<_> = slow.iter().map(|v| v.map(f64::to_bits)).collect();
                assert_eq!(fast_bits, slow_bits, "policy={policy} lookback={lookback}");
            }
        }
    }

    #[test]
    fn test_cumulative_volume_within_fixed_anchor() {
        // The low at index 1 anchors position 4.
        let prices = [5.0, 1.0, 2.0, 3.0, 4.0];
        let volumes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = market(&prices, &volumes);
        let (avwap, anchors) = engine(4, AnchorPolicy::Min).compute_with_anchors(&m).unwrap();

        let anchor = anchors.values()[4].unwrap();
        assert_eq!(anchor.index, 1);
        let volume: f64 = volumes[1..=4].iter().sum();
        let turnover: f64 = prices[1..=4].iter().zip(&volumes[1..=4]).map(|(p, v)| p * v).sum();
        assert_abs_diff_eq!(avwap.values()[4].unwrap(), turnover / volume, epsilon = 1e-12);
    }

    #[test]
    fn test_volume_grows_while_anchor_holds() {
        // Low at index 2 stays in every window through position 7, then the
        // window moves past it and the anchor jumps forward.
        let prices = [12.0, 11.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let volumes = [5.0, 5.0, 10.0, 0.0, 20.0, 15.0, 0.0, 30.0, 25.0, 40.0];
        let m = market(&prices, &volumes);
        let steps = engine(6, AnchorPolicy::Min).accumulate(&m);

        assert!(steps[..6].iter().all(|s| s.is_none()));
        let mut previous: Option<Accumulation> = None;
        for (t, step) in steps.iter().enumerate().skip(6) {
            let acc = step.unwrap();
            let expected: f64 = volumes[acc.anchor..=t].iter().sum();
            assert_eq!(acc.volume, expected, "t={t}");

            if let Some(prev) = previous.filter(|p| p.anchor == acc.anchor) {
                assert!(acc.volume >= prev.volume, "t={t}");
            }
            previous = Some(acc);
        }

        let anchors: Vec<usize> = steps[6..].iter().map(|s| s.unwrap().anchor).collect();
        assert_eq!(anchors, [2, 2, 3, 4]);
    }

    #[test]
    fn test_deterministic() {
        let prices: Vec<f64> = (0..80).map(|i| 20.0 + ((i * 13) % 9) as f64).collect();
        let m = market(&prices, &vec![250.0; 80]);
        let e = engine(10, AnchorPolicy::Min);
        let first = e.compute(&m).unwrap();
        let second = e.compute(&m).unwrap();
        assert_eq!(
            first.values().iter().map(|v| v.map(f64::to_bits)).collect::<Vec<_>>(),
            second.values().iter().map(|v| v.map(f64::to_bits)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_short_series() {
        let m = market(&[1.0, 2.0], &[1.0, 1.0]);
        let avwap = engine(5, AnchorPolicy::Min).compute(&m).unwrap();
        assert_eq!(avwap.len(), 2);
        assert!(avwap.values().iter().all(|v| v.is_none()));

        let empty = market(&[], &[]);
        assert!(engine(5, AnchorPolicy::Min).compute(&empty).unwrap().is_empty());
    }
}
