//! Anchor selection.
//!
//! Finds the observation holding the extreme price within a trailing window.

use avwap_core::{Anchor, AnchorPolicy, Price, TimestampMs};
use ordered_float::OrderedFloat;
use std::collections::VecDeque;

/// Picks the anchor of a single trailing window.
///
/// The policy is fixed for the lifetime of the selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorSelector {
    policy: AnchorPolicy,
}

impl AnchorSelector {
    /// Create a selector for the given policy.
    pub fn new(policy: AnchorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AnchorPolicy {
        self.policy
    }

    /// Select the anchor of a window by scanning it from the start.
    ///
    /// Ties resolve to the earliest observation. `index` in the returned anchor
    /// equals `offset`; callers working on a sub-slice shift it themselves.
    pub fn select_anchor(&self, timestamps: &[TimestampMs], prices: &[f64]) -> Option<Anchor> {
        let n = timestamps.len().min(prices.len());
        if n == 0 {
            return None;
        }

        let mut best = 0;
        for i in 1..n {
            if self.policy.prefers(OrderedFloat(prices[i]), OrderedFloat(prices[best])) {
                best = i;
            }
        }

        Some(Anchor {
            offset: best,
            index: best,
            ts_ms: timestamps[best],
            price: prices[best],
        })
    }
}

/// Sliding-window extreme over a stream of prices.
///
/// Keeps a monotonic deque of candidate positions. The front is always the
/// earliest extreme of the current window, matching [`AnchorSelector`].
#[derive(Debug, Clone)]
pub struct SlidingExtreme {
    policy: AnchorPolicy,
    window: usize,
    /// Candidate (position, price) pairs, monotonic in price.
    candidates: VecDeque<(usize, Price)>,
    /// Number of prices pushed so far.
    count: usize,
}

impl SlidingExtreme {
    /// Create a tracker for windows of `window` observations.
    pub fn new(policy: AnchorPolicy, window: usize) -> Self {
        Self {
            policy,
            window,
            candidates: VecDeque::with_capacity(window),
            count: 0,
        }
    }

    /// Push the next price and return the position of the window extreme.
    pub fn push(&mut self, price: f64) -> usize {
        let position = self.count;
        let price = OrderedFloat(price);
        self.count += 1;

        // Drop candidates the new price strictly beats; equal earlier prices stay.
        while let Some(&(_, back)) = self.candidates.back() {
            if self.policy.prefers(price, back) {
                self.candidates.pop_back();
            } else {
                break;
            }
        }
        self.candidates.push_back((position, price));

        // Expire candidates that left the window
        let start = self.count.saturating_sub(self.window);
        while let Some(&(front, _)) = self.candidates.front() {
            if front < start {
                self.candidates.pop_front();
            } else {
                break;
            }
        }

        self.candidates.front().map(|(pos, _)| *pos).unwrap_or(position)
    }
}
