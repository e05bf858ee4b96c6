//! Ordinary least-squares line fit against elapsed step count.

use statrs::statistics::Statistics;

/// Deviations within this many ULPs of the series magnitude are rounding noise.
const NOISE_ULPS: f64 = 16.0;

/// Result of fitting `y = intercept + slope * x` with `x = 0, 1, ..., n-1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, 1 - SS_res / SS_tot.
    pub r_squared: f64,
}

/// Fit a line through `values` against their positions.
///
/// Returns `None` for fewer than two points, non-finite input, or a window
/// without variance (R² is undefined there). A window whose points all sit
/// within a few ULPs of each other counts as having no variance.
pub fn fit_line(values: &[f64]) -> Option<LinearFit> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if values.iter().all(|v| *v == values[0]) {
        return None;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().mean();

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut ss_tot = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        ss_tot += dy * dy;
    }

    let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let noise = NOISE_ULPS * f64::EPSILON * scale;
    if !(ss_tot > n as f64 * noise * noise) {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let residual = y - (intercept + slope * i as f64);
            residual * residual
        })
        .sum();

    let r_squared = 1.0 - ss_res / ss_tot;
    r_squared.is_finite().then_some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Rolling R² over trailing windows of `window` values.
///
/// Evaluated at positions `>= window`; earlier positions, and any window
/// containing an undefined value, yield `None`.
pub fn rolling_r_squared(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut scores = vec![None; values.len()];
    if window < 2 {
        return scores;
    }

    let mut buf = Vec::with_capacity(window);
    for t in window..values.len() {
        buf.clear();
        let slice = &values[t + 1 - window..=t];
        if slice.iter().any(|v| v.is_none()) {
            continue;
        }
        buf.extend(slice.iter().flatten());
        scores[t] = fit_line(&buf).map(|fit| fit.r_squared);
    }
    scores
}
