//! PyO3 bindings for the AVWAP trend-quality core.
//!
//! Exposes the Rust implementations to the Python screeners and collectors:
//! - Anchored VWAP computation
//! - AVWAP R² trend-quality signal
//! - Anchored pullback screening
//! - Logging setup

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use tracing_subscriber::EnvFilter;

use avwap_core::{
    AnchorPolicy, AvwapConfig, Config, Error as RustError, MarketSeries, ScreenerConfig,
    SignalConfig, TimeSeries,
};
use avwap_features::{
    AvwapEngine, AvwapR2Signal as RustAvwapR2Signal, ScreenResult as RustScreenResult,
    Screener, Signal,
};

// ============================================================================
// Conversions
// ============================================================================

fn to_py_err(err: RustError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_policy(anchor_policy: &str) -> PyResult<AnchorPolicy> {
    anchor_policy.parse().map_err(to_py_err)
}

/// Python ints may be negative; reject those as configuration errors.
fn avwap_config(lookback: i64, anchor_policy: &str) -> PyResult<AvwapConfig> {
    Ok(AvwapConfig {
        lookback: AvwapConfig::checked_lookback(lookback).map_err(to_py_err)?,
        anchor_policy: parse_policy(anchor_policy)?,
    })
}

fn market(timestamps: Vec<i64>, price: Vec<f64>, volume: Vec<f64>) -> PyResult<MarketSeries> {
    MarketSeries::from_vecs(timestamps, price, volume).map_err(to_py_err)
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// Outcome of screening a series at its latest observation.
#[pyclass]
#[derive(Clone)]
pub struct ScreenResult {
    #[pyo3(get)]
    pub anchor_ts_ms: i64,
    #[pyo3(get)]
    pub anchor_price: f64,
    #[pyo3(get)]
    pub ts_ms: i64,
    #[pyo3(get)]
    pub price: f64,
    #[pyo3(get)]
    pub avwap: Option<f64>,
    #[pyo3(get)]
    pub slope: Option<f64>,
    #[pyo3(get)]
    pub is_candidate: bool,
    anchor_date: Option<String>,
}

#[pymethods]
impl ScreenResult {
    /// Anchor date as YYYY-MM-DD.
    #[getter]
    fn anchor_date(&self) -> Option<String> {
        self.anchor_date.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "ScreenResult(anchor={}, price={:.4}, avwap={:?}, slope={:?}, candidate={})",
            self.anchor_date.as_deref().unwrap_or("?"),
            self.price,
            self.avwap,
            self.slope,
            self.is_candidate
        )
    }
}

impl From<RustScreenResult> for ScreenResult {
    fn from(r: RustScreenResult) -> Self {
        ScreenResult {
            anchor_date: r.anchor_date(),
            anchor_ts_ms: r.anchor.ts_ms,
            anchor_price: r.anchor.price,
            ts_ms: r.ts_ms,
            price: r.price,
            avwap: r.avwap,
            slope: r.slope,
            is_candidate: r.is_candidate,
        }
    }
}

// ============================================================================
// Signal Class
// ============================================================================

/// AVWAP R² trend-quality signal.
#[pyclass(name = "AvwapR2Signal")]
pub struct PyAvwapR2Signal {
    inner: RustAvwapR2Signal,
}

#[pymethods]
impl PyAvwapR2Signal {
    #[new]
    #[pyo3(signature = (lookback = 30, threshold = 0.8, anchor_policy = "min"))]
    fn new(lookback: i64, threshold: f64, anchor_policy: &str) -> PyResult<Self> {
        let config = Config {
            avwap: avwap_config(lookback, anchor_policy)?,
            signal: SignalConfig {
                r2_threshold: threshold,
            },
            ..Config::default()
        };
        let inner = RustAvwapR2Signal::from_config(&config).map_err(to_py_err)?;
        Ok(PyAvwapR2Signal { inner })
    }

    /// Boolean signal per observation.
    fn generate(
        &self,
        timestamps: Vec<i64>,
        price: Vec<f64>,
        volume: Vec<f64>,
    ) -> PyResult<Vec<bool>> {
        let m = market(timestamps, price, volume)?;
        Ok(self.inner.generate(&m).map_err(to_py_err)?.into_values())
    }

    /// (avwap, fit_scores, signal) per observation.
    #[allow(clippy::type_complexity)]
    fn evaluate(
        &self,
        timestamps: Vec<i64>,
        price: Vec<f64>,
        volume: Vec<f64>,
    ) -> PyResult<(Vec<Option<f64>>, Vec<Option<f64>>, Vec<bool>)> {
        let m = market(timestamps, price, volume)?;
        let quality = self.inner.evaluate(&m).map_err(to_py_err)?;
        Ok((
            quality.avwap.into_values(),
            quality.fit_scores.into_values(),
            quality.signal.into_values(),
        ))
    }

    #[getter]
    fn lookback(&self) -> usize {
        self.inner.engine().config().lookback
    }

    #[getter]
    fn threshold(&self) -> f64 {
        self.inner.threshold()
    }

    fn __repr__(&self) -> String {
        format!(
            "AvwapR2Signal(lookback={}, threshold={}, anchor_policy={})",
            self.inner.engine().config().lookback,
            self.inner.threshold(),
            self.inner.engine().config().anchor_policy
        )
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Anchored VWAP per observation; None where undefined.
#[pyfunction]
#[pyo3(signature = (timestamps, price, volume, lookback = 30, anchor_policy = "min"))]
fn compute_avwap(
    timestamps: Vec<i64>,
    price: Vec<f64>,
    volume: Vec<f64>,
    lookback: i64,
    anchor_policy: &str,
) -> PyResult<Vec<Option<f64>>> {
    let engine = AvwapEngine::new(avwap_config(lookback, anchor_policy)?).map_err(to_py_err)?;
    let m = market(timestamps, price, volume)?;
    Ok(engine.compute(&m).map_err(to_py_err)?.into_values())
}

/// Trend-quality signal per observation.
#[pyfunction]
#[pyo3(signature = (
    timestamps, price, volume, lookback = 30, threshold = 0.8, anchor_policy = "min"
))]
fn generate_signal(
    timestamps: Vec<i64>,
    price: Vec<f64>,
    volume: Vec<f64>,
    lookback: i64,
    threshold: f64,
    anchor_policy: &str,
) -> PyResult<Vec<bool>> {
    PyAvwapR2Signal::new(lookback, threshold, anchor_policy)?.generate(timestamps, price, volume)
}

/// Rolling R² of the AVWAP trend per observation; None where undefined.
#[pyfunction]
#[pyo3(signature = (timestamps, price, volume, lookback = 30, anchor_policy = "min"))]
fn fit_scores(
    timestamps: Vec<i64>,
    price: Vec<f64>,
    volume: Vec<f64>,
    lookback: i64,
    anchor_policy: &str,
) -> PyResult<Vec<Option<f64>>> {
    let threshold = SignalConfig::default().r2_threshold;
    let signal = PyAvwapR2Signal::new(lookback, threshold, anchor_policy)?;
    let m = market(timestamps, price, volume)?;
    let quality = signal.inner.evaluate(&m).map_err(to_py_err)?;
    Ok(quality.fit_scores.into_values())
}

/// Screen the latest observation; None when the series is too short.
#[pyfunction]
#[pyo3(signature = (
    timestamps, price, volume, lows = None, lookback = 30, slope_window = 5, max_premium = 0.05
))]
#[allow(clippy::too_many_arguments)]
fn screen(
    timestamps: Vec<i64>,
    price: Vec<f64>,
    volume: Vec<f64>,
    lows: Option<Vec<f64>>,
    lookback: i64,
    slope_window: i64,
    max_premium: f64,
) -> PyResult<Option<ScreenResult>> {
    let config = Config {
        avwap: avwap_config(lookback, "min")?,
        screener: ScreenerConfig {
            slope_window: ScreenerConfig::checked_slope_window(slope_window).map_err(to_py_err)?,
            max_premium,
        },
        ..Config::default()
    };
    let screener = Screener::from_config(&config).map_err(to_py_err)?;

    let lows = lows
        .map(|values| TimeSeries::new(timestamps.clone(), values))
        .transpose()
        .map_err(to_py_err)?;
    let m = market(timestamps, price, volume)?;

    let result = screener.screen(&m, lows.as_ref()).map_err(to_py_err)?;
    Ok(result.map(ScreenResult::from))
}

/// Install a stderr tracing subscriber. Returns False if one was already set.
#[pyfunction]
#[pyo3(signature = (filter = "info"))]
fn init_logging(filter: &str) -> PyResult<bool> {
    let env_filter = EnvFilter::try_new(filter).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter, "logging initialised");
    }
    Ok(installed)
}

// ============================================================================
// Module Definition
// ============================================================================

/// AVWAP Trader Core - anchored VWAP trend-quality signals for Python.
#[pymodule]
fn avwap_trader_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<ScreenResult>()?;
    m.add_class::<PyAvwapR2Signal>()?;

    // Functions
    m.add_function(wrap_pyfunction!(compute_avwap, m)?)?;
    m.add_function(wrap_pyfunction!(generate_signal, m)?)?;
    m.add_function(wrap_pyfunction!(fit_scores, m)?)?;
    m.add_function(wrap_pyfunction!(screen, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    Ok(())
}
