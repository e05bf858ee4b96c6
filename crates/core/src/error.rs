//! Error types for the AVWAP trend-quality system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the AVWAP trend-quality system.
///
/// Only precondition failures live here. Insufficient history and degenerate
/// windows are reported as undefined values inside the output series.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (lookback, threshold, policy).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (misaligned, unordered or invalid series).
    #[error("Data error: {0}")]
    Data(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}
