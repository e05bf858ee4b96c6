//! Core types and configuration for the AVWAP trend-quality system.
//!
//! This crate provides shared types used across all other crates:
//! - Time-indexed series and aligned price/volume market series
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{AvwapConfig, Config, ScreenerConfig, SignalConfig};
pub use error::{Error, Result};
pub use types::*;
