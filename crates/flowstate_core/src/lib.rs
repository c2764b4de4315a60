//! Deterministic energy-level forecasting from biometric and activity signals.
//!
//! The heuristic generator in [`inference::heuristic`] maps a primary history
//! series plus the latest reading of each auxiliary signal onto a bounded
//! energy trajectory. It is a pure function of its inputs: every call owns a
//! Mersenne Twister seeded with 42.

pub mod config;
pub mod error;
pub mod inference;
pub mod noise;
pub mod signals;
pub mod stats;

pub use config::{ForecastConfig, ModelConfig, DEFAULT_HORIZON};
pub use error::{ForecastError, Result};
pub use inference::{
    generate_forecast, HeuristicForecaster, HeuristicParams, LocalForecaster, LocalModelHandle,
};
pub use signals::{AuxiliarySignals, FactorTable, Signal};
pub use stats::{HistorySeries, HistoryStats};

/// Built-in history used by the sample endpoint and CLI.
pub const SAMPLE_HISTORY: [f64; 12] = [
    72.0, 76.0, 80.0, 74.0, 78.0, 82.0, 88.0, 75.0, 79.0, 84.0, 81.0, 77.0,
];
