use thiserror::Error;

/// Errors surfaced by the forecasting core.
///
/// Only malformed input is ever reported to callers of the heuristic engine;
/// model failures are returned to the orchestration layer, which decides
/// whether to fall back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    /// Empty history, non-numeric values or a negative horizon.
    #[error("{0}")]
    InvalidInput(String),

    /// The local forecasting model could not be loaded or executed.
    #[error("Model error: {0}")]
    Model(String),
}

impl ForecastError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

pub type Result<T> = core::result::Result<T, ForecastError>;
