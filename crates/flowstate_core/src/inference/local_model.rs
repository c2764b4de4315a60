use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::onnx::OnnxForecaster;
use crate::config::ModelConfig;

/// A locally executed pretrained forecaster.
pub trait LocalForecaster: Send + Sync {
    fn name(&self) -> &str;

    /// Forecasts up to `horizon` values following `history`.
    fn forecast(&self, history: &[f64], horizon: usize) -> anyhow::Result<Vec<f64>>;
}

/// Outcome of the start-up model load, injected into the service.
#[derive(Clone, Default)]
pub enum LocalModelHandle {
    Present(Arc<dyn LocalForecaster>),
    #[default]
    Absent,
}

impl fmt::Debug for LocalModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(model) => f.debug_tuple("Present").field(&model.name()).finish(),
            Self::Absent => f.write_str("Absent"),
        }
    }
}

impl LocalModelHandle {
    pub fn absent() -> Self {
        Self::Absent
    }

    pub fn present(model: impl LocalForecaster + 'static) -> Self {
        Self::Present(Arc::new(model))
    }

    /// Loads the configured model once. Any failure leaves the handle absent
    /// so callers fall back to the heuristic generator.
    pub fn load(config: &ModelConfig) -> Self {
        let Some(path) = config.model_path.as_deref() else {
            info!("No local model configured");
            return Self::Absent;
        };

        match OnnxForecaster::load(Path::new(path), config) {
            Ok(model) => Self::present(model),
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(
                    path = path,
                    error = %reason,
                    "Failed to load local model. Using heuristic only."
                );
                Self::Absent
            }
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn get(&self) -> Option<&Arc<dyn LocalForecaster>> {
        match self {
            Self::Present(model) => Some(model),
            Self::Absent => None,
        }
    }
}
