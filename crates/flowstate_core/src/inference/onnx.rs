use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::local_model::LocalForecaster;
use crate::config::ModelConfig;
use crate::error::ForecastError;

/// Pretrained multi-step forecaster executed through tract.
///
/// The model takes a `[1, context_len]` f32 window and emits a
/// `[1, horizon_len]` forecast.
pub struct OnnxForecaster {
    #[allow(clippy::type_complexity)]
    model: tract_onnx::prelude::SimplePlan<
        tract_onnx::prelude::TypedFact,
        Box<dyn tract_onnx::prelude::TypedOp>,
        tract_onnx::prelude::Graph<
            tract_onnx::prelude::TypedFact,
            Box<dyn tract_onnx::prelude::TypedOp>,
        >,
    >,
    context_len: usize,
    horizon_len: usize,
}

impl OnnxForecaster {
    /// Verifies the checkpoint according to `config` and loads it.
    pub fn load(path: &Path, config: &ModelConfig) -> Result<Self> {
        verify_checkpoint(path, config)?;
        Self::load_unchecked(path, config.context_len, config.horizon_len)
    }

    fn load_unchecked(path: &Path, context_len: usize, horizon_len: usize) -> Result<Self> {
        use tract_onnx::prelude::*;

        anyhow::ensure!(context_len > 0, "context_len must be positive");

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .context("Failed to load ONNX model")?
            .with_input_fact(0, f32::fact([1, context_len]).into())
            .context("Failed to set input fact")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        info!(
            path = %path.display(),
            context_len,
            horizon_len,
            "Local forecasting model loaded"
        );

        Ok(Self {
            model,
            context_len,
            horizon_len,
        })
    }

    pub fn context_len(&self) -> usize {
        self.context_len
    }

    pub fn horizon_len(&self) -> usize {
        self.horizon_len
    }
}

impl LocalForecaster for OnnxForecaster {
    fn name(&self) -> &str {
        "onnx"
    }

    fn forecast(&self, history: &[f64], horizon: usize) -> Result<Vec<f64>> {
        use tract_onnx::prelude::*;

        let window = context_window(history, self.context_len)?;
        let input = tract_ndarray::Array2::from_shape_vec((1, self.context_len), window)
            .context("Failed to create input array")?;
        let input_tensor: Tensor = input.into();

        let result = self
            .model
            .run(tvec![input_tensor.into()])
            .context("Failed to run inference")?;

        let output = result[0]
            .to_array_view::<f32>()
            .context("Failed to extract output")?;

        Ok(output
            .iter()
            .take(horizon.min(self.horizon_len))
            .map(|&v| v as f64)
            .collect())
    }
}

/// Fits `history` to exactly `context_len` values: keeps the most recent
/// ones, left-padding short histories with their first value.
pub fn context_window(history: &[f64], context_len: usize) -> Result<Vec<f32>> {
    let first = *history.first().context("History is empty")?;
    let tail = &history[history.len().saturating_sub(context_len)..];
    let mut window = vec![first as f32; context_len - tail.len()];
    window.extend(tail.iter().map(|&v| v as f32));
    Ok(window)
}

/// Checks the model file against the configured blake3 digest.
///
/// Without a digest the file is only accepted when `allow_unverified` is set.
pub fn verify_checkpoint(path: &Path, config: &ModelConfig) -> Result<()> {
    match &config.checkpoint_blake3 {
        Some(expected) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read checkpoint {}", path.display()))?;
            let actual = blake3::hash(&bytes).to_hex();
            if !actual.as_str().eq_ignore_ascii_case(expected.trim()) {
                return Err(ForecastError::Model(format!(
                    "Checkpoint digest mismatch: expected {}, got {}",
                    expected, actual
                ))
                .into());
            }
            Ok(())
        }
        None if config.allow_unverified => Ok(()),
        None => Err(ForecastError::Model(format!(
            "Refusing to load unverified checkpoint {} (no digest configured)",
            path.display()
        ))
        .into()),
    }
}
