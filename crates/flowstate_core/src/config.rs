use serde::{Deserialize, Serialize};

/// Horizon used when a request does not specify one.
pub const DEFAULT_HORIZON: usize = 12;
/// Context window of the reference local model.
pub const DEFAULT_CONTEXT_LEN: usize = 48;
/// Output length of the reference local model.
pub const DEFAULT_MODEL_HORIZON: usize = 12;

/// Local model loading options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to an ONNX forecasting model; no model is loaded when unset.
    #[serde(default)]
    pub model_path: Option<String>,

    /// Number of history values fed to the model.
    #[serde(default = "default_context_len")]
    pub context_len: usize,

    /// Number of values produced by the model.
    #[serde(default = "default_model_horizon")]
    pub horizon_len: usize,

    /// Expected blake3 digest (hex) of the model file.
    #[serde(default)]
    pub checkpoint_blake3: Option<String>,

    /// Load model files that have no expected digest configured.
    #[serde(default = "default_allow_unverified")]
    pub allow_unverified: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            context_len: DEFAULT_CONTEXT_LEN,
            horizon_len: DEFAULT_MODEL_HORIZON,
            checkpoint_blake3: None,
            allow_unverified: true,
        }
    }
}

fn default_context_len() -> usize {
    DEFAULT_CONTEXT_LEN
}
fn default_model_horizon() -> usize {
    DEFAULT_MODEL_HORIZON
}
fn default_allow_unverified() -> bool {
    true
}

/// Strategy-independent forecast options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Horizon applied when a request omits `forecast_horizon`.
    #[serde(default = "default_horizon")]
    pub default_horizon: usize,
    /// Always answer with the heuristic generator.
    #[serde(default)]
    pub sample_only: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_horizon: DEFAULT_HORIZON,
            sample_only: false,
        }
    }
}

fn default_horizon() -> usize {
    DEFAULT_HORIZON
}
