//! Strategy selection: sample-only, remote model, local model, heuristic fallback.

use anyhow::anyhow;
use flowstate_core::{
    ForecastConfig, HeuristicForecaster, HistorySeries, LocalForecaster, LocalModelHandle,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::remote::{RemoteForecaster, RemoteOutcome};
use crate::request::ForecastRequest;

pub const SAMPLE_MESSAGE: &str = "Sample prediction (not from actual model)";
pub const REMOTE_FALLBACK_MESSAGE: &str = "Remote inference unavailable - using sample prediction";
pub const LOCAL_FAILED_MESSAGE: &str = "Local model failed - returning sample prediction";
pub const NO_MODEL_MESSAGE: &str = "Model not available - returning sample prediction";

/// Horizon of the built-in `/sample` forecast.
pub const SAMPLE_HORIZON: usize = 12;

/// Which generator produced a forecast, as reported in the `mode` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForecastMode {
    /// Forwarded to the hosted model.
    #[serde(rename = "success")]
    Remote,
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "sample")]
    Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub mode: ForecastMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_horizon: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_response: Option<String>,
}

impl PredictResponse {
    fn new(mode: ForecastMode) -> Self {
        Self {
            status: "success",
            mode,
            message: None,
            forecast: None,
            forecast_horizon: None,
            remote_response: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleInput {
    pub history: Vec<f64>,
    pub forecast_horizon: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleOutput {
    pub forecast: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleResponse {
    pub status: &'static str,
    pub mode: ForecastMode,
    pub input: SampleInput,
    pub output: SampleOutput,
}

pub struct ForecastService {
    config: ForecastConfig,
    remote: Option<RemoteForecaster>,
    local: LocalModelHandle,
    heuristic: HeuristicForecaster,
    local_timeout: Duration,
}

impl ForecastService {
    pub fn new(
        config: ForecastConfig,
        remote: Option<RemoteForecaster>,
        local: LocalModelHandle,
        local_timeout: Duration,
    ) -> Self {
        Self {
            config,
            remote,
            local,
            heuristic: HeuristicForecaster::default(),
            local_timeout,
        }
    }

    /// Heuristic-only service, used by the CLI and tests.
    pub fn heuristic_only() -> Self {
        Self::new(
            ForecastConfig::default(),
            None,
            LocalModelHandle::Absent,
            Duration::from_secs(120),
        )
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn local_model(&self) -> &LocalModelHandle {
        &self.local
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote.as_ref().map(RemoteForecaster::url)
    }

    pub async fn predict(&self, request: &ForecastRequest) -> PredictResponse {
        if self.config.sample_only {
            info!(horizon = request.horizon, "Sample mode enabled, using heuristic generator");
            return self.heuristic(request, SAMPLE_MESSAGE);
        }

        if let Some(remote) = &self.remote {
            return match remote.forward(request.history.values()).await {
                RemoteOutcome::Forecast(forecast) => PredictResponse {
                    forecast: Some(forecast),
                    ..PredictResponse::new(ForecastMode::Remote)
                },
                RemoteOutcome::Raw(body) => PredictResponse {
                    remote_response: Some(body),
                    ..PredictResponse::new(ForecastMode::Remote)
                },
                RemoteOutcome::Unavailable(reason) => {
                    warn!(reason = %reason, "Remote inference unavailable, falling back to heuristic");
                    self.heuristic(request, REMOTE_FALLBACK_MESSAGE)
                }
            };
        }

        if let Some(model) = self.local.get() {
            return match self.run_local(Arc::clone(model), request).await {
                Ok(forecast) => {
                    info!(model = model.name(), steps = forecast.len(), "Local model forecast");
                    PredictResponse {
                        forecast: Some(Value::from(forecast)),
                        ..PredictResponse::new(ForecastMode::Local)
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Local model failed, falling back to heuristic");
                    self.heuristic(request, LOCAL_FAILED_MESSAGE)
                }
            };
        }

        info!("Model not loaded, using heuristic generator");
        self.heuristic(request, NO_MODEL_MESSAGE)
    }

    /// Forecast for the built-in twelve-value history.
    pub fn sample(&self) -> SampleResponse {
        let history = HistorySeries::sample();
        let forecast = self.heuristic.forecast(&history, SAMPLE_HORIZON, None);
        SampleResponse {
            status: "success",
            mode: ForecastMode::Sample,
            input: SampleInput {
                history: history.values().to_vec(),
                forecast_horizon: SAMPLE_HORIZON,
            },
            output: SampleOutput { forecast },
        }
    }

    fn heuristic(&self, request: &ForecastRequest, message: &'static str) -> PredictResponse {
        let forecast =
            self.heuristic
                .forecast(&request.history, request.horizon, request.auxiliary.as_ref());
        info!(
            horizon = request.horizon,
            history_len = request.history.len(),
            features = ?request.feature_names(),
            "Generated heuristic forecast"
        );
        PredictResponse {
            message: Some(message),
            forecast: Some(Value::from(forecast)),
            forecast_horizon: Some(request.horizon),
            ..PredictResponse::new(ForecastMode::Sample)
        }
    }

    async fn run_local(
        &self,
        model: Arc<dyn LocalForecaster>,
        request: &ForecastRequest,
    ) -> anyhow::Result<Vec<f64>> {
        let history = request.history.values().to_vec();
        let horizon = request.horizon;
        let task = tokio::task::spawn_blocking(move || model.forecast(&history, horizon));

        match tokio::time::timeout(self.local_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(anyhow!("Local model task failed: {}", join)),
            Err(_) => Err(anyhow!(
                "Local model timed out after {}s",
                self.local_timeout.as_secs_f64()
            )),
        }
    }
}
