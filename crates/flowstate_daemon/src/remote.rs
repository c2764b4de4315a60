//! Forwarding of forecast requests to a hosted model endpoint.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RemoteConfig;

/// Result of a single forwarding attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// HTTP 200 with a JSON body: its `forecast` field, or the whole body.
    Forecast(Value),
    /// HTTP 200 whose body is not JSON.
    Raw(String),
    /// Transport failure or non-200 status.
    Unavailable(String),
}

pub struct RemoteForecaster {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl RemoteForecaster {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }

    /// Builds a forwarder when a remote URL is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>> {
        if !config.is_enabled() {
            return Ok(None);
        }
        let url = config.url.clone().unwrap_or_default();
        Self::new(url, config.api_key.clone(), config.timeout()).map(Some)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts `{"history": [...]}` once; never retries.
    pub async fn forward(&self, history: &[f64]) -> RemoteOutcome {
        let mut request = self
            .client
            .post(&self.url)
            .json(&json!({ "history": history }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Remote request failed");
                return RemoteOutcome::Unavailable(e.to_string());
            }
        };

        let status = response.status();
        info!(url = %self.url, status = status.as_u16(), "Forwarded request to remote model");
        if status != StatusCode::OK {
            return RemoteOutcome::Unavailable(format!("HTTP {}", status));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RemoteOutcome::Unavailable(e.to_string()),
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(mut map)) => match map.remove("forecast") {
                Some(forecast) => RemoteOutcome::Forecast(forecast),
                None => RemoteOutcome::Forecast(Value::Object(map)),
            },
            Ok(other) => RemoteOutcome::Forecast(other),
            Err(_) => RemoteOutcome::Raw(body),
        }
    }
}
