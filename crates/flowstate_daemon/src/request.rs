//! Parsing of `/predict` bodies in the legacy and multivariate shapes.

use flowstate_core::inference::heuristic::horizon_from_i64;
use flowstate_core::stats::coerce_series;
use flowstate_core::{AuxiliarySignals, ForecastError, HistorySeries};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Largest horizon accepted over HTTP.
pub const MAX_HORIZON: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    /// `{"history": [...]}`
    Legacy,
    /// `{"past_values": {feature: [...]}, "timestamps": [...], "forecast_horizon": N}`
    Multivariate,
}

#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub format: RequestFormat,
    /// Name of the series used as the primary signal (multivariate only).
    pub primary: Option<String>,
    pub history: HistorySeries,
    pub horizon: usize,
    pub auxiliary: Option<AuxiliarySignals>,
    pub timestamps: usize,
}

impl ForecastRequest {
    /// Parses a request body. `None` stands for a missing or non-JSON body.
    pub fn from_json(body: Option<&Value>, default_horizon: usize) -> Result<Self, ApiError> {
        let data = match body {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => return Err(ApiError::bad_request("No JSON data provided")),
        };

        let horizon = parse_horizon(data.get("forecast_horizon"), default_horizon)?;

        if let Some(past_values) = data.get("past_values") {
            let past_values = match past_values {
                Value::Object(map) if !map.is_empty() => map,
                Value::Object(_) | Value::Null => {
                    return Err(ApiError::bad_request("No past_values provided"))
                }
                _ => return Err(ApiError::bad_request("past_values must be an object")),
            };
            Self::multivariate(data, past_values, horizon)
        } else if let Some(history) = data.get("history") {
            let raw = history
                .as_array()
                .ok_or_else(|| ApiError::bad_request("history must be an array"))?;
            if raw.is_empty() {
                return Err(ApiError::bad_request("Empty history list"));
            }
            Ok(Self {
                format: RequestFormat::Legacy,
                primary: None,
                history: HistorySeries::from_json(raw)?,
                horizon,
                auxiliary: None,
                timestamps: 0,
            })
        } else {
            Err(ApiError::bad_request(
                "Must provide either 'history' or 'past_values'",
            ))
        }
    }

    fn multivariate(
        data: &Map<String, Value>,
        past_values: &Map<String, Value>,
        horizon: usize,
    ) -> Result<Self, ApiError> {
        // Caller order is preserved, so "first" is the first declared feature.
        let Some((primary, raw)) = past_values.iter().next() else {
            return Err(ApiError::bad_request("No past_values provided"));
        };
        let raw = raw.as_array().ok_or_else(|| {
            ApiError::bad_request(format!("past_values.{} must be an array", primary))
        })?;
        if raw.is_empty() {
            return Err(ApiError::bad_request("Empty history in past_values"));
        }
        let history = HistorySeries::from_json(raw).map_err(|e| in_feature(primary, e))?;

        let mut auxiliary = AuxiliarySignals::with_capacity(past_values.len());
        for (name, values) in past_values {
            let Some(values) = values.as_array().filter(|v| !v.is_empty()) else {
                continue;
            };
            let series = coerce_series(values).map_err(|e| in_feature(name, e))?;
            auxiliary.insert(name.clone(), series);
        }

        let timestamps = data
            .get("timestamps")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        Ok(Self {
            format: RequestFormat::Multivariate,
            primary: Some(primary.clone()),
            history,
            horizon,
            auxiliary: Some(auxiliary),
            timestamps,
        })
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.auxiliary
            .iter()
            .flat_map(|aux| aux.keys().map(String::as_str))
            .collect()
    }
}

fn in_feature(name: &str, e: ForecastError) -> ApiError {
    ApiError::bad_request(format!("past_values.{}: {}", name, e))
}

fn parse_horizon(value: Option<&Value>, default_horizon: usize) -> Result<usize, ApiError> {
    let horizon = match value {
        None | Some(Value::Null) => default_horizon,
        Some(Value::Number(n)) => match (n.as_i64(), n.as_u64()) {
            (Some(h), _) => horizon_from_i64(h)?,
            (None, Some(h)) => usize::try_from(h).unwrap_or(usize::MAX),
            _ => return Err(non_integer_horizon(value)),
        },
        Some(other) => return Err(non_integer_horizon(Some(other))),
    };

    if horizon > MAX_HORIZON {
        return Err(ApiError::bad_request(format!(
            "forecast_horizon must not exceed {}, got {}",
            MAX_HORIZON, horizon
        )));
    }
    Ok(horizon)
}

fn non_integer_horizon(value: Option<&Value>) -> ApiError {
    let shown = value.map(Value::to_string).unwrap_or_default();
    ApiError::bad_request(format!(
        "Forecast horizon must be a non-negative integer, got {}",
        shown
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<ForecastRequest, ApiError> {
        ForecastRequest::from_json(Some(&body), 12)
    }

    fn message(result: Result<ForecastRequest, ApiError>) -> String {
        match result {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_body() {
        let req = parse(json!({"history": [1, 2, 3, 4, 5]})).unwrap();
        assert_eq!(req.format, RequestFormat::Legacy);
        assert_eq!(req.history.values(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(req.horizon, 12);
        assert!(req.auxiliary.is_none());
    }

    #[test]
    fn test_multivariate_uses_first_declared_key() {
        let body: Value = serde_json::from_str(
            r#"{"past_values": {"steps": [6000, 6800], "hrv": [55, 60], "heart_rate": [72, 77]},
                "timestamps": ["2026-10-17T08:00:00Z", "2026-10-17T09:00:00Z"],
                "forecast_horizon": 6}"#,
        )
        .unwrap();
        let req = parse(body).unwrap();
        assert_eq!(req.primary.as_deref(), Some("steps"));
        assert_eq!(req.history.values(), &[6000.0, 6800.0]);
        assert_eq!(req.horizon, 6);
        assert_eq!(req.timestamps, 2);
        // The primary series is passed on with the other signals.
        assert_eq!(req.feature_names(), vec!["steps", "hrv", "heart_rate"]);
    }

    #[test]
    fn test_past_values_takes_precedence() {
        let req = parse(json!({"history": [1], "past_values": {"heart_rate": [70]}})).unwrap();
        assert_eq!(req.format, RequestFormat::Multivariate);
    }

    #[test]
    fn test_skips_non_array_and_empty_signals() {
        let body: Value =
            serde_json::from_str(r#"{"past_values": {"energy": [50], "mood_score": "good", "steps": []}}"#)
                .unwrap();
        let req = parse(body).unwrap();
        assert_eq!(req.feature_names(), vec!["energy"]);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            message(ForecastRequest::from_json(None, 12)),
            "No JSON data provided"
        );
        assert_eq!(message(parse(json!({}))), "No JSON data provided");
        assert_eq!(
            message(parse(json!({"values": [1]}))),
            "Must provide either 'history' or 'past_values'"
        );
        assert_eq!(message(parse(json!({"past_values": {}}))), "No past_values provided");
        assert_eq!(
            message(parse(json!({"past_values": {"heart_rate": []}}))),
            "Empty history in past_values"
        );
        assert_eq!(message(parse(json!({"history": []}))), "Empty history list");
    }

    #[test]
    fn test_invalid_values() {
        assert!(message(parse(json!({"history": [1, "x"]}))).contains("index 1"));
        assert!(message(parse(json!({"past_values": {"hr": [1], "hrv": [null]}})))
            .starts_with("past_values.hrv"));
        assert!(message(parse(json!({"history": [1], "forecast_horizon": -1})))
            .contains("non-negative"));
        assert!(message(parse(json!({"history": [1], "forecast_horizon": 2.5})))
            .contains("non-negative"));
        assert!(message(parse(json!({"history": [1], "forecast_horizon": 1_000_000})))
            .contains("must not exceed"));
    }

    #[test]
    fn test_full_precision_values_parse_exactly() {
        let body: Value = serde_json::from_str(
            r#"{"past_values": {"energy": [10.035659145360567, 0.30000000000000004],
                "hrv": [57.123456789012345]}}"#,
        )
        .unwrap();
        let req = parse(body).unwrap();
        assert_eq!(req.history.values(), &[10.035659145360567, 0.30000000000000004]);
        let aux = req.auxiliary.unwrap();
        assert_eq!(aux["hrv"], vec![57.123456789012345]);
    }

    #[test]
    fn test_zero_horizon_allowed() {
        assert_eq!(parse(json!({"history": [1], "forecast_horizon": 0})).unwrap().horizon, 0);
    }
}
