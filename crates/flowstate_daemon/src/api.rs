use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::ApiError;
use crate::request::{ForecastRequest, RequestFormat};
use crate::service::{ForecastService, PredictResponse, SampleResponse};

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ForecastService>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    local_model: bool,
    remote: bool,
}

// Handlers
async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        local_model: state.service.local_model().is_present(),
        remote: state.service.remote_url().is_some(),
    })
}

async fn sample(State(state): State<ApiState>) -> Json<SampleResponse> {
    let response = state.service.sample();
    info!(
        history = ?response.input.history,
        forecast = ?response.output.forecast,
        "Sample prediction"
    );
    Json(response)
}

async fn predict(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let data = serde_json::from_slice::<Value>(&body).ok();
    let request =
        ForecastRequest::from_json(data.as_ref(), state.service.config().default_horizon)?;

    match request.format {
        RequestFormat::Multivariate => info!(
            features = ?request.feature_names(),
            history_len = request.history.len(),
            timestamps = request.timestamps,
            forecast_horizon = request.horizon,
            "Received multivariate data"
        ),
        RequestFormat::Legacy => info!(
            history_len = request.history.len(),
            forecast_horizon = request.horizon,
            "Received legacy format"
        ),
    }

    Ok(Json(state.service.predict(&request).await))
}

pub fn router(service: Arc<ForecastService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sample", get(sample))
        .route("/predict", post(predict))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ApiState { service })
}

pub async fn run_api_server(
    addr: &str,
    service: Arc<ForecastService>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(service);

    info!(addr = addr, "API Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use flowstate_core::{generate_forecast, ForecastConfig, LocalModelHandle, SAMPLE_HISTORY};
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(ForecastService::heuristic_only()))
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn as_f64s(value: &Value) -> Vec<f64> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = call(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["local_model"], false);
    }

    #[tokio::test]
    async fn test_sample_endpoint() {
        let request = Request::builder().uri("/sample").body(Body::empty()).unwrap();
        let (status, body) = call(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["mode"], "sample");
        assert_eq!(as_f64s(&body["input"]["history"]), SAMPLE_HISTORY.to_vec());
        assert_eq!(
            as_f64s(&body["output"]["forecast"]),
            generate_forecast(&SAMPLE_HISTORY, 12, None).unwrap()
        );
    }

    #[tokio::test]
    async fn test_predict_legacy() {
        let (status, body) = call(app(), post_json(r#"{"history": [1, 2, 3, 4, 5]}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "sample");
        assert_eq!(body["forecast_horizon"], 12);
        let forecast = as_f64s(&body["forecast"]);
        assert_eq!(forecast, generate_forecast(&[1.0, 2.0, 3.0, 4.0, 5.0], 12, None).unwrap());
        assert!(forecast.iter().all(|v| (10.0..=100.0).contains(v)));
    }

    #[tokio::test]
    async fn test_predict_multivariate_uses_declared_order() {
        let body = r#"{
            "past_values": {
                "heart_rate": [72, 76, 80, 74, 78, 82, 88, 75, 79, 84, 81, 77],
                "hrv": [55, 53, 52, 60, 58, 56, 54, 62, 59, 57, 55, 60],
                "steps": [6000, 8500, 4000, 12000, 7000, 9000, 11000, 5500, 8000, 10000, 7500, 6800]
            },
            "timestamps": [],
            "forecast_horizon": 6
        }"#;
        let (status, response) = call(app(), post_json(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["forecast_horizon"], 6);

        let mut aux = flowstate_core::AuxiliarySignals::new();
        aux.insert("heart_rate".into(), SAMPLE_HISTORY.to_vec());
        aux.insert(
            "hrv".into(),
            vec![55.0, 53.0, 52.0, 60.0, 58.0, 56.0, 54.0, 62.0, 59.0, 57.0, 55.0, 60.0],
        );
        aux.insert(
            "steps".into(),
            vec![
                6000.0, 8500.0, 4000.0, 12000.0, 7000.0, 9000.0, 11000.0, 5500.0, 8000.0,
                10000.0, 7500.0, 6800.0,
            ],
        );
        let expected = generate_forecast(&SAMPLE_HISTORY, 6, Some(&aux)).unwrap();
        assert_eq!(as_f64s(&response["forecast"]), expected);
    }

    #[tokio::test]
    async fn test_predict_matches_library_for_full_precision_history() {
        let history = [10.035659145360567, 74.81666666666668, 60.1, 88.4];
        let body = serde_json::to_string(&json!({ "history": history })).unwrap();
        let (status, response) = call(app(), post_json(&body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            as_f64s(&response["forecast"]),
            generate_forecast(&history, 12, None).unwrap()
        );
    }

    #[tokio::test]
    async fn test_predict_zero_horizon() {
        let (status, body) =
            call(app(), post_json(r#"{"history": [50], "forecast_horizon": 0}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["forecast"], json!([]));
    }

    #[tokio::test]
    async fn test_predict_bad_requests() {
        for (payload, message) in [
            ("", "No JSON data provided"),
            ("not json", "No JSON data provided"),
            ("{}", "No JSON data provided"),
            (r#"{"values": [1]}"#, "Must provide either 'history' or 'past_values'"),
            (r#"{"history": []}"#, "Empty history list"),
            (r#"{"past_values": {}}"#, "No past_values provided"),
            (r#"{"past_values": {"hr": []}}"#, "Empty history in past_values"),
        ] {
            let (status, body) = call(app(), post_json(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload {:?}", payload);
            assert_eq!(body["error"], message);
            assert_eq!(body["status"], "error");
        }

        let (status, _) =
            call(app(), post_json(r#"{"history": [1], "forecast_horizon": -1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sample_only_flag() {
        let service = ForecastService::new(
            ForecastConfig {
                sample_only: true,
                ..ForecastConfig::default()
            },
            None,
            LocalModelHandle::Absent,
            Duration::from_secs(1),
        );
        let (_, body) = call(
            router(Arc::new(service)),
            post_json(r#"{"history": [60, 65, 70]}"#),
        )
        .await;
        assert_eq!(body["message"], "Sample prediction (not from actual model)");
    }
}
