//! HTTP routes and handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sentiscope_classifiers::pipeline::truncate;
use sentiscope_core::{Label, PredictionError, PredictionResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::state::AppContext;

/// Characters of input text kept in log lines
const LOG_TEXT_CHARS: usize = 50;

pub fn create_router(context: AppContext) -> Router {
    Router::new()
        .route("/predict", get(predict_query).post(predict_json))
        .route("/check_health", get(health_check))
        .route("/version", get(version))
        .route("/version/modelversion", get(model_version))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(context)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(context): State<AppContext>) -> String {
    context
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_version: Option<String>,
}

async fn version(State(context): State<AppContext>) -> Json<VersionResponse> {
    Json(VersionResponse {
        service_version: context.service_version.to_string(),
        model_version: None,
    })
}

async fn model_version(State(context): State<AppContext>) -> Json<VersionResponse> {
    Json(VersionResponse {
        service_version: context.service_version.to_string(),
        model_version: Some(context.model_version.to_string()),
    })
}

/// `text` from the JSON body; absent means empty
#[derive(Debug, Default, Deserialize)]
struct PredictRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    sentiment: Label,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            sentiment: result.label,
            confidence: result.confidence,
            warning: result.diagnostic.map(|d| d.message().to_string()),
        }
    }
}

async fn predict_query(
    State(context): State<AppContext>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Query(params) = query.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected predict query");
        AppError::InvalidRequest(rejection.body_text())
    })?;

    // First `text` wins when the parameter is repeated; absent means empty
    let text = params
        .into_iter()
        .find(|(key, _)| key == "text")
        .map(|(_, value)| value)
        .unwrap_or_default();
    predict(&context, &text)
}

async fn predict_json(
    State(context): State<AppContext>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected predict body");
        AppError::InvalidRequest(rejection.body_text())
    })?;
    predict(&context, req.text.as_deref().unwrap_or_default())
}

fn predict(context: &AppContext, text: &str) -> Result<Json<PredictResponse>, AppError> {
    debug!(text = %truncate(text, LOG_TEXT_CHARS), "Received predict request");
    let start = Instant::now();

    let result = context.pipeline.predict(text).map_err(|e| {
        error!(
            text = %truncate(text, LOG_TEXT_CHARS),
            error = %e,
            "Prediction failed"
        );
        metrics::counter!("sentiscope_prediction_errors_total").increment(1);
        AppError::Prediction(e)
    })?;

    metrics::histogram!("sentiscope_prediction_latency_us")
        .record(start.elapsed().as_micros() as f64);
    metrics::counter!("sentiscope_predictions_total", "sentiment" => result.label.to_string())
        .increment(1);
    if result.diagnostic.is_some() {
        metrics::counter!("sentiscope_zero_feature_inputs_total").increment(1);
    }

    info!(
        text = %truncate(text, LOG_TEXT_CHARS),
        sentiment = result.label,
        confidence = ?result.confidence,
        "Prediction served"
    );

    Ok(Json(result.into()))
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

/// Request-level failure, rendered as JSON
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message })),
            )
                .into_response(),
            AppError::Prediction(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": err.to_string(),
                    "sentiment": 0,
                    "confidence": 0.0,
                })),
            )
                .into_response(),
        }
    }
}
