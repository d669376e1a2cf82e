//! HTTP request handlers.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use super::ApiState;
use crate::domain::PredictionResult;
use crate::error::{PredictError, ValidationErrors};

/// Server start time, set once before serving.
static START_TIME: OnceLock<Instant> = OnceLock::new();

pub(crate) fn mark_started() {
    START_TIME.get_or_init(Instant::now);
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
}

async fn root(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "message": format!("{} API", state.variant().display_name()),
        "endpoints": {
            "predict": "POST /predict",
            "health": "GET /health",
        },
    }))
}

async fn health(State(state): State<ApiState>) -> Json<Value> {
    let uptime_secs = START_TIME.get_or_init(Instant::now).elapsed().as_secs();
    Json(json!({
        "status": "healthy",
        "model_loaded": true,
        "variant": state.variant().as_str(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime_secs,
    }))
}

async fn predict(State(state): State<ApiState>, body: Bytes) -> Result<Json<PredictionResult>, ApiError> {
    let raw: Value = serde_json::from_slice(&body).map_err(|e| ApiError {
        error: PredictError::Validation(ValidationErrors::single(
            "body",
            format!("invalid JSON: {e}"),
        )),
        province: None,
    })?;

    state.predict_value(&raw).map(Json).map_err(|error| ApiError {
        province: raw
            .get("province")
            .and_then(Value::as_str)
            .map(str::to_string),
        error,
    })
}

/// A failed prediction, plus the context worth logging for it.
pub struct ApiError {
    error: PredictError,
    province: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let province = self.province.as_deref().unwrap_or("");
        match self.error {
            PredictError::Validation(errors) => {
                debug!(%errors, "rejected request");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": "Validation Error", "detail": errors })),
                )
                    .into_response()
            }
            PredictError::Codec { column, value } => {
                warn!(%column, %value, province, "unsupported category");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Unsupported Category",
                        "detail": format!("{column}: {value}"),
                    })),
                )
                    .into_response()
            }
            other => {
                error!(kind = other.kind(), error = %other, province, "prediction failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal Server Error",
                        "detail": "prediction failed",
                    })),
                )
                    .into_response()
            }
        }
    }
}
