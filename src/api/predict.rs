//! Prediction endpoints
//!
//! POST /api/predict runs the pipeline for one feature vector.
//! GET /api/prediction-history always returns an empty history.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use super::AppState;
use crate::error::PipelineError;
use crate::models::ResolvedPrediction;

/// Header carrying the caller's opaque identity.
pub const USER_HEADER: &str = "x-user-id";

/// Successful prediction response
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: ResolvedPrediction,
    pub user: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Prediction history response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub prediction_history: Vec<Value>,
}

/// POST /api/predict
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(raw) = body.map_err(|rejection| ApiError::BadBody(rejection.body_text()))?;
    let user = caller_identity(&headers);

    let prediction = state.pipeline.predict(raw).await.map_err(ApiError::Pipeline)?;

    Ok(Json(PredictionResponse {
        success: true,
        prediction,
        user,
        generated_at: Utc::now(),
    }))
}

/// GET /api/prediction-history
///
/// History is not persisted, so this is always empty.
pub async fn prediction_history() -> Json<HistoryResponse> {
    Json(HistoryResponse {
        success: true,
        prediction_history: Vec::new(),
    })
}

fn caller_identity(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Errors returned by the prediction endpoints
#[derive(Debug)]
pub enum ApiError {
    BadBody(String),
    Pipeline(PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadBody(message) => {
                warn!("Rejected request body: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "success": false, "message": message }),
                )
            }
            ApiError::Pipeline(e) if e.is_client_error() => {
                warn!("Rejected prediction request: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "success": false, "message": e.to_string() }),
                )
            }
            ApiError::Pipeline(e) => {
                error!("Prediction Error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "message": "Error processing prediction",
                        "error": e.to_string(),
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
