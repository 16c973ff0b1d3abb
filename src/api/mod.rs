//! HTTP API for the prediction service.

pub mod health;
pub mod predict;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::pipeline::Pipeline;

pub use health::health_routes;
pub use predict::{prediction_history, predict, USER_HEADER};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/prediction-history", get(prediction_history))
        .merge(health_routes())
        .with_state(state)
}
