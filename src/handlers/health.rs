//! Health check handler

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::{AppResult, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model_features: usize,
    predictions_stored: i64,
    timestamp: i64,
}

/// Liveness plus a glance at the loaded pipeline and the prediction
/// log.
pub async fn check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model_features: state.pipeline.feature_names().len(),
        predictions_stored: state.store.count().await?,
        timestamp: chrono::Utc::now().timestamp(),
    }))
}
