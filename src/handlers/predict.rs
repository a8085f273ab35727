//! Single-transaction prediction handler

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::features::FeatureRecord;
use crate::store::FeedEvent;
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub is_fraud: bool,
    pub fraud_probability: f64,
    pub transaction_id: i64,
    pub new_point: FeedEvent,
}

/// Score a partial transaction record. Missing numeric fields default
/// to 0.0 and a missing type to "". Every successful call appends one
/// row to the prediction log.
pub async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<Json<PredictResponse>> {
    let record = FeatureRecord::from_json(&payload);
    let result = state.pipeline.predict(&record);

    let row = state
        .store
        .record(Utc::now(), result.is_fraud, result.fraud_probability)
        .await?;

    tracing::debug!(
        transaction_id = row.id,
        fraud_probability = result.fraud_probability,
        "scored transaction"
    );

    Ok(Json(PredictResponse {
        is_fraud: result.is_fraud,
        fraud_probability: result.fraud_probability,
        transaction_id: row.id,
        new_point: FeedEvent::from(&row),
    }))
}
