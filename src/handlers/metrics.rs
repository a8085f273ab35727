//! Aggregate metrics handler

use axum::{extract::State, Json};
use chrono::{Duration, Utc};

use crate::aggregate::{self, MetricsReport};
use crate::{AppResult, AppState};

/// Fraud rate, transactions per hour and the hourly mean-probability
/// series over the last 24 hours.
pub async fn metrics(State(state): State<AppState>) -> AppResult<Json<MetricsReport>> {
    let cutoff = Utc::now() - Duration::hours(24);
    let rows = state.store.query_since(cutoff).await?;
    Ok(Json(aggregate::summarize(&rows)))
}
