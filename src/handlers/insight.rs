//! Model insight handlers: feature importances and explanations

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::FeatureContribution;
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
}

/// Top-10 feature importances, sorted descending.
pub async fn features(State(state): State<AppState>) -> AppResult<Json<Vec<FeatureImportance>>> {
    let mut importances = state.pipeline.feature_importances().ok_or_else(|| {
        AppError::ModelUnavailable(
            "feature importances are not available for the loaded model".to_string(),
        )
    })?;

    importances.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    importances.truncate(10);

    Ok(Json(
        importances
            .into_iter()
            .map(|(name, importance)| FeatureImportance { name, importance })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ShapQuery {
    pub id_transaccion: i64,
}

#[derive(Debug, Serialize)]
pub struct ShapResponse {
    pub top_features: Vec<FeatureContribution>,
}

/// Per-transaction explanation (demo stub). 503 when the explainer
/// failed to initialize, 404 when the transaction id is unknown.
pub async fn shap_values(
    State(state): State<AppState>,
    Query(query): Query<ShapQuery>,
) -> AppResult<Json<ShapResponse>> {
    let explainer = state
        .explainer
        .as_ref()
        .ok_or_else(|| AppError::ModelUnavailable("explainer is not available".to_string()))?;

    state
        .store
        .query_by_id(query.id_transaccion)
        .await?
        .ok_or_else(|| AppError::NotFound("transaction not found".to_string()))?;

    Ok(Json(ShapResponse {
        top_features: explainer.top_features(),
    }))
}
