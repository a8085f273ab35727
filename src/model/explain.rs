//! Per-prediction explanation (stub)
//!
//! The explainer initializes only when the loaded classifier exposes
//! coefficients. Per-transaction attributions are not computed in this
//! demo; `/shap_values` answers with an empty contribution list once
//! the transaction is known to exist.

use serde::Serialize;

use super::pipeline::Pipeline;

/// One attributed column in an explanation.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureContribution {
    pub name: String,
    pub value: f64,
}

/// Explanation backend derived from the loaded pipeline.
#[derive(Debug, Clone)]
pub struct Explainer {
    feature_names: Vec<String>,
}

impl Explainer {
    /// Build from the pipeline; `None` when the classifier exposes no
    /// coefficients to attribute.
    pub fn try_new(pipeline: &Pipeline) -> Option<Self> {
        pipeline.feature_importances().map(|importances| Self {
            feature_names: importances.into_iter().map(|(name, _)| name).collect(),
        })
    }

    /// Column names the explainer would attribute over.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Top contributions for a stored transaction. Demo stub: the
    /// original inputs are not retained, so the list is empty.
    pub fn top_features(&self) -> Vec<FeatureContribution> {
        Vec::new()
    }
}
