//! Classification pipeline
//!
//! The pre-trained artifact is a JSON file carrying the fitted
//! standard-scaler parameters, the one-hot encoder categories and the
//! logistic-regression coefficients of the externally trained
//! scaler + encoder + classifier pipeline. It is loaded once at
//! startup and immutable for the process lifetime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRecord, CATEGORICAL_FIELD, NUMERIC_FIELDS};

/// Decision threshold applied wherever the boolean flag is derived
/// from a probability.
pub const FRAUD_THRESHOLD: f64 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model artifact is inconsistent: {0}")]
    Shape(String),
}

/// Fitted standard-scaler parameters, one entry per numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Fitted one-hot encoder for the transaction type. Unknown
/// categories encode to all zeros; with `drop_first` the first
/// category is the implicit baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderParams {
    pub categories: Vec<String>,
    pub drop_first: bool,
}

/// Logistic-regression coefficients over the transformed columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub scaler: ScalerParams,
    pub encoder: EncoderParams,
    pub classifier: ClassifierParams,
}

/// Scorer output for a single record.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PredictionResult {
    pub is_fraud: bool,
    pub fraud_probability: f64,
}

/// The loaded, validated pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    scaler: ScalerParams,
    encoder: EncoderParams,
    classifier: ClassifierParams,
    feature_names: Vec<String>,
}

impl Pipeline {
    /// Load and validate the artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let artifact: PipelineArtifact = serde_json::from_str(&raw)?;
        Self::from_artifact(artifact)
    }

    /// Validate an artifact and derive the post-transform column names.
    pub fn from_artifact(artifact: PipelineArtifact) -> Result<Self, ModelError> {
        let PipelineArtifact {
            scaler,
            encoder,
            classifier,
        } = artifact;

        if scaler.mean.len() != NUMERIC_FIELDS.len() || scaler.std.len() != NUMERIC_FIELDS.len() {
            return Err(ModelError::Shape(format!(
                "scaler expects {} numeric columns, got mean={} std={}",
                NUMERIC_FIELDS.len(),
                scaler.mean.len(),
                scaler.std.len()
            )));
        }

        let mut feature_names: Vec<String> =
            NUMERIC_FIELDS.iter().map(|f| f.to_string()).collect();
        for category in encoder.encoded_categories() {
            feature_names.push(format!("{CATEGORICAL_FIELD}_{category}"));
        }

        if classifier.weights.len() != feature_names.len() {
            return Err(ModelError::Shape(format!(
                "classifier has {} weights for {} transformed columns",
                classifier.weights.len(),
                feature_names.len()
            )));
        }

        Ok(Self {
            scaler,
            encoder,
            classifier,
            feature_names,
        })
    }

    /// Ordered post-transform column names.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Classifier probability that the record is fraudulent.
    pub fn predict_proba(&self, record: &FeatureRecord) -> f64 {
        let transformed = self.transform(record);
        let z: f64 = transformed
            .iter()
            .zip(&self.classifier.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.classifier.intercept;
        sigmoid(z)
    }

    /// Full scoring: probability plus the thresholded flag.
    pub fn predict(&self, record: &FeatureRecord) -> PredictionResult {
        let fraud_probability = self.predict_proba(record);
        PredictionResult {
            is_fraud: fraud_probability > FRAUD_THRESHOLD,
            fraud_probability,
        }
    }

    /// Per-column coefficient magnitudes, when the classifier exposes
    /// them. `None` mirrors a classifier without importances.
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        if self.classifier.weights.is_empty() {
            return None;
        }
        Some(
            self.feature_names
                .iter()
                .cloned()
                .zip(self.classifier.weights.iter().copied())
                .collect(),
        )
    }

    /// Scale numerics and one-hot encode the type, in column order.
    fn transform(&self, record: &FeatureRecord) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.feature_names.len());
        for (i, value) in record.numeric.iter().enumerate() {
            let std = self.scaler.std[i];
            let denom = if std.abs() < f64::EPSILON { 1.0 } else { std };
            out.push((value - self.scaler.mean[i]) / denom);
        }
        for category in self.encoder.encoded_categories() {
            out.push(if record.tx_type == *category { 1.0 } else { 0.0 });
        }
        out
    }
}

impl EncoderParams {
    /// Categories that get their own output column.
    fn encoded_categories(&self) -> &[String] {
        if self.drop_first && !self.categories.is_empty() {
            &self.categories[1..]
        } else {
            &self.categories
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
