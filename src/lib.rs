//! Fraud detection & document OCR scoring API
//!
//! Transactions come in as JSON records, CSV batches or scanned
//! documents; features are extracted, scored against a pre-trained
//! pipeline and appended to an in-memory prediction log that backs
//! the aggregate metrics endpoint and the live SSE feed.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod handlers;
pub mod model;
pub mod ocr;
pub mod store;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use error::{AppError, AppResult};

use config::Config;
use features::FieldExtractor;
use model::{Explainer, Pipeline};
use ocr::{PdfConverter, TextRecognizer};
use store::PredictionStore;

/// Uploads are scanned documents; allow a generous body.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state, dependency-injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: PredictionStore,
    pub pipeline: Arc<Pipeline>,
    pub explainer: Option<Arc<Explainer>>,
    pub extractor: Arc<dyn FieldExtractor>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub pdf: Arc<PdfConverter>,
    pub config: Config,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/stream", get(handlers::stream::stream))
        .route("/batch", post(handlers::batch::batch))
        .route("/upload_ticket", post(handlers::uploads::upload_ticket))
        .route("/upload_documents", post(handlers::uploads::upload_documents))
        .route("/features", get(handlers::insight::features))
        .route("/shap_values", get(handlers::insight::shap_values))
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
