//! Fraud detection API server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fraudscan::config::Config;
use fraudscan::features::RegexFieldExtractor;
use fraudscan::model::{Explainer, Pipeline};
use fraudscan::ocr::{PdfConverter, TesseractCli};
use fraudscan::store::PredictionStore;
use fraudscan::{create_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraudscan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Fraud detection server starting...");

    // Load the pipeline artifact once; it is immutable afterwards.
    let pipeline =
        Pipeline::load(&config.model_path).context("failed to load pipeline artifact")?;
    tracing::info!(
        "Pipeline loaded from {} ({} features)",
        config.model_path,
        pipeline.feature_names().len()
    );

    let explainer = match Explainer::try_new(&pipeline) {
        Some(e) => Some(Arc::new(e)),
        None => {
            tracing::warn!("Explainer unavailable for the loaded model");
            None
        }
    };

    // Initialize database and store
    let pool = db::create_pool(&config.database_url)
        .await
        .context("failed to create database pool")?;
    db::run_migrations(&pool)
        .await
        .context("failed to apply schema")?;

    // Build application state
    let state = AppState {
        store: PredictionStore::new(pool),
        pipeline: Arc::new(pipeline),
        explainer,
        extractor: Arc::new(RegexFieldExtractor::new()),
        ocr: Arc::new(TesseractCli::new(&config.ocr_command, &config.ocr_lang)),
        pdf: Arc::new(PdfConverter::new(&config.pdftoppm_command)),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
