//! Configuration module

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (in-memory SQLite by default)
    pub database_url: String,

    /// Server port
    pub port: u16,

    /// Path to the serialized pipeline artifact
    pub model_path: String,

    /// Directory with the bundled frontend assets
    pub static_dir: String,

    /// Tesseract language pack used for OCR
    pub ocr_lang: String,

    /// Tesseract executable
    pub ocr_command: String,

    /// pdftoppm executable for PDF-to-image conversion
    pub pdftoppm_command: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| "model/fraud_pipeline.json".to_string()),

            static_dir: env::var("STATIC_DIR")
                .unwrap_or_else(|_| "static".to_string()),

            ocr_lang: env::var("OCR_LANG")
                .unwrap_or_else(|_| "spa".to_string()),

            ocr_command: env::var("OCR_COMMAND")
                .unwrap_or_else(|_| "tesseract".to_string()),

            pdftoppm_command: env::var("PDFTOPPM_COMMAND")
                .unwrap_or_else(|_| "pdftoppm".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 8000,
            model_path: "model/fraud_pipeline.json".to_string(),
            static_dir: "static".to_string(),
            ocr_lang: "spa".to_string(),
            ocr_command: "tesseract".to_string(),
            pdftoppm_command: "pdftoppm".to_string(),
        }
    }
}
