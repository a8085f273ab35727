//! Document upload handlers
//!
//! Tickets and invoices arrive as images or PDFs; OCR turns them into
//! text, the field extractor rebuilds a feature record and the
//! pipeline scores it. Each successfully scored document appends one
//! row to the prediction log.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::error::AppError;
use crate::features::FeatureRecord;
use crate::{AppResult, AppState};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

#[derive(Debug, Serialize)]
pub struct DocumentScore {
    pub filename: String,
    pub is_fraud: bool,
    pub fraud_probability: f64,
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentsResponse {
    pub results: Vec<DocumentScore>,
}

enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    fn detect(filename: &str, content_type: Option<&str>) -> Result<Self, AppError> {
        if let Some(ct) = content_type {
            if ct == "application/pdf" {
                return Ok(Self::Pdf);
            }
            if ct.starts_with("image/") {
                return Ok(Self::Image);
            }
        }

        let ext = filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        if ext == "pdf" {
            Ok(Self::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Image)
        } else {
            Err(AppError::UnsupportedMedia(format!(
                "unsupported document type for '{filename}', expected an image or PDF"
            )))
        }
    }
}

/// OCR one ticket and score it.
pub async fn upload_ticket(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DocumentScore>> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let score = score_document(&state, filename, content_type.as_deref(), data).await?;
        return Ok(Json(score));
    }

    Err(AppError::ValidationError(
        "no file in multipart body".to_string(),
    ))
}

/// OCR and score every uploaded document, one result per file.
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadDocumentsResponse>> {
    let mut results = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let score = score_document(&state, filename, content_type.as_deref(), data).await?;
        results.push(score);
    }

    if results.is_empty() {
        return Err(AppError::ValidationError(
            "no files in multipart body".to_string(),
        ));
    }

    Ok(Json(UploadDocumentsResponse { results }))
}

async fn score_document(
    state: &AppState,
    filename: String,
    content_type: Option<&str>,
    data: Bytes,
) -> AppResult<DocumentScore> {
    let kind = DocumentKind::detect(&filename, content_type)?;

    let ocr = state.ocr.clone();
    let pdf = state.pdf.clone();
    let text = tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Image => ocr
            .recognize(&data)
            .map_err(|e| AppError::InvalidImage(e.to_string())),
        DocumentKind::Pdf => {
            let pages = pdf
                .convert(&data)
                .map_err(|e| AppError::PdfConversion(e.to_string()))?;
            let mut text = String::new();
            for page in pages {
                let recognized = ocr
                    .recognize(&page)
                    .map_err(|e| AppError::InvalidImage(e.to_string()))?;
                text.push_str(&recognized);
                text.push('\n');
            }
            Ok(text)
        }
    })
    .await
    .map_err(|e| AppError::InternalError(format!("OCR task failed: {e}")))??;

    let record = FeatureRecord::from_text(&text, state.extractor.as_ref());
    let result = state.pipeline.predict(&record);

    state
        .store
        .record(Utc::now(), result.is_fraud, result.fraud_probability)
        .await?;

    tracing::debug!(
        filename = %filename,
        fraud_probability = result.fraud_probability,
        "scored document"
    );

    Ok(DocumentScore {
        filename,
        is_fraud: result.is_fraud,
        fraud_probability: result.fraud_probability,
    })
}
