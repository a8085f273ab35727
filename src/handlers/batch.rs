//! Batch prediction handler

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::features::FeatureRecord;
use crate::model::FRAUD_THRESHOLD;
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub frauds_detected: usize,
}

/// Score a CSV or Parquet upload row by row and count the frauds.
/// Bulk scores are not persisted to the prediction log.
pub async fn batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<BatchResponse>> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let lower = filename.to_lowercase();
        if !lower.ends_with(".csv") && !lower.ends_with(".parquet") {
            return Err(AppError::UnsupportedMedia(format!(
                "unsupported batch format for '{filename}', expected a .csv or .parquet file"
            )));
        }

        let data = field.bytes().await?;
        let frauds_detected = if lower.ends_with(".csv") {
            score_csv(&state, &data)?
        } else {
            score_parquet(&state, data)?
        };
        return Ok(Json(BatchResponse { frauds_detected }));
    }

    Err(AppError::ValidationError(
        "no file in multipart body".to_string(),
    ))
}

fn score_csv(state: &AppState, data: &[u8]) -> Result<usize, AppError> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| AppError::ValidationError(format!("unreadable CSV header: {e}")))?
        .clone();

    let mut frauds = 0;
    for row in reader.records() {
        let row = row.map_err(|e| AppError::ValidationError(format!("unreadable CSV row: {e}")))?;

        let mut object = Map::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            object.insert(header.to_string(), Value::String(value.to_string()));
        }

        let record = FeatureRecord::from_json(&Value::Object(object));
        if state.pipeline.predict_proba(&record) > FRAUD_THRESHOLD {
            frauds += 1;
        }
    }

    Ok(frauds)
}

fn score_parquet(state: &AppState, data: Bytes) -> Result<usize, AppError> {
    let reader = SerializedFileReader::new(data)
        .map_err(|e| AppError::ValidationError(format!("unreadable Parquet file: {e}")))?;
    let rows = reader
        .get_row_iter(None)
        .map_err(|e| AppError::ValidationError(format!("unreadable Parquet file: {e}")))?;

    let mut frauds = 0;
    for row in rows {
        let row =
            row.map_err(|e| AppError::ValidationError(format!("unreadable Parquet row: {e}")))?;

        let record = FeatureRecord::from_json(&row_to_json(&row));
        if state.pipeline.predict_proba(&record) > FRAUD_THRESHOLD {
            frauds += 1;
        }
    }

    Ok(frauds)
}

fn row_to_json(row: &Row) -> Value {
    let mut object = Map::new();
    for (name, field) in row.get_column_iter() {
        object.insert(name.clone(), field_to_json(field));
    }
    Value::Object(object)
}

/// Scalar Parquet fields mapped onto JSON; nested or exotic types
/// count as absent, like any other unconvertible value.
fn field_to_json(field: &Field) -> Value {
    match field {
        Field::Bool(v) => Value::Bool(*v),
        Field::Byte(v) => Value::from(*v),
        Field::Short(v) => Value::from(*v),
        Field::Int(v) => Value::from(*v),
        Field::Long(v) => Value::from(*v),
        Field::UByte(v) => Value::from(*v),
        Field::UShort(v) => Value::from(*v),
        Field::UInt(v) => Value::from(*v),
        Field::ULong(v) => Value::from(*v),
        Field::Float(v) => Value::from(f64::from(*v)),
        Field::Double(v) => Value::from(*v),
        Field::Str(v) => Value::String(v.clone()),
        _ => Value::Null,
    }
}
