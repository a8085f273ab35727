//! End-to-end API tests over the in-memory stack with a stub OCR
//! engine.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use serde_json::{json, Value};
use tower::ServiceExt;

use fraudscan::config::Config;
use fraudscan::features::{RegexFieldExtractor, NUMERIC_FIELDS};
use fraudscan::model::{
    ClassifierParams, EncoderParams, Explainer, Pipeline, PipelineArtifact, ScalerParams,
};
use fraudscan::ocr::{OcrError, PdfConverter, TextRecognizer};
use fraudscan::store::PredictionStore;
use fraudscan::{create_router, db, AppState};

/// OCR stub returning canned text.
struct StubOcr(&'static str);

impl TextRecognizer for StubOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Ok(self.0.to_string())
    }
}

/// OCR stub simulating an unreadable image.
struct FailingOcr;

impl TextRecognizer for FailingOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Err(OcrError("unreadable image".to_string()))
    }
}

/// Pipeline where only the raw amount carries weight: probability is
/// sigmoid(amount), so amount > 0 means fraud.
fn amount_only_pipeline() -> Pipeline {
    let mut weights = vec![0.0; 11];
    weights[0] = 1.0;
    Pipeline::from_artifact(PipelineArtifact {
        scaler: ScalerParams {
            mean: vec![0.0; NUMERIC_FIELDS.len()],
            std: vec![1.0; NUMERIC_FIELDS.len()],
        },
        encoder: EncoderParams {
            categories: vec![
                "CASH_IN".into(),
                "CASH_OUT".into(),
                "DEBIT".into(),
                "PAYMENT".into(),
                "TRANSFER".into(),
            ],
            drop_first: true,
        },
        classifier: ClassifierParams {
            weights,
            intercept: 0.0,
        },
    })
    .unwrap()
}

async fn test_state(ocr: Arc<dyn TextRecognizer>, with_explainer: bool) -> AppState {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let pipeline = amount_only_pipeline();
    let explainer = if with_explainer {
        Explainer::try_new(&pipeline).map(Arc::new)
    } else {
        None
    };

    AppState {
        store: PredictionStore::new(pool),
        pipeline: Arc::new(pipeline),
        explainer,
        extractor: Arc::new(RegexFieldExtractor::new()),
        ocr,
        pdf: Arc::new(PdfConverter::new("pdftoppm")),
        config: Config::default(),
    }
}

async fn default_state() -> AppState {
    test_state(Arc::new(StubOcr("")), true).await
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(uri: &str, files: &[(&str, &str, &[u8])]) -> Request<Body> {
    const BOUNDARY: &str = "test-boundary";
    let mut body = Vec::new();
    for (filename, content_type, data) in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A two-column Parquet file with the same rows as the CSV fixture.
fn parquet_payload() -> Vec<u8> {
    let schema = Arc::new(
        parse_message_type(
            "message transactions { REQUIRED DOUBLE amount; REQUIRED BINARY type (UTF8); }",
        )
        .unwrap(),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transactions.parquet");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer =
        SerializedFileWriter::new(file, schema, Arc::new(WriterProperties::builder().build()))
            .unwrap();

    let mut group = writer.next_row_group().unwrap();
    let mut amounts = group.next_column().unwrap().unwrap();
    amounts
        .typed::<DoubleType>()
        .write_batch(&[1000.0, -50.0, 250.0], None, None)
        .unwrap();
    amounts.close().unwrap();
    let mut types = group.next_column().unwrap().unwrap();
    types
        .typed::<ByteArrayType>()
        .write_batch(
            &[
                ByteArray::from("TRANSFER"),
                ByteArray::from("PAYMENT"),
                ByteArray::from("CASH_OUT"),
            ],
            None,
            None,
        )
        .unwrap();
    types.close().unwrap();
    group.close().unwrap();
    writer.close().unwrap();

    std::fs::read(&path).unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn predict_applies_defaults_and_assigns_transaction_id() {
    let app = create_router(default_state().await);

    let response = app
        .clone()
        .oneshot(json_request(
            "/predict",
            json!({"amount": 1000, "type": "TRANSFER"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["transaction_id"], 1);
    assert_eq!(body["is_fraud"], true);
    let prob = body["fraud_probability"].as_f64().unwrap();
    assert!(prob > 0.5 && prob <= 1.0);
    assert!(body["new_point"]["timestamp"].is_string());
    assert_eq!(body["new_point"]["fraud_probability"].as_f64().unwrap(), prob);

    // Second call: id equals row count after insertion.
    let response = app
        .oneshot(json_request("/predict", json!({})))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["transaction_id"], 2);
    // All-default record scores exactly at the threshold, not above.
    assert_eq!(body["is_fraud"], false);
    assert_eq!(body["fraud_probability"].as_f64().unwrap(), 0.5);
}

#[tokio::test]
async fn metrics_with_no_rows_is_zeroed() {
    let app = create_router(default_state().await);

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["current"]["fraudRate"], 0.0);
    assert_eq!(body["current"]["txnPerHour"], 0.0);
    assert_eq!(body["history"], json!([]));
}

#[tokio::test]
async fn metrics_reflect_recent_predictions() {
    let app = create_router(default_state().await);

    for amount in [1000.0, -1000.0] {
        let response = app
            .clone()
            .oneshot(json_request("/predict", json!({"amount": amount})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["current"]["fraudRate"].as_f64().unwrap(), 0.5);
    assert!(body["current"]["txnPerHour"].as_f64().unwrap() >= 1.0);
    assert!(!body["history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stream_opens_as_event_stream() {
    let app = create_router(default_state().await);

    let response = app
        .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn batch_counts_frauds_in_csv() {
    let app = create_router(default_state().await);

    let csv = b"amount,type\n1000,TRANSFER\n-50,PAYMENT\n250,CASH_OUT\n";
    let response = app
        .oneshot(multipart_request(
            "/batch",
            &[("transactions.csv", "text/csv", csv)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["frauds_detected"], 2);
}

#[tokio::test]
async fn batch_counts_frauds_in_parquet() {
    let app = create_router(default_state().await);

    let payload = parquet_payload();
    let response = app
        .oneshot(multipart_request(
            "/batch",
            &[(
                "transactions.parquet",
                "application/octet-stream",
                payload.as_slice(),
            )],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["frauds_detected"], 2);
}

#[tokio::test]
async fn batch_rejects_unsupported_formats() {
    let app = create_router(default_state().await);

    let response = app
        .oneshot(multipart_request(
            "/batch",
            &[("data.xlsx", "application/octet-stream", b"...")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("unsupported"));
}

#[tokio::test]
async fn upload_ticket_scores_ocr_text_and_persists() {
    let state = test_state(
        Arc::new(StubOcr("ticket\ntype: TRANSFER\namount: 123,45\n")),
        true,
    )
    .await;
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/upload_ticket",
            &[("ticket.png", "image/png", b"fake image bytes")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["filename"], "ticket.png");
    assert_eq!(body["is_fraud"], true);
    assert!(body["fraud_probability"].as_f64().unwrap() > 0.5);

    // The scored ticket is persisted: its id resolves for /shap_values.
    let response = app
        .oneshot(
            Request::get("/shap_values?id_transaccion=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["top_features"], json!([]));
}

#[tokio::test]
async fn upload_ticket_rejects_unreadable_image() {
    let state = test_state(Arc::new(FailingOcr), true).await;
    let app = create_router(state);

    let response = app
        .oneshot(multipart_request(
            "/upload_ticket",
            &[("ticket.png", "image/png", b"not an image")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_ticket_rejects_unsupported_type() {
    let app = create_router(default_state().await);

    let response = app
        .oneshot(multipart_request(
            "/upload_ticket",
            &[("notes.txt", "text/plain", b"plain text")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_documents_returns_one_result_per_file() {
    let state = test_state(Arc::new(StubOcr("amount: 5000")), true).await;
    let app = create_router(state);

    let response = app
        .oneshot(multipart_request(
            "/upload_documents",
            &[
                ("a.png", "image/png", b"img-a"),
                ("b.jpg", "image/jpeg", b"img-b"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["filename"], "a.png");
    assert_eq!(results[1]["filename"], "b.jpg");
    assert!(results.iter().all(|r| r["is_fraud"] == true));
}

#[tokio::test]
async fn features_are_sorted_descending_and_capped_at_ten() {
    let app = create_router(default_state().await);

    let response = app
        .oneshot(Request::get("/features").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let features = body.as_array().unwrap();
    assert_eq!(features.len(), 10);
    assert_eq!(features[0]["name"], "amount");
    let importances: Vec<f64> = features
        .iter()
        .map(|f| f["importance"].as_f64().unwrap())
        .collect();
    assert!(importances.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn shap_values_unknown_id_is_not_found() {
    let app = create_router(default_state().await);

    let response = app
        .oneshot(
            Request::get("/shap_values?id_transaccion=99")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shap_values_without_explainer_is_unavailable() {
    let state = test_state(Arc::new(StubOcr("")), false).await;
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::get("/shap_values?id_transaccion=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_reports_model_and_store_status() {
    let app = create_router(default_state().await);

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_features"], 11);
    assert_eq!(body["predictions_stored"], 0);

    let response = app
        .clone()
        .oneshot(json_request("/predict", json!({"amount": 10})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["predictions_stored"], 1);
}
