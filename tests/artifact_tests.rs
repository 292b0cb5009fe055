//! Artifact Loading Integration Tests
//!
//! Load the ONNX models in `tests/fixtures/` (written by
//! `tools/make_test_models.py`) together with JSON scalers, then score
//! through the real ONNX Runtime session.
//!
//! Every fixture model computes p(fraud) = sigmoid(x0), where x0 is the scaled
//! time. The time scaler below maps 100 -> 0 and 0 -> -2.

use std::fs;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use fraud_scoring::config::Config;
use fraud_scoring::model::{score, ArtifactError, ArtifactLoader, Artifacts, Decision, ScoringError};
use fraud_scoring::{create_router, AppState};

const SIGMOID_MINUS_TWO: f64 = 0.119_202_922;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn artifact_dir(model: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::copy(fixture(model), dir.path().join("model.onnx")).unwrap();
    fs::write(
        dir.path().join("time_scaler.json"),
        r#"{"kind":"standard","mean":[100.0],"scale":[50.0]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("amount_scaler.json"),
        r#"{"kind":"robust","center":[22.0],"scale":[72.5]}"#,
    )
    .unwrap();
    dir
}

fn load(dir: &TempDir) -> Result<Artifacts, ArtifactError> {
    let config = Config {
        artifact_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    ArtifactLoader::from_config(&config).load()
}

fn v_features() -> Vec<f64> {
    (0..28).map(|i| (i as f64 - 14.0) * 0.37).collect()
}

fn assert_scores(artifacts: &Artifacts) {
    let neutral = score(artifacts, 100.0, &v_features(), 378.66).unwrap();
    assert!((neutral.fraud_probability - 0.5).abs() < 1e-6, "{}", neutral.fraud_probability);
    assert_eq!(neutral.decision, Decision::Fraud);

    let low = score(artifacts, 0.0, &v_features(), 378.66).unwrap();
    assert!(
        (low.fraud_probability - SIGMOID_MINUS_TWO).abs() < 1e-6,
        "{}",
        low.fraud_probability
    );
    assert_eq!(low.decision, Decision::Safe);
}

#[test]
fn test_tensor_model_loads_and_scores() {
    let dir = artifact_dir("tensor_model.onnx");
    let artifacts = load(&dir).unwrap();

    assert_eq!(artifacts.classifier.name(), "model");
    let roles: Vec<_> = artifacts.metadata.iter().map(|m| m.role).collect();
    assert_eq!(roles, ["classifier", "time_scaler", "amount_scaler"]);
    assert_eq!(artifacts.metadata[0].size_bytes, fs::metadata(fixture("tensor_model.onnx")).unwrap().len());

    assert_scores(&artifacts);
}

#[test]
fn test_zipmap_model_loads_and_scores() {
    let dir = artifact_dir("zipmap_model.onnx");
    let artifacts = load(&dir).unwrap();
    assert_scores(&artifacts);
}

#[test]
fn test_tensor_and_zipmap_models_agree() {
    let tensor_dir = artifact_dir("tensor_model.onnx");
    let zipmap_dir = artifact_dir("zipmap_model.onnx");
    let tensor = load(&tensor_dir).unwrap();
    let zipmap = load(&zipmap_dir).unwrap();

    for time in [0.0, 42.0, 100.0, 172_792.0] {
        let a = score(&tensor, time, &v_features(), 1.0).unwrap();
        let b = score(&zipmap, time, &v_features(), 1.0).unwrap();
        assert!((a.fraud_probability - b.fraud_probability).abs() < 1e-6, "time {time}");
        assert_eq!(a.decision, b.decision);
    }
}

#[test]
fn test_double_input_model_rejected_at_load() {
    let dir = artifact_dir("double_input_model.onnx");
    match load(&dir) {
        Err(ArtifactError::Onnx { reason, .. }) => assert!(reason.contains("float32"), "{reason}"),
        other => panic!("expected ONNX load error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_wrong_width_model_rejected_at_load() {
    let dir = artifact_dir("wide_input_model.onnx");
    match load(&dir) {
        Err(ArtifactError::Onnx { reason, .. }) => assert!(reason.contains("31"), "{reason}"),
        other => panic!("expected ONNX load error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_value_beyond_float32_range_is_error() {
    let dir = artifact_dir("tensor_model.onnx");
    let artifacts = load(&dir).unwrap();

    let mut v = v_features();
    v[3] = 1e39;
    match score(&artifacts, 100.0, &v, 1.0) {
        Err(ScoringError::Classifier(msg)) => assert!(msg.contains("column 4"), "{msg}"),
        other => panic!("expected classifier error, got {:?}", other),
    }
}

async fn predict(artifacts: Artifacts, body: Value) -> (StatusCode, Value) {
    let response = create_router(AppState::new(artifacts))
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_predict_with_onnx_model() {
    let dir = artifact_dir("zipmap_model.onnx");
    let artifacts = load(&dir).unwrap();

    let (status, body) = predict(
        artifacts,
        json!({"time": 0.0, "amount": 149.62, "V_features": v_features()}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 0);
    assert_eq!(body["status"], "SAFE");
    let p = body["fraud_probability"].as_f64().unwrap();
    assert!((p - SIGMOID_MINUS_TWO).abs() < 1e-6, "{p}");
}

#[tokio::test]
async fn test_predict_rejects_value_beyond_float32_range() {
    let dir = artifact_dir("tensor_model.onnx");
    let artifacts = load(&dir).unwrap();

    let mut v = v_features();
    v[0] = -1e39;
    let (status, body) = predict(
        artifacts,
        json!({"time": 0.0, "amount": 1.0, "V_features": v}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("float32"));
}
