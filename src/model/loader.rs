//! Artifact loader
//!
//! Reads the classifier and the two scalers from the artifact directory.
//! Any failure here aborts startup.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::classifier::{Classifier, OnnxClassifier};
use super::scaler::{ScalarTransformer, ScalerParams};
use crate::config::Config;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid scaler {path}: {reason}")]
    InvalidScaler { path: PathBuf, reason: String },

    #[error("failed to load model {path}: {reason}")]
    Onnx { path: PathBuf, reason: String },
}

/// What was loaded, for startup logs
#[derive(Debug, Clone)]
pub struct ArtifactMetadata {
    pub role: &'static str,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub loaded_at: DateTime<Utc>,
}

/// Read-only model state shared by every request
#[derive(Clone)]
pub struct Artifacts {
    pub classifier: Arc<dyn Classifier>,
    pub time_scaler: Arc<dyn ScalarTransformer>,
    pub amount_scaler: Arc<dyn ScalarTransformer>,
    pub metadata: Vec<ArtifactMetadata>,
}

impl fmt::Debug for Artifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifacts")
            .field("classifier", &self.classifier.name())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Artifacts {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        time_scaler: Arc<dyn ScalarTransformer>,
        amount_scaler: Arc<dyn ScalarTransformer>,
    ) -> Self {
        Self {
            classifier,
            time_scaler,
            amount_scaler,
            metadata: Vec::new(),
        }
    }
}

/// Loads artifacts named by [`Config`]
pub struct ArtifactLoader {
    model_path: PathBuf,
    time_scaler_path: PathBuf,
    amount_scaler_path: PathBuf,
    onnx_threads: usize,
}

impl ArtifactLoader {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_path: config.model_path(),
            time_scaler_path: config.time_scaler_path(),
            amount_scaler_path: config.amount_scaler_path(),
            onnx_threads: config.onnx_threads,
        }
    }

    /// Load scalers first (cheap), then the model
    pub fn load(&self) -> Result<Artifacts, ArtifactError> {
        let (time_scaler, time_meta) = load_scaler(&self.time_scaler_path, "time_scaler")?;
        let (amount_scaler, amount_meta) = load_scaler(&self.amount_scaler_path, "amount_scaler")?;

        let model_meta = describe(&self.model_path, "classifier")?;
        let classifier = OnnxClassifier::load(&self.model_path, self.onnx_threads).map_err(
            |reason| ArtifactError::Onnx {
                path: self.model_path.clone(),
                reason,
            },
        )?;

        let metadata = vec![model_meta, time_meta, amount_meta];
        for meta in &metadata {
            tracing::info!(
                role = meta.role,
                path = %meta.path.display(),
                sha256 = %meta.sha256,
                size_bytes = meta.size_bytes,
                "Artifact loaded"
            );
        }

        Ok(Artifacts {
            classifier: Arc::new(classifier),
            time_scaler: Arc::new(time_scaler),
            amount_scaler: Arc::new(amount_scaler),
            metadata,
        })
    }
}

/// Parse and check one scaler file
pub fn load_scaler(
    path: &Path,
    role: &'static str,
) -> Result<(ScalerParams, ArtifactMetadata), ArtifactError> {
    let bytes = read(path)?;

    let params: ScalerParams =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    params.check().map_err(|reason| ArtifactError::InvalidScaler {
        path: path.to_path_buf(),
        reason,
    })?;

    if params.width() != Some(1) {
        return Err(ArtifactError::InvalidScaler {
            path: path.to_path_buf(),
            reason: format!("expected a single-column scaler, got width {:?}", params.width()),
        });
    }

    Ok((params, metadata_for(path, role, &bytes)))
}

fn describe(path: &Path, role: &'static str) -> Result<ArtifactMetadata, ArtifactError> {
    let bytes = read(path)?;
    Ok(metadata_for(path, role, &bytes))
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn metadata_for(path: &Path, role: &'static str, bytes: &[u8]) -> ArtifactMetadata {
    let mut hasher = Sha256::new();
    hasher.update(bytes);

    ArtifactMetadata {
        role,
        path: path.to_path_buf(),
        sha256: format!("{:x}", hasher.finalize()),
        size_bytes: bytes.len() as u64,
        loaded_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn config_for(dir: &TempDir) -> Config {
        Config {
            artifact_dir: dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_load_scaler_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "time_scaler.json", r#"{"kind":"standard","mean":[10.0],"scale":[2.0]}"#);

        let (scaler, meta) = load_scaler(&path, "time_scaler").unwrap();
        assert_eq!(scaler.transform_one(14.0).unwrap(), 2.0);
        assert_eq!(meta.role, "time_scaler");
        assert_eq!(meta.sha256.len(), 64);
        assert!(meta.size_bytes > 0);
    }

    #[test]
    fn test_missing_scaler_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_scaler(&dir.path().join("nope.json"), "time_scaler").unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_corrupt_scaler_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "amount_scaler.json", "\u{80}not json");
        let err = load_scaler(&path, "amount_scaler").unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_multi_column_scaler_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "amount_scaler.json", r#"{"kind":"min_max","min":[0.0,0.0],"scale":[1.0,1.0]}"#);
        let err = load_scaler(&path, "amount_scaler").unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidScaler { .. }));
    }

    #[test]
    fn test_loader_fails_without_model() {
        let dir = TempDir::new().unwrap();
        write(&dir, "time_scaler.json", r#"{"kind":"standard","mean":[0.0],"scale":[1.0]}"#);
        write(&dir, "amount_scaler.json", r#"{"kind":"robust","center":[22.0],"scale":[72.5]}"#);

        let err = ArtifactLoader::from_config(&config_for(&dir)).load().unwrap_err();
        match err {
            ArtifactError::NotFound(path) => assert!(path.ends_with("model.onnx")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_loader_fails_on_first_missing_scaler() {
        let dir = TempDir::new().unwrap();
        let err = ArtifactLoader::from_config(&config_for(&dir)).load().unwrap_err();
        match err {
            ArtifactError::NotFound(path) => assert!(path.ends_with("time_scaler.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corrupt_model_is_onnx_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "time_scaler.json", r#"{"kind":"standard","mean":[0.0],"scale":[1.0]}"#);
        write(&dir, "amount_scaler.json", r#"{"kind":"standard","mean":[0.0],"scale":[1.0]}"#);
        write(&dir, "model.onnx", "definitely not protobuf");

        let err = ArtifactLoader::from_config(&config_for(&dir)).load().unwrap_err();
        assert!(matches!(err, ArtifactError::Onnx { .. }));
    }
}
