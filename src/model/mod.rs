//! Model Module - fraud scoring pipeline
//!
//! Artifacts (classifier + two column scalers) are loaded once at startup;
//! every request then runs assemble -> scale -> infer -> decide.

pub mod classifier;
pub mod scaler;
pub mod loader;
pub mod pipeline;
pub mod threshold;

use thiserror::Error;

// Re-export common types
pub use classifier::{Classifier, OnnxClassifier};
pub use scaler::{ScalarTransformer, ScalerParams};
pub use loader::{ArtifactError, ArtifactLoader, ArtifactMetadata, Artifacts};
pub use pipeline::{assemble, score, FeatureVector, FEATURE_COUNT, V_FEATURE_COUNT};
pub use threshold::{Decision, FRAUD_THRESHOLD};

/// Failure inside the numeric pipeline
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{0}")]
    Scaler(String),

    #[error("{0}")]
    Classifier(String),

    #[error("{0}")]
    Shape(String),

    #[error("fraud probability is not a finite number: {0}")]
    NonFinite(f64),
}
