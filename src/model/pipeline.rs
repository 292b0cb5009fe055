//! Feature assembly, scaling and inference for a single transaction

use ndarray::ArrayView2;

use super::classifier::Classifier;
use super::loader::Artifacts;
use super::threshold::Decision;
use super::ScoringError;

/// Anonymised PCA components per transaction
pub const V_FEATURE_COUNT: usize = 28;

/// Model input width: time, V1..V28, amount
pub const FEATURE_COUNT: usize = V_FEATURE_COUNT + 2;

const TIME_INDEX: usize = 0;
const AMOUNT_INDEX: usize = FEATURE_COUNT - 1;

/// One model input row
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Scored transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub fraud_probability: f64,
    pub decision: Decision,
}

/// Build `[time, v_features..., amount]` from raw values.
pub fn assemble(time: f64, v_features: &[f64], amount: f64) -> Result<FeatureVector, ScoringError> {
    if v_features.len() != V_FEATURE_COUNT {
        return Err(ScoringError::Shape(format!(
            "expected {} V features, got {}",
            V_FEATURE_COUNT,
            v_features.len()
        )));
    }

    let mut vector = [0.0; FEATURE_COUNT];
    vector[TIME_INDEX] = time;
    vector[1..=V_FEATURE_COUNT].copy_from_slice(v_features);
    vector[AMOUNT_INDEX] = amount;
    Ok(vector)
}

/// Overwrite the time and amount slots with their scaled values.
///
/// The scalers see the raw inputs, not whatever is already in the vector.
pub fn scale_in_place(
    vector: &mut FeatureVector,
    time: f64,
    amount: f64,
    artifacts: &Artifacts,
) -> Result<(), ScoringError> {
    vector[TIME_INDEX] = artifacts.time_scaler.transform_one(time)?;
    vector[AMOUNT_INDEX] = artifacts.amount_scaler.transform_one(amount)?;
    Ok(())
}

/// Positive-class probability for one row
pub fn infer(classifier: &dyn Classifier, vector: &FeatureVector) -> Result<f64, ScoringError> {
    let batch = ArrayView2::from_shape((1, FEATURE_COUNT), vector.as_slice())
        .map_err(|e| ScoringError::Shape(format!("Array error: {}", e)))?;

    let proba = classifier.predict_proba(batch)?;

    let p = proba.get((0, 1)).copied().ok_or_else(|| {
        ScoringError::Shape(format!(
            "classifier returned shape {:?}, expected (1, 2)",
            proba.dim()
        ))
    })?;

    if !p.is_finite() {
        return Err(ScoringError::NonFinite(p));
    }

    Ok(p.clamp(0.0, 1.0))
}

/// Full scoring path for one transaction
pub fn score(
    artifacts: &Artifacts,
    time: f64,
    v_features: &[f64],
    amount: f64,
) -> Result<Score, ScoringError> {
    let mut vector = assemble(time, v_features, amount)?;
    scale_in_place(&mut vector, time, amount, artifacts)?;

    let fraud_probability = infer(artifacts.classifier.as_ref(), &vector)?;
    let decision = Decision::from_probability(fraud_probability);

    tracing::debug!(
        model = %artifacts.classifier.name(),
        fraud_probability = fraud_probability,
        status = decision.as_str(),
        "Transaction scored"
    );

    Ok(Score {
        fraud_probability,
        decision,
    })
}
