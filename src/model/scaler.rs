//! Column Scalers
//!
//! Fitted single-column transformers for the `time` and `amount` features.
//! Parameters are exported from the training pipeline as JSON.

use ndarray::{Array2, ArrayView2};
use serde::Deserialize;

use super::ScoringError;

/// Capability: transform a batch of rows column-wise.
///
/// The time and amount scalers are each fitted on one column, so at
/// prediction time they receive a `1 x 1` batch.
pub trait ScalarTransformer: Send + Sync {
    fn transform(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScoringError>;

    /// Transform one raw value through a `1 x 1` batch
    fn transform_one(&self, value: f64) -> Result<f64, ScoringError> {
        let batch = Array2::from_elem((1, 1), value);
        let out = self.transform(batch.view())?;
        out.get((0, 0))
            .copied()
            .ok_or_else(|| ScoringError::Shape(format!(
                "scaler returned shape {:?}, expected (1, 1)",
                out.dim()
            )))
    }
}

/// Serialized scaler parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `(x - mean) / scale`
    Standard {
        #[serde(default)]
        mean: Option<Vec<f64>>,
        #[serde(default)]
        scale: Option<Vec<f64>>,
    },
    /// `x * scale + min`
    MinMax {
        min: Vec<f64>,
        scale: Vec<f64>,
    },
    /// `(x - center) / scale`
    Robust {
        #[serde(default)]
        center: Option<Vec<f64>>,
        #[serde(default)]
        scale: Option<Vec<f64>>,
    },
}

impl ScalerParams {
    /// Number of columns the scaler was fitted on, if it carries parameters
    pub fn width(&self) -> Option<usize> {
        match self {
            ScalerParams::Standard { mean, scale } => {
                mean.as_ref().or(scale.as_ref()).map(Vec::len)
            }
            ScalerParams::MinMax { min, .. } => Some(min.len()),
            ScalerParams::Robust { center, scale } => {
                center.as_ref().or(scale.as_ref()).map(Vec::len)
            }
        }
    }

    /// Reject parameter sets that could never produce finite output.
    pub fn check(&self) -> Result<(), String> {
        let (offset, scale, divides) = match self {
            ScalerParams::Standard { mean, scale } => (mean.as_deref(), scale.as_deref(), true),
            ScalerParams::MinMax { min, scale } => (Some(min.as_slice()), Some(scale.as_slice()), false),
            ScalerParams::Robust { center, scale } => (center.as_deref(), scale.as_deref(), true),
        };

        if let (Some(o), Some(s)) = (offset, scale) {
            if o.len() != s.len() {
                return Err(format!(
                    "parameter length mismatch: {} offsets vs {} scales",
                    o.len(),
                    s.len()
                ));
            }
        }

        if offset.map_or(false, |o| o.is_empty()) || scale.map_or(false, |s| s.is_empty()) {
            return Err("empty parameter vector".to_string());
        }

        if let Some(o) = offset {
            if o.iter().any(|v| !v.is_finite()) {
                return Err("non-finite offset".to_string());
            }
        }

        if let Some(s) = scale {
            if s.iter().any(|v| !v.is_finite()) {
                return Err("non-finite scale".to_string());
            }
            if divides && s.iter().any(|&v| v == 0.0) {
                return Err("zero scale".to_string());
            }
        }

        Ok(())
    }
}

impl ScalarTransformer for ScalerParams {
    fn transform(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScoringError> {
        if let Some(width) = self.width() {
            if batch.ncols() != width {
                return Err(ScoringError::Scaler(format!(
                    "X has {} features, but scaler is expecting {} features as input",
                    batch.ncols(),
                    width
                )));
            }
        }

        let mut out = batch.to_owned();

        for mut row in out.rows_mut() {
            for (j, x) in row.iter_mut().enumerate() {
                *x = match self {
                    ScalerParams::Standard { mean, scale } => {
                        (*x - param(mean.as_deref(), j, 0.0)?) / param(scale.as_deref(), j, 1.0)?
                    }
                    ScalerParams::MinMax { min, scale } => {
                        *x * param(Some(scale.as_slice()), j, 1.0)? + param(Some(min.as_slice()), j, 0.0)?
                    }
                    ScalerParams::Robust { center, scale } => {
                        (*x - param(center.as_deref(), j, 0.0)?) / param(scale.as_deref(), j, 1.0)?
                    }
                };
            }
        }

        Ok(out)
    }
}

/// Parameter for column `j`; a missing vector means the identity default
fn param(values: Option<&[f64]>, j: usize, default: f64) -> Result<f64, ScoringError> {
    match values {
        None => Ok(default),
        Some(v) => v.get(j).copied().ok_or_else(|| {
            ScoringError::Scaler(format!(
                "scaler holds {} parameters, no value for column {}",
                v.len(),
                j
            ))
        }),
    }
}
