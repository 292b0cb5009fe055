//! Classifier - ONNX Runtime Integration
//!
//! The fraud model is a binary classifier exported to ONNX. Callers only see
//! the [`Classifier`] capability so the runtime can be swapped out.

use std::path::Path;

use ndarray::{Array2, ArrayView2};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DynMapValueType, DynSequenceValueType, DynValue, Tensor, TensorElementType, ValueType};
use parking_lot::Mutex;

use super::pipeline::FEATURE_COUNT;
use super::ScoringError;

/// Capability: given a batch of N feature rows, return an `N x C` matrix of
/// class probabilities. Column 1 is the positive ("fraud") class.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScoringError>;

    /// Short human-readable name for logs
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Binary classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    name: String,
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load an ONNX model from file.
    ///
    /// The first model input must be a float32 tensor whose last dimension
    /// is the feature width (or dynamic).
    pub fn load(path: &Path, intra_threads: usize) -> Result<Self, String> {
        tracing::info!(path = %path.display(), threads = intra_threads, "Loading ONNX model");

        let environment = ort::init()
            .with_name("fraud-scoring")
            .build()
            .map_err(|e| format!("Failed to create ONNX environment: {}", e))?;

        let session = Session::builder(&environment)
            .map_err(|e| format!("Failed to create session builder: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| format!("Failed to set optimization: {}", e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| format!("Failed to set threads: {}", e))?
            .commit_from_file(path)
            .map_err(|e| format!("Failed to load model: {}", e))?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| "Model declares no inputs".to_string())?;
        check_input(input.dtype()).map_err(|reason| format!("Input '{}' {}", input.name(), reason))?;
        let input_name = input.name().to_string();

        let output_names: Vec<&str> = session.outputs().iter().map(|o| o.name()).collect();
        let output_name = select_output(&output_names)
            .map(str::to_string)
            .ok_or_else(|| "Model declares no probability output".to_string())?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        tracing::info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "ONNX model loaded"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    fn run(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScoringError> {
        let (rows, cols) = batch.dim();

        let data = to_input_values(batch)?;
        let shape = vec![rows as i64, cols as i64];
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| ScoringError::Classifier(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ScoringError::Classifier(format!("Inference failed: {}", e)))?;

        self.extract_probabilities(&outputs, rows)
    }

    /// Handles both plain probability tensors and the `seq(map(int64, float))`
    /// "zipmap" output some exporters emit.
    fn extract_probabilities(
        &self,
        outputs: &SessionOutputs<'_>,
        rows: usize,
    ) -> Result<Array2<f64>, ScoringError> {
        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            ScoringError::Classifier(format!("Missing output '{}'", self.output_name))
        })?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            return probabilities_from_tensor(shape, data, rows);
        }

        if output.dtype().is_sequence() {
            return probabilities_from_sequence(output, rows);
        }

        Err(ScoringError::Classifier(format!(
            "Unsupported output type {} for '{}'",
            output.dtype(),
            self.output_name
        )))
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>, ScoringError> {
        self.run(batch)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// skl2onnx exports `FloatTensorType` inputs, `[N, width]` with N dynamic
fn check_input(dtype: &ValueType) -> Result<(), String> {
    match dtype {
        ValueType::Tensor {
            ty: TensorElementType::Float32,
            shape,
            ..
        } => match shape[..] {
            [_, width] if width < 0 || width == FEATURE_COUNT as i64 => Ok(()),
            _ => Err(format!(
                "has shape {:?}, expected [N, {}]",
                &shape[..],
                FEATURE_COUNT
            )),
        },
        other => Err(format!("has type {}, expected a float32 tensor", other)),
    }
}

/// skl2onnx names it "probabilities"; "label" is never what we want
fn select_output<'a>(names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .find(|n| n.contains("prob"))
        .or_else(|| names.iter().rev().find(|n| !n.contains("label")))
        .copied()
}

/// Narrow the batch to f32. Values beyond the f32 range would become
/// infinities, so they are rejected instead.
fn to_input_values(batch: ArrayView2<'_, f64>) -> Result<Vec<f32>, ScoringError> {
    batch
        .indexed_iter()
        .map(|((_, column), &value)| {
            let narrowed = value as f32;
            if narrowed.is_finite() {
                Ok(narrowed)
            } else {
                Err(ScoringError::Classifier(format!(
                    "Input contains infinity or a value too large for float32 at column {} ({})",
                    column, value
                )))
            }
        })
        .collect()
}

/// `[N, C]` or `[N]` tensors. A single column is the positive-class probability.
fn probabilities_from_tensor(
    dims: &[i64],
    data: &[f32],
    rows: usize,
) -> Result<Array2<f64>, ScoringError> {
    let classes = match dims {
        [n, c] if *n as usize == rows => *c as usize,
        [n] if *n as usize == rows => 1,
        _ => {
            return Err(ScoringError::Shape(format!(
                "unexpected probability shape {:?} for {} rows",
                dims, rows
            )))
        }
    };

    if data.len() != rows * classes {
        return Err(ScoringError::Shape(format!(
            "probability tensor holds {} values, expected {}",
            data.len(),
            rows * classes
        )));
    }

    if classes == 1 {
        return Ok(Array2::from_shape_fn((rows, 2), |(i, j)| {
            let p = data[i] as f64;
            if j == 1 { p } else { 1.0 - p }
        }));
    }

    Array2::from_shape_vec((rows, classes), data.iter().map(|&v| v as f64).collect())
        .map_err(|e| ScoringError::Shape(format!("Array error: {}", e)))
}

fn probabilities_from_sequence(output: &DynValue, rows: usize) -> Result<Array2<f64>, ScoringError> {
    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| ScoringError::Classifier(format!("Failed to downcast to sequence: {}", e)))?;

    let maps = sequence
        .try_extract_sequence::<DynMapValueType>()
        .map_err(|e| ScoringError::Classifier(format!("Failed to read sequence: {}", e)))?;

    if maps.len() != rows {
        return Err(ScoringError::Shape(format!(
            "sequence holds {} entries, expected {}",
            maps.len(),
            rows
        )));
    }

    let mut proba = Array2::<f64>::zeros((rows, 2));
    for (i, map_value) in maps.iter().enumerate() {
        let kv_pairs = map_value
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| ScoringError::Classifier(format!("Failed to read class map: {}", e)))?;

        let mut found = false;
        for (class_id, prob) in &kv_pairs {
            if (0..2).contains(class_id) {
                proba[[i, *class_id as usize]] = *prob as f64;
                found = true;
            }
        }
        if !found {
            return Err(ScoringError::Classifier("No probability found in map".to_string()));
        }
    }

    Ok(proba)
}
