//! ONNX Runtime classifier

use crate::error::ModelError;
use crate::models::classifier::ChurnClassifier;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Trained estimator exported to ONNX.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex.
/// Everything else is read-only after load.
pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    n_features: Option<usize>,
}

impl OnnxClassifier {
    /// Initialise ONNX Runtime and load a model file.
    pub fn load<P: AsRef<Path>>(path: P, name: &str, threads: usize) -> Result<Self, ModelError> {
        let path = path.as_ref();

        ort::init().commit().map_err(ModelError::inference)?;
        info!(model = %name, path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| {
                ModelError::invalid(format!("failed to load model from {}: {}", path.display(), e))
            })?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| ModelError::invalid("ONNX model has no inputs"))?;
        let input_name = input.name.clone();
        let n_features = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.last().copied())
            .filter(|&dim| dim > 0)
            .map(|dim| dim as usize);

        // Classifier exports emit a label output and a probability output
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            n_features = ?n_features,
            "Model loaded successfully"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features,
        })
    }
}

impl ChurnClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_proba(&self, features: &[f32]) -> Result<f64, ModelError> {
        if let Some(expected) = self.n_features {
            if features.len() != expected {
                return Err(ModelError::DimensionMismatch {
                    stage: "classifier",
                    expected,
                    actual: features.len(),
                });
            }
        }

        // Shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, features.to_vec())).map_err(ModelError::inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::inference(format!("session lock poisoned: {}", e)))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(ModelError::inference)?;

        extract_probability(&outputs, &self.output_name, &self.name)
    }
}

/// Read the churn-class probability from model outputs.
///
/// Handles tensor outputs (random forest, gradient boosting) and
/// seq(map(int64, float)) outputs (sklearn-onnx `zipmap`).
fn extract_probability(
    outputs: &SessionOutputs,
    output_name: &str,
    model_name: &str,
) -> Result<f64, ModelError> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(prob) = try_extract(&output, model_name) {
            return Ok(prob);
        }
    }

    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(prob) = try_extract(&output, model_name) {
            debug!(model = %model_name, output = %name, "Probability read from fallback output");
            return Ok(prob);
        }
    }

    warn!(model = %model_name, "No probability output found");
    Err(ModelError::inference(format!(
        "model {} produced no readable probability output",
        model_name
    )))
}

fn try_extract(output: &DynValue, model_name: &str) -> Option<f64> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return positive_class_from_tensor(&dims, data);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        match positive_class_from_sequence_map(output) {
            Ok(prob) => return Some(prob),
            Err(e) => debug!(model = %model_name, error = %e, "seq(map) extraction failed"),
        }
    }

    None
}

/// Probability of class 1 from a `[batch, classes]` or `[classes]` tensor.
fn positive_class_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = match dims {
        [_, classes] | [classes] => *classes,
        _ => return data.last().map(|&v| v as f64),
    };

    match classes {
        c if c >= 2 => data.get(1).map(|&v| v as f64),
        1 => data.first().map(|&v| v as f64),
        _ => None,
    }
}

fn positive_class_from_sequence_map(output: &DynValue) -> Result<f64, ModelError> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(ModelError::inference)?;
    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(ModelError::inference)?;

    let first = maps
        .first()
        .ok_or_else(|| ModelError::inference("empty probability sequence"))?;
    let pairs = first
        .try_extract_key_values::<i64, f32>()
        .map_err(ModelError::inference)?;

    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - *prob as f64);
    }

    Err(ModelError::inference("no class probability in map"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_two_classes() {
        let prob = positive_class_from_tensor(&[1, 2], &[0.3, 0.7]);
        assert_eq!(prob, Some(0.7f32 as f64));
    }

    #[test]
    fn test_tensor_single_column() {
        let prob = positive_class_from_tensor(&[1, 1], &[0.25]);
        assert_eq!(prob, Some(0.25));
    }

    #[test]
    fn test_tensor_flat() {
        assert_eq!(positive_class_from_tensor(&[2], &[0.6, 0.4]), Some(0.4f32 as f64));
        assert_eq!(positive_class_from_tensor(&[1, 0], &[]), None);
    }
}
