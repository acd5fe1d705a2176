//! Classifier seam and the logistic regression baseline

use crate::error::ModelError;
use serde::Deserialize;

/// A trained binary classifier over scaled feature vectors.
///
/// Implementations are immutable after load and shared across requests.
pub trait ChurnClassifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Input width the classifier was fit on, if the artifact records it
    fn n_features(&self) -> Option<usize>;

    /// Probability of the positive (churn) class
    fn predict_proba(&self, features: &[f32]) -> Result<f64, ModelError>;
}

/// Logistic regression exported as JSON coefficients.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticClassifier {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, ModelError> {
        let model = Self {
            coefficients,
            intercept,
        };
        model.check()?;
        Ok(model)
    }

    pub fn from_json(bytes: &[u8], path: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_slice(bytes).map_err(|source| ModelError::Parse {
            path: path.to_string(),
            source,
        })?;
        model.check()?;
        Ok(model)
    }

    fn check(&self) -> Result<(), ModelError> {
        if self.coefficients.is_empty() {
            return Err(ModelError::invalid("logistic model has no coefficients"));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::invalid("logistic coefficients must be finite"));
        }
        Ok(())
    }
}

impl ChurnClassifier for LogisticClassifier {
    fn name(&self) -> &str {
        "logistic"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn predict_proba(&self, features: &[f32]) -> Result<f64, ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                stage: "classifier",
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }

        let logit = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(&w, &x)| w * x as f64)
                .sum::<f64>();

        Ok(sigmoid(logit))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
