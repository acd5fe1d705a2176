//! Fitted standard scaler

use crate::error::ModelError;
use serde::Deserialize;

/// Per-feature standardization learned at training time: `(x - mean) / scale`.
///
/// `scale` is the standard deviation. Zero entries (constant training
/// columns) behave as 1 so the transform stays finite.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    /// Column names the scaler was fit on, when the export recorded them
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ModelError> {
        let scaler = Self {
            mean,
            scale,
            feature_names: None,
        };
        scaler.check()?;
        Ok(scaler)
    }

    /// Parse the JSON export and check its parameters.
    pub fn from_json(bytes: &[u8], path: &str) -> Result<Self, ModelError> {
        let scaler: Self = serde_json::from_slice(bytes).map_err(|source| ModelError::Parse {
            path: path.to_string(),
            source,
        })?;
        scaler.check()?;
        Ok(scaler)
    }

    fn check(&self) -> Result<(), ModelError> {
        if self.mean.is_empty() {
            return Err(ModelError::invalid("scaler has no features"));
        }
        if self.mean.len() != self.scale.len() {
            return Err(ModelError::DimensionMismatch {
                stage: "scaler parameters",
                expected: self.mean.len(),
                actual: self.scale.len(),
            });
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::invalid("scaler parameters must be finite"));
        }
        if self.scale.iter().any(|&s| s < 0.0) {
            return Err(ModelError::invalid("scaler scale must be non-negative"));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.mean.len() {
                return Err(ModelError::DimensionMismatch {
                    stage: "scaler feature names",
                    expected: self.mean.len(),
                    actual: names.len(),
                });
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Standardize a feature vector. No refitting.
    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>, ModelError> {
        if features.len() != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                stage: "scaler",
                expected: self.n_features(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&mean, &scale))| {
                let scale = if scale == 0.0 { 1.0 } else { scale };
                ((x as f64 - mean) / scale) as f32
            })
            .collect())
    }
}
