//! Prediction result data structures

use crate::error::PredictError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Probability above which a customer is predicted to churn.
pub const CHURN_THRESHOLD: f64 = 0.5;

/// Binary churn decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChurnLabel {
    Yes,
    No,
}

impl ChurnLabel {
    /// Strictly greater than the threshold; 0.5 itself is "No".
    pub fn from_probability(probability: f64) -> Self {
        if probability > CHURN_THRESHOLD {
            ChurnLabel::Yes
        } else {
            ChurnLabel::No
        }
    }
}

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower bound of each tier is inclusive.
    pub fn from_probability(probability: f64, thresholds: &RiskLevelThresholds) -> Self {
        if probability >= thresholds.high {
            RiskLevel::High
        } else if probability >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// Configurable risk level thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 0.4,
            high: 0.7,
        }
    }
}

/// Discrete decision derived from a churn probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub prediction: ChurnLabel,
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

impl Classification {
    pub fn from_probability(probability: f64, thresholds: &RiskLevelThresholds) -> Self {
        Self {
            prediction: ChurnLabel::from_probability(probability),
            risk_level: RiskLevel::from_probability(probability, thresholds),
            confidence: confidence(probability),
        }
    }
}

/// Distance of the decision from a coin flip, symmetric in `p` and `1 - p`.
pub fn confidence(probability: f64) -> f64 {
    probability.max(1.0 - probability)
}

/// Result of a single churn prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Probability of the churn="Yes" class (0.0 - 1.0)
    pub churn_probability: f64,

    pub churn_prediction: ChurnLabel,

    pub risk_level: RiskLevel,

    /// max(p, 1 - p)
    pub confidence: f64,

    /// Generation timestamp
    pub prediction_date: DateTime<Utc>,
}

impl PredictionResult {
    pub fn new(churn_probability: f64, classification: Classification) -> Self {
        Self {
            churn_probability,
            churn_prediction: classification.prediction,
            risk_level: classification.risk_level,
            confidence: classification.confidence,
            prediction_date: Utc::now(),
        }
    }
}

/// Error entry standing in for a failed record in a batch.
///
/// Serializes with explicit nulls so batch items share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub error: String,
    pub churn_probability: Option<f64>,
    pub churn_prediction: Option<ChurnLabel>,
    pub risk_level: Option<RiskLevel>,
    /// Rejected by input validation rather than by the model
    #[serde(skip)]
    pub is_validation: bool,
}

impl PredictionFailure {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
            churn_probability: None,
            churn_prediction: None,
            risk_level: None,
            is_validation: false,
        }
    }

    pub fn from_error(error: &PredictError) -> Self {
        Self {
            is_validation: error.is_validation(),
            ..Self::new(error)
        }
    }
}

/// One position of a batch response, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Failed(PredictionFailure),
    Predicted(PredictionResult),
}

impl BatchEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, BatchEntry::Failed(_))
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            BatchEntry::Predicted(result) => Some(result),
            BatchEntry::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(p: f64) -> Classification {
        Classification::from_probability(p, &RiskLevelThresholds::default())
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(classify(0.69).risk_level, RiskLevel::Medium);
        assert_eq!(classify(0.70).risk_level, RiskLevel::High);
        assert_eq!(classify(0.39).risk_level, RiskLevel::Low);
        assert_eq!(classify(0.40).risk_level, RiskLevel::Medium);
        assert_eq!(classify(1.0).risk_level, RiskLevel::High);
        assert_eq!(classify(0.0).risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_prediction_threshold_is_strict() {
        assert_eq!(classify(0.5).prediction, ChurnLabel::No);
        assert_eq!(classify(0.51).prediction, ChurnLabel::Yes);
    }

    #[test]
    fn test_confidence_symmetry() {
        for i in 0..=100 {
            let p = i as f64 / 100.0;
            assert!((confidence(p) - confidence(1.0 - p)).abs() < 1e-12);
            assert!(confidence(p) >= 0.5);
        }
        assert!((confidence(0.8) - 0.8).abs() < 1e-12);
        assert!((confidence(0.2) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_result_serialization() {
        let result = PredictionResult::new(0.82, classify(0.82));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["churn_prediction"], "Yes");
        assert_eq!(json["risk_level"], "HIGH");
        assert!(json["prediction_date"].is_string());
    }

    #[test]
    fn test_failure_entry_serializes_nulls() {
        let entry = BatchEntry::Failed(PredictionFailure::new("missing required field `tenure`"));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["error"], "missing required field `tenure`");
        assert!(json["churn_probability"].is_null());
        assert!(json["risk_level"].is_null());
        assert!(entry.is_error());
    }

    #[test]
    fn test_batch_entry_round_trip_keeps_variant() {
        let entry = BatchEntry::Predicted(PredictionResult::new(0.3, classify(0.3)));
        let json = serde_json::to_string(&entry).unwrap();
        let back: BatchEntry = serde_json::from_str(&json).unwrap();
        assert!(!back.is_error());
        assert_eq!(back.prediction().unwrap().risk_level, RiskLevel::Low);
    }
}
