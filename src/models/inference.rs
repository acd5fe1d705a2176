//! Churn inference: alignment, scaling, prediction and risk classification

use crate::config::{AppConfig, ValidationConfig};
use crate::error::{ModelError, PredictError, ValidationError};
use crate::feature_extractor::{FeatureEncoder, FeatureSchema};
use crate::models::classifier::ChurnClassifier;
use crate::models::loader::{ArtifactLoader, ModelArtifacts};
use crate::models::scaler::StandardScaler;
use crate::types::customer::CustomerProfile;
use crate::types::prediction::{
    BatchEntry, Classification, PredictionFailure, PredictionResult, RiskLevelThresholds,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Churn predictor over immutable, eagerly loaded artifacts.
///
/// Constructed once at startup and shared by reference (usually behind an
/// `Arc`) with every request handler. Nothing is mutated after construction.
pub struct ChurnPredictor {
    classifier: Arc<dyn ChurnClassifier>,
    scaler: StandardScaler,
    schema: FeatureSchema,
    encoder: FeatureEncoder,
    risk_levels: RiskLevelThresholds,
}

impl ChurnPredictor {
    /// Load artifacts from configuration and check they agree.
    pub fn new(config: &AppConfig) -> Result<Self, ModelError> {
        let artifacts = ArtifactLoader::new(config.artifacts.clone()).load()?;
        Self::from_artifacts(
            artifacts,
            config.validation.clone(),
            config.classification.risk_levels.clone(),
        )
    }

    /// Assemble a predictor from already loaded artifacts.
    ///
    /// Fails when scaler or classifier width differs from the feature list,
    /// or when the scaler was fit on differently named columns.
    pub fn from_artifacts(
        artifacts: ModelArtifacts,
        validation: ValidationConfig,
        risk_levels: RiskLevelThresholds,
    ) -> Result<Self, ModelError> {
        let ModelArtifacts {
            classifier,
            scaler,
            schema,
        } = artifacts;

        if scaler.n_features() != schema.len() {
            return Err(ModelError::DimensionMismatch {
                stage: "scaler",
                expected: schema.len(),
                actual: scaler.n_features(),
            });
        }
        if let Some(names) = scaler.feature_names() {
            if names != schema.names() {
                return Err(ModelError::invalid(
                    "scaler feature names differ from the canonical feature list",
                ));
            }
        }
        if let Some(width) = classifier.n_features() {
            if width != schema.len() {
                return Err(ModelError::DimensionMismatch {
                    stage: "classifier",
                    expected: schema.len(),
                    actual: width,
                });
            }
        }

        let unrecognized = schema.unrecognized_features();
        if !unrecognized.is_empty() {
            warn!(
                features = ?unrecognized,
                "Canonical features the encoder never produces; they will always be zero"
            );
        }

        info!(
            model = %classifier.name(),
            features = schema.len(),
            "Churn predictor initialized"
        );

        Ok(Self {
            classifier,
            scaler,
            schema,
            encoder: FeatureEncoder::new(validation),
            risk_levels,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    /// Validate a raw record and align it to the canonical feature order.
    pub fn align_features(&self, record: &Value) -> Result<Vec<f32>, ValidationError> {
        self.encoder.align_features(record, &self.schema)
    }

    /// Apply the fitted scaler.
    pub fn scale(&self, features: &[f32]) -> Result<Vec<f32>, ModelError> {
        self.scaler.transform(features)
    }

    /// Churn probability for a scaled vector.
    pub fn predict_proba(&self, scaled: &[f32]) -> Result<f64, ModelError> {
        let probability = self.classifier.predict_proba(scaled)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ModelError::inference(format!(
                "classifier returned probability {} outside [0, 1]",
                probability
            )));
        }
        Ok(probability)
    }

    pub fn classify(&self, probability: f64) -> Classification {
        Classification::from_probability(probability, &self.risk_levels)
    }

    /// Predict churn for a single raw customer record.
    pub fn predict_single(&self, record: &Value) -> Result<PredictionResult, PredictError> {
        let profile = self.encoder.validate(record)?;
        Ok(self.predict_profile(&profile)?)
    }

    /// Predict churn for an already validated profile.
    pub fn predict_profile(
        &self,
        profile: &CustomerProfile,
    ) -> Result<PredictionResult, ModelError> {
        let encoded = self.encoder.encode(profile);

        let dropped = self.schema.dropped_columns(&encoded);
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "Encoded columns not in the model schema");
        }

        let features = self.schema.align(&encoded);
        let scaled = self.scale(&features)?;
        let probability = self.predict_proba(&scaled)?;
        let classification = self.classify(probability);

        debug!(
            customer_id = ?profile.customer_id,
            churn_probability = probability,
            risk_level = classification.risk_level.as_str(),
            "Prediction complete"
        );

        Ok(PredictionResult::new(probability, classification))
    }

    /// Predict each record independently, preserving input order.
    ///
    /// A failing record becomes an error entry. The call itself fails only
    /// when every record failed on the model side, which means the artifacts
    /// are unusable.
    pub fn predict_batch(&self, records: &[Value]) -> Result<Vec<BatchEntry>, ModelError> {
        let mut entries = Vec::with_capacity(records.len());
        let mut first_model_error = None;
        let mut model_failures = 0;

        for (position, record) in records.iter().enumerate() {
            match self.predict_single(record) {
                Ok(result) => entries.push(BatchEntry::Predicted(result)),
                Err(e) => {
                    error!(position = position, error = %e, "Batch prediction error for customer");
                    entries.push(BatchEntry::Failed(PredictionFailure::from_error(&e)));
                    if let PredictError::Model(model_error) = e {
                        model_failures += 1;
                        first_model_error.get_or_insert(model_error);
                    }
                }
            }
        }

        if !records.is_empty() && model_failures == records.len() {
            if let Some(e) = first_model_error {
                return Err(e);
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::tests::telco_feature_names;
    use crate::models::classifier::LogisticClassifier;
    use crate::types::prediction::{ChurnLabel, RiskLevel};
    use serde_json::json;

    /// Logistic weights with the known direction of the Telco churn drivers.
    fn weight(name: &str) -> f64 {
        match name {
            "tenure" => -0.9,
            "MonthlyCharges" => 0.6,
            "SeniorCitizen" => 0.2,
            "InternetService_Fiber optic" => 0.7,
            "TechSupport_Yes" => -0.4,
            "Contract_One year" => -0.5,
            "Contract_Two year" => -1.0,
            "PaperlessBilling_Yes" => 0.3,
            "PaymentMethod_Electronic check" => 0.4,
            "MultipleLines_Yes" => 0.1,
            "TenureBucket_48m+" => -0.3,
            _ => 0.0,
        }
    }

    fn artifacts() -> ModelArtifacts {
        let names = telco_feature_names();
        let mean: Vec<f64> = names
            .iter()
            .map(|n| match n.as_str() {
                "tenure" => 32.0,
                "MonthlyCharges" => 65.0,
                "TotalCharges" => 2280.0,
                _ => 0.3,
            })
            .collect();
        let scale: Vec<f64> = names
            .iter()
            .map(|n| match n.as_str() {
                "tenure" => 24.5,
                "MonthlyCharges" => 30.0,
                "TotalCharges" => 2266.0,
                _ => 0.45,
            })
            .collect();
        let coefficients = names.iter().map(|n| weight(n)).collect();

        ModelArtifacts {
            classifier: Arc::new(LogisticClassifier::new(coefficients, -1.2).unwrap()),
            scaler: StandardScaler::new(mean, scale).unwrap(),
            schema: FeatureSchema::new(names).unwrap(),
        }
    }

    fn predictor() -> ChurnPredictor {
        ChurnPredictor::from_artifacts(
            artifacts(),
            ValidationConfig::default(),
            RiskLevelThresholds::default(),
        )
        .unwrap()
    }

    fn high_risk() -> Value {
        json!({
            "tenure": 1,
            "Contract": "Month-to-month",
            "InternetService": "Fiber optic",
            "TechSupport": "No",
            "PaymentMethod": "Electronic check",
            "PaperlessBilling": "Yes",
            "MonthlyCharges": 100.0,
            "SeniorCitizen": 1,
            "MultipleLines": "Yes"
        })
    }

    fn low_risk() -> Value {
        json!({
            "tenure": 60,
            "Contract": "Two year",
            "InternetService": "DSL",
            "TechSupport": "Yes",
            "PaymentMethod": "Credit card (automatic)",
            "PaperlessBilling": "No",
            "MonthlyCharges": 50.0,
            "SeniorCitizen": 0,
            "MultipleLines": "No"
        })
    }

    #[test]
    fn test_predict_single_shape() {
        let result = predictor().predict_single(&high_risk()).unwrap();

        assert!((0.0..=1.0).contains(&result.churn_probability));
        assert!(result.confidence >= 0.5);
        assert_eq!(
            result.churn_prediction,
            ChurnLabel::from_probability(result.churn_probability)
        );
    }

    #[test]
    fn test_high_risk_exceeds_low_risk() {
        let predictor = predictor();
        let high = predictor.predict_single(&high_risk()).unwrap();
        let low = predictor.predict_single(&low_risk()).unwrap();

        assert!(high.churn_probability > low.churn_probability + 0.3);
        assert_eq!(high.risk_level, RiskLevel::High);
        assert_eq!(low.risk_level, RiskLevel::Low);
        assert_eq!(high.churn_prediction, ChurnLabel::Yes);
        assert_eq!(low.churn_prediction, ChurnLabel::No);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let predictor = predictor();
        let first = predictor.predict_single(&high_risk()).unwrap();
        let second = predictor.predict_single(&high_risk()).unwrap();
        assert_eq!(first.churn_probability, second.churn_probability);
    }

    #[test]
    fn test_validation_error_propagates() {
        let mut record = high_risk();
        record.as_object_mut().unwrap().remove("Contract");

        let err = predictor().predict_single(&record).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let predictor = predictor();
        let mut records = vec![high_risk(), low_risk(), high_risk(), low_risk()];
        records[2] = json!({ "tenure": "soon" });

        let entries = predictor.predict_batch(&records).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries.iter().filter(|e| e.is_error()).count(), 1);
        assert!(entries[2].is_error());

        let alone = predictor.predict_single(&low_risk()).unwrap();
        let in_batch = entries[1].prediction().unwrap();
        assert_eq!(in_batch.churn_probability, alone.churn_probability);
    }

    #[test]
    fn test_batch_of_invalid_records_still_returns_entries() {
        let records = vec![json!({}), json!([])];
        let entries = predictor().predict_batch(&records).unwrap();
        assert!(entries.iter().all(|e| e.is_error()));
    }

    #[test]
    fn test_empty_batch() {
        assert!(predictor().predict_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_scaler_width_mismatch_rejected() {
        let mut artifacts = artifacts();
        artifacts.scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).unwrap();

        let result = ChurnPredictor::from_artifacts(
            artifacts,
            ValidationConfig::default(),
            RiskLevelThresholds::default(),
        );
        assert!(matches!(
            result,
            Err(ModelError::DimensionMismatch { stage: "scaler", .. })
        ));
    }

    #[test]
    fn test_classifier_width_mismatch_rejected() {
        let mut artifacts = artifacts();
        artifacts.classifier = Arc::new(LogisticClassifier::new(vec![0.1; 5], 0.0).unwrap());

        let result = ChurnPredictor::from_artifacts(
            artifacts,
            ValidationConfig::default(),
            RiskLevelThresholds::default(),
        );
        assert!(matches!(
            result,
            Err(ModelError::DimensionMismatch { stage: "classifier", .. })
        ));
    }

    struct BrokenClassifier;

    impl ChurnClassifier for BrokenClassifier {
        fn name(&self) -> &str {
            "broken"
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn predict_proba(&self, _features: &[f32]) -> Result<f64, ModelError> {
            Err(ModelError::inference("session unavailable"))
        }
    }

    #[test]
    fn test_batch_fails_when_model_is_unusable() {
        let mut artifacts = artifacts();
        artifacts.classifier = Arc::new(BrokenClassifier);
        let predictor = ChurnPredictor::from_artifacts(
            artifacts,
            ValidationConfig::default(),
            RiskLevelThresholds::default(),
        )
        .unwrap();

        assert!(predictor.predict_batch(&[high_risk(), low_risk()]).is_err());

        // A validation failure in the mix keeps the batch call successful
        let entries = predictor
            .predict_batch(&[high_risk(), json!({})])
            .unwrap();
        assert!(entries.iter().all(|e| e.is_error()));
    }
}
