//! Turns decoded requests into responses and records their outcome

use crate::consumer::{customer_id, PredictionRequest};
use crate::metrics::PipelineMetrics;
use crate::models::inference::ChurnPredictor;
use crate::producer::PredictionResponse;
use crate::types::prediction::{BatchEntry, PredictionFailure};
use tracing::{error, warn};

/// Run a request through the predictor.
pub fn handle_request(
    predictor: &ChurnPredictor,
    metrics: &PipelineMetrics,
    request: PredictionRequest,
) -> PredictionResponse {
    match request {
        PredictionRequest::Single(record) => {
            let customer_id = customer_id(&record);
            let entry = match predictor.predict_single(&record) {
                Ok(result) => {
                    metrics.record_prediction(&result);
                    BatchEntry::Predicted(result)
                }
                Err(e) => {
                    metrics.record_failure(e.is_validation());
                    warn!(customer_id = ?customer_id, error = %e, "Prediction rejected");
                    BatchEntry::Failed(PredictionFailure::from_error(&e))
                }
            };
            PredictionResponse::single(customer_id, entry)
        }
        PredictionRequest::Batch(records) => match predictor.predict_batch(&records) {
            Ok(entries) => {
                for entry in &entries {
                    match entry {
                        BatchEntry::Predicted(result) => metrics.record_prediction(result),
                        BatchEntry::Failed(failure) => metrics.record_failure(failure.is_validation),
                    }
                }
                PredictionResponse::batch(entries)
            }
            Err(e) => {
                for _ in &records {
                    metrics.record_failure(false);
                }
                error!(records = records.len(), error = %e, "Batch failed on every record");
                PredictionResponse::rejected(e)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::feature_extractor::FeatureSchema;
    use crate::models::classifier::LogisticClassifier;
    use crate::models::loader::ModelArtifacts;
    use crate::models::scaler::StandardScaler;
    use crate::types::prediction::RiskLevelThresholds;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn predictor() -> ChurnPredictor {
        let names: Vec<String> = ["tenure", "MonthlyCharges", "Contract_Two year"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let artifacts = ModelArtifacts {
            classifier: Arc::new(LogisticClassifier::new(vec![-1.0, 0.5, -1.0], 0.0).unwrap()),
            scaler: StandardScaler::new(vec![30.0, 65.0, 0.25], vec![24.0, 30.0, 0.43]).unwrap(),
            schema: FeatureSchema::new(names).unwrap(),
        };
        ChurnPredictor::from_artifacts(
            artifacts,
            ValidationConfig::default(),
            RiskLevelThresholds::default(),
        )
        .unwrap()
    }

    fn customer(id: &str, tenure: u32) -> serde_json::Value {
        json!({
            "customer_id": id,
            "tenure": tenure,
            "Contract": "Month-to-month",
            "InternetService": "DSL",
            "TechSupport": "No",
            "PaymentMethod": "Mailed check",
            "PaperlessBilling": "No",
            "MonthlyCharges": 40.0
        })
    }

    #[test]
    fn test_single_request() {
        let metrics = PipelineMetrics::new();
        let response = handle_request(
            &predictor(),
            &metrics,
            PredictionRequest::Single(customer("C-1", 3)),
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["customer_id"], "C-1");
        assert!(json["churn_probability"].is_number());
        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_single_invalid_request() {
        let metrics = PipelineMetrics::new();
        let response = handle_request(
            &predictor(),
            &metrics,
            PredictionRequest::Single(json!({ "customer_id": "C-2" })),
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["customer_id"], "C-2");
        assert!(json["error"].as_str().unwrap().contains("tenure"));
        assert!(json["churn_probability"].is_null());
        assert_eq!(metrics.validation_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_batch_request() {
        let metrics = PipelineMetrics::new();
        let request = PredictionRequest::Batch(vec![
            customer("C-1", 3),
            json!({ "tenure": -4 }),
            customer("C-3", 70),
        ]);
        let response = handle_request(&predictor(), &metrics, request);
        let json = serde_json::to_value(&response).unwrap();
        let predictions = json["predictions"].as_array().unwrap();

        assert_eq!(predictions.len(), 3);
        assert!(predictions[1]["error"].is_string());
        assert!(
            predictions[0]["churn_probability"].as_f64().unwrap()
                > predictions[2]["churn_probability"].as_f64().unwrap()
        );
        assert_eq!(metrics.predictions.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.validation_failures.load(Ordering::Relaxed), 1);
    }
}
