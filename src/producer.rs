//! NATS producer for prediction responses

use crate::types::prediction::BatchEntry;
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Response published for one request message
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Result or error entry for a single customer
    Single {
        #[serde(skip_serializing_if = "Option::is_none")]
        customer_id: Option<String>,
        #[serde(flatten)]
        entry: BatchEntry,
    },
    /// Entries in input order
    Batch { predictions: Vec<BatchEntry> },
    /// The request as a whole could not be served
    Rejected { error: String },
}

impl PredictionResponse {
    pub fn single(customer_id: Option<String>, entry: BatchEntry) -> Self {
        Self::with_body(ResponseBody::Single { customer_id, entry })
    }

    pub fn batch(predictions: Vec<BatchEntry>) -> Self {
        Self::with_body(ResponseBody::Batch { predictions })
    }

    pub fn rejected(error: impl std::fmt::Display) -> Self {
        Self::with_body(ResponseBody::Rejected {
            error: error.to_string(),
        })
    }

    fn with_body(body: ResponseBody) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            body,
        }
    }
}

/// Publishes responses to the reply subject, or to the result subject
/// when the request carried none.
#[derive(Clone)]
pub struct ResponsePublisher {
    client: Client,
    subject: String,
}

impl ResponsePublisher {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    pub async fn publish(
        &self,
        reply: Option<Subject>,
        response: &PredictionResponse,
    ) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        let target = reply.unwrap_or_else(|| Subject::from(self.subject.as_str()));

        self.client.publish(target.clone(), payload.into()).await?;

        debug!(
            request_id = %response.request_id,
            subject = %target,
            "Published prediction response"
        );

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prediction::{
        Classification, PredictionFailure, PredictionResult, RiskLevelThresholds,
    };

    fn result(p: f64) -> BatchEntry {
        BatchEntry::Predicted(PredictionResult::new(
            p,
            Classification::from_probability(p, &RiskLevelThresholds::default()),
        ))
    }

    #[test]
    fn test_single_response_is_flat() {
        let response = PredictionResponse::single(Some("0001-A".to_string()), result(0.45));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["customer_id"], "0001-A");
        assert_eq!(json["risk_level"], "MEDIUM");
        assert_eq!(json["churn_prediction"], "No");
        assert!(json["request_id"].is_string());
    }

    #[test]
    fn test_batch_response_preserves_order() {
        let response = PredictionResponse::batch(vec![
            result(0.9),
            BatchEntry::Failed(PredictionFailure::new("missing required field `tenure`")),
            result(0.1),
        ]);
        let json = serde_json::to_value(&response).unwrap();
        let predictions = json["predictions"].as_array().unwrap();

        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0]["risk_level"], "HIGH");
        assert!(predictions[1]["churn_probability"].is_null());
        assert_eq!(predictions[2]["risk_level"], "LOW");
    }

    #[test]
    fn test_rejected_response() {
        let json = serde_json::to_value(PredictionResponse::rejected("bad payload")).unwrap();
        assert_eq!(json["error"], "bad payload");
    }
}
