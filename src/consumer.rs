//! NATS consumer for incoming prediction requests

use anyhow::Result;
use async_nats::{Client, Subscriber};
use serde_json::Value;
use tracing::info;

/// Consumer for receiving prediction requests from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
}

impl RequestConsumer {
    /// Create a new request consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to prediction request subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decoded request payload.
///
/// A JSON object with a `customers` array is a batch; any other JSON value
/// is a single customer record and is validated downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    Single(Value),
    Batch(Vec<Value>),
}

impl PredictionRequest {
    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(payload)?;

        if let Value::Object(mut obj) = value {
            if let Some(Value::Array(_)) = obj.get("customers") {
                if let Some(Value::Array(customers)) = obj.remove("customers") {
                    return Ok(PredictionRequest::Batch(customers));
                }
            }
            return Ok(PredictionRequest::Single(Value::Object(obj)));
        }

        Ok(PredictionRequest::Single(value))
    }

    pub fn len(&self) -> usize {
        match self {
            PredictionRequest::Single(_) => 1,
            PredictionRequest::Batch(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `customer_id` of a raw record, if it carries one.
pub fn customer_id(record: &Value) -> Option<String> {
    match record.get("customer_id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_payload() {
        let payload = br#"{"customer_id": "7590-VHVEG", "tenure": 1}"#;
        let request = PredictionRequest::from_payload(payload).unwrap();

        match &request {
            PredictionRequest::Single(record) => {
                assert_eq!(customer_id(record), Some("7590-VHVEG".to_string()));
            }
            other => panic!("expected single request, got {:?}", other),
        }
        assert_eq!(request.len(), 1);
    }

    #[test]
    fn test_batch_payload() {
        let payload = br#"{"customers": [{"tenure": 1}, {"tenure": 2}, {"tenure": 3}]}"#;
        let request = PredictionRequest::from_payload(payload).unwrap();

        assert_eq!(
            request,
            PredictionRequest::Batch(vec![
                json!({"tenure": 1}),
                json!({"tenure": 2}),
                json!({"tenure": 3})
            ])
        );
    }

    #[test]
    fn test_customers_field_that_is_not_a_list() {
        let request = PredictionRequest::from_payload(br#"{"customers": 3}"#).unwrap();
        assert!(matches!(request, PredictionRequest::Single(_)));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(PredictionRequest::from_payload(b"{not json").is_err());
    }
}
