//! Churn Inference Library
//!
//! Serves a pre-trained customer churn classifier: raw customer records are
//! validated, one-hot encoded, aligned to the training schema, scaled and
//! scored, and the probability is mapped to a churn decision and risk level.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::{PredictionRequest, RequestConsumer};
pub use error::{ModelError, PredictError, ValidationError};
pub use feature_extractor::{FeatureEncoder, FeatureSchema};
pub use models::inference::ChurnPredictor;
pub use producer::{PredictionResponse, ResponsePublisher};
pub use types::{customer::CustomerProfile, prediction::PredictionResult};
