//! Type definitions for the churn inference service

pub mod customer;
pub mod prediction;

pub use customer::{CustomerProfile, TenureBucket};
pub use prediction::{BatchEntry, ChurnLabel, PredictionFailure, PredictionResult, RiskLevel};
