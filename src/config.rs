//! Configuration management for the churn inference service

use crate::types::prediction::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Format of the serialized classifier artifact
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// ONNX export of the trained estimator, run through ONNX Runtime
    #[default]
    Onnx,
    /// JSON coefficients of a logistic regression
    Logistic,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming prediction requests
    pub request_subject: String,
    /// Subject for results of requests without a reply subject
    pub result_subject: String,
}

/// Trained model artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory the relative artifact paths are resolved against
    pub dir: String,
    #[serde(default)]
    pub model_kind: ModelKind,
    /// Classifier file (`.onnx` or logistic `.json`)
    pub model_file: String,
    /// Fitted standard scaler parameters
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,
    /// Canonical ordered feature-name list
    #[serde(default = "default_feature_names_file")]
    pub feature_names_file: String,
    /// Intra-op threads for ONNX inference
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_feature_names_file() -> String {
    "feature_names.json".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl ArtifactsConfig {
    pub fn model_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.model_file)
    }

    pub fn scaler_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.scaler_file)
    }

    pub fn feature_names_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.feature_names_file)
    }
}

/// Input domain limits applied before encoding
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    pub max_tenure: u32,
    pub max_monthly_charges: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_tenure: 100,
            max_monthly_charges: 200.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub risk_levels: RiskLevelThresholds,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, overlaid with `CHURN__*` env vars
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CHURN").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "churn.predict".to_string(),
                result_subject: "churn.predictions".to_string(),
            },
            artifacts: ArtifactsConfig {
                dir: "models".to_string(),
                model_kind: ModelKind::Onnx,
                model_file: "churn_model_rf.onnx".to_string(),
                scaler_file: default_scaler_file(),
                feature_names_file: default_feature_names_file(),
                onnx_threads: 1,
            },
            validation: ValidationConfig::default(),
            classification: ClassificationConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.request_subject, "churn.predict");
        assert_eq!(config.artifacts.model_kind, ModelKind::Onnx);
        assert_eq!(config.validation.max_tenure, 100);
        assert_eq!(config.classification.risk_levels.high, 0.7);
        assert_eq!(config.classification.risk_levels.medium, 0.4);
    }

    #[test]
    fn test_artifact_paths() {
        let config = AppConfig::default();
        assert_eq!(
            config.artifacts.scaler_path(),
            Path::new("models").join("scaler.json")
        );
        assert_eq!(
            config.artifacts.model_path(),
            Path::new("models").join("churn_model_rf.onnx")
        );
    }

    #[test]
    fn test_load_minimal_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[nats]
url = "nats://broker:4222"
request_subject = "req"
result_subject = "res"

[artifacts]
dir = "/srv/models"
model_kind = "logistic"
model_file = "logistic.json"

[pipeline]
workers = 2

[logging]
level = "debug"
format = "pretty"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.nats.url, "nats://broker:4222");
        assert_eq!(config.artifacts.model_kind, ModelKind::Logistic);
        assert_eq!(config.artifacts.feature_names_file, "feature_names.json");
        assert_eq!(config.pipeline.metrics_interval_secs, 30);
        assert_eq!(config.validation.max_monthly_charges, 200.0);
    }
}
