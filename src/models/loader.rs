//! Model artifact loader

use crate::config::{ArtifactsConfig, ModelKind};
use crate::error::ModelError;
use crate::feature_extractor::FeatureSchema;
use crate::models::classifier::{ChurnClassifier, LogisticClassifier};
use crate::models::onnx::OnnxClassifier;
use crate::models::scaler::StandardScaler;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The three artifacts written by the training run.
pub struct ModelArtifacts {
    pub classifier: Arc<dyn ChurnClassifier>,
    pub scaler: StandardScaler,
    pub schema: FeatureSchema,
}

/// Loader for trained model artifacts
pub struct ArtifactLoader {
    config: ArtifactsConfig,
}

impl ArtifactLoader {
    pub fn new(config: ArtifactsConfig) -> Self {
        Self { config }
    }

    /// Load classifier, scaler and feature list. Any failure is fatal.
    pub fn load(&self) -> Result<ModelArtifacts, ModelError> {
        let schema = load_feature_names(self.config.feature_names_path())?;
        info!(
            path = %self.config.feature_names_path().display(),
            features = schema.len(),
            "Feature names loaded"
        );

        let scaler_path = self.config.scaler_path();
        let scaler =
            StandardScaler::from_json(&read(&scaler_path)?, &scaler_path.display().to_string())?;
        info!(
            path = %scaler_path.display(),
            features = scaler.n_features(),
            "Scaler loaded"
        );

        let classifier = self.load_classifier()?;

        Ok(ModelArtifacts {
            classifier,
            scaler,
            schema,
        })
    }

    fn load_classifier(&self) -> Result<Arc<dyn ChurnClassifier>, ModelError> {
        let path = self.config.model_path();

        let classifier: Arc<dyn ChurnClassifier> = match self.config.model_kind {
            ModelKind::Onnx => Arc::new(OnnxClassifier::load(
                &path,
                "random_forest",
                self.config.onnx_threads,
            )?),
            ModelKind::Logistic => Arc::new(LogisticClassifier::from_json(
                &read(&path)?,
                &path.display().to_string(),
            )?),
        };

        info!(
            model = %classifier.name(),
            kind = ?self.config.model_kind,
            path = %path.display(),
            "Classifier loaded"
        );

        Ok(classifier)
    }
}

/// Read the canonical feature list (a JSON array of strings).
pub fn load_feature_names<P: AsRef<Path>>(path: P) -> Result<FeatureSchema, ModelError> {
    let path = path.as_ref();
    let names: Vec<String> =
        serde_json::from_slice(&read(path)?).map_err(|source| ModelError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    FeatureSchema::new(names)
}

fn read(path: &Path) -> Result<Vec<u8>, ModelError> {
    std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(dir: &Path) -> ArtifactsConfig {
        ArtifactsConfig {
            dir: dir.display().to_string(),
            model_kind: ModelKind::Logistic,
            model_file: "logistic.json".to_string(),
            scaler_file: "scaler.json".to_string(),
            feature_names_file: "feature_names.json".to_string(),
            onnx_threads: 1,
        }
    }

    #[test]
    fn test_load_logistic_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("feature_names.json"),
            r#"["tenure", "Contract_Two year"]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("scaler.json"),
            r#"{"mean": [30.0, 0.2], "scale": [20.0, 0.4]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("logistic.json"),
            r#"{"coefficients": [-0.8, -1.2], "intercept": -0.5}"#,
        )
        .unwrap();

        let artifacts = ArtifactLoader::new(config(dir.path())).load().unwrap();
        assert_eq!(artifacts.schema.len(), 2);
        assert_eq!(artifacts.scaler.n_features(), 2);
        assert_eq!(artifacts.classifier.name(), "logistic");
        assert_eq!(artifacts.classifier.n_features(), Some(2));
    }

    #[test]
    fn test_missing_file_is_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactLoader::new(config(dir.path())).load().err().unwrap();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn test_malformed_feature_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feature_names.json");
        fs::write(&path, r#"{"not": "a list"}"#).unwrap();
        assert!(matches!(load_feature_names(&path), Err(ModelError::Parse { .. })));
    }
}
