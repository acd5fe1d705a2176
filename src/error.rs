//! Error types for churn prediction

/// Input record failed boundary validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("record must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Artifacts are unusable or inconsistent with each other.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact: {details}")]
    InvalidArtifact { details: String },

    #[error("dimension mismatch in {stage}: expected {expected}, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("inference failed: {details}")]
    Inference { details: String },
}

impl ModelError {
    pub fn invalid(details: impl Into<String>) -> Self {
        ModelError::InvalidArtifact {
            details: details.into(),
        }
    }

    pub fn inference(details: impl std::fmt::Display) -> Self {
        ModelError::Inference {
            details: details.to_string(),
        }
    }
}

/// Failure of a single prediction.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl PredictError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PredictError::Validation(_))
    }
}
