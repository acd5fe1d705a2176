//! Trained model artifacts and churn inference

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod onnx;
pub mod scaler;

pub use classifier::{ChurnClassifier, LogisticClassifier};
pub use inference::ChurnPredictor;
pub use loader::{ArtifactLoader, ModelArtifacts};
pub use onnx::OnnxClassifier;
pub use scaler::StandardScaler;
