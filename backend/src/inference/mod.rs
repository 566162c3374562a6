pub mod artifacts;
pub mod config;
pub mod predictor;
pub mod preprocess;
pub mod registry;
pub mod vision;

pub use predictor::{ModelPredictor, Predictor, StubPredictor, build_predictor};
pub use preprocess::{FeatureVector, ImageSample};
pub use registry::{ModelRegistry, RegistryHandle};

use std::path::PathBuf;

/// Input rejected before it reaches a model.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid input: {}", .0.join("; "))]
    Fields(Vec<String>),
    #[error("Unsupported image: {0}")]
    Image(String),
}

impl ValidationError {
    pub fn details(&self) -> Vec<String> {
        match self {
            ValidationError::Fields(errors) => errors.clone(),
            ValidationError::Image(msg) => vec![msg.clone()],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Artifact not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt artifact {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Inconsistent artifacts: {0}")]
    Inconsistent(String),
    #[error("Image model backend unavailable: {0}")]
    BackendUnavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Unknown class index {0}")]
    UnknownClass(usize),
}
