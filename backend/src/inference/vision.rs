use ndarray::Array4;
use std::path::Path;

use super::{InferenceError, ModelLoadError};

/// Convolutional classifier over a preprocessed `[1, H, W, 3]` batch.
/// Returns one probability per class, in output-layer order.
pub trait ImageClassifier: Send + Sync {
    fn predict(&self, batch: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

#[cfg(feature = "torch")]
mod torch {
    use ndarray::Array4;
    use std::path::Path;
    use std::sync::Mutex;
    use tch::{CModule, Device, Kind, Tensor};

    use super::ImageClassifier;
    use crate::inference::{InferenceError, ModelLoadError};

    /// TorchScript export of the leaf classifier. The exported graph takes
    /// NCHW input and emits logits; softmax is applied here.
    pub struct TorchClassifier {
        model: Mutex<CModule>,
        device: Device,
    }

    impl TorchClassifier {
        pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
            let device = Device::cuda_if_available();
            let model = CModule::load_on_device(model_path, device).map_err(|e| {
                ModelLoadError::BackendUnavailable(format!(
                    "failed to load {}: {}",
                    model_path.display(),
                    e
                ))
            })?;
            log::info!("Loaded TorchScript model {} on {:?}", model_path.display(), device);
            Ok(Self {
                model: Mutex::new(model),
                device,
            })
        }
    }

    impl ImageClassifier for TorchClassifier {
        fn predict(&self, batch: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            let shape: Vec<i64> = batch.shape().iter().map(|d| *d as i64).collect();
            let data = batch.as_slice().ok_or_else(|| {
                InferenceError::Preprocessing("input batch is not contiguous".to_string())
            })?;
            let input = Tensor::from_slice(data)
                .reshape(shape.as_slice())
                .permute([0, 3, 1, 2])
                .to_device(self.device);

            let output = self
                .model
                .lock()
                .map_err(|_| InferenceError::Model("model mutex poisoned".to_string()))?
                .forward_ts(&[input])
                .map_err(|e| InferenceError::Model(e.to_string()))?;

            let output_flat = output.softmax(-1, Kind::Float).to_kind(Kind::Float).view([-1]);
            let num_elements = output_flat.size()[0] as usize;
            let mut output_vec = vec![0.0f32; num_elements];
            output_flat.copy_data(&mut output_vec, num_elements);
            Ok(output_vec)
        }
    }
}

#[cfg(feature = "torch")]
pub use torch::TorchClassifier;

pub fn load_image_classifier(model_path: &Path) -> Result<Box<dyn ImageClassifier>, ModelLoadError> {
    if !model_path.exists() {
        return Err(ModelLoadError::Missing(model_path.to_path_buf()));
    }
    #[cfg(feature = "torch")]
    {
        Ok(Box::new(TorchClassifier::load(model_path)?))
    }
    #[cfg(not(feature = "torch"))]
    {
        Err(ModelLoadError::BackendUnavailable(
            "built without the `torch` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_reported_as_missing() {
        let err = load_image_classifier(Path::new("/nonexistent/plant_disease_model.pt"))
            .err()
            .unwrap();
        assert!(matches!(err, ModelLoadError::Missing(_)));
    }

    #[cfg(not(feature = "torch"))]
    #[test]
    fn present_model_without_backend_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plant_disease_model.pt");
        std::fs::write(&path, b"not really torchscript").unwrap();
        let err = load_image_classifier(&path).err().unwrap();
        assert!(matches!(err, ModelLoadError::BackendUnavailable(_)));
    }
}
