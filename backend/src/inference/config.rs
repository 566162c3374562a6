use serde::{Deserialize, Serialize};
use std::path::Path;

use super::preprocess::{ChannelOrder, ResizeMethod};

const DEFAULT_DISEASE_MODEL: &str = "plant_disease_model.pt";

/// Model-side configuration: where the artifacts live and how images are
/// shaped before they reach the disease classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub image: ImageConfig,
    pub artifacts: ArtifactFiles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub size: Vec<u32>,
    pub channel_order: ChannelOrder,
    pub resize_method: ResizeMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawArtifactFiles")]
pub struct ArtifactFiles {
    pub soil: NumericArtifactFiles,
    pub crop: NumericArtifactFiles,
    pub disease_model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericArtifactFiles {
    pub model: String,
    pub scaler: String,
    pub label_encoder: String,
}

impl NumericArtifactFiles {
    fn with_prefix(prefix: &str) -> Self {
        Self {
            model: format!("{}_model.json", prefix),
            scaler: format!("{}_scaler.json", prefix),
            label_encoder: format!("{}_label_encoder.json", prefix),
        }
    }

    /// Any file name left blank takes the `<prefix>_*.json` default.
    fn or_prefixed(self, prefix: &str) -> Self {
        let defaults = Self::with_prefix(prefix);
        let pick = |name: String, default: String| if name.trim().is_empty() { default } else { name };
        Self {
            model: pick(self.model, defaults.model),
            scaler: pick(self.scaler, defaults.scaler),
            label_encoder: pick(self.label_encoder, defaults.label_encoder),
        }
    }
}

/// Artifact names as written in the YAML, before defaults are filled in.
#[derive(Default, Deserialize)]
#[serde(default)]
struct RawArtifactFiles {
    soil: NumericArtifactFiles,
    crop: NumericArtifactFiles,
    disease_model: Option<String>,
}

impl From<RawArtifactFiles> for ArtifactFiles {
    fn from(raw: RawArtifactFiles) -> Self {
        Self {
            soil: raw.soil.or_prefixed("soil_fertility"),
            crop: raw.crop.or_prefixed("crop_recommendation"),
            disease_model: raw
                .disease_model
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DISEASE_MODEL.to_string()),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            image: ImageConfig::default(),
            artifacts: ArtifactFiles::default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            size: vec![224, 224],
            channel_order: ChannelOrder::Bgr,
            resize_method: ResizeMethod::Triangle,
        }
    }
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        Self {
            soil: NumericArtifactFiles::with_prefix("soil_fertility"),
            crop: NumericArtifactFiles::with_prefix("crop_recommendation"),
            disease_model: DEFAULT_DISEASE_MODEL.to_string(),
        }
    }
}

impl ImageConfig {
    /// `(width, height)`; a single value means a square target.
    pub fn target_size(&self) -> (u32, u32) {
        match self.size.as_slice() {
            [w, h, ..] => (*w, *h),
            [side] => (*side, *side),
            [] => (224, 224),
        }
    }
}

impl ModelConfig {
    /// Reads the YAML model config. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            log::info!(
                "No model config at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(path)?;
        let config: ModelConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "image:\n  size: [128, 96]\n  channel_order: rgb\n";
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.image.target_size(), (128, 96));
        assert_eq!(config.image.channel_order, ChannelOrder::Rgb);
        assert_eq!(config.image.resize_method, ResizeMethod::Triangle);
        assert_eq!(config.artifacts.soil.scaler, "soil_fertility_scaler.json");
        assert_eq!(config.artifacts.disease_model, "plant_disease_model.pt");
    }

    #[test]
    fn partially_named_artifacts_fall_back_per_file() {
        let yaml = "artifacts:\n  soil:\n    model: soil_rf_v2.json\n  crop:\n    scaler: crop_scaler_v2.json\n";
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        let soil = &config.artifacts.soil;
        assert_eq!(soil.model, "soil_rf_v2.json");
        assert_eq!(soil.scaler, "soil_fertility_scaler.json");
        assert_eq!(soil.label_encoder, "soil_fertility_label_encoder.json");
        let crop = &config.artifacts.crop;
        assert_eq!(crop.model, "crop_recommendation_model.json");
        assert_eq!(crop.scaler, "crop_scaler_v2.json");
        assert_eq!(config.artifacts.disease_model, "plant_disease_model.pt");
    }

    #[test]
    fn missing_file_is_default() {
        let config = ModelConfig::load(Path::new("/nonexistent/models.yaml")).unwrap();
        assert_eq!(config.image.target_size(), (224, 224));
        assert_eq!(config.image.channel_order, ChannelOrder::Bgr);
    }
}
