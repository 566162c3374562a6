use shared::PredictionKind;
use std::path::Path;
use std::sync::Arc;

use super::artifacts::{Classifier, LabelEncoder, StandardScaler, read_json};
use super::config::{ModelConfig, NumericArtifactFiles};
use super::preprocess::ImageTransform;
use super::vision::{ImageClassifier, load_image_classifier};
use super::ModelLoadError;
use crate::advisory;

pub const SOIL_FEATURES: [&str; 6] = [
    "nitrogen",
    "phosphorus",
    "potassium",
    "ph",
    "organic_matter",
    "moisture",
];

pub const CROP_FEATURES: [&str; 7] = [
    "nitrogen",
    "phosphorus",
    "potassium",
    "temperature",
    "humidity",
    "ph",
    "rainfall",
];

/// Output-layer order of the leaf classifier. Must stay index-aligned with
/// the trained model.
pub const DISEASE_CLASSES: [&str; 15] = [
    "Pepper__bell___Bacterial_spot",
    "Pepper__bell___healthy",
    "Potato___Early_blight",
    "Potato___healthy",
    "Potato___Late_blight",
    "Potato___Target_Spot",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___Tomato_YellowLeaf_Curl_Virus",
    "Tomato_Bacterial_spot",
    "Tomato_Early_blight",
    "Tomato_healthy",
    "Tomato_Late_blight",
    "Tomato_Leaf_Mold",
    "Tomato_Septoria_leaf_spot",
    "Tomato_Spider_mites_Two_spotted_spider_mite",
];

pub type RegistryHandle = Arc<ModelRegistry>;

/// Classifier with the scaler and label encoder it was trained with.
#[derive(Debug, Clone)]
pub struct NumericModel {
    pub classifier: Classifier,
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
}

impl NumericModel {
    /// Checks the trio is mutually consistent and that the scaler was fit on
    /// `expected_order`.
    pub fn new(
        kind: PredictionKind,
        classifier: Classifier,
        scaler: StandardScaler,
        encoder: LabelEncoder,
        expected_order: &[&str],
    ) -> Result<Self, ModelLoadError> {
        scaler.validate()?;
        encoder.validate()?;
        classifier.validate()?;

        let same_order = scaler.feature_names.len() == expected_order.len()
            && scaler
                .feature_names
                .iter()
                .zip(expected_order)
                .all(|(fitted, expected)| fitted.eq_ignore_ascii_case(expected));
        if !same_order {
            return Err(ModelLoadError::Inconsistent(format!(
                "{} scaler was fit on {:?}, expected {:?}",
                kind, scaler.feature_names, expected_order
            )));
        }
        if classifier.n_features() != scaler.n_features() {
            return Err(ModelLoadError::Inconsistent(format!(
                "{} classifier takes {} features, scaler provides {}",
                kind,
                classifier.n_features(),
                scaler.n_features()
            )));
        }
        if classifier.n_classes() != encoder.classes.len() {
            return Err(ModelLoadError::Inconsistent(format!(
                "{} classifier has {} classes, label encoder has {}",
                kind,
                classifier.n_classes(),
                encoder.classes.len()
            )));
        }

        let uncovered = advisory::uncovered_labels(kind, &encoder.classes);
        if !uncovered.is_empty() {
            log::warn!("{} labels without advisory entries: {:?}", kind, uncovered);
        }

        Ok(Self {
            classifier,
            scaler,
            encoder,
        })
    }

    pub fn load(
        model_dir: &Path,
        files: &NumericArtifactFiles,
        kind: PredictionKind,
        expected_order: &[&str],
    ) -> Result<Self, ModelLoadError> {
        let classifier: Classifier = read_json(&model_dir.join(&files.model))?;
        let scaler: StandardScaler = read_json(&model_dir.join(&files.scaler))?;
        let encoder: LabelEncoder = read_json(&model_dir.join(&files.label_encoder))?;
        Self::new(kind, classifier, scaler, encoder, expected_order)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.scaler.feature_names
    }
}

pub struct DiseaseModel {
    pub classifier: Box<dyn ImageClassifier>,
    pub classes: Vec<String>,
    pub transform: ImageTransform,
}

impl DiseaseModel {
    pub fn new(classifier: Box<dyn ImageClassifier>, transform: ImageTransform) -> Self {
        Self {
            classifier,
            classes: DISEASE_CLASSES.iter().map(|c| c.to_string()).collect(),
            transform,
        }
    }
}

/// Read-only set of loaded models. A kind whose artifacts failed to load is
/// `None` and is served by the fixed fallback.
#[derive(Default)]
pub struct ModelRegistry {
    pub soil: Option<NumericModel>,
    pub crop: Option<NumericModel>,
    pub disease: Option<DiseaseModel>,
}

impl ModelRegistry {
    pub fn load(model_dir: &Path, config: &ModelConfig) -> RegistryHandle {
        log::info!("Loading models from {}", model_dir.display());

        let soil = NumericModel::load(
            model_dir,
            &config.artifacts.soil,
            PredictionKind::SoilFertility,
            &SOIL_FEATURES,
        );
        let crop = NumericModel::load(
            model_dir,
            &config.artifacts.crop,
            PredictionKind::CropRecommendation,
            &CROP_FEATURES,
        );
        let disease = load_image_classifier(&model_dir.join(&config.artifacts.disease_model))
            .map(|classifier| DiseaseModel::new(classifier, ImageTransform::from(&config.image)));

        Arc::new(Self {
            soil: loaded(PredictionKind::SoilFertility, soil),
            crop: loaded(PredictionKind::CropRecommendation, crop),
            disease: loaded(PredictionKind::DiseaseDetection, disease),
        })
    }

    pub fn is_loaded(&self, kind: PredictionKind) -> bool {
        match kind {
            PredictionKind::SoilFertility => self.soil.is_some(),
            PredictionKind::CropRecommendation => self.crop.is_some(),
            PredictionKind::DiseaseDetection => self.disease.is_some(),
        }
    }
}

fn loaded<T>(kind: PredictionKind, result: Result<T, ModelLoadError>) -> Option<T> {
    match result {
        Ok(model) => {
            log::info!("{} model loaded", kind);
            Some(model)
        }
        Err(e) => {
            log::error!("{} model unavailable, using fallback: {}", kind, e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inference::artifacts::tests::stump_forest;
    use crate::inference::config::ModelConfig;

    pub(crate) fn soil_model() -> NumericModel {
        NumericModel::new(
            PredictionKind::SoilFertility,
            Classifier::RandomForest(stump_forest(6)),
            StandardScaler {
                feature_names: SOIL_FEATURES.iter().map(|f| f.to_string()).collect(),
                mean: vec![50.0, 40.0, 40.0, 6.5, 1.0, 20.0],
                scale: vec![25.0, 20.0, 20.0, 1.0, 0.5, 10.0],
            },
            LabelEncoder {
                classes: vec!["High".into(), "Low".into(), "Medium".into()],
            },
            &SOIL_FEATURES,
        )
        .unwrap()
    }

    pub(crate) fn write_soil_artifacts(dir: &Path) {
        let model = soil_model();
        let write = |name: &str, json: String| std::fs::write(dir.join(name), json).unwrap();
        write(
            "soil_fertility_model.json",
            serde_json::to_string(&model.classifier).unwrap(),
        );
        write(
            "soil_fertility_scaler.json",
            serde_json::to_string(&model.scaler).unwrap(),
        );
        write(
            "soil_fertility_label_encoder.json",
            serde_json::to_string(&model.encoder).unwrap(),
        );
    }

    #[test]
    fn loads_soil_artifacts_and_leaves_missing_kinds_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_soil_artifacts(dir.path());

        let registry = ModelRegistry::load(dir.path(), &ModelConfig::default());
        assert!(registry.is_loaded(PredictionKind::SoilFertility));
        assert!(!registry.is_loaded(PredictionKind::CropRecommendation));
        assert!(!registry.is_loaded(PredictionKind::DiseaseDetection));
        assert_eq!(registry.soil.as_ref().unwrap().feature_names().len(), 6);
    }

    #[test]
    fn corrupt_artifact_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        write_soil_artifacts(dir.path());
        std::fs::write(dir.path().join("soil_fertility_scaler.json"), "{not json").unwrap();

        let err = NumericModel::load(
            dir.path(),
            &ModelConfig::default().artifacts.soil,
            PredictionKind::SoilFertility,
            &SOIL_FEATURES,
        )
        .unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt { .. }));
    }

    #[test]
    fn scaler_fit_on_other_order_is_rejected() {
        let model = soil_model();
        let mut scaler = model.scaler.clone();
        scaler.feature_names.swap(0, 1);
        let err = NumericModel::new(
            PredictionKind::SoilFertility,
            model.classifier.clone(),
            scaler,
            model.encoder.clone(),
            &SOIL_FEATURES,
        )
        .unwrap_err();
        assert!(matches!(err, ModelLoadError::Inconsistent(_)));
    }

    #[test]
    fn encoder_must_cover_every_class() {
        let model = soil_model();
        let err = NumericModel::new(
            PredictionKind::SoilFertility,
            model.classifier.clone(),
            model.scaler.clone(),
            LabelEncoder {
                classes: vec!["Low".into(), "High".into()],
            },
            &SOIL_FEATURES,
        )
        .unwrap_err();
        assert!(matches!(err, ModelLoadError::Inconsistent(_)));
    }
}
