use serde::Deserialize;
use shared::{PredictionKind, PredictionResult};
use std::sync::Arc;
use strum_macros::{Display, EnumString};

use super::preprocess::{FeatureVector, ImageSample, prepare_image, prepare_numeric};
use super::registry::{DiseaseModel, NumericModel, RegistryHandle};
use super::InferenceError;

/// Prediction capability handed to request handlers. Every call returns a
/// result; failures surface as the `"Error"` sentinel.
pub trait Predictor: Send + Sync {
    fn predict_soil_fertility(&self, features: &FeatureVector) -> PredictionResult;
    fn predict_crop_recommendation(&self, features: &FeatureVector) -> PredictionResult;
    fn predict_plant_disease(&self, image: &ImageSample) -> PredictionResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PredictorKind {
    #[default]
    Model,
    Stub,
}

/// Fixed answers used when models are switched off or failed to load.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubPredictor;

impl StubPredictor {
    pub const SOIL: (&'static str, f64) = ("Medium", 85.0);
    pub const CROP: (&'static str, f64) = ("Rice", 90.0);
    pub const DISEASE: (&'static str, f64) = ("Healthy", 95.0);
}

impl Predictor for StubPredictor {
    fn predict_soil_fertility(&self, _features: &FeatureVector) -> PredictionResult {
        PredictionResult::new(Self::SOIL.0, Self::SOIL.1)
    }

    fn predict_crop_recommendation(&self, _features: &FeatureVector) -> PredictionResult {
        PredictionResult::new(Self::CROP.0, Self::CROP.1)
    }

    fn predict_plant_disease(&self, _image: &ImageSample) -> PredictionResult {
        PredictionResult::new(Self::DISEASE.0, Self::DISEASE.1)
    }
}

pub struct ModelPredictor {
    registry: RegistryHandle,
    fallback: StubPredictor,
}

impl ModelPredictor {
    pub fn new(registry: RegistryHandle) -> Self {
        Self {
            registry,
            fallback: StubPredictor,
        }
    }
}

impl Predictor for ModelPredictor {
    fn predict_soil_fertility(&self, features: &FeatureVector) -> PredictionResult {
        match &self.registry.soil {
            Some(model) => fail_closed(
                PredictionKind::SoilFertility,
                classify_numeric(model, features),
            ),
            None => self.fallback.predict_soil_fertility(features),
        }
    }

    fn predict_crop_recommendation(&self, features: &FeatureVector) -> PredictionResult {
        match &self.registry.crop {
            Some(model) => fail_closed(
                PredictionKind::CropRecommendation,
                classify_numeric(model, features),
            ),
            None => self.fallback.predict_crop_recommendation(features),
        }
    }

    fn predict_plant_disease(&self, image: &ImageSample) -> PredictionResult {
        match &self.registry.disease {
            Some(model) => fail_closed(
                PredictionKind::DiseaseDetection,
                classify_image(model, image),
            ),
            None => self.fallback.predict_plant_disease(image),
        }
    }
}

pub fn build_predictor(kind: PredictorKind, registry: RegistryHandle) -> Arc<dyn Predictor> {
    match kind {
        PredictorKind::Model => Arc::new(ModelPredictor::new(registry)),
        PredictorKind::Stub => {
            log::warn!("Predictor configured as stub; all predictions are fixed values");
            Arc::new(StubPredictor)
        }
    }
}

fn fail_closed(kind: PredictionKind, result: Result<PredictionResult, InferenceError>) -> PredictionResult {
    match result {
        Ok(prediction) => {
            log::debug!(
                "{} prediction: {} ({:.2}%)",
                kind,
                prediction.label,
                prediction.confidence
            );
            prediction
        }
        Err(e) => {
            log::error!("{} prediction error: {}", kind, e);
            PredictionResult::error()
        }
    }
}

fn classify_numeric(model: &NumericModel, features: &FeatureVector) -> Result<PredictionResult, InferenceError> {
    let x = prepare_numeric(features, model.feature_names())
        .map_err(|e| InferenceError::Preprocessing(e.to_string()))?;
    let scaled = model.scaler.transform(&x)?;
    let proba = model.classifier.predict_proba(scaled.view())?;
    let row = proba.row(0).to_vec();
    let (index, probability) = top_class(&row)
        .ok_or_else(|| InferenceError::Model("classifier returned no probabilities".to_string()))?;
    let label = model.encoder.inverse_transform(index)?;
    Ok(PredictionResult::new(label, to_percent(probability)))
}

fn classify_image(model: &DiseaseModel, image: &ImageSample) -> Result<PredictionResult, InferenceError> {
    let batch = prepare_image(image, &model.transform)
        .map_err(|e| InferenceError::Preprocessing(e.to_string()))?;
    let output = model.classifier.predict(&batch)?;
    if output.len() != model.classes.len() {
        return Err(InferenceError::Model(format!(
            "model emitted {} scores for {} disease classes",
            output.len(),
            model.classes.len()
        )));
    }
    let probs: Vec<f64> = output.into_iter().map(f64::from).collect();
    let (index, probability) = top_class(&probs)
        .ok_or_else(|| InferenceError::Model("model returned no finite scores".to_string()))?;
    let label = model
        .classes
        .get(index)
        .ok_or(InferenceError::UnknownClass(index))?;
    Ok(PredictionResult::new(label.as_str(), to_percent(probability)))
}

/// Arg-max over finite values; ties go to the lowest index.
pub fn top_class(probs: &[f64]) -> Option<(usize, f64)> {
    probs
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .fold(None, |best, (i, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((i, p)),
        })
}

fn to_percent(probability: f64) -> f64 {
    (probability * 100.0).clamp(0.0, 100.0)
}
