//! Static advisory tables keyed by predicted label.
//!
//! Lookups never fail: a label outside a table resolves to that table's
//! fallback entry.

pub mod agronomy;

use shared::{CropInfo, PredictionKind};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

pub const SOIL_FALLBACK: &[&str] = &["Consult an agricultural expert"];
pub const NOT_AVAILABLE: &str = "Not available";
pub const TREATMENT_FALLBACK: &str = "Consult an agricultural expert for appropriate treatment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum FertilityClass {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Crop {
    Rice,
    Wheat,
    Maize,
    Sugarcane,
    Cotton,
    Groundnut,
    Millet,
    Barley,
    Soybean,
    Bajra,
    Sorghum,
    Turmeric,
    Mustard,
    Sunflower,
    Gram,
    Lentil,
    Pea,
    Cabbage,
    Onion,
    Potato,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Disease {
    #[strum(serialize = "Pepper__bell___Bacterial_spot")]
    PepperBacterialSpot,
    #[strum(serialize = "Pepper__bell___healthy")]
    PepperHealthy,
    #[strum(serialize = "Potato___Early_blight")]
    PotatoEarlyBlight,
    #[strum(serialize = "Potato___healthy")]
    PotatoHealthy,
    #[strum(serialize = "Potato___Late_blight")]
    PotatoLateBlight,
    #[strum(serialize = "Potato___Target_Spot")]
    PotatoTargetSpot,
    #[strum(serialize = "Tomato___Tomato_mosaic_virus")]
    TomatoMosaicVirus,
    #[strum(serialize = "Tomato___Tomato_YellowLeaf_Curl_Virus")]
    TomatoYellowLeafCurlVirus,
    #[strum(serialize = "Tomato_Bacterial_spot")]
    TomatoBacterialSpot,
    #[strum(serialize = "Tomato_Early_blight")]
    TomatoEarlyBlight,
    #[strum(serialize = "Tomato_healthy")]
    TomatoHealthy,
    #[strum(serialize = "Tomato_Late_blight")]
    TomatoLateBlight,
    #[strum(serialize = "Tomato_Leaf_Mold")]
    TomatoLeafMold,
    #[strum(serialize = "Tomato_Septoria_leaf_spot")]
    TomatoSeptoriaLeafSpot,
    #[strum(serialize = "Tomato_Spider_mites_Two_spotted_spider_mite")]
    TomatoSpiderMites,
}

pub fn soil_advice(label: &str) -> &'static [&'static str] {
    match FertilityClass::from_str(label.trim()) {
        Ok(FertilityClass::Low) => &[
            "Add organic compost",
            "Apply NPK fertilizers",
            "Use green manure",
        ],
        Ok(FertilityClass::Medium) => &[
            "Maintain organic content",
            "Use balanced NPK fertilizers",
        ],
        Ok(FertilityClass::High) => &["Monitor nutrient levels", "Avoid over-fertilization"],
        Err(_) => SOIL_FALLBACK,
    }
}

pub fn crop_info(label: &str) -> CropInfo {
    let Ok(crop) = Crop::from_str(label.trim()) else {
        return CropInfo {
            season: NOT_AVAILABLE.to_string(),
            duration: NOT_AVAILABLE.to_string(),
            water_requirement: NOT_AVAILABLE.to_string(),
            soil_type: NOT_AVAILABLE.to_string(),
        };
    };
    let (season, duration, water_requirement, soil_type) = match crop {
        Crop::Rice => (
            "Kharif (June - November)",
            "100-150 days",
            "1200-1800 mm",
            "Clayey loam, silt loam, well-drained",
        ),
        Crop::Wheat => (
            "Rabi (November - April)",
            "110-140 days",
            "450-650 mm",
            "Loamy, clay loam, well-drained",
        ),
        Crop::Maize => (
            "Kharif (June - October)",
            "90-120 days",
            "500-800 mm",
            "Loamy, alluvial, well-drained",
        ),
        Crop::Sugarcane => (
            "Annual (Planted February - March or September - October)",
            "10-18 months",
            "1500-2500 mm",
            "Loamy, alluvial, well-drained, fertile",
        ),
        Crop::Cotton => (
            "Kharif (June - November)",
            "150-180 days",
            "700-1200 mm",
            "Black soil, sandy loam, well-drained",
        ),
        Crop::Groundnut => (
            "Kharif or Rabi",
            "105-120 days",
            "500-600 mm",
            "Sandy loam, well-drained",
        ),
        Crop::Millet => (
            "Kharif (June - September)",
            "70-120 days",
            "300-400 mm",
            "Sandy loam, well-drained",
        ),
        Crop::Barley => (
            "Rabi (November - April)",
            "90-110 days",
            "300-400 mm",
            "Sandy loam, well-drained",
        ),
        Crop::Soybean => (
            "Kharif (June - October)",
            "90-120 days",
            "500-700 mm",
            "Loamy, clay loam, well-drained",
        ),
        Crop::Bajra => (
            "Kharif (June - September)",
            "75-90 days",
            "350-400 mm",
            "Sandy loam, well-drained",
        ),
        Crop::Sorghum => (
            "Kharif and Rabi",
            "100-120 days",
            "400-600 mm",
            "Loamy, clay loam, well-drained",
        ),
        Crop::Turmeric => (
            "Planted in April - May",
            "7-9 months",
            "1500-2000 mm",
            "Loamy, fertile, well-drained",
        ),
        Crop::Mustard => (
            "Rabi (October - March)",
            "110-140 days",
            "400-500 mm",
            "Loamy, clay loam, well-drained",
        ),
        Crop::Sunflower => (
            "Kharif and Rabi",
            "80-120 days",
            "500-600 mm",
            "Loamy, well-drained",
        ),
        Crop::Gram => (
            "Rabi (October - April)",
            "90-100 days",
            "400-500 mm",
            "Sandy loam, clay loam, well-drained",
        ),
        Crop::Lentil => (
            "Rabi (November - April)",
            "100-110 days",
            "350-500 mm",
            "Loamy, well-drained",
        ),
        Crop::Pea => (
            "Rabi (October - March)",
            "90-120 days",
            "400-500 mm",
            "Loamy, well-drained",
        ),
        Crop::Cabbage => (
            "Rabi and Kharif",
            "70-120 days",
            "350-500 mm",
            "Loamy, well-drained",
        ),
        Crop::Onion => (
            "Kharif and Rabi",
            "100-150 days",
            "600-800 mm",
            "Loamy, well-drained",
        ),
        Crop::Potato => (
            "Rabi (October - March)",
            "90-120 days",
            "500-700 mm",
            "Sandy loam, well-drained",
        ),
    };
    CropInfo {
        season: season.to_string(),
        duration: duration.to_string(),
        water_requirement: water_requirement.to_string(),
        soil_type: soil_type.to_string(),
    }
}

pub fn disease_treatment(label: &str) -> &'static str {
    let Ok(disease) = Disease::from_str(label.trim()) else {
        return TREATMENT_FALLBACK;
    };
    match disease {
        Disease::PepperHealthy | Disease::PotatoHealthy | Disease::TomatoHealthy => {
            "No treatment needed."
        }
        Disease::PepperBacterialSpot => "Remove infected leaves, apply copper-based bactericide.",
        Disease::PotatoEarlyBlight => "Apply recommended fungicide, remove infected foliage.",
        Disease::PotatoLateBlight => "Use fungicides and resistant varieties.",
        Disease::PotatoTargetSpot => "Remove affected leaves, apply fungicide.",
        Disease::TomatoMosaicVirus => "Remove infected plants, control aphids.",
        Disease::TomatoYellowLeafCurlVirus => "Control whiteflies, remove infected plants.",
        Disease::TomatoBacterialSpot => "Apply copper-based bactericides, remove infected parts.",
        Disease::TomatoEarlyBlight => "Apply fungicides, remove infected leaves.",
        Disease::TomatoLateBlight => "Apply fungicides, use resistant varieties.",
        Disease::TomatoLeafMold => "Improve air circulation, apply fungicide.",
        Disease::TomatoSeptoriaLeafSpot => "Apply fungicide, remove infected leaves.",
        Disease::TomatoSpiderMites => "Use miticides, maintain proper humidity.",
    }
}

/// Labels a classifier can emit that have no advisory entry of their own.
pub fn uncovered_labels<'a>(kind: PredictionKind, labels: &'a [String]) -> Vec<&'a str> {
    labels
        .iter()
        .map(String::as_str)
        .filter(|label| {
            let label = label.trim();
            match kind {
                PredictionKind::SoilFertility => FertilityClass::from_str(label).is_err(),
                PredictionKind::CropRecommendation => Crop::from_str(label).is_err(),
                PredictionKind::DiseaseDetection => Disease::from_str(label).is_err(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn soil_advice_by_band() {
        assert_eq!(soil_advice("Low").len(), 3);
        assert_eq!(soil_advice("medium")[1], "Use balanced NPK fertilizers");
        assert_eq!(soil_advice("Error"), SOIL_FALLBACK);
    }

    #[test]
    fn every_crop_has_real_info() {
        for crop in Crop::iter() {
            let info = crop_info(&crop.to_string());
            assert_ne!(info.season, NOT_AVAILABLE, "{} has no entry", crop);
        }
        assert_eq!(crop_info("Rice").duration, "100-150 days");
    }

    #[test]
    fn unknown_crop_is_not_available() {
        let info = crop_info("dragonfruit");
        assert_eq!(
            info,
            CropInfo {
                season: "Not available".into(),
                duration: "Not available".into(),
                water_requirement: "Not available".into(),
                soil_type: "Not available".into(),
            }
        );
    }

    #[test]
    fn disease_treatment_is_exact_match() {
        assert_eq!(
            disease_treatment("Tomato_Leaf_Mold"),
            "Improve air circulation, apply fungicide."
        );
        assert_eq!(disease_treatment("Potato___healthy"), "No treatment needed.");
        assert_eq!(disease_treatment("Healthy"), TREATMENT_FALLBACK);
        for disease in Disease::iter() {
            assert_ne!(disease_treatment(&disease.to_string()), TREATMENT_FALLBACK);
        }
    }

    #[test]
    fn uncovered_labels_reports_drift() {
        let labels = vec!["rice".to_string(), "kiwi".to_string(), "Potato".to_string()];
        assert_eq!(
            uncovered_labels(PredictionKind::CropRecommendation, &labels),
            vec!["kiwi"]
        );
    }
}
