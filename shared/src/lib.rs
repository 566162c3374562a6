use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

pub const ERROR_LABEL: &str = "Error";

/// Top-1 classifier output. `confidence` is a percentage in [0, 100].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    pub confidence: f64,
}

impl PredictionResult {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Sentinel returned when preprocessing or inference fails.
    pub fn error() -> Self {
        Self::new(ERROR_LABEL, 0.0)
    }

    pub fn is_error(&self) -> bool {
        self.label == ERROR_LABEL
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Language {
    #[default]
    #[strum(serialize = "en")]
    En,
    #[strum(serialize = "hi")]
    Hi,
    #[strum(serialize = "te")]
    Te,
}

impl Language {
    /// Unrecognised codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        code.trim().parse().unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Te => "te",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Te => "Telugu",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictionKind {
    SoilFertility,
    CropRecommendation,
    DiseaseDetection,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatResponse {
    pub response: String,
    pub status: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TextToSpeechRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Outcome of a speech synthesis call. Failures are reported, never raised.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SpeechResult {
    Success { message: String, audio_file: String },
    Error { message: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CropInfo {
    pub season: String,
    pub duration: String,
    pub water_requirement: String,
    pub soil_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SoilPredictionResponse {
    pub prediction: PredictionResult,
    pub recommendations: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CropPredictionResponse {
    pub prediction: PredictionResult,
    pub crop_info: CropInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DiseasePredictionResponse {
    pub prediction: PredictionResult,
    pub treatment: String,
    pub image_hash: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FertilizerRequest {
    #[serde(default)]
    pub nitrogen: f64,
    #[serde(default)]
    pub phosphorus: f64,
    #[serde(default)]
    pub potassium: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FertilizerPlan {
    pub nitrogen_needed: f64,
    pub phosphorus_needed: f64,
    pub potassium_needed: f64,
    pub urea_kg_per_acre: f64,
    pub dap_kg_per_acre: f64,
    pub mop_kg_per_acre: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WeatherAdviceRequest {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct WeatherQuery {
    pub location: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ForecastDay {
    pub day: String,
    pub temp_max: f64,
    pub temp_min: f64,
    pub rain_chance: u8,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
    pub weather_condition: String,
    pub forecast: Vec<ForecastDay>,
    pub agriculture_advice: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PriceTrend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CropPrice {
    pub crop_name: String,
    pub price_per_kg: f64,
    pub market_location: String,
    pub price_trend: PriceTrend,
    pub last_updated: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CalendarRequest {
    pub crop: String,
    pub planting_date: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FarmingCalendar {
    pub planting_date: NaiveDate,
    pub germination_date: NaiveDate,
    pub first_fertilizer: NaiveDate,
    pub second_fertilizer: NaiveDate,
    pub flowering_stage: NaiveDate,
    pub harvest_date: NaiveDate,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prediction_type: PredictionKind,
    pub input_data: String,
    pub result: String,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Weather,
    CropPrice,
    System,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationKind,
}
