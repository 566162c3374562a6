use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, error::InternalError, web};
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use shared::{
    CalendarRequest, ChatRequest, CropPredictionResponse, DiseasePredictionResponse,
    FertilizerRequest, NewNotification, Notification, PredictionKind, PredictionRecord,
    PredictionResult, SoilPredictionResponse, TextToSpeechRequest, WeatherAdviceRequest,
    WeatherQuery,
};
use std::path::PathBuf;
use uuid::Uuid;

use crate::advisory::{self, agronomy};
use crate::chat::{ChatbotDispatcher, SpeechSynthesizer};
use crate::db::{PredictionStore, RepositoryError};
use crate::identity::UserContext;
use crate::inference::registry::{CROP_FEATURES, SOIL_FEATURES};
use crate::inference::{FeatureVector, ImageSample, ModelRegistry, Predictor, ValidationError};
use crate::upload::{self, UploadError};

const HISTORY_LIMIT: usize = 5;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

fn error_body(error: impl Into<String>, details: Vec<String>) -> ErrorResponse {
    ErrorResponse {
        error: error.into(),
        details,
    }
}

fn validation_failed(e: &ValidationError) -> HttpResponse {
    warn!("Rejected input: {}", e);
    let error = match e {
        ValidationError::Fields(_) => "Invalid input",
        ValidationError::Image(_) => "Invalid image",
    };
    HttpResponse::BadRequest().json(error_body(error, e.details()))
}

fn internal_error(context: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(error_body(context, Vec::new()))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, audio_dir: PathBuf) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(error_body("Invalid JSON body", vec![err.to_string()]));
        InternalError::from_response(err, response).into()
    }))
    .service(web::resource("/health").route(web::get().to(health)))
    .service(
        web::scope("/api")
            .service(web::resource("/predict/soil").route(web::post().to(predict_soil)))
            .service(web::resource("/predict/crop").route(web::post().to(predict_crop)))
            .service(web::resource("/predict/disease").route(web::post().to(predict_disease)))
            .service(web::resource("/chat").route(web::post().to(chat)))
            .service(web::resource("/text-to-speech").route(web::post().to(text_to_speech)))
            .service(web::resource("/fertilizer").route(web::post().to(fertilizer)))
            .service(web::resource("/weather-advice").route(web::post().to(weather_advice)))
            .service(web::resource("/calendar").route(web::post().to(calendar)))
            .service(web::resource("/weather").route(web::get().to(weather)))
            .service(web::resource("/crop-prices").route(web::get().to(crop_prices)))
            .service(
                web::resource("/users/{user_id}/predictions").route(web::get().to(prediction_history)),
            )
            .service(
                web::resource("/users/{user_id}/notifications")
                    .route(web::get().to(unread_notifications))
                    .route(web::post().to(create_notification)),
            )
            .service(
                web::resource("/users/{user_id}/notifications/{notification_id}/read")
                    .route(web::post().to(mark_notification_read)),
            ),
    )
    .service(Files::new("/static/audio", audio_dir));
}

async fn health(registry: web::Data<ModelRegistry>, chatbot: web::Data<ChatbotDispatcher>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "models": {
            "soil_fertility": registry.is_loaded(PredictionKind::SoilFertility),
            "crop_recommendation": registry.is_loaded(PredictionKind::CropRecommendation),
            "disease_detection": registry.is_loaded(PredictionKind::DiseaseDetection),
        },
        "chat": chatbot.responder_name(),
    }))
}

fn features_from_body(body: &Value, required: &[&str]) -> Result<FeatureVector, ValidationError> {
    let raw = body.as_object().ok_or_else(|| {
        ValidationError::Fields(vec!["Request body must be a JSON object".to_string()])
    })?;
    FeatureVector::from_raw(raw, required)
}

/// Records a prediction in the background. Anonymous callers and failed
/// predictions are not recorded.
fn persist_prediction(
    store: &web::Data<dyn PredictionStore>,
    user: UserContext,
    kind: PredictionKind,
    input_data: String,
    prediction: &PredictionResult,
) {
    let Some(user_id) = user.0 else {
        return;
    };
    if prediction.is_error() {
        return;
    }

    let record = PredictionRecord {
        id: Uuid::new_v4(),
        user_id,
        prediction_type: kind,
        input_data,
        result: prediction.label.clone(),
        confidence_score: prediction.confidence,
        created_at: Utc::now(),
    };
    let store = store.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = store.save_prediction(&record).await {
            error!("Failed to save {} prediction {}: {}", record.prediction_type, record.id, e);
        }
    });
}

async fn predict_soil(
    predictor: web::Data<dyn Predictor>,
    store: web::Data<dyn PredictionStore>,
    user: UserContext,
    body: web::Json<Value>,
) -> HttpResponse {
    let features = match features_from_body(&body, &SOIL_FEATURES) {
        Ok(features) => features,
        Err(e) => return validation_failed(&e),
    };
    let input_data = features.describe();

    let prediction = match web::block(move || predictor.predict_soil_fertility(&features)).await {
        Ok(prediction) => prediction,
        Err(e) => {
            error!("Soil prediction task failed: {}", e);
            return internal_error("Prediction failed");
        }
    };

    persist_prediction(&store, user, PredictionKind::SoilFertility, input_data, &prediction);
    let recommendations = advisory::soil_advice(&prediction.label)
        .iter()
        .map(|r| r.to_string())
        .collect();
    HttpResponse::Ok().json(SoilPredictionResponse {
        prediction,
        recommendations,
    })
}

async fn predict_crop(
    predictor: web::Data<dyn Predictor>,
    store: web::Data<dyn PredictionStore>,
    user: UserContext,
    body: web::Json<Value>,
) -> HttpResponse {
    let features = match features_from_body(&body, &CROP_FEATURES) {
        Ok(features) => features,
        Err(e) => return validation_failed(&e),
    };
    let input_data = features.describe();

    let prediction = match web::block(move || predictor.predict_crop_recommendation(&features)).await {
        Ok(prediction) => prediction,
        Err(e) => {
            error!("Crop prediction task failed: {}", e);
            return internal_error("Prediction failed");
        }
    };

    persist_prediction(&store, user, PredictionKind::CropRecommendation, input_data, &prediction);
    let crop_info = advisory::crop_info(&prediction.label);
    HttpResponse::Ok().json(CropPredictionResponse {
        prediction,
        crop_info,
    })
}

async fn predict_disease(
    predictor: web::Data<dyn Predictor>,
    store: web::Data<dyn PredictionStore>,
    user: UserContext,
    payload: Multipart,
) -> HttpResponse {
    let upload = match upload::read_image_field(payload).await {
        Ok(upload) => upload,
        Err(e) => {
            warn!("Rejected upload: {}", e);
            return match e {
                UploadError::TooLarge => HttpResponse::PayloadTooLarge().json(error_body(e.to_string(), Vec::new())),
                _ => HttpResponse::BadRequest().json(error_body(e.to_string(), Vec::new())),
            };
        }
    };
    let image_hash = upload::calculate_image_hash(&upload.bytes);
    info!(
        "Disease detection for {} ({} bytes, {})",
        upload.filename,
        upload.bytes.len(),
        image_hash
    );

    let bytes = upload.bytes;
    let outcome = web::block(move || {
        let image = ImageSample::decode(&bytes)?;
        image.check_channels()?;
        Ok::<_, ValidationError>(predictor.predict_plant_disease(&image))
    })
    .await;

    let prediction = match outcome {
        Ok(Ok(prediction)) => prediction,
        Ok(Err(e)) => return validation_failed(&e),
        Err(e) => {
            error!("Disease prediction task failed: {}", e);
            return internal_error("Prediction failed");
        }
    };

    let input_data = json!({"filename": upload.filename, "image_hash": image_hash}).to_string();
    persist_prediction(&store, user, PredictionKind::DiseaseDetection, input_data, &prediction);
    let treatment = advisory::disease_treatment(&prediction.label).to_string();
    HttpResponse::Ok().json(DiseasePredictionResponse {
        prediction,
        treatment,
        image_hash,
    })
}

async fn chat(chatbot: web::Data<ChatbotDispatcher>, body: web::Json<ChatRequest>) -> HttpResponse {
    let request = body.into_inner();
    if request.message.trim().is_empty() {
        return HttpResponse::BadRequest().json(error_body("No message provided", Vec::new()));
    }
    let language = request.language.as_deref().unwrap_or("en");
    HttpResponse::Ok().json(chatbot.respond(&request.message, language).await)
}

async fn text_to_speech(
    synthesizer: web::Data<dyn SpeechSynthesizer>,
    body: web::Json<TextToSpeechRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let language = shared::Language::from_code(request.language.as_deref().unwrap_or("en"));
    HttpResponse::Ok().json(synthesizer.synthesize(&request.text, language).await)
}

async fn fertilizer(body: web::Json<FertilizerRequest>) -> HttpResponse {
    HttpResponse::Ok().json(agronomy::fertilizer_plan(
        body.nitrogen,
        body.phosphorus,
        body.potassium,
    ))
}

async fn weather_advice(body: web::Json<WeatherAdviceRequest>) -> HttpResponse {
    let advice = agronomy::weather_advice(body.temperature, body.humidity, body.rainfall);
    HttpResponse::Ok().json(json!({ "advice": advice }))
}

async fn weather(query: web::Query<WeatherQuery>) -> HttpResponse {
    let location = query.location.as_deref().unwrap_or_default();
    HttpResponse::Ok().json(agronomy::weather_snapshot(location))
}

async fn crop_prices() -> HttpResponse {
    HttpResponse::Ok().json(agronomy::crop_prices(Utc::now()))
}

async fn calendar(body: web::Json<CalendarRequest>) -> HttpResponse {
    match agronomy::farming_calendar(&body.crop, &body.planting_date) {
        Ok(calendar) => HttpResponse::Ok().json(calendar),
        Err(e) => validation_failed(&e),
    }
}

async fn prediction_history(
    store: web::Data<dyn PredictionStore>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let user_id = path.into_inner();
    match store.recent_predictions(user_id, HISTORY_LIMIT).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            error!("Error retrieving predictions for {}: {}", user_id, e);
            internal_error("Failed to load prediction history")
        }
    }
}

async fn unread_notifications(
    store: web::Data<dyn PredictionStore>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let user_id = path.into_inner();
    match store.unread_notifications(user_id).await {
        Ok(notifications) => HttpResponse::Ok().json(notifications),
        Err(e) => {
            error!("Error retrieving notifications for {}: {}", user_id, e);
            internal_error("Failed to load notifications")
        }
    }
}

async fn create_notification(
    store: web::Data<dyn PredictionStore>,
    path: web::Path<Uuid>,
    body: web::Json<NewNotification>,
) -> HttpResponse {
    let request = body.into_inner();
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id: path.into_inner(),
        title: request.title,
        message: request.message,
        notification_type: request.notification_type,
        is_read: false,
        created_at: Utc::now(),
    };
    match store.create_notification(&notification).await {
        Ok(()) => HttpResponse::Created().json(notification),
        Err(e) => {
            error!("Failed to create notification: {}", e);
            internal_error("Failed to create notification")
        }
    }
}

async fn mark_notification_read(
    store: web::Data<dyn PredictionStore>,
    path: web::Path<(Uuid, Uuid)>,
) -> HttpResponse {
    let (user_id, notification_id) = path.into_inner();
    match store.mark_notification_read(user_id, notification_id).await {
        Ok(()) => HttpResponse::Ok().json(json!({"status": "success"})),
        Err(RepositoryError::NotFound) => {
            HttpResponse::NotFound().json(error_body("Notification not found", Vec::new()))
        }
        Err(e) => {
            error!("Failed to mark notification {} read: {}", notification_id, e);
            internal_error("Failed to update notification")
        }
    }
}
