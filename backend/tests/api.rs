use actix_web::{App, test, web};
use async_trait::async_trait;
use serde_json::{Value, json};
use shared::{Language, PredictionKind, SpeechResult};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use backend::chat::{ChatbotDispatcher, KeywordResponder, SpeechSynthesizer};
use backend::db::{InMemoryStore, PredictionStore};
use backend::identity::USER_ID_HEADER;
use backend::inference::artifacts::{Classifier, DecisionTree, LabelEncoder, RandomForest, StandardScaler};
use backend::inference::registry::{NumericModel, SOIL_FEATURES};
use backend::inference::{ModelPredictor, ModelRegistry, Predictor, StubPredictor};
use backend::routes::configure_routes;

struct CannedSpeech;

#[async_trait]
impl SpeechSynthesizer for CannedSpeech {
    async fn synthesize(&self, text: &str, _language: Language) -> SpeechResult {
        if text.trim().is_empty() {
            SpeechResult::Error {
                message: "Text-to-speech conversion failed.".into(),
            }
        } else {
            SpeechResult::Success {
                message: "TTS audio generated successfully.".into(),
                audio_file: "/static/audio/response_test.mp3".into(),
            }
        }
    }
}

macro_rules! app {
    ($store:expr) => {
        app!($store, Arc::new(StubPredictor))
    };
    ($store:expr, $predictor:expr) => {{
        let predictor: Arc<dyn Predictor> = $predictor;
        let speech: Arc<dyn SpeechSynthesizer> = Arc::new(CannedSpeech);
        let store: Arc<dyn PredictionStore> = $store;
        test::init_service(
            App::new()
                .app_data(web::Data::new(ModelRegistry::default()))
                .app_data(web::Data::from(predictor))
                .app_data(web::Data::from(speech))
                .app_data(web::Data::from(store))
                .app_data(web::Data::new(ChatbotDispatcher::new(Arc::new(KeywordResponder))))
                .configure(|cfg| configure_routes(cfg, std::env::temp_dir())),
        )
        .await
    }};
}

fn soil_body() -> Value {
    json!({
        "nitrogen": 45,
        "phosphorus": "30",
        "potassium": 40,
        "ph": 6.5,
        "organic_matter": 1.2,
        "moisture": 22
    })
}

/// Loads cleanly but every leaf is empty, so each prediction fails.
fn soil_model_with_empty_leaf() -> NumericModel {
    let tree = DecisionTree {
        children_left: vec![-1],
        children_right: vec![-1],
        feature: vec![-2],
        threshold: vec![-2.0],
        value: vec![vec![0.0, 0.0, 0.0]],
    };
    NumericModel::new(
        PredictionKind::SoilFertility,
        Classifier::RandomForest(RandomForest {
            n_features: 6,
            n_classes: 3,
            trees: vec![tree],
        }),
        StandardScaler {
            feature_names: SOIL_FEATURES.iter().map(|f| f.to_string()).collect(),
            mean: vec![0.0; 6],
            scale: vec![1.0; 6],
        },
        LabelEncoder {
            classes: vec!["High".into(), "Low".into(), "Medium".into()],
        },
        &SOIL_FEATURES,
    )
    .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(32, 32, image::Rgb([30, 160, 40])));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn multipart(field: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----agri-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

#[actix_web::test]
async fn soil_prediction_with_stub() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let req = test::TestRequest::post()
        .uri("/api/predict/soil")
        .set_json(soil_body())
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["prediction"]["label"], "Medium");
    assert_eq!(resp["prediction"]["confidence"], 85.0);
    assert_eq!(
        resp["recommendations"],
        json!(["Maintain organic content", "Use balanced NPK fertilizers"])
    );
}

#[actix_web::test]
async fn failed_soil_inference_renders_error_and_is_not_recorded() {
    let store = Arc::new(InMemoryStore::new());
    let registry = Arc::new(ModelRegistry {
        soil: Some(soil_model_with_empty_leaf()),
        ..Default::default()
    });
    let app = app!(store.clone(), Arc::new(ModelPredictor::new(registry)));
    let user = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/predict/soil")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .set_json(soil_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["prediction"]["label"], "Error");
    assert_eq!(body["prediction"]["confidence"], 0.0);
    assert_eq!(body["recommendations"], json!(["Consult an agricultural expert"]));

    actix_web::rt::time::sleep(Duration::from_millis(50)).await;
    assert!(store.recent_predictions(user, 5).await.unwrap().is_empty());
}

#[actix_web::test]
async fn missing_ph_is_rejected() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let mut body = soil_body();
    body.as_object_mut().unwrap().remove("ph");
    let req = test::TestRequest::post()
        .uri("/api/predict/soil")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid input");
    assert_eq!(body["details"], json!(["Missing required field: ph"]));
}

#[actix_web::test]
async fn crop_prediction_includes_crop_info() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let req = test::TestRequest::post()
        .uri("/api/predict/crop")
        .set_json(json!({
            "nitrogen": 90, "phosphorus": 42, "potassium": 43,
            "temperature": 20.8, "humidity": 82, "ph": 6.5, "rainfall": 202.9
        }))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["prediction"]["label"], "Rice");
    assert_eq!(resp["crop_info"]["season"], "Kharif (June - November)");
}

#[actix_web::test]
async fn disease_upload_checks_extension() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let (content_type, body) = multipart("image", "leaf.webp", &png_bytes());
    let req = test::TestRequest::post()
        .uri("/api/predict/disease")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn disease_upload_without_image_field() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let (content_type, body) = multipart("photo", "leaf.png", &png_bytes());
    let req = test::TestRequest::post()
        .uri("/api/predict/disease")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No image file provided");
}

#[actix_web::test]
async fn disease_prediction_returns_hash_and_treatment() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let png = png_bytes();
    let (content_type, body) = multipart("image", "Leaf.PNG", &png);
    let req = test::TestRequest::post()
        .uri("/api/predict/disease")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["prediction"]["label"], "Healthy");
    assert_eq!(resp["image_hash"], backend::upload::calculate_image_hash(&png));
    assert_eq!(
        resp["treatment"],
        "Consult an agricultural expert for appropriate treatment."
    );
}

#[actix_web::test]
async fn undecodable_image_is_rejected() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let (content_type, body) = multipart("image", "leaf.jpg", b"not really a jpeg");
    let req = test::TestRequest::post()
        .uri("/api/predict/disease")
        .insert_header(("content-type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid image");
}

#[actix_web::test]
async fn chat_replies_in_english_for_unknown_language() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({"message": "What is the mandi price?", "language": "fr"}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["status"], "success");
    assert_eq!(
        resp["response"],
        backend::chat::keyword::responses(backend::chat::ChatIntent::Price, Language::En)[0]
    );

    let req = test::TestRequest::post()
        .uri("/api/chat")
        .set_json(json!({"message": "  "}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn text_to_speech_reports_status() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let req = test::TestRequest::post()
        .uri("/api/text-to-speech")
        .set_json(json!({"text": "Water early in the morning", "language": "hi"}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["audio_file"], "/static/audio/response_test.mp3");

    let req = test::TestRequest::post()
        .uri("/api/text-to-speech")
        .set_json(json!({"text": ""}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["status"], "error");
}

#[actix_web::test]
async fn agronomy_helpers() {
    let app = app!(Arc::new(InMemoryStore::new()));

    let req = test::TestRequest::post()
        .uri("/api/fertilizer")
        .set_json(json!({"nitrogen": 50, "phosphorus": 60, "potassium": 20}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["nitrogen_needed"], 10.0);
    assert_eq!(resp["phosphorus_needed"], 0.0);

    let req = test::TestRequest::post()
        .uri("/api/weather-advice")
        .set_json(json!({"temperature": 25.5, "humidity": 65, "rainfall": 20}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        resp["advice"],
        json!(["Weather conditions are favorable for normal farming activities"])
    );

    let req = test::TestRequest::post()
        .uri("/api/calendar")
        .set_json(json!({"crop": "rice", "planting_date": "2024-06-01"}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["harvest_date"], "2024-09-29");

    let req = test::TestRequest::post()
        .uri("/api/calendar")
        .set_json(json!({"crop": "rice", "planting_date": "June 1st"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn weather_snapshot_and_crop_prices() {
    let app = app!(Arc::new(InMemoryStore::new()));

    let req = test::TestRequest::get()
        .uri("/api/weather?location=Warangal")
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["location"], "Warangal");
    assert_eq!(resp["weather_condition"], "Partly Cloudy");
    assert_eq!(resp["forecast"].as_array().unwrap().len(), 3);
    assert_eq!(resp["forecast"][0]["day"], "Today");
    assert_eq!(resp["agriculture_advice"][0], "Low rainfall: Plan irrigation accordingly");

    let req = test::TestRequest::get().uri("/api/weather").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["location"], "default");

    let req = test::TestRequest::get().uri("/api/crop-prices").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    let prices = resp.as_array().unwrap();
    assert_eq!(prices.len(), 8);
    assert_eq!(prices[0]["crop_name"], "Rice");
    assert_eq!(prices[0]["price_per_kg"], 22.5);
    assert_eq!(prices[0]["price_trend"], "increasing");
    assert_eq!(prices[0]["market_location"], "Local Mandi");
    assert!(prices[0]["last_updated"].is_string());
}

#[actix_web::test]
async fn predictions_are_recorded_for_identified_users_only() {
    let store = Arc::new(InMemoryStore::new());
    let app = app!(store.clone());
    let user = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri("/api/predict/soil")
        .insert_header((USER_ID_HEADER, user.to_string()))
        .set_json(soil_body())
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::post()
        .uri("/api/predict/soil")
        .set_json(soil_body())
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    // persistence runs in a spawned task
    let mut records = Vec::new();
    for _ in 0..50 {
        records = store.recent_predictions(user, 5).await.unwrap();
        if !records.is_empty() {
            break;
        }
        actix_web::rt::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(records.len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/predictions", user))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp.as_array().unwrap().len(), 1);
    assert_eq!(resp[0]["prediction_type"], "soil_fertility");
    assert_eq!(resp[0]["result"], "Medium");
}

#[actix_web::test]
async fn malformed_user_header_is_rejected() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let req = test::TestRequest::post()
        .uri("/api/predict/soil")
        .insert_header((USER_ID_HEADER, "not-a-uuid"))
        .set_json(soil_body())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn notification_lifecycle() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let user = Uuid::new_v4();

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/notifications", user))
        .set_json(json!({
            "title": "Rain alert",
            "message": "Heavy rain expected tomorrow",
            "notification_type": "weather"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/notifications", user))
        .to_request();
    let unread: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/notifications/{}/read", user, id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/notifications", user))
        .to_request();
    let unread: Value = test::call_and_read_body_json(&app, req).await;
    assert!(unread.as_array().unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/notifications/{}/read", user, Uuid::new_v4()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn health_reports_model_status() {
    let app = app!(Arc::new(InMemoryStore::new()));
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["status"], "ok");
    assert_eq!(resp["models"]["soil_fertility"], false);
    assert_eq!(resp["chat"], "keyword");
}
