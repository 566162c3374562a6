use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::env;
use std::sync::Arc;

use backend::chat::{ChatbotDispatcher, GoogleTts, SpeechSynthesizer};
use backend::config::{Settings, StorageBackend};
use backend::db::{DynamoDbStore, InMemoryStore, PredictionStore};
use backend::identity::USER_ID_HEADER;
use backend::inference::config::ModelConfig;
use backend::inference::{ModelRegistry, build_predictor};
use backend::routes::configure_routes;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, e);
    std::io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let settings = Settings::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let model_config = ModelConfig::load(&settings.model_config)
        .map_err(|e| startup_error("Failed to read model config", e))?;
    let registry = ModelRegistry::load(&settings.model_dir, &model_config);
    let predictor = build_predictor(settings.predictor, registry.clone());

    let chatbot = ChatbotDispatcher::from_strategy(settings.chat_strategy, &settings.llm);

    std::fs::create_dir_all(&settings.tts.audio_dir)?;
    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(
        GoogleTts::new(&settings.tts).map_err(|e| startup_error("Failed to create TTS client", e))?,
    );

    let store: Arc<dyn PredictionStore> = match &settings.storage {
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; history is lost on restart");
            Arc::new(InMemoryStore::new())
        }
        StorageBackend::DynamoDb {
            predictions_table,
            notifications_table,
        } => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            log::info!(
                "Using DynamoDB tables '{}' and '{}'",
                predictions_table,
                notifications_table
            );
            Arc::new(DynamoDbStore::new(
                DynamoDbClient::new(&aws_config),
                predictions_table.clone(),
                notifications_table.clone(),
            ))
        }
    };

    let registry = web::Data::from(registry);
    let predictor = web::Data::from(predictor);
    let synthesizer = web::Data::from(synthesizer);
    let store = web::Data::from(store);
    let chatbot = web::Data::new(chatbot);
    let audio_dir = settings.tts.audio_dir.clone();

    let bind_address = settings.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .allowed_header(USER_ID_HEADER)
                    .max_age(3600),
            )
            .app_data(registry.clone())
            .app_data(predictor.clone())
            .app_data(synthesizer.clone())
            .app_data(store.clone())
            .app_data(chatbot.clone())
            .configure(|cfg| configure_routes(cfg, audio_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
