use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::chat::{ChatStrategy, LlmSettings, TtsSettings};
use crate::inference::predictor::PredictorKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}={value:?} is not a valid {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{0} must be set when STORAGE_BACKEND=dynamodb")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    DynamoDb {
        predictions_table: String,
        notifications_table: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub model_dir: PathBuf,
    pub model_config: PathBuf,
    pub predictor: PredictorKind,
    pub chat_strategy: ChatStrategy,
    pub llm: LlmSettings,
    pub tts: TtsSettings,
    pub storage: StorageBackend,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm_defaults = LlmSettings::default();
        let tts_defaults = TtsSettings::default();

        let storage_kind = var("STORAGE_BACKEND").map(|v| v.to_ascii_lowercase());
        let storage = match storage_kind.as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("dynamodb") => StorageBackend::DynamoDb {
                predictions_table: var("DYNAMODB_PREDICTIONS_TABLE")
                    .ok_or(ConfigError::Missing("DYNAMODB_PREDICTIONS_TABLE"))?,
                notifications_table: var("DYNAMODB_NOTIFICATIONS_TABLE")
                    .ok_or(ConfigError::Missing("DYNAMODB_NOTIFICATIONS_TABLE"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                    expected: "storage backend (memory|dynamodb)",
                });
            }
        };

        Ok(Self {
            port: parse_or(var("PORT"), "PORT", "port number", 8081)?,
            model_dir: var("MODEL_DIR").map(PathBuf::from).unwrap_or_else(|| "models".into()),
            model_config: var("MODEL_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| "config/models.yaml".into()),
            predictor: parse_or(var("PREDICTOR"), "PREDICTOR", "predictor (model|stub)", PredictorKind::Model)?,
            chat_strategy: parse_or(
                var("CHAT_STRATEGY"),
                "CHAT_STRATEGY",
                "chat strategy (keyword|llm)",
                ChatStrategy::Keyword,
            )?,
            llm: LlmSettings {
                api_key: var("OPENAI_API_KEY"),
                base_url: var("OPENAI_BASE_URL").unwrap_or(llm_defaults.base_url),
                model: var("OPENAI_MODEL").unwrap_or(llm_defaults.model),
                timeout: secs_or(var("LLM_TIMEOUT_SECS"), "LLM_TIMEOUT_SECS", llm_defaults.timeout)?,
            },
            tts: TtsSettings {
                base_url: var("TTS_BASE_URL").unwrap_or(tts_defaults.base_url),
                audio_dir: var("AUDIO_DIR").map(PathBuf::from).unwrap_or(tts_defaults.audio_dir),
                timeout: secs_or(var("TTS_TIMEOUT_SECS"), "TTS_TIMEOUT_SECS", tts_defaults.timeout)?,
            },
            storage,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: v,
            expected,
        }),
    }
}

fn secs_or(value: Option<String>, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_or(value, name, "number of seconds", default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
            expected: "positive number of seconds",
        });
    }
    Ok(Duration::from_secs(secs))
}
