use async_trait::async_trait;
use reqwest::Client;
use shared::{Language, SpeechResult};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::ExternalServiceError;

const MAX_CHUNK_CHARS: usize = 100;

/// URL prefix under which `audio_dir` is served.
pub const AUDIO_URL_PREFIX: &str = "/static/audio";

#[derive(Debug, Clone)]
pub struct TtsSettings {
    pub base_url: String,
    pub audio_dir: PathBuf,
    pub timeout: Duration,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            base_url: "https://translate.google.com".to_string(),
            audio_dir: PathBuf::from("static/audio"),
            timeout: Duration::from_secs(15),
        }
    }
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Never fails; problems are reported through `SpeechResult::Error`.
    async fn synthesize(&self, text: &str, language: Language) -> SpeechResult;
}

/// Client for a Google-Translate-compatible `translate_tts` endpoint.
pub struct GoogleTts {
    http_client: Client,
    base_url: String,
    audio_dir: PathBuf,
}

impl GoogleTts {
    pub fn new(settings: &TtsSettings) -> Result<Self, ExternalServiceError> {
        let http_client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            audio_dir: settings.audio_dir.clone(),
        })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: Language,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, ExternalServiceError> {
        let url = Url::parse_with_params(
            &format!("{}/translate_tts", self.base_url),
            &[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", language.code()),
                ("client", "tw-ob"),
                ("total", &total.to_string()),
                ("idx", &idx.to_string()),
                ("textlen", &chunk.chars().count().to_string()),
            ],
        )?;

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ExternalServiceError::EmptyResponse);
        }
        Ok(bytes.to_vec())
    }

    async fn render(&self, text: &str, language: Language) -> Result<String, ExternalServiceError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(ExternalServiceError::InvalidInput("no text to synthesize".into()));
        }

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(chunk, language, idx, chunks.len()).await?);
        }

        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let file_name = audio_file_name();
        let path = self.audio_dir.join(&file_name);
        tokio::fs::write(&path, &audio).await?;
        log::info!("TTS audio saved as {}", path.display());
        Ok(file_name)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, language: Language) -> SpeechResult {
        match self.render(text, language).await {
            Ok(file_name) => SpeechResult::Success {
                message: "TTS audio generated successfully.".to_string(),
                audio_file: format!("{}/{}", AUDIO_URL_PREFIX, file_name),
            },
            Err(e) => {
                log::error!("TTS error: {}", e);
                SpeechResult::Error {
                    message: "Text-to-speech conversion failed.".to_string(),
                }
            }
        }
    }
}

fn audio_file_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "response_{}_{}.mp3",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        &id[..8]
    )
}

/// Splits on whitespace into chunks of at most `max_chars` characters. Words
/// longer than the limit are cut.
fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}
