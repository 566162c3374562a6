use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::Language;
use std::time::Duration;

use super::{ChatResponder, ExternalServiceError, error_response};

const SYSTEM_PROMPT: &str = "You are a knowledgeable, friendly smart agriculture assistant \
helping small farmers with practical guidance.";

fn user_prompt(message: &str, language: Language) -> String {
    format!(
        "You are a helpful agriculture assistant who replies in {} and provides clear, practical, \
beginner-friendly, step-by-step farming advice. Do not apologize or repeat instructions. \
If the question is unrelated to agriculture, politely redirect the user.\n\nUser Question:\n{}",
        language.display_name(),
        message
    )
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct LlmResponder {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmResponder {
    /// `None` when no API key is configured or the HTTP client cannot be built.
    pub fn from_settings(settings: &LlmSettings) -> Option<Self> {
        let api_key = settings.api_key.as_ref().filter(|k| !k.trim().is_empty())?;
        let http_client = match Client::builder().timeout(settings.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                log::error!("Failed to build LLM HTTP client: {}", e);
                return None;
            }
        };
        Some(Self {
            http_client,
            api_key: api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    async fn complete(&self, message: &str, language: Language) -> Result<String, ExternalServiceError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: user_prompt(message, language),
                },
            ],
            max_tokens: 500,
            temperature: 0.3,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ExternalServiceError::EmptyResponse)
    }
}

#[async_trait]
impl ChatResponder for LlmResponder {
    async fn respond(&self, message: &str, language: Language) -> String {
        match self.complete(message, language).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("LLM chat request failed: {}", e);
                error_response(language).to_string()
            }
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn responder(server: &MockServer, timeout: Duration) -> LlmResponder {
        LlmResponder::from_settings(&LlmSettings {
            api_key: Some("test-key".into()),
            base_url: server.uri(),
            model: "test-model".into(),
            timeout,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn returns_trimmed_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "test-model", "max_tokens": 500})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Use drip irrigation.\n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = responder(&server, Duration::from_secs(5))
            .respond("how to save water", Language::En)
            .await;
        assert_eq!(reply, "Use drip irrigation.");
    }

    #[tokio::test]
    async fn server_error_falls_back_to_error_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let reply = responder(&server, Duration::from_secs(5))
            .respond("anything", Language::Hi)
            .await;
        assert_eq!(reply, error_response(Language::Hi));
    }

    #[tokio::test]
    async fn empty_choices_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let reply = responder(&server, Duration::from_secs(5))
            .respond("anything", Language::En)
            .await;
        assert_eq!(reply, error_response(Language::En));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"choices": [{"message": {"content": "late"}}]})),
            )
            .mount(&server)
            .await;

        let reply = responder(&server, Duration::from_millis(200))
            .respond("anything", Language::Te)
            .await;
        assert_eq!(reply, error_response(Language::Te));
    }

    #[test]
    fn prompt_names_reply_language() {
        let prompt = user_prompt("when to sow wheat?", Language::Te);
        assert!(prompt.contains("replies in Telugu"));
        assert!(prompt.ends_with("User Question:\nwhen to sow wheat?"));
    }

    #[test]
    fn blank_key_disables_llm() {
        let settings = LlmSettings {
            api_key: Some("   ".into()),
            ..LlmSettings::default()
        };
        assert!(LlmResponder::from_settings(&settings).is_none());
    }
}
