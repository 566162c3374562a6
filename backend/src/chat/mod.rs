pub mod keyword;
pub mod llm;
pub mod speech;

use async_trait::async_trait;
use serde::Deserialize;
use shared::{ChatResponse, Language};
use std::sync::Arc;
use strum_macros::{Display, EnumString};

pub use keyword::{ChatIntent, KeywordResponder};
pub use llm::{LlmResponder, LlmSettings};
pub use speech::{GoogleTts, SpeechSynthesizer, TtsSettings};

#[derive(Debug, thiserror::Error)]
pub enum ExternalServiceError {
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Service returned an empty response")]
    EmptyResponse,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ExternalServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExternalServiceError::Timeout
        } else {
            ExternalServiceError::Http(err.to_string())
        }
    }
}

/// Fixed reply used whenever a responder cannot produce text.
pub fn error_response(language: Language) -> &'static str {
    match language {
        Language::En => "Sorry, I had trouble understanding your question. Please try again.",
        Language::Hi => "माफ करें, मुझे आपका प्रश्न समझने में परेशानी हुई। कृपया फिर से प्रयास करें।",
        Language::Te => {
            "క్షమించండి, మీ ప్రశ్నను అర్థం చేసుకోవడంలో నాకు ఇబ్బంది వచ్చింది. దయచేసి మళ్లీ ప్రయత్నించండి."
        }
    }
}

/// A chat strategy. Implementations always return displayable text.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn respond(&self, message: &str, language: Language) -> String;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ChatStrategy {
    #[default]
    Keyword,
    Llm,
}

#[derive(Clone)]
pub struct ChatbotDispatcher {
    responder: Arc<dyn ChatResponder>,
}

impl ChatbotDispatcher {
    pub fn new(responder: Arc<dyn ChatResponder>) -> Self {
        Self { responder }
    }

    /// The LLM strategy needs an API key; without one the keyword responder
    /// is used instead.
    pub fn from_strategy(strategy: ChatStrategy, llm: &LlmSettings) -> Self {
        let responder: Arc<dyn ChatResponder> = match strategy {
            ChatStrategy::Keyword => Arc::new(KeywordResponder),
            ChatStrategy::Llm => match LlmResponder::from_settings(llm) {
                Some(responder) => Arc::new(responder),
                None => {
                    log::warn!("CHAT_STRATEGY=llm but OPENAI_API_KEY is not set; using keyword responder");
                    Arc::new(KeywordResponder)
                }
            },
        };
        log::info!("Chatbot using {} responder", responder.name());
        Self { responder }
    }

    pub fn responder_name(&self) -> &'static str {
        self.responder.name()
    }

    pub async fn respond(&self, message: &str, language_code: &str) -> ChatResponse {
        let language = Language::from_code(language_code);
        let mut text = self.responder.respond(message, language).await;
        if text.trim().is_empty() {
            text = error_response(language).to_string();
        }
        ChatResponse {
            response: text,
            status: "success".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl ChatResponder for Silent {
        async fn respond(&self, _message: &str, _language: Language) -> String {
            String::new()
        }

        fn name(&self) -> &'static str {
            "silent"
        }
    }

    #[tokio::test]
    async fn unsupported_language_answers_in_english() {
        let dispatcher = ChatbotDispatcher::new(Arc::new(KeywordResponder));
        let reply = dispatcher.respond("what is the mandi price today", "fr").await;
        assert_eq!(reply.status, "success");
        assert_eq!(
            reply.response,
            keyword::responses(ChatIntent::Price, Language::En)[0]
        );
    }

    #[tokio::test]
    async fn empty_text_becomes_error_string() {
        let dispatcher = ChatbotDispatcher::new(Arc::new(Silent));
        let reply = dispatcher.respond("anything", "te").await;
        assert_eq!(reply.response, error_response(Language::Te));
    }

    #[test]
    fn llm_without_key_falls_back_to_keywords() {
        let dispatcher = ChatbotDispatcher::from_strategy(ChatStrategy::Llm, &LlmSettings::default());
        assert_eq!(dispatcher.responder_name(), "keyword");
    }
}
