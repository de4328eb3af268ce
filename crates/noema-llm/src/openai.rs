//! OpenAI-protocol driver
//!
//! Implements [`LlmDriver`] against the OpenAI chat completions streaming
//! API. Also used for any OpenAI-protocol-compatible endpoint via
//! `with_base_url`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::driver::{LlmCallConfig, LlmCompletionMetadata, LlmDriver, LlmResponseStream, LlmStreamEvent};
use crate::error::{LlmError, Result};
use crate::message::{ChatMessage, ChatRole};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiDriver {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiDriver {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Configuration("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn convert_role(role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    fn convert_messages(messages: Vec<ChatMessage>) -> Vec<OpenAiMessage> {
        messages
            .into_iter()
            .map(|m| OpenAiMessage {
                role: Self::convert_role(m.role).to_string(),
                content: m.content,
            })
            .collect()
    }
}

#[async_trait]
impl LlmDriver for OpenAiDriver {
    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        let request = OpenAiRequest {
            model: config.model.clone(),
            messages: Self::convert_messages(messages),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::UpstreamUnavailable(format!("{status}: {body}")));
        }

        let model = config.model.clone();
        let total_tokens = Arc::new(Mutex::new(0u32));
        let event_stream = response.bytes_stream().eventsource();

        let converted_stream: LlmResponseStream = Box::pin(event_stream.map(move |result| {
            let model = model.clone();
            let total_tokens = Arc::clone(&total_tokens);

            match result {
                Ok(event) => {
                    if event.data == "[DONE]" {
                        let tokens = *total_tokens.lock().unwrap();
                        return Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                            total_tokens: Some(tokens),
                            prompt_tokens: None,
                            completion_tokens: Some(tokens),
                            model: Some(model),
                            finish_reason: Some("stop".to_string()),
                        }));
                    }

                    match serde_json::from_str::<OpenAiStreamChunk>(&event.data) {
                        Ok(chunk) => {
                            let mut tokens = *total_tokens.lock().unwrap();
                            if let Some(usage) = &chunk.usage {
                                tokens = usage.total_tokens.unwrap_or(tokens);
                                *total_tokens.lock().unwrap() = tokens;
                            }

                            if let Some(choice) = chunk.choices.first() {
                                if let Some(content) = &choice.delta.content {
                                    *total_tokens.lock().unwrap() += 1;
                                    return Ok(LlmStreamEvent::TextDelta(content.clone()));
                                }

                                if let Some(reason) = &choice.finish_reason {
                                    return Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                                        total_tokens: Some(tokens),
                                        prompt_tokens: None,
                                        completion_tokens: Some(tokens),
                                        model: Some(model),
                                        finish_reason: Some(reason.clone()),
                                    }));
                                }
                            }

                            Ok(LlmStreamEvent::TextDelta(String::new()))
                        }
                        Err(e) => Err(LlmError::MalformedResponse(e.to_string())),
                    }
                }
                Err(e) => Ok(LlmStreamEvent::Error(format!("stream error: {e}"))),
            }
        }));

        Ok(converted_stream)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_role() {
        assert_eq!(OpenAiDriver::convert_role(ChatRole::System), "system");
        assert_eq!(OpenAiDriver::convert_role(ChatRole::User), "user");
        assert_eq!(OpenAiDriver::convert_role(ChatRole::Assistant), "assistant");
    }

    #[test]
    fn test_convert_messages_preserves_order() {
        let messages = vec![
            ChatMessage::system("be terse"),
            ChatMessage::user("hello"),
        ];
        let converted = OpenAiDriver::convert_messages(messages);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[1].content, "hello");
    }

    #[test]
    fn test_from_env_missing_key_is_configuration_error() {
        std::env::remove_var("OPENAI_API_KEY");
        let result = OpenAiDriver::from_env();
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }
}
