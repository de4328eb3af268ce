//! Anthropic Messages API driver
//!
//! Implements [`LlmDriver`] for Anthropic's Claude models, including
//! extended-thinking budgets derived from a reasoning effort level.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::driver::{LlmCallConfig, LlmCompletionMetadata, LlmDriver, LlmResponseStream, LlmStreamEvent};
use crate::error::{LlmError, Result};
use crate::message::{ChatMessage, ChatRole};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicDriver {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl AnthropicDriver {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::Configuration("ANTHROPIC_API_KEY not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }

    fn convert_role(role: ChatRole) -> &'static str {
        match role {
            // System is sent as the top-level `system` field, not a message
            ChatRole::System => "user",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Split out the system prompt (Anthropic sends it as a top-level field)
    /// and convert the remainder into Anthropic messages.
    fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt = None;
        let mut converted = Vec::new();

        for msg in messages {
            if msg.role == ChatRole::System {
                system_prompt = Some(match system_prompt.take() {
                    Some(existing) => format!("{existing}\n{}", msg.content),
                    None => msg.content.clone(),
                });
                continue;
            }

            converted.push(AnthropicMessage {
                role: Self::convert_role(msg.role).to_string(),
                content: vec![AnthropicContentBlock::Text {
                    text: msg.content.clone(),
                }],
            });
        }

        (system_prompt, converted)
    }
}

#[async_trait]
impl LlmDriver for AnthropicDriver {
    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        let (system_prompt, anthropic_messages) = Self::convert_messages(&messages);

        let thinking = config
            .reasoning_effort
            .as_ref()
            .and_then(|e| AnthropicThinking::from_effort(e));

        let request = AnthropicRequest {
            model: config.model.clone(),
            messages: anthropic_messages,
            max_tokens: config.max_tokens.unwrap_or(4096).max(1),
            temperature: config.temperature,
            system: system_prompt,
            stream: true,
            thinking,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::UpstreamUnavailable(format!("{status}: {body}")));
        }

        let event_stream = response.bytes_stream().eventsource();

        let model = config.model.clone();
        let input_tokens = Arc::new(Mutex::new(0u32));
        let output_tokens = Arc::new(Mutex::new(0u32));

        let converted_stream: LlmResponseStream = Box::pin(event_stream.map(move |result| {
            let model = model.clone();
            let input_tokens = Arc::clone(&input_tokens);
            let output_tokens = Arc::clone(&output_tokens);

            match result {
                Ok(event) => match event.event.as_str() {
                    "message_start" => {
                        if let Ok(data) = serde_json::from_str::<AnthropicMessageStart>(&event.data)
                        {
                            if let Some(usage) = data.message.usage {
                                *input_tokens.lock().unwrap() = usage.input_tokens;
                            }
                        }
                        Ok(LlmStreamEvent::TextDelta(String::new()))
                    }
                    "content_block_delta" => {
                        if let Ok(data) =
                            serde_json::from_str::<AnthropicContentBlockDeltaEvent>(&event.data)
                        {
                            if let AnthropicDelta::TextDelta { text } = data.delta {
                                *output_tokens.lock().unwrap() += 1;
                                return Ok(LlmStreamEvent::TextDelta(text));
                            }
                        }
                        Ok(LlmStreamEvent::TextDelta(String::new()))
                    }
                    "message_delta" => {
                        if let Ok(data) = serde_json::from_str::<AnthropicMessageDelta>(&event.data)
                        {
                            if let Some(usage) = data.usage {
                                *output_tokens.lock().unwrap() = usage.output_tokens;
                            }
                        }
                        Ok(LlmStreamEvent::TextDelta(String::new()))
                    }
                    "message_stop" => {
                        let in_tokens = *input_tokens.lock().unwrap();
                        let out_tokens = *output_tokens.lock().unwrap();

                        Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                            total_tokens: Some(in_tokens + out_tokens),
                            prompt_tokens: Some(in_tokens),
                            completion_tokens: Some(out_tokens),
                            model: Some(model),
                            finish_reason: Some("stop".to_string()),
                        }))
                    }
                    "error" => Ok(LlmStreamEvent::Error(format!(
                        "anthropic stream error: {}",
                        event.data
                    ))),
                    _ => Ok(LlmStreamEvent::TextDelta(String::new())),
                },
                Err(e) => Ok(LlmStreamEvent::Error(format!("stream error: {e}"))),
            }
        }));

        Ok(converted_stream)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<AnthropicThinking>,
}

#[derive(Debug, Serialize)]
struct AnthropicThinking {
    r#type: String,
    budget_tokens: u32,
}

impl AnthropicThinking {
    fn from_effort(effort: &str) -> Option<Self> {
        let budget = match effort.to_lowercase().as_str() {
            "low" => 1024,
            "medium" => 4096,
            "high" => 16384,
            "xhigh" => 32768,
            _ => return None,
        };

        Some(Self {
            r#type: "enabled".to_string(),
            budget_tokens: budget,
        })
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageStart {
    message: AnthropicMessageInfo,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageInfo {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlockDeltaEvent {
    delta: AnthropicDelta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageDelta {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_effort_maps_known_levels() {
        assert_eq!(AnthropicThinking::from_effort("low").unwrap().budget_tokens, 1024);
        assert_eq!(AnthropicThinking::from_effort("medium").unwrap().budget_tokens, 4096);
        assert_eq!(AnthropicThinking::from_effort("high").unwrap().budget_tokens, 16384);
        assert_eq!(AnthropicThinking::from_effort("xhigh").unwrap().budget_tokens, 32768);
    }

    #[test]
    fn test_from_effort_unknown_returns_none() {
        assert!(AnthropicThinking::from_effort("extreme").is_none());
    }

    #[test]
    fn test_convert_messages_splits_system_prompt() {
        let messages = vec![
            ChatMessage::system("be terse"),
            ChatMessage::user("hello"),
        ];
        let (system, converted) = AnthropicDriver::convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, "user");
    }

    #[test]
    fn test_convert_messages_concatenates_multiple_system_messages() {
        let messages = vec![
            ChatMessage::system("first"),
            ChatMessage::system("second"),
            ChatMessage::user("hello"),
        ];
        let (system, _) = AnthropicDriver::convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("first\nsecond"));
    }
}
