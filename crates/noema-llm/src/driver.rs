//! Provider-agnostic streaming chat completion driver
//!
//! Mirrors the driver abstraction this crate is grounded on: a single
//! `LlmDriver` trait implemented once per provider, a streaming response of
//! typed events, and a non-streaming convenience method built on top of it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::{LlmError, Result};
use crate::message::ChatMessage;

/// Type alias for the LLM response stream
pub type LlmResponseStream = Pin<Box<dyn Stream<Item = Result<LlmStreamEvent>> + Send>>;

/// Events emitted during LLM streaming
#[derive(Debug, Clone)]
pub enum LlmStreamEvent {
    /// Incremental text content
    TextDelta(String),
    /// Streaming completed
    Done(LlmCompletionMetadata),
    /// Error surfaced mid-stream
    Error(String),
}

/// Metadata about a completed LLM call
#[derive(Debug, Clone, Default)]
pub struct LlmCompletionMetadata {
    pub total_tokens: Option<u32>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
}

/// Configuration for a single chat completion call
#[derive(Debug, Clone)]
pub struct LlmCallConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Reasoning effort for models that support extended thinking (low, medium, high, xhigh)
    pub reasoning_effort: Option<String>,
}

/// Non-streaming response assembled from a completed stream
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub metadata: LlmCompletionMetadata,
}

/// Trait implemented once per LLM provider
///
/// Implementations handle provider-specific request shaping and SSE parsing;
/// callers work only in terms of [`ChatMessage`] and [`LlmCallConfig`].
#[async_trait]
pub trait LlmDriver: Send + Sync {
    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream>;

    /// Drive the stream to completion and return the assembled text
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponse> {
        let mut stream = self.chat_completion_stream(messages, config).await?;
        let mut text = String::new();
        let mut metadata = LlmCompletionMetadata::default();

        while let Some(event) = stream.next().await {
            match event? {
                LlmStreamEvent::TextDelta(delta) => text.push_str(&delta),
                LlmStreamEvent::Done(meta) => metadata = meta,
                LlmStreamEvent::Error(err) => return Err(LlmError::UpstreamUnavailable(err)),
            }
        }

        Ok(LlmResponse { text, metadata })
    }

    /// Convenience wrapper that drives the stream and parses the assembled
    /// text as JSON, matching the schema-validated output every LLM-backed
    /// activity requires.
    async fn chat_completion_json(
        &self,
        messages: Vec<ChatMessage>,
        config: &LlmCallConfig,
    ) -> Result<serde_json::Value> {
        let response = self.chat_completion(messages, config).await?;
        serde_json::from_str(response.text.trim())
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))
    }
}

pub type BoxedLlmDriver = Box<dyn LlmDriver>;
