//! Provider-agnostic LLM abstraction
//!
//! A small, closed abstraction over chat-completion providers: a single
//! [`LlmDriver`] trait, streaming events, and a fixed set of named
//! [`ModelTier`]s that activities select by task rather than by model name
//! directly.

mod anthropic;
mod driver;
mod error;
mod message;
mod openai;
mod tier;

pub use anthropic::AnthropicDriver;
pub use driver::{
    BoxedLlmDriver, LlmCallConfig, LlmCompletionMetadata, LlmDriver, LlmResponse,
    LlmResponseStream, LlmStreamEvent,
};
pub use error::{LlmError, Result};
pub use message::{ChatMessage, ChatRole};
pub use openai::OpenAiDriver;
pub use tier::{ModelTier, TierConfig};

/// Which provider backs a driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAi,
    Anthropic,
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAi),
            "anthropic" => Ok(ProviderType::Anthropic),
            other => Err(format!("unknown LLM provider: {other}")),
        }
    }
}

/// Build a boxed driver for the given provider from an API key
pub fn create_driver(provider: ProviderType, api_key: impl Into<String>) -> BoxedLlmDriver {
    match provider {
        ProviderType::OpenAi => Box::new(OpenAiDriver::new(api_key)),
        ProviderType::Anthropic => Box::new(AnthropicDriver::new(api_key)),
    }
}

/// Build a boxed driver for `config.model`'s tier, resolving the provider
/// and API key from the environment
pub fn create_driver_from_env(provider: ProviderType) -> Result<BoxedLlmDriver> {
    match provider {
        ProviderType::OpenAi => Ok(Box::new(OpenAiDriver::from_env()?)),
        ProviderType::Anthropic => Ok(Box::new(AnthropicDriver::from_env()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_roundtrip() {
        assert_eq!("openai".parse::<ProviderType>().unwrap(), ProviderType::OpenAi);
        assert_eq!(
            "anthropic".parse::<ProviderType>().unwrap(),
            ProviderType::Anthropic
        );
        assert!("bedrock".parse::<ProviderType>().is_err());
    }
}
