//! LLM-backed activities
//!
//! Each activity builds a prompt, calls the driver for the tier's default
//! model, and schema-validates the response by deserializing the assembled
//! JSON into its typed output. A deserialization failure becomes
//! `ActivityError::malformed_response`, never a raw string passed along.

use std::sync::Arc;

use async_trait::async_trait;
use noema_durable::prelude::{Activity, ActivityContext, ActivityError};
use noema_llm::{ChatMessage, LlmCallConfig, LlmDriver};

use super::types::*;

fn malformed_response(context: &str, err: impl std::fmt::Display) -> ActivityError {
    ActivityError::non_retryable(format!("malformed response from {context}: {err}"))
        .with_type("MalformedResponse")
}

fn tier_config(tier: noema_llm::ModelTier, reasoning_effort: Option<String>) -> LlmCallConfig {
    let cfg = tier.config();
    LlmCallConfig {
        model: cfg.model.to_string(),
        temperature: Some(cfg.temperature),
        max_tokens: Some(cfg.max_tokens),
        reasoning_effort,
    }
}

pub struct ResearchDomainActivity {
    pub driver: Arc<dyn LlmDriver>,
}

#[async_trait]
impl Activity for ResearchDomainActivity {
    const TYPE: &'static str = "research_domain";
    type Input = ResearchDomainInput;
    type Output = ResearchDomainOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let tier = noema_llm::ModelTier::default_for_task("research_domain");
        let config = tier_config(tier, None);

        let messages = vec![
            ChatMessage::system(
                "You are a domain research assistant. Respond with a single JSON object \
                 matching {summary, topics[], quality_criteria, knowledge_gaps[], sources[], \
                 recommendations[]}. No prose outside the JSON.",
            ),
            ChatMessage::user(format!(
                "Research the knowledge domain \"{}\".\nDescription: {}\nInitial topics: {:?}\n\
                 Target audience: {:?}\nInclude historical context: {}\nInclude technical depth: {}\n\
                 Include practical guidance: {}",
                input.domain_name,
                input.description,
                input.initial_topics,
                input.target_audience,
                input.include_historical,
                input.include_technical,
                input.include_practical,
            )),
        ];

        let value = self
            .driver
            .chat_completion_json(messages, &config)
            .await
            .map_err(|e| ActivityError::retryable(e.to_string()).with_type("UpstreamUnavailable"))?;

        serde_json::from_value(value).map_err(|e| malformed_response("research_domain", e))
    }
}

pub struct AnalyzeResearchActivity {
    pub driver: Arc<dyn LlmDriver>,
}

#[async_trait]
impl Activity for AnalyzeResearchActivity {
    const TYPE: &'static str = "analyze_research";
    type Input = AnalyzeResearchInput;
    type Output = AnalyzeResearchOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let tier = noema_llm::ModelTier::default_for_task("analyze_research");
        let config = tier_config(tier, None);

        let research_json = serde_json::to_string(&input.research)
            .map_err(|e| malformed_response("analyze_research input", e))?;

        let messages = vec![
            ChatMessage::system(
                "You turn domain research into a bootstrap configuration. Respond with a \
                 single JSON object matching {topics[], quality_criteria, search_attributes, \
                 bootstrap_prompt, research_steps[], target_audience[]}. No prose outside the JSON.",
            ),
            ChatMessage::user(format!(
                "Domain: {}\nResearch output: {}",
                input.domain_name, research_json
            )),
        ];

        let value = self
            .driver
            .chat_completion_json(messages, &config)
            .await
            .map_err(|e| ActivityError::retryable(e.to_string()).with_type("UpstreamUnavailable"))?;

        serde_json::from_value(value).map_err(|e| malformed_response("analyze_research", e))
    }
}

pub struct GenerateExampleQuestionsActivity {
    pub driver: Arc<dyn LlmDriver>,
}

#[async_trait]
impl Activity for GenerateExampleQuestionsActivity {
    const TYPE: &'static str = "generate_example_questions";
    type Input = GenerateExampleQuestionsInput;
    type Output = GenerateExampleQuestionsOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let tier = noema_llm::ModelTier::default_for_task("generate_example_questions");
        let config = tier_config(tier, None);

        let messages = vec![
            ChatMessage::system(
                "Generate example questions a user might ask within a knowledge domain. \
                 Respond with a single JSON object {questions: [{question, category, \
                 difficulty, relevance_score}]}. No prose outside the JSON.",
            ),
            ChatMessage::user(format!(
                "Domain: {}\nDescription: {}",
                input.domain_name, input.description
            )),
        ];

        let value = self
            .driver
            .chat_completion_json(messages, &config)
            .await
            .map_err(|e| ActivityError::retryable(e.to_string()).with_type("UpstreamUnavailable"))?;

        serde_json::from_value(value)
            .map_err(|e| malformed_response("generate_example_questions", e))
    }
}

pub struct AssessDocumentRelevanceActivity {
    pub driver: Arc<dyn LlmDriver>,
}

#[async_trait]
impl Activity for AssessDocumentRelevanceActivity {
    const TYPE: &'static str = "assess_document_relevance";
    type Input = AssessDocumentRelevanceInput;
    type Output = AssessDocumentRelevanceOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let tier: noema_llm::ModelTier = input
            .model_tier
            .parse()
            .unwrap_or_else(|_| noema_llm::ModelTier::default_for_task("assess_document_relevance"));
        let config = tier_config(tier, None);

        let criteria_json = serde_json::to_string(&input.domain_criteria)
            .map_err(|e| malformed_response("assess_document_relevance input", e))?;

        let messages = vec![
            ChatMessage::system(
                "Score a contributed document's relevance to a knowledge domain on a 0-10 \
                 scale. Respond with a single JSON object {relevance_score, is_relevant, \
                 summary, key_points[], topics[], quality_indicators, rejection_reason?}. \
                 No prose outside the JSON.",
            ),
            ChatMessage::user(format!(
                "Document reference: {}\nDomain quality criteria: {}",
                input.file_ref, criteria_json
            )),
        ];

        let value = self
            .driver
            .chat_completion_json(messages, &config)
            .await
            .map_err(|e| {
                ActivityError::retryable(e.to_string()).with_type("UpstreamUnavailable")
            })?;

        let output: AssessDocumentRelevanceOutput =
            serde_json::from_value(value).map_err(|e| malformed_response("assess_document_relevance", e))?;

        if !(0.0..=10.0).contains(&output.relevance_score) {
            return Err(
                ActivityError::non_retryable("relevance_score out of [0,10] range")
                    .with_type("MalformedResponse"),
            );
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use noema_llm::{LlmCompletionMetadata, LlmResponseStream, LlmStreamEvent};

    struct StubDriver {
        json: &'static str,
    }

    #[async_trait]
    impl LlmDriver for StubDriver {
        async fn chat_completion_stream(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &LlmCallConfig,
        ) -> noema_llm::Result<LlmResponseStream> {
            let json = self.json.to_string();
            let events = vec![
                Ok(LlmStreamEvent::TextDelta(json)),
                Ok(LlmStreamEvent::Done(LlmCompletionMetadata::default())),
            ];
            Ok(Box::pin(stream::iter(events)))
        }
    }

    fn ctx() -> ActivityContext {
        ActivityContext::new(uuid::Uuid::nil(), "a".to_string(), 1, 3)
    }

    #[tokio::test]
    async fn test_research_domain_parses_valid_response() {
        let activity = ResearchDomainActivity {
            driver: Arc::new(StubDriver {
                json: r#"{"summary":"s","topics":["a"],"quality_criteria":{},"knowledge_gaps":[],"sources":[],"recommendations":[]}"#,
            }),
        };

        let result = activity
            .execute(
                &ctx(),
                ResearchDomainInput {
                    domain_name: "rust".into(),
                    description: "the rust language".into(),
                    initial_topics: vec![],
                    target_audience: vec![],
                    include_historical: false,
                    include_technical: true,
                    include_practical: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.summary, "s");
        assert_eq!(result.topics, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_research_domain_rejects_malformed_json() {
        let activity = ResearchDomainActivity {
            driver: Arc::new(StubDriver { json: "not json" }),
        };

        let err = activity
            .execute(
                &ctx(),
                ResearchDomainInput {
                    domain_name: "rust".into(),
                    description: "d".into(),
                    initial_topics: vec![],
                    target_audience: vec![],
                    include_historical: false,
                    include_technical: false,
                    include_practical: false,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_type.as_deref(), Some("MalformedResponse"));
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_assess_document_relevance_rejects_out_of_range_score() {
        let activity = AssessDocumentRelevanceActivity {
            driver: Arc::new(StubDriver {
                json: r#"{"relevance_score":15.0,"is_relevant":true,"summary":"s","key_points":[],"topics":[],"quality_indicators":{}}"#,
            }),
        };

        let err = activity
            .execute(
                &ctx(),
                AssessDocumentRelevanceInput {
                    document_id: uuid::Uuid::nil(),
                    file_ref: "f".into(),
                    domain_criteria: serde_json::json!({}),
                    model_tier: "balanced".into(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.error_type.as_deref(), Some("MalformedResponse"));
    }
}
