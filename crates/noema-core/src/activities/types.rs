//! Activity input/output types
//!
//! Every LLM-backed activity's output is schema-validated: the model's raw
//! text is parsed as JSON and deserialized into the typed struct here before
//! the activity returns, so a malformed response never threads further as a
//! raw string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================
// research_domain
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchDomainInput {
    pub domain_name: String,
    pub description: String,
    #[serde(default)]
    pub initial_topics: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    #[serde(default)]
    pub include_historical: bool,
    #[serde(default)]
    pub include_technical: bool,
    #[serde(default)]
    pub include_practical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchDomainOutput {
    pub summary: String,
    pub topics: Vec<String>,
    pub quality_criteria: serde_json::Value,
    pub knowledge_gaps: Vec<String>,
    pub sources: Vec<String>,
    pub recommendations: Vec<String>,
}

// ============================================
// analyze_research
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResearchInput {
    pub domain_name: String,
    pub research: ResearchDomainOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResearchOutput {
    pub topics: Vec<String>,
    pub quality_criteria: serde_json::Value,
    pub search_attributes: serde_json::Value,
    pub bootstrap_prompt: String,
    pub research_steps: Vec<String>,
    pub target_audience: Vec<String>,
}

// ============================================
// generate_example_questions
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateExampleQuestionsInput {
    pub domain_name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleQuestion {
    pub question: String,
    pub category: String,
    pub difficulty: String,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateExampleQuestionsOutput {
    pub questions: Vec<ExampleQuestion>,
}

// ============================================
// index_domain
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDomainInput {
    pub domain_id: Uuid,
    pub domain_name: String,
    pub topics: Vec<String>,
    pub quality_criteria: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDomainOutput {
    pub vector_id: String,
    pub graph_updated: bool,
}

// ============================================
// assess_document_relevance
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessDocumentRelevanceInput {
    pub document_id: Uuid,
    pub file_ref: String,
    pub domain_criteria: serde_json::Value,
    pub model_tier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessDocumentRelevanceOutput {
    pub relevance_score: f64,
    pub is_relevant: bool,
    pub summary: String,
    pub key_points: Vec<String>,
    pub topics: Vec<String>,
    pub quality_indicators: serde_json::Value,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

// ============================================
// extract_text
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractTextInput {
    pub document_id: Uuid,
    pub file_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractTextOutput {
    pub text: String,
    pub chunks: Vec<String>,
    pub metadata: serde_json::Value,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
}

// ============================================
// generate_embeddings
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateEmbeddingsInput {
    pub chunks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateEmbeddingsOutput {
    pub embeddings: Vec<Vec<f32>>,
}

// ============================================
// index_weaviate
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexWeaviateInput {
    pub document_id: Uuid,
    pub domain_id: Uuid,
    pub chunks: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexWeaviateOutput {
    pub vector_id: String,
    pub chunk_count: usize,
}

// ============================================
// update_graph
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGraphInput {
    pub document_id: Uuid,
    pub domain_id: Uuid,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGraphOutput {
    pub ok: bool,
}

// ============================================
// notify_contributor
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyContributorInput {
    pub contributor_id: String,
    pub decision: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyContributorOutput {
    pub delivered: bool,
}

// ============================================
// send_signal_persistent
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSignalPersistentInput {
    pub user_id: String,
    pub workflow_id: Uuid,
    pub signal_type: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSignalPersistentOutput {
    pub ok: bool,
}
