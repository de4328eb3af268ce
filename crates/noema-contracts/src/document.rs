// Document resource DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a contributed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Analyzing,
    PendingReview,
    Approved,
    Rejected,
    Indexed,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Analyzing => "analyzing",
            DocumentStatus::PendingReview => "pending_review",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Indexed => "indexed",
            DocumentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "analyzing" => Ok(Self::Analyzing),
            "pending_review" => Ok(Self::PendingReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "indexed" => Ok(Self::Indexed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown document status: {other}")),
        }
    }
}

/// Structured relevance analysis produced by `assess_document_relevance`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub key_points: Vec<String>,
    pub topics: Vec<String>,
    pub quality_indicators: serde_json::Value,
    pub rejection_reason: Option<String>,
}

/// Where an indexed document landed in the vector/graph stores
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexRefs {
    pub vector_id: Option<String>,
    pub graph_updated: bool,
}

impl Default for IndexRefs {
    fn default() -> Self {
        Self {
            vector_id: None,
            graph_updated: false,
        }
    }
}

/// A contributed document, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Document {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub contributor_id: String,
    pub file_ref: String,
    pub status: DocumentStatus,
    pub relevance_score: Option<f64>,
    pub analysis: Option<DocumentAnalysis>,
    pub index_refs: Option<IndexRefs>,
    pub workflow_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /documents`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartDocumentContributionRequest {
    pub domain_id: Uuid,
    pub contributor_id: String,
    pub file_ref: String,
    #[serde(default)]
    pub auto_approve_threshold: Option<f64>,
    #[serde(default)]
    pub reject_threshold: Option<f64>,
    #[serde(default)]
    pub controller_pool: Option<Vec<String>>,
}

/// Body of `POST /workflows/{id}/controller-decision`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ControllerDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ControllerDecisionRequest {
    pub decision: ControllerDecision,
    pub controller_id: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Response of `GET /documents/{workflow_id}/status`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContributionStatusResponse {
    pub status: DocumentStatus,
    pub relevance_score: Option<f64>,
    pub analysis: Option<DocumentAnalysis>,
    pub controller_decision: Option<ControllerDecision>,
    pub controller_id: Option<String>,
}
