// Domain resource DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::{QualityCriteria, ResearchDepth};

/// Lifecycle status of a knowledge domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Proposed,
    Researching,
    Analyzing,
    AwaitingOwner,
    Active,
    Rejected,
    Failed,
}

impl std::fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DomainStatus::Proposed => "proposed",
            DomainStatus::Researching => "researching",
            DomainStatus::Analyzing => "analyzing",
            DomainStatus::AwaitingOwner => "awaiting_owner",
            DomainStatus::Active => "active",
            DomainStatus::Rejected => "rejected",
            DomainStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DomainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(Self::Proposed),
            "researching" => Ok(Self::Researching),
            "analyzing" => Ok(Self::Analyzing),
            "awaiting_owner" => Ok(Self::AwaitingOwner),
            "active" => Ok(Self::Active),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown domain status: {other}")),
        }
    }
}

/// A knowledge domain, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Domain {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub status: DomainStatus,
    pub topics: Vec<String>,
    pub quality_criteria: QualityCriteria,
    pub target_audience: Vec<String>,
    pub workflow_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /domains`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartDomainBootstrapRequest {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub initial_topics: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    #[serde(default)]
    pub research_focus: Option<String>,
    #[serde(default)]
    pub quality_requirements: QualityCriteria,
    #[serde(default)]
    pub research_depth: ResearchDepth,
    #[serde(default)]
    pub include_historical: bool,
    #[serde(default)]
    pub include_technical: bool,
    #[serde(default)]
    pub include_practical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartWorkflowResponse {
    pub workflow_id: Uuid,
    pub status: String,
    pub message: String,
}

/// Body of `POST /domains/{workflow_id}/owner-feedback`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnerFeedbackRequest {
    pub approved: bool,
    #[serde(default)]
    pub feedback: serde_json::Value,
    #[serde(default)]
    pub question_rankings: Vec<serde_json::Value>,
    #[serde(default)]
    pub additional_topics: Vec<String>,
    #[serde(default)]
    pub remove_topics: Vec<String>,
    #[serde(default)]
    pub quality_requirements: Option<QualityCriteria>,
}

/// Response of `GET /domains/{workflow_id}/status`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BootstrapStatusResponse {
    pub status: DomainStatus,
    pub research_results: Option<serde_json::Value>,
    pub analysis_results: Option<serde_json::Value>,
    pub domain_config: Option<serde_json::Value>,
    pub example_questions: Option<Vec<serde_json::Value>>,
    pub owner_feedback: Option<serde_json::Value>,
    pub owner_approved: Option<bool>,
    pub error_message: Option<String>,
}
