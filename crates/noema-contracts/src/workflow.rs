// Workflow instance DTOs and the shared vocabulary of search-attribute keys
//
// Workflows are the sole writers of these keys (§4.6); every other crate
// treats them as read-only string constants so a typo doesn't silently split
// an inbox query from the attribute a workflow actually wrote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod attr {
    pub const ASSIGNEE: &str = "Assignee";
    pub const QUEUE: &str = "Queue";
    pub const STATUS: &str = "Status";
    pub const PRIORITY: &str = "Priority";
    pub const DUE_AT: &str = "DueAt";
    pub const DOMAIN_ID: &str = "DomainId";
    pub const DOMAIN_NAME: &str = "DomainName";
    pub const OWNER_ID: &str = "OwnerId";
    pub const DOCUMENT_ID: &str = "DocumentId";
    pub const CONTRIBUTOR_ID: &str = "ContributorId";
    pub const RELEVANCE_SCORE: &str = "RelevanceScore";
    pub const CREATED_AT: &str = "CreatedAt";
}

pub mod queue {
    pub const DOMAIN_BOOTSTRAP: &str = "domain-bootstrap";
    pub const DOCUMENT_ANALYSIS: &str = "document-analysis";
    pub const AI_PROCESSING: &str = "ai-processing";
    pub const STORAGE: &str = "storage";
    pub const GENERAL: &str = "general";
}

/// Engine-level status of a workflow instance (distinct from the workflow's
/// own business `Status` search attribute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowInstanceStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

/// Summary returned by `Describe`/`ListWorkflows`, projected from the search
/// attribute set a workflow has upserted so far
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowInstanceSummary {
    pub workflow_id: Uuid,
    pub workflow_type: String,
    pub status: WorkflowInstanceStatus,
    pub start_time: DateTime<Utc>,
    pub search_attributes: serde_json::Value,
}

/// Query body for listing workflows filtered by the visibility projection
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ListWorkflowsRequest {
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}
