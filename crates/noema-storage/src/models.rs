//! Database row types (internal, may differ from the public contracts DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Domains
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct DomainRow {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub status: String,
    #[sqlx(json)]
    pub topics: Vec<String>,
    pub quality_criteria: sqlx::types::JsonValue,
    #[sqlx(json)]
    pub target_audience: Vec<String>,
    pub search_attributes: sqlx::types::JsonValue,
    pub workflow_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDomain {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub topics: Vec<String>,
    pub quality_criteria: serde_json::Value,
    pub target_audience: Vec<String>,
    pub workflow_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDomain {
    pub status: Option<String>,
    pub search_attributes: Option<serde_json::Value>,
}

// ============================================
// Documents
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub contributor_id: String,
    pub file_ref: String,
    pub status: String,
    pub relevance_score: Option<f64>,
    pub analysis: Option<sqlx::types::JsonValue>,
    pub index_refs: Option<sqlx::types::JsonValue>,
    pub workflow_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub contributor_id: String,
    pub file_ref: String,
    pub workflow_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDocument {
    pub status: Option<String>,
    pub relevance_score: Option<f64>,
    pub analysis: Option<serde_json::Value>,
    pub index_refs: Option<serde_json::Value>,
}

// ============================================
// Signals (per-user inbox)
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct SignalRow {
    pub id: Uuid,
    pub user_id: String,
    pub workflow_id: Uuid,
    pub signal_type: String,
    pub data: sqlx::types::JsonValue,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateSignal {
    pub id: Uuid,
    pub user_id: String,
    pub workflow_id: Uuid,
    pub signal_type: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
