// Signal / inbox resource DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of signal emitted by a workflow transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    StatusUpdate,
    Progress,
    Completion,
    Error,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalType::StatusUpdate => "status_update",
            SignalType::Progress => "progress",
            SignalType::Completion => "completion",
            SignalType::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status_update" => Ok(Self::StatusUpdate),
            "progress" => Ok(Self::Progress),
            "completion" => Ok(Self::Completion),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown signal_type: {other}")),
        }
    }
}

/// A signal delivered to a user's inbox, pushed live when a subscriber is
/// connected and always durably appended regardless
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Signal {
    pub id: Uuid,
    pub user_id: String,
    pub workflow_id: Uuid,
    pub signal_type: SignalType,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub signal_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InboxQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}
