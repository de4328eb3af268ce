//! Search-attribute projection helpers
//!
//! Workflows are the sole writers of their search attributes; this module
//! only builds the attribute maps and query filters workflows and inboxes
//! use, and the deterministic controller tie-break the Document Contribution
//! Workflow needs at start.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use noema_contracts::workflow::attr;
use noema_durable::prelude::WorkflowQuery;
use serde_json::Value;

/// Builds an `Assignee = ... AND Queue = ... AND Status = ...` style query,
/// the pattern every inbox view issues against the visibility projection.
pub fn inbox_query(
    workflow_type: Option<&str>,
    assignee: Option<&str>,
    queue: Option<&str>,
    status: Option<&str>,
) -> WorkflowQuery {
    let mut query = WorkflowQuery::default();
    if let Some(t) = workflow_type {
        query = query.with_type(t);
    }
    if let Some(a) = assignee {
        query = query.eq(attr::ASSIGNEE, Value::String(a.to_string()));
    }
    if let Some(q) = queue {
        query = query.eq(attr::QUEUE, Value::String(q.to_string()));
    }
    if let Some(s) = status {
        query = query.eq(attr::STATUS, Value::String(s.to_string()));
    }
    query
}

/// A candidate controller and its current open-review load, used to pick a
/// deterministic assignee for the Document Contribution Workflow.
#[derive(Debug, Clone)]
pub struct ControllerLoad {
    pub controller_id: String,
    pub open_reviews: u32,
}

/// Picks the controller with the lowest open-review load, breaking ties by
/// lexicographically smallest id. Fixed at workflow start so the same input
/// always yields the same assignee on replay.
pub fn choose_controller(pool: &[ControllerLoad], owner_id: &str) -> String {
    pool.iter()
        .min_by(|a, b| {
            a.open_reviews
                .cmp(&b.open_reviews)
                .then_with(|| a.controller_id.cmp(&b.controller_id))
        })
        .map(|c| c.controller_id.clone())
        .unwrap_or_else(|| owner_id.to_string())
}

pub fn due_at(now: DateTime<Utc>, timeout: chrono::Duration) -> DateTime<Utc> {
    now + timeout
}

/// Common domain-bootstrap attribute set, built fresh at every transition
/// per §4.6 ("every workflow MUST upsert Status at every business-state
/// transition").
pub fn bootstrap_attrs(
    status: &str,
    domain_id: uuid::Uuid,
    domain_name: &str,
    owner_id: &str,
) -> BTreeMap<String, Value> {
    let mut attrs = BTreeMap::new();
    attrs.insert(attr::STATUS.to_string(), Value::String(status.to_string()));
    attrs.insert(
        attr::QUEUE.to_string(),
        Value::String(noema_contracts::workflow::queue::DOMAIN_BOOTSTRAP.to_string()),
    );
    attrs.insert(
        attr::ASSIGNEE.to_string(),
        Value::String(owner_id.to_string()),
    );
    attrs.insert(
        attr::DOMAIN_ID.to_string(),
        Value::String(domain_id.to_string()),
    );
    attrs.insert(
        attr::DOMAIN_NAME.to_string(),
        Value::String(domain_name.to_string()),
    );
    attrs.insert(
        attr::OWNER_ID.to_string(),
        Value::String(owner_id.to_string()),
    );
    attrs
}

pub fn contribution_attrs(
    status: &str,
    document_id: uuid::Uuid,
    domain_id: uuid::Uuid,
    contributor_id: &str,
) -> BTreeMap<String, Value> {
    let mut attrs = BTreeMap::new();
    attrs.insert(attr::STATUS.to_string(), Value::String(status.to_string()));
    attrs.insert(
        attr::QUEUE.to_string(),
        Value::String(noema_contracts::workflow::queue::DOCUMENT_ANALYSIS.to_string()),
    );
    attrs.insert(
        attr::DOCUMENT_ID.to_string(),
        Value::String(document_id.to_string()),
    );
    attrs.insert(
        attr::DOMAIN_ID.to_string(),
        Value::String(domain_id.to_string()),
    );
    attrs.insert(
        attr::CONTRIBUTOR_ID.to_string(),
        Value::String(contributor_id.to_string()),
    );
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_controller_picks_lowest_load() {
        let pool = vec![
            ControllerLoad {
                controller_id: "c-2".into(),
                open_reviews: 3,
            },
            ControllerLoad {
                controller_id: "c-1".into(),
                open_reviews: 1,
            },
        ];

        assert_eq!(choose_controller(&pool, "owner"), "c-1");
    }

    #[test]
    fn test_choose_controller_breaks_ties_by_id() {
        let pool = vec![
            ControllerLoad {
                controller_id: "c-2".into(),
                open_reviews: 1,
            },
            ControllerLoad {
                controller_id: "c-1".into(),
                open_reviews: 1,
            },
        ];

        assert_eq!(choose_controller(&pool, "owner"), "c-1");
    }

    #[test]
    fn test_choose_controller_falls_back_to_owner_when_pool_empty() {
        assert_eq!(choose_controller(&[], "owner-9"), "owner-9");
    }
}
