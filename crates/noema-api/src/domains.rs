//! Domain resource and bootstrap workflow routes

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use noema_contracts::{
    BootstrapStatusResponse, ListResponse, OwnerFeedbackRequest, StartDomainBootstrapRequest,
    StartWorkflowResponse, WorkflowInstanceStatus, WorkflowInstanceSummary,
};
use noema_core::visibility::inbox_query;
use noema_core::workflows::{DomainBootstrapInput, DomainBootstrapWorkflow};
use noema_durable::prelude::{
    Pagination as EnginePagination, Workflow, WorkflowExecutor, WorkflowSignal, WorkflowStatus,
};
use noema_durable::PostgresWorkflowEventStore;
use noema_storage::{CreateDomain, Database};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub executor: Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/domains", post(start_domain_bootstrap))
        .route("/domains/:workflow_id/status", get(get_bootstrap_status))
        .route(
            "/domains/:workflow_id/owner-feedback",
            post(submit_owner_feedback),
        )
        .route("/domains/owner/inbox", get(owner_inbox))
        .with_state(state)
}

fn engine_status_to_instance_status(status: WorkflowStatus) -> WorkflowInstanceStatus {
    match status {
        WorkflowStatus::Pending | WorkflowStatus::Running => WorkflowInstanceStatus::Running,
        WorkflowStatus::Completed => WorkflowInstanceStatus::Completed,
        WorkflowStatus::Failed => WorkflowInstanceStatus::Failed,
        WorkflowStatus::Cancelled => WorkflowInstanceStatus::Cancelled,
    }
}

/// POST /domains - start a new knowledge domain's bootstrap workflow
#[utoipa::path(
    post,
    path = "/domains",
    request_body = StartDomainBootstrapRequest,
    responses(
        (status = 201, description = "Bootstrap workflow started", body = StartWorkflowResponse),
        (status = 409, description = "Slug already active"),
        (status = 500, description = "Internal server error")
    ),
    tag = "domains"
)]
pub async fn start_domain_bootstrap(
    State(state): State<AppState>,
    Json(req): Json<StartDomainBootstrapRequest>,
) -> Result<(StatusCode, Json<StartWorkflowResponse>), StatusCode> {
    let domain_id = Uuid::now_v7();
    let slug = req
        .slug
        .clone()
        .unwrap_or_else(|| slugify(&req.title));

    if state.db.slug_is_active(&slug).await.map_err(|e| {
        tracing::error!(error = %e, "failed to check slug uniqueness");
        StatusCode::INTERNAL_SERVER_ERROR
    })? {
        return Err(StatusCode::CONFLICT);
    }

    let input = DomainBootstrapInput {
        domain_id,
        owner_id: req.owner_id.clone(),
        title: req.title.clone(),
        description: req.description.clone(),
        created_at: Utc::now(),
        initial_topics: req.initial_topics.clone(),
        target_audience: req.target_audience.clone(),
        include_historical: req.include_historical,
        include_technical: req.include_technical,
        include_practical: req.include_practical,
    };

    let workflow_id = state
        .executor
        .start_workflow::<DomainBootstrapWorkflow>(input, None)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to start domain_bootstrap workflow");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state
        .db
        .create_domain(CreateDomain {
            id: domain_id,
            owner_id: req.owner_id,
            title: req.title,
            description: req.description,
            slug,
            topics: req.initial_topics,
            quality_criteria: serde_json::to_value(req.quality_requirements).unwrap_or_default(),
            target_audience: req.target_audience,
            workflow_id,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to persist domain row");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(%workflow_id, %domain_id, "domain bootstrap started");

    Ok((
        StatusCode::CREATED,
        Json(StartWorkflowResponse {
            workflow_id,
            status: "researching".to_string(),
            message: "domain bootstrap started".to_string(),
        }),
    ))
}

/// GET /domains/{workflow_id}/status
#[utoipa::path(
    get,
    path = "/domains/{workflow_id}/status",
    params(("workflow_id" = Uuid, Path, description = "Domain bootstrap workflow id")),
    responses(
        (status = 200, description = "Current bootstrap status", body = BootstrapStatusResponse),
        (status = 404, description = "Workflow not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "domains"
)]
pub async fn get_bootstrap_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
) -> Result<Json<BootstrapStatusResponse>, StatusCode> {
    let value = state
        .executor
        .query_workflow(workflow_id, "get_bootstrap_status", serde_json::json!({}))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, %workflow_id, "bootstrap status query failed");
            StatusCode::NOT_FOUND
        })?;

    let response: BootstrapStatusResponse = serde_json::from_value(value).map_err(|e| {
        tracing::error!(error = %e, "malformed bootstrap status");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(response))
}

/// POST /domains/{workflow_id}/owner-feedback
///
/// Business-state outcomes (e.g. the owner rejecting the domain) are still
/// HTTP 200: only transport/store failures get a non-2xx status.
#[utoipa::path(
    post,
    path = "/domains/{workflow_id}/owner-feedback",
    params(("workflow_id" = Uuid, Path, description = "Domain bootstrap workflow id")),
    request_body = OwnerFeedbackRequest,
    responses(
        (status = 200, description = "Feedback accepted", body = BootstrapStatusResponse),
        (status = 404, description = "Workflow not found or already terminal"),
        (status = 500, description = "Internal server error")
    ),
    tag = "domains"
)]
pub async fn submit_owner_feedback(
    State(state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
    Json(req): Json<OwnerFeedbackRequest>,
) -> Result<Json<BootstrapStatusResponse>, StatusCode> {
    let payload = serde_json::json!({
        "approved": req.approved,
        "feedback": req.feedback,
        "question_rankings": req.question_rankings,
        "additional_topics": req.additional_topics,
        "remove_topics": req.remove_topics,
        "quality_requirements": req.quality_requirements,
    });

    state
        .executor
        .send_signal(workflow_id, WorkflowSignal::new("submit_owner_feedback", payload))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, %workflow_id, "owner feedback signal rejected");
            StatusCode::NOT_FOUND
        })?;

    state.executor.process_workflow(workflow_id).await.map_err(|e| {
        tracing::error!(error = %e, %workflow_id, "failed to advance workflow after owner feedback");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let value = state
        .executor
        .query_workflow(workflow_id, "get_bootstrap_status", serde_json::json!({}))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to re-query bootstrap status");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let response: BootstrapStatusResponse = serde_json::from_value(value).map_err(|e| {
        tracing::error!(error = %e, "malformed bootstrap status");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct InboxParams {
    pub owner_id: String,
    pub status: Option<String>,
    pub queue: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

/// GET /domains/owner/inbox - domain workflows visible to an owner
#[utoipa::path(
    get,
    path = "/domains/owner/inbox",
    params(
        ("owner_id" = String, Query, description = "Owner to filter by"),
        ("status" = Option<String>, Query, description = "Filter by business status"),
        ("queue" = Option<String>, Query, description = "Filter by queue"),
        ("limit" = Option<u32>, Query, description = "Max number of results"),
        ("offset" = Option<u32>, Query, description = "Offset for pagination")
    ),
    responses(
        (status = 200, description = "Matching domain workflows", body = ListResponse<WorkflowInstanceSummary>),
        (status = 500, description = "Internal server error")
    ),
    tag = "domains"
)]
pub async fn owner_inbox(
    State(state): State<AppState>,
    Query(params): Query<InboxParams>,
) -> Result<Json<ListResponse<WorkflowInstanceSummary>>, StatusCode> {
    let query = inbox_query(
        Some(DomainBootstrapWorkflow::TYPE),
        Some(&params.owner_id),
        params.queue.as_deref(),
        params.status.as_deref(),
    );

    let page = state
        .executor
        .store()
        .list_workflows(
            query,
            EnginePagination {
                offset: params.offset,
                limit: params.limit,
            },
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list domain workflows");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let data = page
        .items
        .into_iter()
        .map(|s| WorkflowInstanceSummary {
            workflow_id: s.workflow_id,
            workflow_type: s.workflow_type,
            status: engine_status_to_instance_status(s.status),
            start_time: s.start_time,
            search_attributes: serde_json::to_value(s.search_attributes).unwrap_or_default(),
        })
        .collect();

    Ok(Json(ListResponse::new(data)))
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
