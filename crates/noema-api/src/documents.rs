//! Document contribution resource and workflow routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use noema_contracts::{
    ContributionStatusResponse, ControllerDecision, ControllerDecisionRequest, DocumentStatus,
    StartDocumentContributionRequest, StartWorkflowResponse,
};
use noema_core::visibility::ControllerLoad;
use noema_core::workflows::{DocumentContributionInput, DocumentContributionWorkflow};
use noema_durable::prelude::{WorkflowExecutor, WorkflowSignal};
use noema_durable::PostgresWorkflowEventStore;
use noema_storage::{CreateDocument, Database};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub executor: Arc<WorkflowExecutor<PostgresWorkflowEventStore>>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/documents", post(start_document_contribution))
        .route("/documents/:workflow_id/status", get(get_contribution_status))
        .route(
            "/workflows/:workflow_id/controller-decision",
            post(submit_controller_decision),
        )
        .with_state(state)
}

fn default_model_tier() -> String {
    "balanced".to_string()
}

/// The workflow's internal state names are finer-grained than the public
/// `DocumentStatus` (it distinguishes the transient `auto_approved`/
/// `auto_rejected` states from the human-reviewed `approved`/`rejected`
/// ones so replay can tell them apart); this collapses them onto the
/// DTO's seven statuses.
fn document_status_from_state_name(name: &str) -> DocumentStatus {
    match name {
        "uploaded" => DocumentStatus::Pending,
        "analyzing" => DocumentStatus::Analyzing,
        "pending_review" => DocumentStatus::PendingReview,
        "auto_approved" | "approved" => DocumentStatus::Approved,
        "auto_rejected" | "rejected" => DocumentStatus::Rejected,
        "indexed" => DocumentStatus::Indexed,
        _ => DocumentStatus::Failed,
    }
}

/// The workflow's `controller_decision` query field is the internal
/// `{approved, feedback, controller_id}` shape, not the public
/// approve/reject enum; this reads the `approved` flag out of it directly
/// rather than deserializing the whole object into `ControllerDecision`.
fn parse_contribution_status(
    value: serde_json::Value,
) -> Result<ContributionStatusResponse, serde_json::Error> {
    let status = value
        .get("status")
        .and_then(|v| v.as_str())
        .map(document_status_from_state_name)
        .unwrap_or(DocumentStatus::Failed);

    let relevance_score = value.get("relevance_score").and_then(|v| v.as_f64());

    let analysis = match value.get("analysis") {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())?,
        _ => None,
    };

    let controller_decision = value
        .get("controller_decision")
        .and_then(|v| v.get("approved"))
        .and_then(|v| v.as_bool())
        .map(|approved| {
            if approved {
                ControllerDecision::Approve
            } else {
                ControllerDecision::Reject
            }
        });

    let controller_id = value
        .get("controller_id")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(ContributionStatusResponse {
        status,
        relevance_score,
        analysis,
        controller_decision,
        controller_id,
    })
}

/// POST /documents - contribute a document to a knowledge domain
#[utoipa::path(
    post,
    path = "/documents",
    request_body = StartDocumentContributionRequest,
    responses(
        (status = 201, description = "Contribution workflow started", body = StartWorkflowResponse),
        (status = 404, description = "Domain not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "documents"
)]
pub async fn start_document_contribution(
    State(state): State<AppState>,
    Json(req): Json<StartDocumentContributionRequest>,
) -> Result<(StatusCode, Json<StartWorkflowResponse>), StatusCode> {
    let domain = state
        .db
        .get_domain(req.domain_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to look up domain for contribution");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let document_id = Uuid::now_v7();
    let controller_pool = req
        .controller_pool
        .unwrap_or_default()
        .into_iter()
        .map(|controller_id| ControllerLoad {
            controller_id,
            open_reviews: 0,
        })
        .collect();

    let input = DocumentContributionInput {
        document_id,
        domain_id: req.domain_id,
        contributor_id: req.contributor_id.clone(),
        owner_id: domain.owner_id,
        file_ref: req.file_ref.clone(),
        domain_criteria: domain.quality_criteria,
        model_tier: default_model_tier(),
        auto_approve_threshold: req.auto_approve_threshold.unwrap_or(8.0),
        reject_threshold: req.reject_threshold.unwrap_or(7.0),
        controller_pool,
    };

    let workflow_id = state
        .executor
        .start_workflow::<DocumentContributionWorkflow>(input, None)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to start document_contribution workflow");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state
        .db
        .create_document(CreateDocument {
            id: document_id,
            domain_id: req.domain_id,
            contributor_id: req.contributor_id,
            file_ref: req.file_ref,
            workflow_id,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to persist document row");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(%workflow_id, %document_id, "document contribution started");

    Ok((
        StatusCode::CREATED,
        Json(StartWorkflowResponse {
            workflow_id,
            status: "analyzing".to_string(),
            message: "document contribution started".to_string(),
        }),
    ))
}

/// GET /documents/{workflow_id}/status
#[utoipa::path(
    get,
    path = "/documents/{workflow_id}/status",
    params(("workflow_id" = Uuid, Path, description = "Document contribution workflow id")),
    responses(
        (status = 200, description = "Current contribution status", body = ContributionStatusResponse),
        (status = 404, description = "Workflow not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "documents"
)]
pub async fn get_contribution_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
) -> Result<Json<ContributionStatusResponse>, StatusCode> {
    let value = state
        .executor
        .query_workflow(workflow_id, "get_status", serde_json::json!({}))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, %workflow_id, "contribution status query failed");
            StatusCode::NOT_FOUND
        })?;

    let response = parse_contribution_status(value).map_err(|e| {
        tracing::error!(error = %e, "malformed contribution status");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(response))
}

/// POST /workflows/{id}/controller-decision
///
/// Business-state outcomes (approve/reject) are still HTTP 200: only
/// transport/store failures get a non-2xx status.
#[utoipa::path(
    post,
    path = "/workflows/{workflow_id}/controller-decision",
    params(("workflow_id" = Uuid, Path, description = "Document contribution workflow id")),
    request_body = ControllerDecisionRequest,
    responses(
        (status = 200, description = "Decision accepted", body = ContributionStatusResponse),
        (status = 404, description = "Workflow not found or already terminal"),
        (status = 500, description = "Internal server error")
    ),
    tag = "documents"
)]
pub async fn submit_controller_decision(
    State(state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
    Json(req): Json<ControllerDecisionRequest>,
) -> Result<Json<ContributionStatusResponse>, StatusCode> {
    let payload = serde_json::json!({
        "approved": matches!(req.decision, noema_contracts::ControllerDecision::Approve),
        "feedback": req.feedback,
        "controller_id": req.controller_id,
    });

    state
        .executor
        .send_signal(workflow_id, WorkflowSignal::new("submit_review", payload))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, %workflow_id, "controller decision signal rejected");
            StatusCode::NOT_FOUND
        })?;

    state.executor.process_workflow(workflow_id).await.map_err(|e| {
        tracing::error!(error = %e, %workflow_id, "failed to advance workflow after controller decision");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let value = state
        .executor
        .query_workflow(workflow_id, "get_status", serde_json::json!({}))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to re-query contribution status");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let response = parse_contribution_status(value).map_err(|e| {
        tracing::error!(error = %e, "malformed contribution status");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(response))
}
