//! Signal inbox HTTP routes
//!
//! All endpoints here are scoped to a caller-supplied `user_id`; there is no
//! authentication layer in front of them (out of scope per the platform's
//! non-goals), so the caller is trusted to supply its own identity the same
//! way `contributor_id`/`owner_id` are supplied elsewhere in this API.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use noema_contracts::{ListResponse, Signal};
use noema_core::SignalService;
use noema_storage::Pagination;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub signals: Arc<SignalService>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/inbox/signals", get(list_signals))
        .route("/inbox/signals/unread-count", get(unread_count))
        .route("/inbox/signals/:id/read", post(mark_read))
        .route("/inbox/signals/mark-all-read", post(mark_all_read))
        .route("/inbox/signals/stream", get(stream_signals))
        .with_state(state)
}

fn row_to_signal(row: noema_storage::SignalRow) -> Signal {
    Signal {
        id: row.id,
        user_id: row.user_id,
        workflow_id: row.workflow_id,
        signal_type: row.signal_type.parse().unwrap_or(noema_contracts::SignalType::StatusUpdate),
        data: row.data,
        timestamp: row.timestamp,
        read: row.read,
        read_at: row.read_at,
    }
}

#[derive(Debug, Deserialize)]
pub struct ListSignalsParams {
    pub user_id: String,
    #[serde(default)]
    pub unread_only: bool,
    pub signal_type: Option<String>,
    pub workflow_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /inbox/signals
#[utoipa::path(
    get,
    path = "/inbox/signals",
    params(
        ("user_id" = String, Query, description = "Inbox owner"),
        ("unread_only" = Option<bool>, Query, description = "Only return unread signals"),
        ("signal_type" = Option<String>, Query, description = "Filter by signal type"),
        ("workflow_id" = Option<Uuid>, Query, description = "Filter by originating workflow"),
        ("limit" = Option<i64>, Query, description = "Max number of results"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination")
    ),
    responses(
        (status = 200, description = "Matching signals", body = ListResponse<Signal>),
        (status = 500, description = "Internal server error")
    ),
    tag = "inbox"
)]
pub async fn list_signals(
    State(state): State<AppState>,
    Query(params): Query<ListSignalsParams>,
) -> Result<Json<ListResponse<Signal>>, StatusCode> {
    let rows = state
        .signals
        .inbox(
            &params.user_id,
            params.unread_only,
            params.signal_type.as_deref(),
            params.workflow_id,
            Pagination {
                limit: params.limit,
                offset: params.offset,
            },
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list inbox signals");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let data = rows.into_iter().map(row_to_signal).collect();
    Ok(Json(ListResponse::new(data)))
}

#[derive(Debug, Deserialize)]
pub struct UserIdParam {
    pub user_id: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

/// GET /inbox/signals/unread-count
#[utoipa::path(
    get,
    path = "/inbox/signals/unread-count",
    params(("user_id" = String, Query, description = "Inbox owner")),
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "inbox"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    Query(params): Query<UserIdParam>,
) -> Result<Json<UnreadCountResponse>, StatusCode> {
    let unread_count = state.signals.unread_count(&params.user_id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to count unread signals");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

/// POST /inbox/signals/{id}/read
#[utoipa::path(
    post,
    path = "/inbox/signals/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Signal id"),
        ("user_id" = String, Query, description = "Caller claiming ownership of the signal")
    ),
    responses(
        (status = 200, description = "Marked as read (idempotent if already read)"),
        (status = 404, description = "Signal not found or not owned by this caller"),
        (status = 500, description = "Internal server error")
    ),
    tag = "inbox"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdParam>,
) -> Result<StatusCode, StatusCode> {
    let marked = state.signals.mark_read(&params.user_id, id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to mark signal read");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if marked {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkAllReadParams {
    pub user_id: String,
    pub workflow_id: Option<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MarkAllReadResponse {
    pub marked: u64,
}

/// POST /inbox/signals/mark-all-read
#[utoipa::path(
    post,
    path = "/inbox/signals/mark-all-read",
    params(
        ("user_id" = String, Query, description = "Inbox owner"),
        ("workflow_id" = Option<Uuid>, Query, description = "Restrict to one workflow's signals")
    ),
    responses(
        (status = 200, description = "Number of signals marked read", body = MarkAllReadResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "inbox"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Query(params): Query<MarkAllReadParams>,
) -> Result<Json<MarkAllReadResponse>, StatusCode> {
    let marked = state
        .signals
        .mark_all_read(&params.user_id, params.workflow_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to mark all signals read");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(MarkAllReadResponse { marked }))
}

/// GET /inbox/signals/stream - live signal delivery over Server-Sent Events
///
/// Unlike `runs::stream_run_events` in the agent-runner API this doesn't
/// poll the store: it bridges the same live-subscriber channel the dual-write
/// signal service pushes to, so delivery is immediate rather than bounded by
/// a poll interval.
#[utoipa::path(
    get,
    path = "/inbox/signals/stream",
    params(("user_id" = String, Query, description = "Inbox owner")),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    ),
    tag = "inbox"
)]
pub async fn stream_signals(
    State(state): State<AppState>,
    Query(params): Query<UserIdParam>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let registry = state.signals.registry();
    let (subscriber_id, rx) = registry.connect(&params.user_id);
    let user_id = params.user_id.clone();

    tracing::info!(user_id = %user_id, %subscriber_id, "signal stream connected");

    let stream = UnboundedReceiverStream::new(rx).map(move |signal| {
        let json = serde_json::to_string(&signal).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event(signal.signal_type.to_string()).data(json))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
