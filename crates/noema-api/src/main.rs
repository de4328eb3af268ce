// noema API server

mod documents;
mod domains;
mod inbox;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use noema_core::activities::{
    AnalyzeResearchActivity, AssessDocumentRelevanceActivity, ExtractTextActivity,
    GenerateEmbeddingsActivity, GenerateExampleQuestionsActivity, IndexDomainActivity,
    IndexWeaviateActivity, NotifyContributorActivity, ResearchDomainActivity,
    SendSignalPersistentActivity, UpdateGraphActivity,
};
use noema_core::workflows::{DocumentContributionWorkflow, DomainBootstrapWorkflow};
use noema_core::{SignalService, SubscriberRegistry};
use noema_durable::prelude::{Activity, TaskOutcome, WorkerPool, WorkerPoolConfig, WorkflowExecutor};
use noema_durable::{ActivityError, PostgresWorkflowEventStore};
use noema_llm::ProviderType;
use noema_storage::Database;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        domains::start_domain_bootstrap,
        domains::get_bootstrap_status,
        domains::submit_owner_feedback,
        domains::owner_inbox,
        documents::start_document_contribution,
        documents::get_contribution_status,
        documents::submit_controller_decision,
        inbox::list_signals,
        inbox::unread_count,
        inbox::mark_read,
        inbox::mark_all_read,
        inbox::stream_signals,
    ),
    components(schemas(
        noema_contracts::StartDomainBootstrapRequest,
        noema_contracts::StartWorkflowResponse,
        noema_contracts::OwnerFeedbackRequest,
        noema_contracts::BootstrapStatusResponse,
        noema_contracts::DomainStatus,
        noema_contracts::WorkflowInstanceSummary,
        noema_contracts::WorkflowInstanceStatus,
        noema_contracts::StartDocumentContributionRequest,
        noema_contracts::ContributionStatusResponse,
        noema_contracts::ControllerDecisionRequest,
        noema_contracts::ControllerDecision,
        noema_contracts::DocumentStatus,
        noema_contracts::DocumentAnalysis,
        noema_contracts::Signal,
        noema_contracts::SignalType,
        noema_contracts::QualityCriteria,
        noema_contracts::ResearchDepth,
        domains::InboxParams,
        inbox::ListSignalsParams,
        inbox::UnreadCountResponse,
        inbox::MarkAllReadResponse,
    )),
    tags(
        (name = "domains", description = "Knowledge domain bootstrap endpoints"),
        (name = "documents", description = "Document contribution and review endpoints"),
        (name = "inbox", description = "Owner/controller signal inbox endpoints"),
    ),
    info(
        title = "Noema API",
        version = "0.1.0",
        description = "API for bootstrapping knowledge domains and reviewing document contributions",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noema_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("noema-api starting...");

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;

    let db = Database::from_url(&database_url)
        .await
        .context("failed to connect to database")?;
    let db = Arc::new(db);
    tracing::info!("connected to database");

    let engine_store = PostgresWorkflowEventStore::new(db.pool().clone());
    let mut executor = WorkflowExecutor::new(engine_store);
    executor.register::<DomainBootstrapWorkflow>();
    executor.register::<DocumentContributionWorkflow>();
    let executor = Arc::new(executor);

    let provider: ProviderType = std::env::var("LLM_PROVIDER")
        .unwrap_or_else(|_| "anthropic".to_string())
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid LLM_PROVIDER: {e}"))?;
    let driver: Arc<dyn noema_llm::LlmDriver> =
        Arc::from(noema_llm::create_driver_from_env(provider).context("failed to configure LLM driver")?);
    tracing::info!(?provider, "LLM driver configured");

    let registry = Arc::new(SubscriberRegistry::new());
    let signals = Arc::new(SignalService::new(Arc::clone(&registry), Arc::clone(&db)));

    let worker_store = PostgresWorkflowEventStore::new(db.pool().clone());
    let worker_pool = Arc::new(WorkerPool::new(
        Arc::new(worker_store),
        WorkerPoolConfig::new(vec![
            ResearchDomainActivity::TYPE.to_string(),
            AnalyzeResearchActivity::TYPE.to_string(),
            GenerateExampleQuestionsActivity::TYPE.to_string(),
            AssessDocumentRelevanceActivity::TYPE.to_string(),
            NotifyContributorActivity::TYPE.to_string(),
            SendSignalPersistentActivity::TYPE.to_string(),
            ExtractTextActivity::TYPE.to_string(),
            GenerateEmbeddingsActivity::TYPE.to_string(),
            IndexWeaviateActivity::TYPE.to_string(),
            UpdateGraphActivity::TYPE.to_string(),
            IndexDomainActivity::TYPE.to_string(),
        ]),
    ));

    noema_core::dispatch::register(&worker_pool, Arc::new(ResearchDomainActivity { driver: driver.clone() }));
    noema_core::dispatch::register(&worker_pool, Arc::new(AnalyzeResearchActivity { driver: driver.clone() }));
    noema_core::dispatch::register(
        &worker_pool,
        Arc::new(GenerateExampleQuestionsActivity { driver: driver.clone() }),
    );
    noema_core::dispatch::register(
        &worker_pool,
        Arc::new(AssessDocumentRelevanceActivity { driver: driver.clone() }),
    );
    noema_core::dispatch::register(
        &worker_pool,
        Arc::new(NotifyContributorActivity { signals: Arc::clone(&signals) }),
    );
    noema_core::dispatch::register(
        &worker_pool,
        Arc::new(SendSignalPersistentActivity { signals: Arc::clone(&signals) }),
    );
    noema_core::dispatch::register(&worker_pool, Arc::new(ExtractTextActivity));
    noema_core::dispatch::register(&worker_pool, Arc::new(GenerateEmbeddingsActivity));
    noema_core::dispatch::register(&worker_pool, Arc::new(IndexWeaviateActivity { db: Arc::clone(&db) }));
    noema_core::dispatch::register(&worker_pool, Arc::new(UpdateGraphActivity { db: Arc::clone(&db) }));
    noema_core::dispatch::register(&worker_pool, Arc::new(IndexDomainActivity));

    let hook_executor = Arc::clone(&executor);
    worker_pool.set_result_hook(move |workflow_id, activity_id, outcome| {
        let executor = Arc::clone(&hook_executor);
        async move {
            let result = match outcome {
                TaskOutcome::Completed(output) => {
                    executor.on_activity_completed(workflow_id, &activity_id, output).await
                }
                TaskOutcome::Failed { message, will_retry } => {
                    let error = if will_retry {
                        ActivityError::retryable(message)
                    } else {
                        ActivityError::non_retryable(message)
                    };
                    executor
                        .on_activity_failed(workflow_id, &activity_id, error, will_retry)
                        .await
                }
            };
            if let Err(e) = result {
                tracing::error!(%workflow_id, %activity_id, "failed to drive workflow from task outcome: {}", e);
            }
        }
    });

    executor
        .recover_pending_timers()
        .await
        .context("failed to recover pending timers")?;

    worker_pool.start().await.context("failed to start worker pool")?;
    tracing::info!("worker pool started");

    let domains_state = domains::AppState {
        db: Arc::clone(&db),
        executor: Arc::clone(&executor),
    };
    let documents_state = documents::AppState {
        db: Arc::clone(&db),
        executor: Arc::clone(&executor),
    };
    let inbox_state = inbox::AppState { signals: Arc::clone(&signals) };

    let app = Router::new()
        .route("/health", get(health))
        .merge(domains::routes(domains_state))
        .merge(documents::routes(documents_state))
        .merge(inbox::routes(inbox_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = "0.0.0.0:9100";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
