//! Drives a workflow through a real `WorkerPool`, not direct trait-method
//! calls, to exercise the wiring between `ActivityCompleted`/`TimerFired`
//! events and the executor that has to react to them.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use noema_durable::prelude::*;
use noema_durable::worker::PollerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IncrementInput {
    start: i32,
    target: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct IncrementOutput {
    final_value: i32,
}

/// Schedules an `increment` activity until `target` is reached, then starts
/// a short timer and only completes once it fires — exercises both the
/// activity-completion and timer-fired bridges in one pass.
struct IncrementWorkflow {
    current: i32,
    target: i32,
    timer_fired: bool,
    completed: bool,
}

const SETTLE_TIMER: &str = "settle";

impl Workflow for IncrementWorkflow {
    const TYPE: &'static str = "increment_workflow";
    type Input = IncrementInput;
    type Output = IncrementOutput;

    fn new(input: Self::Input) -> Self {
        Self {
            current: input.start,
            target: input.target,
            timer_fired: false,
            completed: false,
        }
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        self.next_action()
    }

    fn on_activity_completed(
        &mut self,
        _activity_id: &str,
        result: serde_json::Value,
        _now: chrono::DateTime<chrono::Utc>,
    ) -> Vec<WorkflowAction> {
        self.current = result.get("value").and_then(|v| v.as_i64()).unwrap_or(0) as i32;
        self.next_action()
    }

    fn on_activity_failed(
        &mut self,
        _activity_id: &str,
        _error: &ActivityError,
    ) -> Vec<WorkflowAction> {
        vec![WorkflowAction::fail(WorkflowError::new("increment failed"))]
    }

    fn on_timer_fired(&mut self, timer_id: &str) -> Vec<WorkflowAction> {
        if timer_id == SETTLE_TIMER {
            self.timer_fired = true;
            self.completed = true;
            vec![WorkflowAction::complete(
                json!({ "final_value": self.current }),
            )]
        } else {
            vec![]
        }
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn result(&self) -> Option<Self::Output> {
        self.completed.then_some(IncrementOutput {
            final_value: self.current,
        })
    }
}

impl IncrementWorkflow {
    fn next_action(&self) -> Vec<WorkflowAction> {
        if self.current >= self.target {
            vec![WorkflowAction::timer(SETTLE_TIMER, Duration::from_millis(50))]
        } else {
            vec![WorkflowAction::schedule_activity(
                format!("increment-{}", self.current),
                "increment",
                json!({ "value": self.current }),
            )]
        }
    }
}

#[tokio::test]
async fn workflow_advances_through_real_worker_pool() {
    let store = Arc::new(InMemoryWorkflowEventStore::new());
    let shared_store: Arc<dyn WorkflowEventStore> = store.clone();

    let worker_pool = Arc::new(WorkerPool::new(
        shared_store,
        WorkerPoolConfig::new(vec!["increment".to_string()])
            .with_poller(PollerConfig::new().with_min_interval(Duration::from_millis(10))),
    ));
    worker_pool.register_handler("increment", |task| async move {
        let value = task.input.get("value").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(json!({ "value": value + 1 }))
    });

    let mut executor = WorkflowExecutor::from_shared(store.clone());
    executor.register::<IncrementWorkflow>();
    let executor = Arc::new(executor);

    let hook_executor = Arc::clone(&executor);
    worker_pool.set_result_hook(move |workflow_id, activity_id, outcome| {
        let executor = Arc::clone(&hook_executor);
        async move {
            match outcome {
                TaskOutcome::Completed(output) => {
                    executor
                        .on_activity_completed(workflow_id, &activity_id, output)
                        .await
                        .expect("on_activity_completed should succeed");
                }
                TaskOutcome::Failed { message, will_retry } => {
                    executor
                        .on_activity_failed(
                            workflow_id,
                            &activity_id,
                            ActivityError::retryable(message),
                            will_retry,
                        )
                        .await
                        .expect("on_activity_failed should succeed");
                }
            }
        }
    });

    worker_pool.start().await.expect("worker pool should start");

    let workflow_id = executor
        .start_workflow::<IncrementWorkflow>(
            IncrementInput {
                start: 0,
                target: 3,
            },
            None,
        )
        .await
        .expect("should start workflow");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = executor
            .store()
            .get_workflow_status(workflow_id)
            .await
            .expect("should get status");

        if status == WorkflowStatus::Completed {
            break;
        }

        assert!(
            tokio::time::Instant::now() < deadline,
            "workflow never left {:?} via the real worker pool",
            status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let info = executor
        .store()
        .get_workflow_info(workflow_id)
        .await
        .expect("should get workflow info");
    assert_eq!(
        info.result,
        Some(json!({ "final_value": 3 })),
        "workflow should have counted up to 3 through real activity dispatch"
    );

    worker_pool.shutdown().await.expect("worker pool should shut down");
}
