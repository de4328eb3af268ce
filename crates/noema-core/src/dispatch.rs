//! Bridges the typed [`Activity`] trait to the worker pool's raw
//! JSON-in/JSON-out handler signature, so each activity is registered with
//! one call instead of hand-written boilerplate per activity type.

use std::sync::Arc;

use noema_durable::prelude::{Activity, ActivityContext, ClaimedTask, WorkerPool};

/// Registers `activity` on `pool` under its own `Activity::TYPE`.
pub fn register<A>(pool: &WorkerPool, activity: Arc<A>)
where
    A: Activity + Send + Sync + 'static,
{
    pool.register_handler(A::TYPE, move |task: ClaimedTask| {
        let activity = Arc::clone(&activity);
        async move {
            let input: A::Input = serde_json::from_value(task.input)
                .map_err(|e| format!("malformed input for {}: {e}", A::TYPE))?;

            let ctx = ActivityContext::new(
                task.workflow_id,
                task.activity_id.clone(),
                task.attempt,
                task.max_attempts,
            );

            let output = activity
                .execute(&ctx, input)
                .await
                .map_err(|e| e.message)?;

            serde_json::to_value(output).map_err(|e| e.to_string())
        }
    });
}
