//! Contributor notification and signal-dispatch activities

use std::sync::Arc;

use async_trait::async_trait;
use noema_contracts::signal::SignalType;
use noema_durable::prelude::{Activity, ActivityContext, ActivityError};

use crate::signal::SignalService;

use super::types::*;

fn parse_signal_type(s: &str) -> Result<SignalType, ActivityError> {
    match s {
        "status_update" => Ok(SignalType::StatusUpdate),
        "progress" => Ok(SignalType::Progress),
        "completion" => Ok(SignalType::Completion),
        "error" => Ok(SignalType::Error),
        other => Err(
            ActivityError::non_retryable(format!("unrecognized signal_type: {other}"))
                .with_type("InvalidSignalType"),
        ),
    }
}

/// Contributor notification is best-effort: a delivery failure here never
/// fails the owning workflow, so the activity only logs and reports whether
/// it got through.
pub struct NotifyContributorActivity {
    pub signals: Arc<SignalService>,
}

#[async_trait]
impl Activity for NotifyContributorActivity {
    const TYPE: &'static str = "notify_contributor";
    type Input = NotifyContributorInput;
    type Output = NotifyContributorOutput;

    async fn execute(
        &self,
        ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let data = serde_json::json!({
            "decision": input.decision,
            "reason": input.reason,
        });

        match self
            .signals
            .send(
                &input.contributor_id,
                ctx.workflow_id,
                SignalType::Completion,
                data,
            )
            .await
        {
            Ok(delivered) => Ok(NotifyContributorOutput { delivered }),
            Err(e) => {
                tracing::warn!(error = %e, contributor_id = %input.contributor_id, "notify_contributor failed");
                Ok(NotifyContributorOutput { delivered: false })
            }
        }
    }
}

pub struct SendSignalPersistentActivity {
    pub signals: Arc<SignalService>,
}

#[async_trait]
impl Activity for SendSignalPersistentActivity {
    const TYPE: &'static str = "send_signal_persistent";
    type Input = SendSignalPersistentInput;
    type Output = SendSignalPersistentOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let signal_type = parse_signal_type(&input.signal_type)?;

        let ok = self
            .signals
            .send(&input.user_id, input.workflow_id, signal_type, input.payload)
            .await
            .map_err(|e| ActivityError::retryable(e.to_string()).with_type("SignalDeliveryFailed"))?;

        Ok(SendSignalPersistentOutput { ok })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_type_rejects_unknown() {
        assert!(parse_signal_type("bogus").is_err());
    }

    #[test]
    fn test_parse_signal_type_accepts_known_values() {
        assert!(parse_signal_type("status_update").is_ok());
        assert!(parse_signal_type("progress").is_ok());
        assert!(parse_signal_type("completion").is_ok());
        assert!(parse_signal_type("error").is_ok());
    }

    // send_signal_persistent / notify_contributor need a live Database
    // connection to exercise end-to-end; the registry-level push behavior
    // is covered directly in signal::tests.
}
