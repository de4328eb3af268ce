//! Signal + inbox delivery
//!
//! A signal is delivered two ways: pushed to a live subscriber if one is
//! connected, and always durably appended to the recipient's inbox. Delivery
//! succeeds if either write succeeds; it only fails if both do.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use noema_contracts::signal::{Signal, SignalType};
use noema_storage::{CreateSignal, Database, Pagination};
use tokio::sync::mpsc;
use uuid::Uuid;

pub type Sink = mpsc::UnboundedSender<Signal>;

/// Tracks live inbox subscribers by user id. A user may have more than one
/// connection open (multiple tabs, multiple devices); every sink gets a push.
#[derive(Default)]
pub struct SubscriberRegistry {
    sinks: DashMap<String, Vec<(Uuid, Sink)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving half plus a
    /// handle to use for disconnect.
    pub fn connect(&self, user_id: &str) -> (Uuid, mpsc::UnboundedReceiver<Signal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber_id = Uuid::now_v7();
        self.sinks
            .entry(user_id.to_string())
            .or_default()
            .push((subscriber_id, tx));
        (subscriber_id, rx)
    }

    /// Idempotent: disconnecting a subscriber that's already gone is a no-op.
    pub fn disconnect(&self, user_id: &str, subscriber_id: Uuid) {
        if let Some(mut sinks) = self.sinks.get_mut(user_id) {
            sinks.retain(|(id, _)| *id != subscriber_id);
        }
    }

    /// Pushes to every live sink for the user. Returns true if at least one
    /// sink accepted the signal. Sinks whose receiver has dropped are pruned.
    fn push(&self, user_id: &str, signal: &Signal) -> bool {
        let Some(mut sinks) = self.sinks.get_mut(user_id) else {
            return false;
        };

        let mut delivered = false;
        sinks.retain(|(_, tx)| match tx.send(signal.clone()) {
            Ok(()) => {
                delivered = true;
                true
            }
            Err(_) => false,
        });

        delivered
    }
}

/// Dual-write signal delivery: push to any live subscriber, always append to
/// the durable inbox. Succeeds if either write succeeds.
pub struct SignalService {
    registry: Arc<SubscriberRegistry>,
    db: Arc<Database>,
}

impl SignalService {
    pub fn new(registry: Arc<SubscriberRegistry>, db: Arc<Database>) -> Self {
        Self { registry, db }
    }

    pub fn registry(&self) -> Arc<SubscriberRegistry> {
        Arc::clone(&self.registry)
    }

    pub async fn send(
        &self,
        user_id: &str,
        workflow_id: Uuid,
        signal_type: SignalType,
        data: serde_json::Value,
    ) -> anyhow::Result<bool> {
        let id = Uuid::now_v7();
        let timestamp = Utc::now();

        let signal = Signal {
            id,
            user_id: user_id.to_string(),
            workflow_id,
            signal_type,
            data: data.clone(),
            timestamp,
            read: false,
            read_at: None,
        };

        let pushed = self.registry.push(user_id, &signal);

        let persisted = match self
            .db
            .append_signal(CreateSignal {
                id,
                user_id: user_id.to_string(),
                workflow_id,
                signal_type: signal_type.to_string(),
                data,
                timestamp,
            })
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, user_id, "failed to persist signal to inbox");
                false
            }
        };

        if !pushed && !persisted {
            anyhow::bail!("signal delivery failed: neither push nor persist succeeded");
        }

        Ok(pushed || persisted)
    }

    pub async fn inbox(
        &self,
        user_id: &str,
        unread_only: bool,
        signal_type: Option<&str>,
        workflow_id: Option<Uuid>,
        pagination: Pagination,
    ) -> anyhow::Result<Vec<noema_storage::SignalRow>> {
        self.db
            .list_inbox(user_id, unread_only, signal_type, workflow_id, pagination)
            .await
    }

    /// Scoped to `user_id`: marking a signal that belongs to someone else
    /// returns `false` rather than mutating or leaking its existence (§8 P7).
    pub async fn mark_read(&self, user_id: &str, signal_id: Uuid) -> anyhow::Result<bool> {
        self.db.mark_signal_read(signal_id, user_id, Utc::now()).await
    }

    pub async fn mark_all_read(
        &self,
        user_id: &str,
        workflow_id: Option<Uuid>,
    ) -> anyhow::Result<u64> {
        self.db.mark_all_signals_read(user_id, workflow_id, Utc::now()).await
    }

    pub async fn unread_count(&self, user_id: &str) -> anyhow::Result<i64> {
        self.db.unread_signal_count(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let (id, _rx) = registry.connect("user-1");
        registry.disconnect("user-1", id);
        registry.disconnect("user-1", id);
    }

    #[test]
    fn test_push_without_subscriber_returns_false() {
        let registry = SubscriberRegistry::new();
        let signal = Signal {
            id: Uuid::now_v7(),
            user_id: "user-1".into(),
            workflow_id: Uuid::now_v7(),
            signal_type: SignalType::StatusUpdate,
            data: serde_json::json!({}),
            timestamp: Utc::now(),
            read: false,
            read_at: None,
        };

        assert!(!registry.push("user-1", &signal));
    }

    #[test]
    fn test_push_delivers_to_connected_subscriber() {
        let registry = SubscriberRegistry::new();
        let (_id, mut rx) = registry.connect("user-1");
        let signal = Signal {
            id: Uuid::now_v7(),
            user_id: "user-1".into(),
            workflow_id: Uuid::now_v7(),
            signal_type: SignalType::Progress,
            data: serde_json::json!({"pct": 50}),
            timestamp: Utc::now(),
            read: false,
            read_at: None,
        };

        assert!(registry.push("user-1", &signal));
        let received = rx.try_recv().expect("signal should be queued");
        assert_eq!(received.id, signal.id);
    }

    #[test]
    fn test_push_prunes_dropped_receiver() {
        let registry = SubscriberRegistry::new();
        let (_id, rx) = registry.connect("user-1");
        drop(rx);

        let signal = Signal {
            id: Uuid::now_v7(),
            user_id: "user-1".into(),
            workflow_id: Uuid::now_v7(),
            signal_type: SignalType::Error,
            data: serde_json::json!({}),
            timestamp: Utc::now(),
            read: false,
            read_at: None,
        };

        assert!(!registry.push("user-1", &signal));
    }
}
