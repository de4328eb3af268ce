//! Document Contribution Workflow
//!
//! `Uploaded → Analyzing → { AutoApproved | PendingReview | AutoRejected } → { Approved | Rejected | Indexed | Failed }`.
//!
//! Controller timeout and auto-routing thresholds are fixed at workflow
//! start, not decided at timeout, so the policy stays deterministic across
//! replay.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use noema_durable::prelude::{ActivityError, Workflow, WorkflowAction, WorkflowError, WorkflowSignal};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::activities::{
    AssessDocumentRelevanceInput, AssessDocumentRelevanceOutput, ExtractTextInput,
    ExtractTextOutput, GenerateEmbeddingsInput, GenerateEmbeddingsOutput, IndexWeaviateInput,
    IndexWeaviateOutput, NotifyContributorInput, UpdateGraphInput,
};
use crate::visibility::{contribution_attrs, ControllerLoad, choose_controller};

pub const CONTROLLER_DECISION_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

mod activity_names {
    pub const ASSESS: &str = "assess_document_relevance";
    pub const EXTRACT: &str = "extract_text";
    pub const EMBED: &str = "generate_embeddings";
    pub const INDEX: &str = "index_weaviate";
    pub const GRAPH: &str = "update_graph";
    pub const NOTIFY: &str = "notify_contributor";
}

const CONTROLLER_TIMER: &str = "controller_decision_timeout";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContributionInput {
    pub document_id: Uuid,
    pub domain_id: Uuid,
    pub contributor_id: String,
    pub owner_id: String,
    pub file_ref: String,
    pub domain_criteria: serde_json::Value,
    pub model_tier: String,
    #[serde(default = "default_auto_approve_threshold")]
    pub auto_approve_threshold: f64,
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: f64,
    #[serde(default)]
    pub controller_pool: Vec<ControllerLoad>,
}

fn default_auto_approve_threshold() -> f64 {
    8.0
}

fn default_reject_threshold() -> f64 {
    7.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerDecision {
    pub approved: bool,
    #[serde(default)]
    pub feedback: Option<String>,
    pub controller_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContributionOutput {
    pub document_id: Uuid,
    pub status: String,
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContributionState {
    Uploaded,
    Analyzing,
    AutoApproved {
        analysis: AssessDocumentRelevanceOutput,
    },
    PendingReview {
        analysis: AssessDocumentRelevanceOutput,
        controller_id: String,
    },
    AutoRejected {
        analysis: AssessDocumentRelevanceOutput,
    },
    Approved {
        analysis: AssessDocumentRelevanceOutput,
        decision: Option<ControllerDecision>,
    },
    Rejected {
        reason: String,
        analysis: Option<AssessDocumentRelevanceOutput>,
    },
    Indexed {
        analysis: AssessDocumentRelevanceOutput,
        vector_id: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug)]
pub struct DocumentContributionWorkflow {
    input: DocumentContributionInput,
    state: ContributionState,
}

impl DocumentContributionWorkflow {
    fn attrs(&self, status: &str) -> BTreeMap<String, serde_json::Value> {
        contribution_attrs(
            status,
            self.input.document_id,
            self.input.domain_id,
            &self.input.contributor_id,
        )
    }

    fn upsert(&self, status: &str) -> WorkflowAction {
        WorkflowAction::upsert_search_attributes(self.attrs(status))
    }

    fn upsert_with(&self, status: &str, extra: &[(&str, serde_json::Value)]) -> WorkflowAction {
        let mut attrs = self.attrs(status);
        for (k, v) in extra {
            attrs.insert((*k).to_string(), v.clone());
        }
        WorkflowAction::upsert_search_attributes(attrs)
    }

    fn fail(&mut self, error: impl Into<String>) -> Vec<WorkflowAction> {
        let message = error.into();
        self.state = ContributionState::Failed {
            error: message.clone(),
        };
        vec![
            self.upsert("failed"),
            WorkflowAction::fail(WorkflowError::new(message)),
        ]
    }

    fn start_indexing(&self, chunks_hint: ()) -> Vec<WorkflowAction> {
        let _ = chunks_hint;
        vec![
            self.upsert_with("indexing", &[("Progress", json!(0.5))]),
            WorkflowAction::schedule_activity(
                activity_names::EXTRACT,
                activity_names::EXTRACT,
                serde_json::to_value(ExtractTextInput {
                    document_id: self.input.document_id,
                    file_ref: self.input.file_ref.clone(),
                })
                .unwrap_or(json!({})),
            ),
        ]
    }

    fn choose_controller_id(&self) -> String {
        choose_controller(&self.input.controller_pool, &self.input.owner_id)
    }
}

impl Workflow for DocumentContributionWorkflow {
    const TYPE: &'static str = "document_contribution";
    type Input = DocumentContributionInput;
    type Output = DocumentContributionOutput;

    fn new(input: Self::Input) -> Self {
        Self {
            input,
            state: ContributionState::Uploaded,
        }
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        self.state = ContributionState::Analyzing;

        let assess_input = AssessDocumentRelevanceInput {
            document_id: self.input.document_id,
            file_ref: self.input.file_ref.clone(),
            domain_criteria: self.input.domain_criteria.clone(),
            model_tier: self.input.model_tier.clone(),
        };

        vec![
            self.upsert_with("analyzing", &[("Progress", json!(0.1))]),
            WorkflowAction::schedule_activity(
                activity_names::ASSESS,
                activity_names::ASSESS,
                serde_json::to_value(assess_input).unwrap_or(json!({})),
            ),
        ]
    }

    fn on_activity_completed(
        &mut self,
        activity_id: &str,
        result: serde_json::Value,
        now: chrono::DateTime<Utc>,
    ) -> Vec<WorkflowAction> {
        match activity_id {
            activity_names::ASSESS => {
                let analysis: AssessDocumentRelevanceOutput = match serde_json::from_value(result)
                {
                    Ok(a) => a,
                    Err(e) => {
                        return self.fail(format!("malformed assess_document_relevance result: {e}"))
                    }
                };

                let score = analysis.relevance_score;
                let score_attr = vec![(
                    "RelevanceScore",
                    json!(score),
                )];

                if score >= self.input.auto_approve_threshold {
                    self.state = ContributionState::AutoApproved {
                        analysis: analysis.clone(),
                    };
                    let mut actions = vec![self.upsert_with("auto_approved", &score_attr)];
                    actions.extend(self.start_indexing(()));
                    actions
                } else if score < self.input.reject_threshold {
                    let reason = analysis
                        .rejection_reason
                        .clone()
                        .unwrap_or_else(|| "below_reject_threshold".to_string());
                    self.state = ContributionState::AutoRejected {
                        analysis: analysis.clone(),
                    };
                    vec![
                        self.upsert_with("auto_rejected", &score_attr),
                        WorkflowAction::schedule_activity(
                            activity_names::NOTIFY,
                            activity_names::NOTIFY,
                            serde_json::to_value(NotifyContributorInput {
                                contributor_id: self.input.contributor_id.clone(),
                                decision: "rejected".to_string(),
                                reason: Some(reason.clone()),
                            })
                            .unwrap_or(json!({})),
                        ),
                        WorkflowAction::complete(json!({
                            "document_id": self.input.document_id,
                            "status": "auto_rejected",
                            "rejection_reason": reason,
                        })),
                    ]
                } else {
                    let controller_id = self.choose_controller_id();
                    self.state = ContributionState::PendingReview {
                        analysis: analysis.clone(),
                        controller_id: controller_id.clone(),
                    };
                    let due_at = crate::visibility::due_at(
                        now,
                        chrono::Duration::from_std(CONTROLLER_DECISION_TIMEOUT).unwrap(),
                    );
                    vec![
                        self.upsert_with(
                            "pending_review",
                            &[
                                ("RelevanceScore", json!(score)),
                                ("Assignee", json!(controller_id)),
                                ("DueAt", json!(due_at.to_rfc3339())),
                            ],
                        ),
                        WorkflowAction::timer(CONTROLLER_TIMER, CONTROLLER_DECISION_TIMEOUT),
                    ]
                }
            }

            activity_names::EXTRACT => {
                let output: ExtractTextOutput = match serde_json::from_value(result) {
                    Ok(o) => o,
                    Err(e) => return self.fail(format!("malformed extract_text result: {e}")),
                };

                vec![
                    self.upsert_with("indexing", &[("Progress", json!(0.7))]),
                    WorkflowAction::schedule_activity(
                        activity_names::EMBED,
                        activity_names::EMBED,
                        serde_json::to_value(GenerateEmbeddingsInput {
                            chunks: output.chunks,
                        })
                        .unwrap_or(json!({})),
                    ),
                ]
            }

            activity_names::EMBED => {
                let output: GenerateEmbeddingsOutput = match serde_json::from_value(result) {
                    Ok(o) => o,
                    Err(e) => return self.fail(format!("malformed generate_embeddings result: {e}")),
                };

                vec![
                    self.upsert_with("indexing", &[("Progress", json!(0.8))]),
                    WorkflowAction::schedule_activity(
                        activity_names::INDEX,
                        activity_names::INDEX,
                        serde_json::to_value(IndexWeaviateInput {
                            document_id: self.input.document_id,
                            domain_id: self.input.domain_id,
                            chunks: vec![],
                            embeddings: output.embeddings,
                        })
                        .unwrap_or(json!({})),
                    ),
                ]
            }

            activity_names::INDEX => {
                let output: IndexWeaviateOutput = match serde_json::from_value(result) {
                    Ok(o) => o,
                    Err(e) => return self.fail(format!("malformed index_weaviate result: {e}")),
                };

                let analysis = self.current_analysis();
                if let Some(analysis) = analysis {
                    self.state = ContributionState::Indexed {
                        analysis,
                        vector_id: output.vector_id,
                    };
                }

                vec![
                    self.upsert_with("indexing", &[("Progress", json!(0.9))]),
                    WorkflowAction::schedule_activity(
                        activity_names::GRAPH,
                        activity_names::GRAPH,
                        serde_json::to_value(UpdateGraphInput {
                            document_id: self.input.document_id,
                            domain_id: self.input.domain_id,
                            topics: vec![],
                            entities: vec![],
                        })
                        .unwrap_or(json!({})),
                    ),
                ]
            }

            activity_names::GRAPH => {
                vec![
                    self.upsert("indexed"),
                    WorkflowAction::schedule_activity(
                        activity_names::NOTIFY,
                        activity_names::NOTIFY,
                        serde_json::to_value(NotifyContributorInput {
                            contributor_id: self.input.contributor_id.clone(),
                            decision: "approved".to_string(),
                            reason: None,
                        })
                        .unwrap_or(json!({})),
                    ),
                    WorkflowAction::complete(json!({
                        "document_id": self.input.document_id,
                        "status": "indexed",
                    })),
                ]
            }

            activity_names::NOTIFY => vec![],

            _ => vec![],
        }
    }

    fn on_activity_failed(&mut self, activity_id: &str, error: &ActivityError) -> Vec<WorkflowAction> {
        if activity_id == activity_names::NOTIFY {
            // Notification is never fatal (§4.7).
            return vec![];
        }
        self.fail(format!("{activity_id} failed: {}", error.message))
    }

    fn on_timer_fired(&mut self, timer_id: &str) -> Vec<WorkflowAction> {
        if timer_id != CONTROLLER_TIMER {
            return vec![];
        }

        if let ContributionState::PendingReview { analysis, .. } = &self.state {
            let analysis = analysis.clone();
            self.state = ContributionState::Rejected {
                reason: "controller_timeout".to_string(),
                analysis: Some(analysis),
            };
            return vec![
                self.upsert("rejected"),
                WorkflowAction::complete(json!({
                    "document_id": self.input.document_id,
                    "status": "rejected",
                    "reason": "controller_timeout",
                })),
            ];
        }

        vec![]
    }

    fn on_signal(&mut self, signal: &WorkflowSignal) -> Vec<WorkflowAction> {
        if signal.signal_type != "submit_review" {
            return vec![];
        }

        let ContributionState::PendingReview { analysis, .. } = &self.state else {
            return vec![];
        };
        let analysis = analysis.clone();

        let decision: ControllerDecision = match serde_json::from_value(signal.payload.clone()) {
            Ok(d) => d,
            Err(_) => return vec![],
        };

        if decision.approved {
            self.state = ContributionState::Approved {
                analysis: analysis.clone(),
                decision: Some(decision.clone()),
            };
            let mut actions = vec![self.upsert_with(
                "approved",
                &[("Assignee", json!(decision.controller_id))],
            )];
            actions.extend(self.start_indexing(()));
            actions
        } else {
            self.state = ContributionState::Rejected {
                reason: "controller_rejected".to_string(),
                analysis: Some(analysis),
            };
            vec![
                self.upsert("rejected"),
                WorkflowAction::schedule_activity(
                    activity_names::NOTIFY,
                    activity_names::NOTIFY,
                    serde_json::to_value(NotifyContributorInput {
                        contributor_id: self.input.contributor_id.clone(),
                        decision: "rejected".to_string(),
                        reason: decision.feedback.clone(),
                    })
                    .unwrap_or(json!({})),
                ),
                WorkflowAction::complete(json!({
                    "document_id": self.input.document_id,
                    "status": "rejected",
                    "reason": "controller_rejected",
                })),
            ]
        }
    }

    fn on_query(&self, name: &str, _args: serde_json::Value) -> Option<serde_json::Value> {
        match name {
            "get_status" => Some(json!({
                "status": self.status_name(),
                "relevance_score": self.current_analysis().map(|a| a.relevance_score),
                "analysis": self.current_analysis(),
                "controller_decision": self.controller_decision(),
                "controller_id": self.controller_id(),
            })),
            _ => None,
        }
    }

    fn is_completed(&self) -> bool {
        matches!(
            self.state,
            ContributionState::AutoRejected { .. }
                | ContributionState::Rejected { .. }
                | ContributionState::Indexed { .. }
                | ContributionState::Failed { .. }
        )
    }

    fn result(&self) -> Option<Self::Output> {
        match &self.state {
            ContributionState::Indexed { analysis, .. } => Some(DocumentContributionOutput {
                document_id: self.input.document_id,
                status: "indexed".to_string(),
                relevance_score: Some(analysis.relevance_score),
            }),
            ContributionState::AutoRejected { analysis } => Some(DocumentContributionOutput {
                document_id: self.input.document_id,
                status: "auto_rejected".to_string(),
                relevance_score: Some(analysis.relevance_score),
            }),
            ContributionState::Rejected { analysis, .. } => Some(DocumentContributionOutput {
                document_id: self.input.document_id,
                status: "rejected".to_string(),
                relevance_score: analysis.as_ref().map(|a| a.relevance_score),
            }),
            _ => None,
        }
    }

    fn error(&self) -> Option<WorkflowError> {
        match &self.state {
            ContributionState::Failed { error } => Some(WorkflowError::new(error.clone())),
            _ => None,
        }
    }
}

impl DocumentContributionWorkflow {
    fn current_analysis(&self) -> Option<AssessDocumentRelevanceOutput> {
        match &self.state {
            ContributionState::AutoApproved { analysis }
            | ContributionState::AutoRejected { analysis }
            | ContributionState::Indexed { analysis, .. }
            | ContributionState::PendingReview { analysis, .. }
            | ContributionState::Approved { analysis, .. } => Some(analysis.clone()),
            ContributionState::Rejected { analysis, .. } => analysis.clone(),
            _ => None,
        }
    }

    fn status_name(&self) -> &'static str {
        match &self.state {
            ContributionState::Uploaded => "uploaded",
            ContributionState::Analyzing => "analyzing",
            ContributionState::AutoApproved { .. } => "auto_approved",
            ContributionState::PendingReview { .. } => "pending_review",
            ContributionState::AutoRejected { .. } => "auto_rejected",
            ContributionState::Approved { .. } => "approved",
            ContributionState::Rejected { .. } => "rejected",
            ContributionState::Indexed { .. } => "indexed",
            ContributionState::Failed { .. } => "failed",
        }
    }

    fn controller_decision(&self) -> Option<serde_json::Value> {
        match &self.state {
            ContributionState::Approved { decision, .. } => {
                decision.as_ref().and_then(|d| serde_json::to_value(d).ok())
            }
            _ => None,
        }
    }

    fn controller_id(&self) -> Option<String> {
        match &self.state {
            ContributionState::PendingReview { controller_id, .. } => Some(controller_id.clone()),
            ContributionState::Approved {
                decision: Some(decision),
                ..
            } => Some(decision.controller_id.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(threshold_score_ctx: (f64, f64)) -> DocumentContributionInput {
        DocumentContributionInput {
            document_id: Uuid::now_v7(),
            domain_id: Uuid::now_v7(),
            contributor_id: "contrib-1".to_string(),
            owner_id: "owner-1".to_string(),
            file_ref: "s3://bucket/doc.pdf".to_string(),
            domain_criteria: json!({}),
            model_tier: "balanced".to_string(),
            auto_approve_threshold: threshold_score_ctx.0,
            reject_threshold: threshold_score_ctx.1,
            controller_pool: vec![],
        }
    }

    fn assess_result(score: f64) -> serde_json::Value {
        json!({
            "relevance_score": score,
            "is_relevant": score >= 5.0,
            "summary": "s",
            "key_points": [],
            "topics": [],
            "quality_indicators": {},
            "rejection_reason": if score < 5.0 { Some("low quality") } else { None }
        })
    }

    #[test]
    fn test_auto_approve_runs_full_indexing_pipeline() {
        let mut wf = DocumentContributionWorkflow::new(input((8.0, 7.0)));
        wf.on_start();
        wf.on_activity_completed(activity_names::ASSESS, assess_result(9.2), Utc::now());
        assert_eq!(wf.status_name(), "auto_approved");

        wf.on_activity_completed(
            activity_names::EXTRACT,
            json!({"text": "t", "chunks": ["a"], "metadata": {}, "entities": [], "topics": []}),
            Utc::now(),
        );
        wf.on_activity_completed(
            activity_names::EMBED,
            json!({"embeddings": [[0.1, 0.2]]}),
            Utc::now(),
        );
        wf.on_activity_completed(
            activity_names::INDEX,
            json!({"vector_id": "vec-1", "chunk_count": 1}),
            Utc::now(),
        );
        let actions = wf.on_activity_completed(activity_names::GRAPH, json!({"ok": true}), Utc::now());

        assert!(actions
            .iter()
            .any(|a| matches!(a, WorkflowAction::CompleteWorkflow { .. })));
        assert_eq!(wf.result().unwrap().status, "indexed");
    }

    #[test]
    fn test_auto_reject_skips_indexing() {
        let mut wf = DocumentContributionWorkflow::new(input((8.0, 7.0)));
        wf.on_start();
        let actions = wf.on_activity_completed(activity_names::ASSESS, assess_result(4.0), Utc::now());

        assert!(!actions
            .iter()
            .any(|a| matches!(a, WorkflowAction::ScheduleActivity { activity_type, .. } if activity_type == activity_names::EXTRACT)));
        assert_eq!(wf.result().unwrap().status, "auto_rejected");
    }

    #[test]
    fn test_pending_review_then_human_approve_reaches_indexed() {
        let mut wf = DocumentContributionWorkflow::new(input((8.0, 7.0)));
        wf.on_start();
        wf.on_activity_completed(activity_names::ASSESS, assess_result(7.5), Utc::now());
        assert_eq!(wf.status_name(), "pending_review");

        let actions = wf.on_signal(&WorkflowSignal::new(
            "submit_review",
            json!({"approved": true, "controller_id": "c-1"}),
        ));
        assert!(actions
            .iter()
            .any(|a| matches!(a, WorkflowAction::ScheduleActivity { activity_type, .. } if activity_type == activity_names::EXTRACT)));

        wf.on_activity_completed(
            activity_names::EXTRACT,
            json!({"text": "t", "chunks": ["a"], "metadata": {}, "entities": [], "topics": []}),
            Utc::now(),
        );
        wf.on_activity_completed(activity_names::EMBED, json!({"embeddings": [[0.1]]}), Utc::now());
        wf.on_activity_completed(
            activity_names::INDEX,
            json!({"vector_id": "vec-1", "chunk_count": 1}),
            Utc::now(),
        );
        wf.on_activity_completed(activity_names::GRAPH, json!({"ok": true}), Utc::now());

        assert_eq!(wf.result().unwrap().status, "indexed");
        assert_eq!(wf.controller_id(), Some("c-1".to_string()));
    }

    #[test]
    fn test_controller_timeout_rejects() {
        let mut wf = DocumentContributionWorkflow::new(input((8.0, 7.0)));
        wf.on_start();
        wf.on_activity_completed(activity_names::ASSESS, assess_result(7.5), Utc::now());

        wf.on_timer_fired(CONTROLLER_TIMER);

        assert_eq!(wf.result().unwrap().status, "rejected");
    }

    #[test]
    fn test_notify_contributor_failure_never_fails_workflow() {
        let mut wf = DocumentContributionWorkflow::new(input((8.0, 7.0)));
        wf.on_start();
        wf.on_activity_completed(activity_names::ASSESS, assess_result(4.0), Utc::now());

        let actions = wf.on_activity_failed(
            activity_names::NOTIFY,
            &ActivityError::retryable("smtp down"),
        );

        assert!(actions.is_empty());
        assert!(!wf.is_completed() || wf.error().is_none());
    }
}
