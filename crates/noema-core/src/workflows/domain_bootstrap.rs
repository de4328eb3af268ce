//! Domain Bootstrap Workflow
//!
//! Drives a proposed knowledge domain through AI research, analysis,
//! owner approval, and indexing.
//!
//! `Proposed → Researching → Analyzing → AwaitingOwner → { Active | Rejected } → ⊥`,
//! plus `Failed` absorbing any exhausted-retry activity.
//!
//! Indexing runs strictly after owner approval: the two overlapping
//! bootstrap paths in the source material disagreed on ordering, and
//! indexing-before-approval would let a later-rejected domain contaminate
//! the vector/graph stores.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use noema_durable::prelude::{ActivityError, Workflow, WorkflowAction, WorkflowError, WorkflowSignal};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::activities::{
    AnalyzeResearchInput, AnalyzeResearchOutput, ExampleQuestion, GenerateExampleQuestionsInput,
    GenerateExampleQuestionsOutput, IndexDomainInput, ResearchDomainInput, ResearchDomainOutput,
};
use crate::visibility::bootstrap_attrs;

pub const OWNER_DECISION_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

mod activity_names {
    pub const RESEARCH: &str = "research_domain";
    pub const ANALYZE: &str = "analyze_research";
    pub const QUESTIONS: &str = "generate_example_questions";
    pub const INDEX: &str = "index_domain";
}

const OWNER_TIMER: &str = "owner_decision_timeout";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBootstrapInput {
    pub domain_id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    /// Fixed by the caller that starts the workflow so `CreatedAt` stays
    /// stable across replay; the workflow itself never calls `Utc::now()`.
    pub created_at: chrono::DateTime<Utc>,
    #[serde(default)]
    pub initial_topics: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    #[serde(default)]
    pub include_historical: bool,
    #[serde(default)]
    pub include_technical: bool,
    #[serde(default)]
    pub include_practical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerFeedback {
    pub approved: bool,
    #[serde(default)]
    pub feedback: serde_json::Value,
    #[serde(default)]
    pub question_rankings: Vec<serde_json::Value>,
    #[serde(default)]
    pub additional_topics: Vec<String>,
    #[serde(default)]
    pub remove_topics: Vec<String>,
    #[serde(default)]
    pub quality_requirements: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBootstrapOutput {
    pub domain_id: Uuid,
    pub status: String,
    pub topics: Vec<String>,
    pub quality_criteria: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BootstrapState {
    Proposed,
    Researching,
    Analyzing {
        research: ResearchDomainOutput,
        analysis: Option<AnalyzeResearchOutput>,
        questions: Option<Vec<ExampleQuestion>>,
    },
    AwaitingOwner {
        analysis: AnalyzeResearchOutput,
        questions: Vec<ExampleQuestion>,
        due_at: chrono::DateTime<Utc>,
    },
    Active {
        topics: Vec<String>,
        quality_criteria: serde_json::Value,
        owner_feedback: Option<OwnerFeedback>,
    },
    Rejected {
        reason: String,
        owner_feedback: Option<OwnerFeedback>,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug)]
pub struct DomainBootstrapWorkflow {
    input: DomainBootstrapInput,
    state: BootstrapState,
}

impl DomainBootstrapWorkflow {
    fn attrs(&self, status: &str) -> BTreeMap<String, serde_json::Value> {
        let mut attrs =
            bootstrap_attrs(status, self.input.domain_id, &self.input.title, &self.input.owner_id);
        attrs.insert(
            noema_contracts::workflow::attr::PRIORITY.to_string(),
            json!("high"),
        );
        attrs.insert(
            noema_contracts::workflow::attr::CREATED_AT.to_string(),
            json!(self.input.created_at.to_rfc3339()),
        );
        attrs
    }

    fn upsert(&self, status: &str) -> WorkflowAction {
        WorkflowAction::upsert_search_attributes(self.attrs(status))
    }

    fn upsert_with_due_at(&self, status: &str, due_at: chrono::DateTime<Utc>) -> WorkflowAction {
        let mut attrs = self.attrs(status);
        attrs.insert(
            noema_contracts::workflow::attr::DUE_AT.to_string(),
            json!(due_at.to_rfc3339()),
        );
        WorkflowAction::upsert_search_attributes(attrs)
    }

    fn fail(&mut self, error: impl Into<String>) -> Vec<WorkflowAction> {
        let message = error.into();
        self.state = BootstrapState::Failed {
            error: message.clone(),
        };
        vec![
            self.upsert("failed"),
            WorkflowAction::fail(WorkflowError::new(message)),
        ]
    }
}

impl Workflow for DomainBootstrapWorkflow {
    const TYPE: &'static str = "domain_bootstrap";
    type Input = DomainBootstrapInput;
    type Output = DomainBootstrapOutput;

    fn new(input: Self::Input) -> Self {
        Self {
            input,
            state: BootstrapState::Proposed,
        }
    }

    fn on_start(&mut self) -> Vec<WorkflowAction> {
        self.state = BootstrapState::Researching;

        let research_input = ResearchDomainInput {
            domain_name: self.input.title.clone(),
            description: self.input.description.clone(),
            initial_topics: self.input.initial_topics.clone(),
            target_audience: self.input.target_audience.clone(),
            include_historical: self.input.include_historical,
            include_technical: self.input.include_technical,
            include_practical: self.input.include_practical,
        };

        vec![
            self.upsert("researching"),
            WorkflowAction::schedule_activity(
                activity_names::RESEARCH,
                activity_names::RESEARCH,
                serde_json::to_value(research_input).unwrap_or(json!({})),
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
            activity_names::RESEARCH => {
                let research: ResearchDomainOutput = match serde_json::from_value(result) {
                    Ok(r) => r,
                    Err(e) => return self.fail(format!("malformed research_domain result: {e}")),
                };

                self.state = BootstrapState::Analyzing {
                    research: research.clone(),
                    analysis: None,
                    questions: None,
                };

                let analyze_input = AnalyzeResearchInput {
                    domain_name: self.input.title.clone(),
                    research,
                };
                let questions_input = GenerateExampleQuestionsInput {
                    domain_name: self.input.title.clone(),
                    description: self.input.description.clone(),
                };

                vec![
                    self.upsert("analyzing"),
                    WorkflowAction::schedule_activity(
                        activity_names::ANALYZE,
                        activity_names::ANALYZE,
                        serde_json::to_value(analyze_input).unwrap_or(json!({})),
                    ),
                    WorkflowAction::schedule_activity(
                        activity_names::QUESTIONS,
                        activity_names::QUESTIONS,
                        serde_json::to_value(questions_input).unwrap_or(json!({})),
                    ),
                ]
            }

            activity_names::ANALYZE => {
                let result: AnalyzeResearchOutput = match serde_json::from_value(result) {
                    Ok(a) => a,
                    Err(e) => return self.fail(format!("malformed analyze_research result: {e}")),
                };

                if let BootstrapState::Analyzing { analysis, .. } = &mut self.state {
                    *analysis = Some(result);
                }

                self.maybe_finish_analysis(now)
            }

            activity_names::QUESTIONS => {
                let output: GenerateExampleQuestionsOutput = match serde_json::from_value(result) {
                    Ok(o) => o,
                    Err(e) => {
                        return self.fail(format!(
                            "malformed generate_example_questions result: {e}"
                        ))
                    }
                };

                if let BootstrapState::Analyzing { questions, .. } = &mut self.state {
                    *questions = Some(output.questions);
                }

                self.maybe_finish_analysis(now)
            }

            activity_names::INDEX => {
                // Indexing succeeded; the workflow is already Active as of
                // the approve() signal, this just confirms the side effect.
                vec![WorkflowAction::complete(json!({
                    "domain_id": self.input.domain_id,
                    "status": "active",
                }))]
            }

            _ => vec![],
        }
    }

    fn on_activity_failed(&mut self, activity_id: &str, error: &ActivityError) -> Vec<WorkflowAction> {
        self.fail(format!("{activity_id} failed: {}", error.message))
    }

    fn on_timer_fired(&mut self, timer_id: &str) -> Vec<WorkflowAction> {
        if timer_id != OWNER_TIMER {
            return vec![];
        }

        if let BootstrapState::AwaitingOwner { .. } = self.state {
            self.state = BootstrapState::Rejected {
                reason: "owner_decision_timeout".to_string(),
                owner_feedback: None,
            };
            return vec![
                self.upsert("rejected"),
                WorkflowAction::complete(json!({
                    "domain_id": self.input.domain_id,
                    "status": "rejected",
                    "reason": "owner_decision_timeout",
                })),
            ];
        }

        vec![]
    }

    fn on_signal(&mut self, signal: &WorkflowSignal) -> Vec<WorkflowAction> {
        match signal.signal_type.as_str() {
            "submit_owner_feedback" | "approve" | "reject" => {
                let BootstrapState::AwaitingOwner { analysis, .. } = &self.state else {
                    // Terminal or not-yet-awaiting: ignore duplicate/late signals.
                    return vec![];
                };

                let feedback: OwnerFeedback = match signal.signal_type.as_str() {
                    "approve" => OwnerFeedback {
                        approved: true,
                        feedback: json!({}),
                        question_rankings: vec![],
                        additional_topics: vec![],
                        remove_topics: vec![],
                        quality_requirements: json!({}),
                    },
                    "reject" => OwnerFeedback {
                        approved: false,
                        feedback: signal.payload.clone(),
                        question_rankings: vec![],
                        additional_topics: vec![],
                        remove_topics: vec![],
                        quality_requirements: json!({}),
                    },
                    _ => match serde_json::from_value(signal.payload.clone()) {
                        Ok(f) => f,
                        Err(_) => return vec![],
                    },
                };

                let mut topics = analysis.topics.clone();
                topics.retain(|t| !feedback.remove_topics.contains(t));
                for added in &feedback.additional_topics {
                    if !topics.contains(added) {
                        topics.push(added.clone());
                    }
                }

                let mut quality_criteria = analysis.quality_criteria.clone();
                if let (Some(target), Some(overrides)) = (
                    quality_criteria.as_object_mut(),
                    feedback.quality_requirements.as_object(),
                ) {
                    for (k, v) in overrides {
                        target.insert(k.clone(), v.clone());
                    }
                }

                if feedback.approved {
                    self.state = BootstrapState::Active {
                        topics: topics.clone(),
                        quality_criteria: quality_criteria.clone(),
                        owner_feedback: Some(feedback),
                    };

                    let index_input = IndexDomainInput {
                        domain_id: self.input.domain_id,
                        domain_name: self.input.title.clone(),
                        topics,
                        quality_criteria,
                    };

                    vec![
                        self.upsert("active"),
                        WorkflowAction::schedule_activity(
                            activity_names::INDEX,
                            activity_names::INDEX,
                            serde_json::to_value(index_input).unwrap_or(json!({})),
                        ),
                    ]
                } else {
                    self.state = BootstrapState::Rejected {
                        reason: "owner_rejected".to_string(),
                        owner_feedback: Some(feedback),
                    };
                    vec![
                        self.upsert("rejected"),
                        WorkflowAction::complete(json!({
                            "domain_id": self.input.domain_id,
                            "status": "rejected",
                            "reason": "owner_rejected",
                        })),
                    ]
                }
            }
            _ => vec![],
        }
    }

    fn on_query(&self, name: &str, _args: serde_json::Value) -> Option<serde_json::Value> {
        match name {
            "get_bootstrap_status" => Some(json!({
                "status": self.status_name(),
                "research_results": self.research_results(),
                "analysis_results": self.analysis_results(),
                "domain_config": self.domain_config(),
                "example_questions": self.example_questions(),
                "owner_feedback": self.owner_feedback(),
                "owner_approved": self.owner_approved(),
                "error_message": self.error_message(),
            })),
            _ => None,
        }
    }

    fn is_completed(&self) -> bool {
        matches!(
            self.state,
            BootstrapState::Active { .. } | BootstrapState::Rejected { .. } | BootstrapState::Failed { .. }
        )
    }

    fn result(&self) -> Option<Self::Output> {
        match &self.state {
            BootstrapState::Active {
                topics,
                quality_criteria,
                ..
            } => Some(DomainBootstrapOutput {
                domain_id: self.input.domain_id,
                status: "active".to_string(),
                topics: topics.clone(),
                quality_criteria: quality_criteria.clone(),
            }),
            BootstrapState::Rejected { .. } => Some(DomainBootstrapOutput {
                domain_id: self.input.domain_id,
                status: "rejected".to_string(),
                topics: vec![],
                quality_criteria: json!({}),
            }),
            _ => None,
        }
    }

    fn error(&self) -> Option<WorkflowError> {
        match &self.state {
            BootstrapState::Failed { error } => Some(WorkflowError::new(error.clone())),
            _ => None,
        }
    }
}

impl DomainBootstrapWorkflow {
    /// Transitions `Analyzing -> AwaitingOwner` once both `analyze_research`
    /// and `generate_example_questions` have completed, regardless of which
    /// finished first.
    fn maybe_finish_analysis(&mut self, now: chrono::DateTime<Utc>) -> Vec<WorkflowAction> {
        let BootstrapState::Analyzing {
            analysis, questions, ..
        } = &self.state
        else {
            return vec![];
        };

        let (Some(analysis), Some(questions)) = (analysis.clone(), questions.clone()) else {
            return vec![];
        };

        let due_at = crate::visibility::due_at(
            now,
            chrono::Duration::from_std(OWNER_DECISION_TIMEOUT).unwrap(),
        );
        self.state = BootstrapState::AwaitingOwner {
            analysis,
            questions,
            due_at,
        };

        vec![
            self.upsert_with_due_at("awaiting_owner", due_at),
            WorkflowAction::timer(OWNER_TIMER, OWNER_DECISION_TIMEOUT),
        ]
    }

    fn status_name(&self) -> &'static str {
        match &self.state {
            BootstrapState::Proposed => "proposed",
            BootstrapState::Researching => "researching",
            BootstrapState::Analyzing { .. } => "analyzing",
            BootstrapState::AwaitingOwner { .. } => "awaiting_owner",
            BootstrapState::Active { .. } => "active",
            BootstrapState::Rejected { .. } => "rejected",
            BootstrapState::Failed { .. } => "failed",
        }
    }

    fn research_results(&self) -> Option<serde_json::Value> {
        match &self.state {
            BootstrapState::Analyzing { research, .. } => serde_json::to_value(research).ok(),
            _ => None,
        }
    }

    fn analysis_results(&self) -> Option<serde_json::Value> {
        match &self.state {
            BootstrapState::AwaitingOwner { analysis, .. } => serde_json::to_value(analysis).ok(),
            _ => None,
        }
    }

    fn domain_config(&self) -> Option<serde_json::Value> {
        match &self.state {
            BootstrapState::Active {
                topics,
                quality_criteria,
                ..
            } => Some(json!({ "topics": topics, "quality_criteria": quality_criteria })),
            _ => None,
        }
    }

    fn example_questions(&self) -> Option<serde_json::Value> {
        match &self.state {
            BootstrapState::AwaitingOwner { questions, .. } => serde_json::to_value(questions).ok(),
            _ => None,
        }
    }

    fn owner_feedback(&self) -> Option<serde_json::Value> {
        match &self.state {
            BootstrapState::Active { owner_feedback, .. } => {
                owner_feedback.as_ref().and_then(|f| serde_json::to_value(f).ok())
            }
            BootstrapState::Rejected { owner_feedback, .. } => {
                owner_feedback.as_ref().and_then(|f| serde_json::to_value(f).ok())
            }
            _ => None,
        }
    }

    fn owner_approved(&self) -> bool {
        matches!(self.state, BootstrapState::Active { .. })
    }

    fn error_message(&self) -> Option<String> {
        match &self.state {
            BootstrapState::Failed { error } => Some(error.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> DomainBootstrapInput {
        DomainBootstrapInput {
            domain_id: Uuid::now_v7(),
            owner_id: "owner-1".to_string(),
            title: "Architect Isac Gustav Clason".to_string(),
            description: "Swedish architect, National Romanticism".to_string(),
            created_at: Utc::now(),
            initial_topics: vec!["architecture".into(), "swedish history".into()],
            target_audience: vec![],
            include_historical: true,
            include_technical: true,
            include_practical: true,
        }
    }

    fn research_output() -> serde_json::Value {
        json!({
            "summary": "s",
            "topics": (0..10).map(|i| format!("topic-{i}")).collect::<Vec<_>>(),
            "quality_criteria": {},
            "knowledge_gaps": [],
            "sources": [],
            "recommendations": []
        })
    }

    fn analysis_output() -> serde_json::Value {
        json!({
            "topics": ["architecture", "swedish history", "contemporary Swedish architects"],
            "quality_criteria": {"quality_threshold": 7.0},
            "search_attributes": {},
            "bootstrap_prompt": "p",
            "research_steps": [],
            "target_audience": []
        })
    }

    #[test]
    fn test_happy_path_reaches_active_with_merged_feedback() {
        let mut wf = DomainBootstrapWorkflow::new(input());
        wf.on_start();
        wf.on_activity_completed(activity_names::RESEARCH, research_output(), Utc::now());
        wf.on_activity_completed(activity_names::ANALYZE, analysis_output(), Utc::now());
        wf.on_activity_completed(activity_names::QUESTIONS, json!({ "questions": [] }), Utc::now());

        let signal = WorkflowSignal::new(
            "submit_owner_feedback",
            json!({
                "approved": true,
                "additional_topics": ["preservation techniques"],
                "remove_topics": ["contemporary Swedish architects"],
                "quality_requirements": {"quality_threshold": 8.5, "min_length": 2000}
            }),
        );
        let actions = wf.on_signal(&signal);

        assert!(matches!(
            actions.iter().find(|a| matches!(a, WorkflowAction::ScheduleActivity { .. })),
            Some(WorkflowAction::ScheduleActivity { activity_type, .. }) if activity_type == activity_names::INDEX
        ));

        let result = wf.result().expect("domain should be active");
        assert_eq!(result.status, "active");
        assert!(result.topics.contains(&"preservation techniques".to_string()));
        assert!(!result.topics.contains(&"contemporary Swedish architects".to_string()));
        assert_eq!(
            result.quality_criteria["quality_threshold"],
            json!(8.5)
        );
    }

    #[test]
    fn test_owner_rejects() {
        let mut wf = DomainBootstrapWorkflow::new(input());
        wf.on_start();
        wf.on_activity_completed(activity_names::RESEARCH, research_output(), Utc::now());
        wf.on_activity_completed(activity_names::ANALYZE, analysis_output(), Utc::now());
        wf.on_activity_completed(activity_names::QUESTIONS, json!({ "questions": [] }), Utc::now());

        let signal = WorkflowSignal::new(
            "submit_owner_feedback",
            json!({ "approved": false }),
        );
        let actions = wf.on_signal(&signal);

        assert!(actions
            .iter()
            .all(|a| !matches!(a, WorkflowAction::ScheduleActivity { .. })));
        assert_eq!(wf.result().unwrap().status, "rejected");
    }

    #[test]
    fn test_owner_silent_times_out_to_rejected() {
        let mut wf = DomainBootstrapWorkflow::new(input());
        wf.on_start();
        wf.on_activity_completed(activity_names::RESEARCH, research_output(), Utc::now());
        wf.on_activity_completed(activity_names::ANALYZE, analysis_output(), Utc::now());
        wf.on_activity_completed(activity_names::QUESTIONS, json!({ "questions": [] }), Utc::now());

        wf.on_timer_fired(OWNER_TIMER);

        assert_eq!(wf.result().unwrap().status, "rejected");
        assert!(wf.is_completed());
    }

    #[test]
    fn test_duplicate_signal_after_terminal_is_ignored() {
        let mut wf = DomainBootstrapWorkflow::new(input());
        wf.on_start();
        wf.on_activity_completed(activity_names::RESEARCH, research_output(), Utc::now());
        wf.on_activity_completed(activity_names::ANALYZE, analysis_output(), Utc::now());
        wf.on_activity_completed(activity_names::QUESTIONS, json!({ "questions": [] }), Utc::now());
        wf.on_signal(&WorkflowSignal::new("reject", json!({})));
        assert_eq!(wf.result().unwrap().status, "rejected");

        let actions = wf.on_signal(&WorkflowSignal::new("approve", json!({})));
        assert!(actions.is_empty());
        assert_eq!(wf.result().unwrap().status, "rejected");
    }

    #[test]
    fn test_activity_failure_marks_workflow_failed() {
        let mut wf = DomainBootstrapWorkflow::new(input());
        wf.on_start();
        let actions = wf.on_activity_failed(
            activity_names::RESEARCH,
            &ActivityError::retryable("upstream unavailable"),
        );

        assert!(actions
            .iter()
            .any(|a| matches!(a, WorkflowAction::FailWorkflow { .. })));
        assert!(wf.error().is_some());
    }
}
