pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod types;

pub use llm::{
    AnalyzeResearchActivity, AssessDocumentRelevanceActivity, GenerateExampleQuestionsActivity,
    ResearchDomainActivity,
};
pub use notify::{NotifyContributorActivity, SendSignalPersistentActivity};
pub use pipeline::{
    ExtractTextActivity, GenerateEmbeddingsActivity, IndexDomainActivity, IndexWeaviateActivity,
    UpdateGraphActivity,
};
pub use types::*;
