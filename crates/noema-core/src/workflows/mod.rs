pub mod document_contribution;
pub mod domain_bootstrap;

pub use document_contribution::{
    ContributionState, ControllerDecision, DocumentContributionInput, DocumentContributionOutput,
    DocumentContributionWorkflow,
};
pub use domain_bootstrap::{
    BootstrapState, DomainBootstrapInput, DomainBootstrapOutput, DomainBootstrapWorkflow,
    OwnerFeedback,
};
