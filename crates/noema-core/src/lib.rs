//! Business logic for the durable knowledge-domain workflow platform.
//!
//! Built on top of `noema-durable`'s replay engine: the Domain Bootstrap and
//! Document Contribution workflows, the activities they schedule, and the
//! signal/inbox delivery service that notifies owners and contributors.

pub mod activities;
pub mod dispatch;
pub mod signal;
pub mod visibility;
pub mod workflows;

pub use signal::{SignalService, Sink, SubscriberRegistry};
pub use workflows::{DocumentContributionWorkflow, DomainBootstrapWorkflow};
