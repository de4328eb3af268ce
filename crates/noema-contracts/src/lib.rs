// Public contracts for the Noema API: DTOs shared between the HTTP façade,
// the core workflow crate, and storage row mappers.

pub mod common;
pub mod document;
pub mod domain;
pub mod signal;
pub mod workflow;

pub use common::*;
pub use document::*;
pub use domain::*;
pub use signal::*;
pub use workflow::*;
