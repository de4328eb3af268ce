// Postgres storage layer with sqlx

pub mod models;
pub mod repositories;

pub use models::*;
pub use repositories::{AttributeFilter, Database, Pagination};
