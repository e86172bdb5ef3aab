//! Storage module.
//!
//! Record models, the in-process transactional store, and SQL query
//! builders for hosts that persist through PostgreSQL.

pub mod models;
pub mod queries;
pub mod store;

pub use models::*;
pub use queries::*;
pub use store::{ComplianceStore, StoreSnapshot, Transaction};
