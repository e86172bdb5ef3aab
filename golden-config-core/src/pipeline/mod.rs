//! Pipeline orchestration module.
//!
//! Compliance run workflow:
//! - Load actual and intended artifacts per device
//! - Sanitize the backup with the platform's cleaning rules
//! - Evaluate every rule for the device's platform
//! - Upsert compliance records and hash groups in one transaction
//! - Report per-device success or failure

pub mod artifacts;
pub mod batch;
pub mod context;
pub mod evaluation;

pub use artifacts::*;
pub use batch::*;
pub use context::*;
pub use evaluation::*;
