//! Normalization module.
//!
//! Canonical forms and content hashes for configuration payloads, plus the
//! platform-scoped cleaning applied to backups before comparison.

pub mod content;
pub mod ordering;
pub mod postprocess;

pub use content::*;
pub use ordering::*;
pub use postprocess::*;
