//! Compliance rules.
//!
//! Rule and platform-setting models as loaded from the host, and the
//! per-run index that resolves a device's platform to its rules.

pub mod model;
pub mod resolver;

pub use model::*;
pub use resolver::*;
