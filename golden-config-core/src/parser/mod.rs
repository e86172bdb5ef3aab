//! CLI configuration parsing.
//!
//! Dialect lookup by network driver, line parsing into parent/child
//! `ConfigLine`s, and section selection by top-level markers.

pub mod dialect;
pub mod lines;
pub mod section;

pub use dialect::*;
pub use lines::*;
pub use section::*;
