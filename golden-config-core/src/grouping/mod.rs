//! Fleet-wide grouping of identical non-compliant configurations.

pub mod engine;

pub use engine::{HashGroupingEngine, HashLink};
