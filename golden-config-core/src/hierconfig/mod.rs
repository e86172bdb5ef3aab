//! Hierarchical configuration comparison.
//!
//! Configurations are read into trees, narrowed by YAML lineage selectors and
//! written back as text in a stable order, so surface reordering by the
//! device does not register as drift. The same trees drive remediation.

pub mod lineage;
pub mod remediation;
pub mod select;
pub mod tree;

pub use lineage::{parse_selectors, LineageSelector, MatchRule};
pub use remediation::{negate, remediation_text, DEFAULT_NEGATION};
pub use select::{injected_parents, select_text};
pub use tree::{HConfig, HNode};
