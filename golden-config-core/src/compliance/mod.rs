//! Compliance evaluation.
//!
//! One strategy per rule type scopes the actual and intended artifacts to
//! the configuration a rule governs; the assembler diffs the two scoped
//! elements into a compliance outcome:
//! - `cli` - section selection by top-level markers
//! - `json` - top-level key selection
//! - `hier` - lineage selection over configuration trees
//! - `custom` - registered callables

pub mod cli;
pub mod custom;
pub mod diff;
pub mod element;
pub mod hier;
pub mod json;
pub mod outcome;
pub mod strategy;

pub use custom::{CustomCompliance, CustomInput, CustomRegistry, CustomRemediation, CUSTOM_COMPLIANCE, CUSTOM_REMEDIATION};
pub use diff::{
    assemble, compare_lines, prune_empty, structural_diff, unified_config_diff, LineComparison, StructuralDiff,
};
pub use element::ConfigElement;
pub use outcome::ComplianceOutcome;
pub use strategy::{evaluate_rule, ComparisonStrategy};
