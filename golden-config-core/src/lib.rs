//! Golden Config Core - Configuration compliance engine
//!
//! This crate provides the compliance diffing and hash grouping logic for
//! Golden Config, exposed to Python via PyO3. The implementation prioritizes:
//!
//! 1. **Correctness** - A skipped comparison fails loudly instead of
//!    reporting a false result
//! 2. **Logging** - Every device and rule decision logged with run context
//! 3. **Consistency** - Compliance rows and their hash groups commit together
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `pipeline` - Compliance run orchestrator and worker pool
//! - `rules` - Rule models and per-platform rule index
//! - `parser` - CLI dialects and section selection
//! - `hierconfig` - Hierarchical configuration trees and lineage selectors
//! - `compliance` - Comparison strategies and diff assembly
//! - `normalize` - Canonical forms, content hashes and backup cleaning
//! - `grouping` - Hash groups of identical non-compliant configurations
//! - `remediation` - Remediation text and config plans
//! - `storage` - Record models, transactional store and SQL builders
//! - `logging` - Structured logging with run context

pub mod compliance;
pub mod config;
pub mod error;
pub mod grouping;
pub mod hierconfig;
pub mod logging;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod remediation;
pub mod rules;
pub mod storage;

#[cfg(feature = "python")]
mod python;

pub use compliance::{evaluate_rule, ComplianceOutcome, ConfigElement, CustomRegistry};
pub use config::{EngineSettings, PlatformSettings};
pub use error::{ComplianceError, Result};
pub use grouping::HashGroupingEngine;
pub use normalize::{compute_config_hash, normalize_config_content};
pub use pipeline::{evaluate_device, run_compliance, BatchReport, ComplianceJob, RunContext};
pub use rules::{ComplianceRule, ConfigType, Device, RuleIndex};
pub use storage::{ComplianceStore, StoreSnapshot};
