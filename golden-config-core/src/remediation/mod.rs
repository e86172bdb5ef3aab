//! Remediation text and config plans.

pub mod engine;
pub mod plan;

pub use engine::remediate;
pub use plan::{config_set_from_compliance, plan_for_hash_group, ConfigPlan, ConfigPlanType};
