//! Persisted record shapes.
//!
//! These mirror the host application's tables. Every payload column is a
//! `serde_json::Value` so records round-trip through JSON without losing
//! list/map structure.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::rules::model::ComplianceRule;

/// Which side of a compliance record a hash was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Actual,
    Intended,
}

impl ConfigKind {
    pub const BOTH: [ConfigKind; 2] = [ConfigKind::Actual, ConfigKind::Intended];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Actual => "actual",
            ConfigKind::Intended => "intended",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compliance evaluation for a (device, rule) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigCompliance {
    pub id: Uuid,
    pub device_id: Uuid,
    pub device_name: String,
    pub rule_id: Uuid,
    pub feature_id: Uuid,
    pub compliance: bool,
    pub compliance_int: u8,
    pub ordered: bool,
    pub actual: Value,
    pub intended: Value,
    pub missing: Value,
    pub extra: Value,
    pub remediation: Value,
    pub last_updated: DateTime<Utc>,
}

impl ConfigCompliance {
    pub fn key(&self) -> (Uuid, Uuid) {
        (self.device_id, self.rule_id)
    }

    pub fn side(&self, kind: ConfigKind) -> &Value {
        match kind {
            ConfigKind::Actual => &self.actual,
            ConfigKind::Intended => &self.intended,
        }
    }

    /// True when two evaluations carry the same result, ignoring identity
    /// and timestamps.
    pub fn same_outcome(&self, other: &ConfigCompliance) -> bool {
        self.device_id == other.device_id
            && self.rule_id == other.rule_id
            && self.compliance == other.compliance
            && self.compliance_int == other.compliance_int
            && self.ordered == other.ordered
            && self.actual == other.actual
            && self.intended == other.intended
            && self.missing == other.missing
            && self.extra == other.extra
            && self.remediation == other.remediation
    }
}

/// Content fingerprint of one side of a compliance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigComplianceHash {
    pub id: Uuid,
    pub device_id: Uuid,
    pub rule_id: Uuid,
    pub config_type: ConfigKind,
    pub config_hash: String,
    pub config_group: Option<Uuid>,
}

impl ConfigComplianceHash {
    pub fn natural_key(&self) -> (Uuid, Uuid, ConfigKind) {
        (self.device_id, self.rule_id, self.config_type)
    }
}

/// A distinct non-compliant configuration shared by one or more devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigHashGrouping {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub config_hash: String,
    pub config_content: Value,
}

impl fmt::Display for ConfigHashGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.rule_id, self.config_hash)
    }
}

/// The slice of a compliance rule the grouping tables need: which feature a
/// rule belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub rule_id: Uuid,
    pub feature_id: Uuid,
    pub feature_name: String,
    pub feature_slug: String,
    pub platform: String,
}

impl From<&ComplianceRule> for RuleRecord {
    fn from(rule: &ComplianceRule) -> Self {
        Self {
            rule_id: rule.id,
            feature_id: rule.feature.id,
            feature_name: rule.feature.name.clone(),
            feature_slug: rule.feature.slug.clone(),
            platform: rule.platform.clone(),
        }
    }
}

/// Group row annotated with its member count, as shown to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashGroupSummary {
    pub group: ConfigHashGrouping,
    pub feature_id: Uuid,
    pub feature_name: String,
    pub feature_slug: String,
    pub device_count: usize,
}
