//! Compliance outcome for one (device, rule) pair, before persistence.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::pipeline::context::DeviceContext;
use crate::rules::resolver::IndexedRule;
use crate::storage::models::ConfigCompliance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceOutcome {
    pub compliance: bool,
    pub compliance_int: u8,
    pub ordered: bool,
    pub actual: Value,
    pub intended: Value,
    pub missing: Value,
    pub extra: Value,
}

impl ComplianceOutcome {
    /// The record to upsert. The id is provisional; the store keeps the id
    /// of an existing record for the same (device, rule).
    pub fn into_record(self, rule: &IndexedRule, device: &DeviceContext, remediation: Value) -> ConfigCompliance {
        ConfigCompliance {
            id: Uuid::new_v4(),
            device_id: device.device_id,
            device_name: device.device_name.clone(),
            rule_id: rule.id(),
            feature_id: rule.rule.feature.id,
            compliance: self.compliance,
            compliance_int: self.compliance_int,
            ordered: self.ordered,
            actual: self.actual,
            intended: self.intended,
            missing: self.missing,
            extra: self.extra,
            remediation,
            last_updated: device.evaluated_at,
        }
    }
}
