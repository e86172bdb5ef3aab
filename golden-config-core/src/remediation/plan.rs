//! Config plans built from stored compliance records.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::grouping::HashGroupingEngine;
use crate::logging::structured::LogContext;
use crate::log_info;
use crate::storage::models::ConfigCompliance;
use crate::storage::store::ComplianceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPlanType {
    Intended,
    Missing,
    Remediation,
    Manual,
}

impl ConfigPlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigPlanType::Intended => "intended",
            ConfigPlanType::Missing => "missing",
            ConfigPlanType::Remediation => "remediation",
            ConfigPlanType::Manual => "manual",
        }
    }

    fn field<'r>(&self, record: &'r ConfigCompliance) -> Option<&'r Value> {
        match self {
            ConfigPlanType::Intended => Some(&record.intended),
            ConfigPlanType::Missing => Some(&record.missing),
            ConfigPlanType::Remediation => Some(&record.remediation),
            ConfigPlanType::Manual => None,
        }
    }
}

impl fmt::Display for ConfigPlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands to push to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPlan {
    pub device_id: Uuid,
    pub device_name: String,
    pub feature_id: Uuid,
    pub plan_type: ConfigPlanType,
    pub config_set: String,
}

/// Text of a stored payload: strings as-is, documents as pretty JSON.
fn as_config_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

fn record_for(store: &ComplianceStore, device_id: Uuid, feature_id: Uuid) -> Option<ConfigCompliance> {
    store.read(|tx| {
        tx.compliance_keys()
            .into_iter()
            .filter(|(device, _)| *device == device_id)
            .filter_map(|(device, rule)| tx.compliance(device, rule))
            .find(|record| record.feature_id == feature_id)
            .cloned()
    })
}

/// The device's `plan_type` text for the feature, or "" without a record.
/// Manual plans carry no stored text.
pub fn config_set_from_compliance(
    store: &ComplianceStore,
    device_id: Uuid,
    feature_id: Uuid,
    plan_type: ConfigPlanType,
) -> String {
    record_for(store, device_id, feature_id)
        .and_then(|record| plan_type.field(&record).map(as_config_text))
        .unwrap_or_default()
}

/// One plan per device of the hash group. Devices with nothing to push are
/// left out; manual plans use `manual_commands` verbatim.
pub fn plan_for_hash_group(
    store: &ComplianceStore,
    feature_id: Uuid,
    config_hash: &str,
    plan_type: ConfigPlanType,
    manual_commands: Option<&str>,
    ctx: &LogContext,
) -> Result<Vec<ConfigPlan>> {
    let devices = HashGroupingEngine::new(store).device_ids_for_hash_group(feature_id, config_hash)?;

    let mut plans = Vec::with_capacity(devices.len());
    for device_id in devices {
        let Some(record) = record_for(store, device_id, feature_id) else {
            continue;
        };
        let config_set = match plan_type {
            ConfigPlanType::Manual => manual_commands.unwrap_or_default().to_string(),
            _ => config_set_from_compliance(store, device_id, feature_id, plan_type),
        };
        if config_set.trim().is_empty() {
            continue;
        }
        plans.push(ConfigPlan {
            device_id,
            device_name: record.device_name,
            feature_id,
            plan_type,
            config_set,
        });
    }

    log_info!(
        ctx,
        "CONFIG_PLANS_CREATED",
        plan_type = plan_type.as_str(),
        hash = config_hash,
        plans = plans.len()
    );
    Ok(plans)
}
