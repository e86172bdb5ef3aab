//! Remediation for non-compliant records.

use serde_json::Value;

use crate::compliance::custom::{CustomInput, CustomRegistry, CUSTOM_REMEDIATION};
use crate::compliance::outcome::ComplianceOutcome;
use crate::error::{ComplianceError, Result};
use crate::hierconfig::{remediation_text, HConfig, DEFAULT_NEGATION};
use crate::log_debug;
use crate::parser::hier_dialect;
use crate::pipeline::context::DeviceContext;
use crate::rules::model::{RemediationSetting, RemediationType};
use crate::rules::resolver::IndexedRule;

/// Remediation text for one outcome.
///
/// Empty when the outcome is compliant, the rule does not ask for
/// remediation or the platform has no remediation setting.
pub fn remediate(
    rule: &IndexedRule,
    outcome: &ComplianceOutcome,
    setting: Option<&RemediationSetting>,
    device: &DeviceContext,
    registry: &CustomRegistry,
) -> Result<String> {
    if outcome.compliance || !rule.rule.config_remediation {
        return Ok(String::new());
    }
    let Some(setting) = setting else {
        log_debug!(
            device.log_context().with_rule(&rule.label()),
            "REMEDIATION_SKIPPED",
            reason = "no remediation setting for platform"
        );
        return Ok(String::new());
    };

    match setting.remediation_type {
        RemediationType::HierConfig => hier_remediation(outcome, setting, device),
        RemediationType::Custom => custom_remediation(rule, outcome, device, registry),
    }
}

fn hier_remediation(outcome: &ComplianceOutcome, setting: &RemediationSetting, device: &DeviceContext) -> Result<String> {
    let dialect = hier_dialect(&device.platform, &device.device_name)?;

    let (Value::String(running), Value::String(generated)) = (&outcome.actual, &outcome.intended) else {
        // structured documents have no command form
        return Ok(String::new());
    };

    let negation = setting
        .remediation_options
        .get("negation")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_NEGATION);

    Ok(remediation_text(
        &HConfig::parse(running, dialect),
        &HConfig::parse(generated, dialect),
        negation,
    ))
}

fn custom_remediation(
    rule: &IndexedRule,
    outcome: &ComplianceOutcome,
    device: &DeviceContext,
    registry: &CustomRegistry,
) -> Result<String> {
    let callable = registry
        .remediation(CUSTOM_REMEDIATION)
        .ok_or_else(|| ComplianceError::CustomCallableMissing {
            device: device.device_name.clone(),
            rule: rule.label(),
            purpose: "remediation",
            name: CUSTOM_REMEDIATION.to_string(),
        })?;

    let input = CustomInput::new(rule, device, outcome.actual.clone(), outcome.intended.clone())
        .with_delta(outcome.missing.clone(), outcome.extra.clone());

    callable
        .remediate(&input)
        .map_err(|source| ComplianceError::CustomCallableFailed {
            device: device.device_name.clone(),
            name: CUSTOM_REMEDIATION.to_string(),
            source,
        })
}
