//! User-supplied compliance and remediation callables.
//!
//! Callables are registered by identifier at process start and handed to
//! each evaluation through the registry; nothing is looked up globally.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ComplianceError, Result};
use crate::pipeline::context::DeviceContext;
use crate::rules::model::ComplianceRule;
use crate::rules::resolver::IndexedRule;

use super::element::ConfigElement;
use super::outcome::ComplianceOutcome;
use super::strategy::ComparisonStrategy;

/// Identifier of the callable evaluating custom rules.
pub const CUSTOM_COMPLIANCE: &str = "get_custom_compliance";
/// Identifier of the callable producing custom remediation.
pub const CUSTOM_REMEDIATION: &str = "get_custom_remediation";

const REQUIRED_KEYS: [&str; 5] = ["compliance", "compliance_int", "ordered", "missing", "extra"];

/// What a callable sees: the record being evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct CustomInput {
    pub device_id: Uuid,
    pub device_name: String,
    pub platform: String,
    pub rule: ComplianceRule,
    pub actual: Value,
    pub intended: Value,
    /// Populated for remediation.
    pub missing: Value,
    /// Populated for remediation.
    pub extra: Value,
}

impl CustomInput {
    pub fn new(rule: &IndexedRule, device: &DeviceContext, actual: Value, intended: Value) -> Self {
        Self {
            device_id: device.device_id,
            device_name: device.device_name.clone(),
            platform: device.platform.clone(),
            rule: rule.rule.as_ref().clone(),
            actual,
            intended,
            missing: Value::Null,
            extra: Value::Null,
        }
    }

    pub fn with_delta(mut self, missing: Value, extra: Value) -> Self {
        self.missing = missing;
        self.extra = extra;
        self
    }
}

/// Returns an object with `compliance`, `compliance_int`, `ordered`,
/// `missing` and `extra`.
pub trait CustomCompliance: Send + Sync {
    fn evaluate(&self, input: &CustomInput) -> anyhow::Result<Value>;
}

/// Returns the remediation text for a non-compliant record.
pub trait CustomRemediation: Send + Sync {
    fn remediate(&self, input: &CustomInput) -> anyhow::Result<String>;
}

impl<F> CustomCompliance for F
where
    F: Fn(&CustomInput) -> anyhow::Result<Value> + Send + Sync,
{
    fn evaluate(&self, input: &CustomInput) -> anyhow::Result<Value> {
        self(input)
    }
}

impl<F> CustomRemediation for F
where
    F: Fn(&CustomInput) -> anyhow::Result<String> + Send + Sync,
{
    fn remediate(&self, input: &CustomInput) -> anyhow::Result<String> {
        self(input)
    }
}

#[derive(Clone, Default)]
pub struct CustomRegistry {
    compliance: HashMap<String, Arc<dyn CustomCompliance>>,
    remediation: HashMap<String, Arc<dyn CustomRemediation>>,
}

impl fmt::Debug for CustomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRegistry")
            .field("compliance", &self.compliance.keys().collect::<Vec<_>>())
            .field("remediation", &self.remediation.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CustomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_compliance(&mut self, name: &str, callable: impl CustomCompliance + 'static) -> &mut Self {
        self.compliance.insert(name.to_string(), Arc::new(callable));
        self
    }

    pub fn register_remediation(&mut self, name: &str, callable: impl CustomRemediation + 'static) -> &mut Self {
        self.remediation.insert(name.to_string(), Arc::new(callable));
        self
    }

    pub fn compliance(&self, name: &str) -> Option<Arc<dyn CustomCompliance>> {
        self.compliance.get(name).cloned()
    }

    pub fn remediation(&self, name: &str) -> Option<Arc<dyn CustomRemediation>> {
        self.remediation.get(name).cloned()
    }
}

/// Check a callable's result and turn it into an outcome.
pub fn validate_custom_result(
    result: &Value,
    name: &str,
    device: &DeviceContext,
) -> Result<(bool, u8, bool, Value, Value)> {
    let invalid = |reason: String| ComplianceError::InvalidCustomResult {
        device: device.device_name.clone(),
        name: name.to_string(),
        reason,
    };

    let obj = result
        .as_object()
        .ok_or_else(|| invalid(format!("expected an object, got `{}`", result)))?;

    for key in REQUIRED_KEYS {
        if !obj.contains_key(key) {
            return Err(invalid(format!("the `{}` key was not found", key)));
        }
    }

    let boolean = |key: &str| {
        obj[key]
            .as_bool()
            .ok_or_else(|| invalid(format!("`{}` must be a boolean, got `{}`", key, obj[key])))
    };
    let compliance = boolean("compliance")?;
    let ordered = boolean("ordered")?;

    let compliance_int = match obj["compliance_int"].as_u64() {
        Some(0) => 0,
        Some(1) => 1,
        _ => {
            return Err(invalid(format!(
                "`compliance_int` must be 0 or 1, got `{}`",
                obj["compliance_int"]
            )))
        }
    };

    Ok((
        compliance,
        compliance_int,
        ordered,
        obj["missing"].clone(),
        obj["extra"].clone(),
    ))
}

/// Delegates the whole comparison to the registered callable.
pub struct CustomStrategy<'a> {
    pub registry: &'a CustomRegistry,
}

impl ComparisonStrategy for CustomStrategy<'_> {
    fn compare(
        &self,
        _rule: &IndexedRule,
        actual: &str,
        intended: &str,
        _device: &DeviceContext,
    ) -> Result<(ConfigElement, ConfigElement)> {
        Ok((
            ConfigElement::Raw(actual.to_string()),
            ConfigElement::Raw(intended.to_string()),
        ))
    }

    fn evaluate(
        &self,
        rule: &IndexedRule,
        actual: &str,
        intended: &str,
        device: &DeviceContext,
    ) -> Result<ComplianceOutcome> {
        let callable = self
            .registry
            .compliance(CUSTOM_COMPLIANCE)
            .ok_or_else(|| ComplianceError::CustomCallableMissing {
                device: device.device_name.clone(),
                rule: rule.label(),
                purpose: "compliance",
                name: CUSTOM_COMPLIANCE.to_string(),
            })?;

        let (actual, intended) = self.compare(rule, actual, intended, device)?;
        let input = CustomInput::new(rule, device, actual.to_value(), intended.to_value());

        let result = callable
            .evaluate(&input)
            .map_err(|source| ComplianceError::CustomCallableFailed {
                device: device.device_name.clone(),
                name: CUSTOM_COMPLIANCE.to_string(),
                source,
            })?;

        let (compliance, compliance_int, ordered, missing, extra) =
            validate_custom_result(&result, CUSTOM_COMPLIANCE, device)?;

        Ok(ComplianceOutcome {
            compliance,
            compliance_int,
            ordered,
            actual: input.actual,
            intended: input.intended,
            missing,
            extra,
        })
    }
}
