//! Compliance evaluation for one device.
//!
//! Every rule for the device's platform is evaluated before anything is
//! written; the compliance upserts and their hash grouping then commit in a
//! single store transaction. A device that fails at any step leaves no rows
//! behind. The device also gets a unified diff of its whole backup against
//! its intended configuration.

use std::collections::HashMap;

use serde_json::Value;

use crate::compliance::custom::CustomRegistry;
use crate::compliance::diff::unified_config_diff;
use crate::compliance::strategy::evaluate_rule;
use crate::error::Result;
use crate::grouping::HashGroupingEngine;
use crate::logging::structured::LogContext;
use crate::normalize::{clean_config, compile_platform_cleaning, CleaningRules};
use crate::remediation::remediate;
use crate::rules::model::{ComplianceRule, ConfigRemove, ConfigReplace, Device, RemediationSetting};
use crate::rules::resolver::RuleIndex;
use crate::storage::models::{ConfigCompliance, ConfigKind};
use crate::storage::store::ComplianceStore;
use crate::{log_debug, log_info, log_warn};

use super::artifacts::ArtifactSource;
use super::context::RunContext;

/// Everything a run needs, prepared once before devices are evaluated.
#[derive(Debug)]
pub struct ComplianceJob {
    pub rules: RuleIndex,
    pub cleaning: HashMap<String, CleaningRules>,
    pub remediation: HashMap<String, RemediationSetting>,
    pub registry: CustomRegistry,
}

impl ComplianceJob {
    pub fn build(
        rules: Vec<ComplianceRule>,
        removes: &[ConfigRemove],
        replaces: &[ConfigReplace],
        remediation: Vec<RemediationSetting>,
        registry: CustomRegistry,
        ctx: &LogContext,
    ) -> Result<Self> {
        let rules = RuleIndex::build(rules, ctx)?;
        // reported now, enforced per device
        let _ = rules.check_custom(&registry, ctx);

        let cleaning = compile_platform_cleaning(removes, replaces)?;
        let remediation = remediation
            .into_iter()
            .map(|setting| (setting.platform.clone(), setting))
            .collect();

        Ok(Self {
            rules,
            cleaning,
            remediation,
            registry,
        })
    }

    /// The rules as registered in the store.
    pub fn rule_models(&self) -> Vec<ComplianceRule> {
        self.rules.rules().map(|r| r.rule.as_ref().clone()).collect()
    }
}

/// What one device's evaluation produced.
#[derive(Debug, Clone)]
pub struct DeviceEvaluation {
    /// Compliance records as persisted, one per rule.
    pub records: Vec<ConfigCompliance>,
    /// Unified diff of the sanitized backup against the intended config.
    pub compliance_config: String,
}

/// Evaluate and persist every rule for one device.
pub fn evaluate_device(
    ctx: &RunContext,
    job: &ComplianceJob,
    store: &ComplianceStore,
    device: &Device,
    source: &dyn ArtifactSource,
) -> Result<DeviceEvaluation> {
    let dctx = ctx.device_context(device);
    let log_ctx = dctx.log_context();

    let rules = job.rules.resolve(&device.platform, &device.name)?;

    let mut actual = source.load(device, ConfigKind::Actual)?;
    let intended = source.load(device, ConfigKind::Intended)?;

    if ctx.settings.sanitize_backup {
        if let Some(cleaning) = job.cleaning.get(&device.platform) {
            actual = clean_config(&actual, cleaning, &log_ctx);
        }
    }

    let mut records = Vec::with_capacity(rules.len());
    for rule in rules {
        let rule_ctx = log_ctx.with_rule(&rule.label());
        let outcome = evaluate_rule(rule, &actual, &intended, &dctx, &job.registry)?;

        let remediation = if ctx.settings.remediation_enabled {
            remediate(
                rule,
                &outcome,
                job.remediation.get(&device.platform),
                &dctx,
                &job.registry,
            )?
        } else {
            String::new()
        };

        log_debug!(
            rule_ctx,
            "COMPLIANCE_EVALUATED",
            strategy = rule.strategy.as_str(),
            compliant = outcome.compliance
        );
        records.push(outcome.into_record(rule, &dctx, Value::String(remediation)));
    }

    let saved = store.transaction(|tx| {
        let mut saved = Vec::with_capacity(records.len());
        for record in records {
            let record = tx.upsert_compliance(record);
            HashGroupingEngine::record(tx, &record, &log_ctx);
            saved.push(record);
        }
        Ok(saved)
    })?;

    let compliant = saved.iter().filter(|r| r.compliance).count();
    if compliant == saved.len() {
        log_info!(log_ctx, "DEVICE_COMPLIANT", rules = saved.len());
    } else {
        log_warn!(
            log_ctx,
            "DEVICE_NON_COMPLIANT",
            rules = saved.len(),
            non_compliant = saved.len() - compliant
        );
    }

    Ok(DeviceEvaluation {
        records: saved,
        compliance_config: unified_config_diff(&actual, &intended),
    })
}
