//! Rule index.
//!
//! Rules are indexed by platform once per compliance run, with their match
//! sections and lineage selectors already parsed, so per-device resolution
//! is a map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::compliance::custom::{CustomRegistry, CUSTOM_COMPLIANCE};
use crate::error::{ComplianceError, Result};
use crate::hierconfig::lineage::{parse_selectors, LineageSelector};
use crate::logging::structured::LogContext;
use crate::{log_info, log_warn};

use super::model::{ComplianceRule, ConfigType};

/// A rule ready for evaluation.
#[derive(Debug, Clone)]
pub struct IndexedRule {
    pub rule: Arc<ComplianceRule>,
    pub strategy: ConfigType,
    /// Copied from the rule; persisted on every record it produces.
    pub ordered: bool,
    /// CLI section markers or JSON keys.
    pub sections: Vec<String>,
    /// Populated for hierarchical rules.
    pub selectors: Vec<LineageSelector>,
}

impl IndexedRule {
    pub fn new(rule: ComplianceRule) -> Result<Self> {
        rule.validate()?;
        let strategy = rule.effective_type();
        let selectors = if strategy == ConfigType::HierConfig {
            parse_selectors(&rule.match_config).map_err(|reason| ComplianceError::InvalidMatchConfig {
                rule: rule.label(),
                reason,
            })?
        } else {
            Vec::new()
        };

        Ok(Self {
            strategy,
            ordered: rule.config_ordered,
            sections: rule.sections(),
            selectors,
            rule: Arc::new(rule),
        })
    }

    pub fn id(&self) -> Uuid {
        self.rule.id
    }

    pub fn label(&self) -> String {
        self.rule.label()
    }
}

#[derive(Debug, Default)]
pub struct RuleIndex {
    by_platform: HashMap<String, Vec<IndexedRule>>,
}

impl RuleIndex {
    /// Index `rules` by platform.
    ///
    /// When several rules claim the same (platform, feature) the most
    /// specific one is kept: custom, then hierarchical, then JSON, then CLI.
    /// Within a platform rules are ordered by feature name.
    pub fn build(rules: Vec<ComplianceRule>, ctx: &LogContext) -> Result<Self> {
        let mut by_key: HashMap<(String, Uuid), IndexedRule> = HashMap::new();

        for rule in rules {
            let indexed = IndexedRule::new(rule)?;
            let key = (indexed.rule.platform.clone(), indexed.rule.feature.id);

            let replace = match by_key.get(&key) {
                None => true,
                Some(existing) => {
                    let more_specific = indexed.rule.specificity_rank() < existing.rule.specificity_rank();
                    let (kept, dropped) = if more_specific {
                        (indexed.strategy, existing.strategy)
                    } else {
                        (existing.strategy, indexed.strategy)
                    };
                    log_warn!(
                        ctx,
                        "RULE_SHADOWED",
                        rule = indexed.label(),
                        kept = kept.as_str(),
                        dropped = dropped.as_str()
                    );
                    more_specific
                }
            };
            if replace {
                by_key.insert(key, indexed);
            }
        }

        let mut by_platform: HashMap<String, Vec<IndexedRule>> = HashMap::new();
        for ((platform, _), indexed) in by_key {
            by_platform.entry(platform).or_default().push(indexed);
        }
        for rules in by_platform.values_mut() {
            rules.sort_by(|a, b| a.rule.feature.name.cmp(&b.rule.feature.name));
        }

        let index = Self { by_platform };
        log_info!(ctx, "RULE_INDEX_BUILT", platforms = index.platforms(), rules = index.len());
        Ok(index)
    }

    pub fn platforms(&self) -> Vec<String> {
        let mut platforms: Vec<String> = self.by_platform.keys().cloned().collect();
        platforms.sort();
        platforms
    }

    pub fn len(&self) -> usize {
        self.by_platform.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rules(&self) -> impl Iterator<Item = &IndexedRule> {
        self.by_platform.values().flatten()
    }

    /// Every rule for a device's platform, or `RuleNotFound`.
    pub fn resolve(&self, platform: &str, device: &str) -> Result<&[IndexedRule]> {
        match self.by_platform.get(platform) {
            Some(rules) if !rules.is_empty() => Ok(rules),
            _ => Err(ComplianceError::RuleNotFound {
                device: device.to_string(),
                platform: platform.to_string(),
            }),
        }
    }

    /// The rule for one feature on a device's platform, or `RuleNotFound`.
    pub fn resolve_feature(&self, platform: &str, feature_id: Uuid, device: &str) -> Result<&IndexedRule> {
        self.resolve(platform, device)?
            .iter()
            .find(|r| r.rule.feature.id == feature_id)
            .ok_or_else(|| ComplianceError::RuleNotFound {
                device: device.to_string(),
                platform: platform.to_string(),
            })
    }

    /// Report custom rules that will fail because no callable is registered.
    pub fn check_custom(&self, registry: &CustomRegistry, ctx: &LogContext) -> Vec<ComplianceError> {
        if registry.compliance(CUSTOM_COMPLIANCE).is_some() {
            return Vec::new();
        }

        let mut problems: Vec<ComplianceError> = self
            .rules()
            .filter(|r| r.strategy == ConfigType::Custom)
            .map(|r| ComplianceError::CustomCallableMissing {
                device: "*".to_string(),
                rule: r.label(),
                purpose: "compliance",
                name: CUSTOM_COMPLIANCE.to_string(),
            })
            .collect();
        problems.sort_by_key(|e| e.to_string());

        for problem in &problems {
            log_warn!(ctx, "CUSTOM_CALLABLE_UNREGISTERED", error = problem.to_string());
        }
        problems
    }
}
