//! Comparison strategy contract and dispatch.

use crate::error::Result;
use crate::pipeline::context::DeviceContext;
use crate::rules::model::ConfigType;
use crate::rules::resolver::IndexedRule;

use super::cli::CliStrategy;
use super::custom::{CustomRegistry, CustomStrategy};
use super::diff::assemble;
use super::element::ConfigElement;
use super::hier::HierStrategy;
use super::json::JsonStrategy;
use super::outcome::ComplianceOutcome;

pub trait ComparisonStrategy {
    /// Scope both artifacts to what the rule cares about.
    fn compare(
        &self,
        rule: &IndexedRule,
        actual: &str,
        intended: &str,
        device: &DeviceContext,
    ) -> Result<(ConfigElement, ConfigElement)>;

    /// Scope, then diff.
    fn evaluate(
        &self,
        rule: &IndexedRule,
        actual: &str,
        intended: &str,
        device: &DeviceContext,
    ) -> Result<ComplianceOutcome> {
        let (actual, intended) = self.compare(rule, actual, intended, device)?;
        Ok(assemble(rule, actual, intended))
    }
}

/// Evaluate one rule for one device with the strategy its type selects.
pub fn evaluate_rule(
    rule: &IndexedRule,
    actual: &str,
    intended: &str,
    device: &DeviceContext,
    registry: &CustomRegistry,
) -> Result<ComplianceOutcome> {
    match rule.strategy {
        ConfigType::Cli => CliStrategy.evaluate(rule, actual, intended, device),
        ConfigType::Json => JsonStrategy.evaluate(rule, actual, intended, device),
        ConfigType::HierConfig => HierStrategy.evaluate(rule, actual, intended, device),
        ConfigType::Custom => CustomStrategy { registry }.evaluate(rule, actual, intended, device),
    }
}
