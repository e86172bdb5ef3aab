//! Hierarchical tree comparison.

use crate::error::Result;
use crate::hierconfig::{injected_parents, select_text, HConfig};
use crate::parser::{hier_dialect, parse_config, LINEARIZED};
use crate::pipeline::context::DeviceContext;
use crate::rules::resolver::IndexedRule;

use super::element::ConfigElement;
use super::strategy::ComparisonStrategy;

/// Selects lineages from both trees and compares the relinearized text.
pub struct HierStrategy;

impl ComparisonStrategy for HierStrategy {
    fn compare(
        &self,
        rule: &IndexedRule,
        actual: &str,
        intended: &str,
        device: &DeviceContext,
    ) -> Result<(ConfigElement, ConfigElement)> {
        let dialect = hier_dialect(&device.platform, &device.device_name)?;

        let running = select_text(&HConfig::parse(actual, dialect), &rule.selectors);
        let mut generated = select_text(&HConfig::parse(intended, dialect), &rule.selectors);
        if generated.is_empty() {
            generated = injected_parents(&running);
        }

        let element = |text: String| ConfigElement::Lines {
            lines: parse_config(&text, &LINEARIZED),
            text,
        };
        Ok((element(running), element(generated)))
    }
}
