//! CLI section comparison.

use crate::error::Result;
use crate::parser::{cli_dialect, parse_config, render_lines, section_lines};
use crate::pipeline::context::DeviceContext;
use crate::rules::resolver::IndexedRule;

use super::element::ConfigElement;
use super::strategy::ComparisonStrategy;

/// Keeps the sections whose top-level line starts with one of the rule's
/// markers, parsed with the device platform's dialect.
pub struct CliStrategy;

impl ComparisonStrategy for CliStrategy {
    fn compare(
        &self,
        rule: &IndexedRule,
        actual: &str,
        intended: &str,
        device: &DeviceContext,
    ) -> Result<(ConfigElement, ConfigElement)> {
        let dialect = cli_dialect(&device.platform, &device.device_name)?;

        let scope = |config: &str| {
            let lines = section_lines(&parse_config(config, dialect), &rule.sections);
            ConfigElement::Lines {
                text: render_lines(&lines),
                lines,
            }
        };

        Ok((scope(actual), scope(intended)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::{ComplianceFeature, ComplianceRule, ConfigType};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn rule(match_config: &str, ordered: bool) -> IndexedRule {
        IndexedRule::new(ComplianceRule {
            id: Uuid::new_v4(),
            feature: ComplianceFeature {
                id: Uuid::new_v4(),
                name: "NTP".to_string(),
                slug: "ntp".to_string(),
                description: String::new(),
            },
            platform: "cisco_ios".to_string(),
            description: String::new(),
            config_ordered: ordered,
            config_remediation: false,
            match_config: match_config.to_string(),
            config_type: ConfigType::Cli,
            custom_compliance: false,
        })
        .unwrap()
    }

    fn device(platform: &str) -> DeviceContext {
        DeviceContext {
            run_id: "run-test".to_string(),
            device_id: Uuid::new_v4(),
            device_name: "nyc-rtr-01".to_string(),
            platform: platform.to_string(),
            evaluated_at: Utc::now(),
        }
    }

    #[test]
    fn test_non_compliant_reports_missing_and_extra() {
        let actual = "hostname r1\nntp server 10.0.0.1\nntp server 10.0.0.9\n";
        let intended = "hostname r1\nntp server 10.0.0.1\nntp server 10.0.0.2\n";
        let outcome = CliStrategy
            .evaluate(&rule("ntp", false), actual, intended, &device("cisco_ios"))
            .unwrap();
        assert!(!outcome.compliance);
        assert_eq!(outcome.compliance_int, 0);
        assert_eq!(outcome.missing, json!("ntp server 10.0.0.2"));
        assert_eq!(outcome.extra, json!("ntp server 10.0.0.9"));
        assert_eq!(outcome.actual, json!("ntp server 10.0.0.1\nntp server 10.0.0.9"));
    }

    #[test]
    fn test_compliant_has_empty_strings() {
        let cfg = "ntp server 10.0.0.1\ninterface Gi1\n shutdown\n";
        let outcome = CliStrategy
            .evaluate(&rule("ntp", true), cfg, cfg, &device("cisco_ios"))
            .unwrap();
        assert!(outcome.compliance);
        assert!(outcome.ordered);
        assert_eq!(outcome.missing, json!(""));
        assert_eq!(outcome.extra, json!(""));
    }

    #[test]
    fn test_unsupported_platform_fails_loudly() {
        let err = CliStrategy
            .evaluate(&rule("ntp", false), "", "", &device("vendor_x"))
            .unwrap_err();
        assert_eq!(err.kind(), "parser_unsupported");
    }
}
