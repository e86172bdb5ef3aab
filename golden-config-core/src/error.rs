//! Error taxonomy for compliance evaluation and hash grouping.
//!
//! Every device-scoped variant carries the device name and the resource that
//! could not be resolved, so a batch report can be read without the logs.

use std::path::PathBuf;

use uuid::Uuid;

use crate::storage::models::ConfigKind;

/// Which parser family rejected a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserFamily {
    Cli,
    HierConfig,
}

impl std::fmt::Display for ParserFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserFamily::Cli => write!(f, "CLI-config"),
            ParserFamily::HierConfig => write!(f, "hier_config"),
        }
    }
}

/// E3005 for the intended file, E3006 for the backup.
fn missing_code(kind: &ConfigKind) -> &'static str {
    match kind {
        ConfigKind::Intended => "E3005",
        ConfigKind::Actual => "E3006",
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    #[error("{}: unable to locate {kind} configuration for device `{device}` at {}", missing_code(.kind), .path.display())]
    ConfigNotFound {
        device: String,
        kind: ConfigKind,
        path: PathBuf,
    },

    #[error("unable to read {kind} configuration for device `{device}` at {}", .path.display())]
    ConfigUnreadable {
        device: String,
        kind: ConfigKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("E3007: there is no defined compliance rule for platform `{platform}` (device `{device}`)")]
    RuleNotFound { device: String, platform: String },

    #[error("E3003: there is no {family} parser support for platform `{platform}` (device `{device}`)")]
    ParserUnsupported {
        device: String,
        platform: String,
        family: ParserFamily,
    },

    #[error("custom {purpose} callable `{name}` is not registered (device `{device}`, rule `{rule}`)")]
    CustomCallableMissing {
        device: String,
        rule: String,
        purpose: &'static str,
        name: String,
    },

    #[error("custom callable `{name}` returned invalid data for device `{device}`: {reason}")]
    InvalidCustomResult {
        device: String,
        name: String,
        reason: String,
    },

    #[error("custom callable `{name}` failed for device `{device}`")]
    CustomCallableFailed {
        device: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("E3002: unable to interpret {kind} configuration as JSON for device `{device}`")]
    MalformedInput {
        device: String,
        kind: ConfigKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("E3002: {kind} configuration for device `{device}` is a JSON {}, keys can only be selected from an object", json_type(.document))]
    NotAnObject {
        device: String,
        kind: ConfigKind,
        document: serde_json::Value,
    },

    #[error("invalid match_config for rule `{rule}`: {reason}")]
    InvalidMatchConfig { rule: String, reason: String },

    #[error("invalid regex `{pattern}` for platform `{platform}`")]
    InvalidPattern {
        platform: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("hash grouping records not found: {missing:?}; nothing was deleted")]
    GroupingIntegrity { missing: Vec<Uuid> },

    #[error("compliance feature `{feature_id}` has no rules registered")]
    FeatureNotFound { feature_id: Uuid },

    #[error("invalid engine settings: {0}")]
    InvalidSettings(String),
}

impl ComplianceError {
    /// Stable tag used in batch reports and the Python surface.
    pub fn kind(&self) -> &'static str {
        match self {
            ComplianceError::ConfigNotFound { .. } => "config_not_found",
            ComplianceError::ConfigUnreadable { .. } => "config_unreadable",
            ComplianceError::RuleNotFound { .. } => "rule_not_found",
            ComplianceError::ParserUnsupported { .. } => "parser_unsupported",
            ComplianceError::CustomCallableMissing { .. } => "custom_callable_missing",
            ComplianceError::InvalidCustomResult { .. } => "invalid_custom_result",
            ComplianceError::CustomCallableFailed { .. } => "custom_callable_failed",
            ComplianceError::MalformedInput { .. } | ComplianceError::NotAnObject { .. } => "malformed_input",
            ComplianceError::InvalidMatchConfig { .. } => "invalid_match_config",
            ComplianceError::InvalidPattern { .. } => "invalid_pattern",
            ComplianceError::GroupingIntegrity { .. } => "grouping_integrity",
            ComplianceError::FeatureNotFound { .. } => "feature_not_found",
            ComplianceError::InvalidSettings(_) => "invalid_settings",
        }
    }
}

pub type Result<T, E = ComplianceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_device_and_resource() {
        let err = ComplianceError::RuleNotFound {
            device: "nyc-rtr-01".to_string(),
            platform: "cisco_ios".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("nyc-rtr-01"));
        assert!(msg.contains("cisco_ios"));
        assert_eq!(err.kind(), "rule_not_found");

        let err = ComplianceError::ConfigNotFound {
            device: "nyc-rtr-01".to_string(),
            kind: ConfigKind::Intended,
            path: PathBuf::from("/repo/intended/nyc-rtr-01.cfg"),
        };
        assert!(err.to_string().contains("/repo/intended/nyc-rtr-01.cfg"));
        assert!(err.to_string().contains("intended"));
        assert!(err.to_string().starts_with("E3005"));
    }

    #[test]
    fn test_missing_backup_uses_its_own_code() {
        let err = ComplianceError::ConfigNotFound {
            device: "nyc-rtr-01".to_string(),
            kind: ConfigKind::Actual,
            path: PathBuf::from("/repo/backup/nyc-rtr-01.cfg"),
        };
        assert!(err.to_string().starts_with("E3006"));
        assert!(err.to_string().contains("actual"));
    }

    #[test]
    fn test_callable_missing_is_distinct_from_rule_not_found() {
        let err = ComplianceError::CustomCallableMissing {
            device: "edge-1".to_string(),
            rule: "cisco_ios - ntp".to_string(),
            purpose: "compliance",
            name: "get_custom_compliance".to_string(),
        };
        assert_eq!(err.kind(), "custom_callable_missing");
        assert!(err.to_string().contains("get_custom_compliance"));
    }
}
