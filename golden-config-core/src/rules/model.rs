//! Compliance rule and platform setting models.
//!
//! Rows arrive from the host database as JSON; field names follow the host's
//! column names.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ComplianceError, Result};
use crate::hierconfig::lineage::parse_selectors;

/// Comment line marking a CLI rule whose match_config is a hier_config
/// selector document.
pub const HIER_CONFIG_MARKER: &str = "# hier_config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFeature {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigType {
    #[default]
    Cli,
    Json,
    Custom,
    HierConfig,
}

impl ConfigType {
    /// Lower rank wins when two rules claim the same (platform, feature).
    fn specificity_rank(&self) -> u8 {
        match self {
            ConfigType::Custom => 0,
            ConfigType::HierConfig => 1,
            ConfigType::Json => 2,
            ConfigType::Cli => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Cli => "cli",
            ConfigType::Json => "json",
            ConfigType::Custom => "custom",
            ConfigType::HierConfig => "hier_config",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub id: Uuid,
    pub feature: ComplianceFeature,
    /// Network driver of the platform, e.g. `cisco_ios`.
    pub platform: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config_ordered: bool,
    #[serde(default)]
    pub config_remediation: bool,
    #[serde(default)]
    pub match_config: String,
    #[serde(default)]
    pub config_type: ConfigType,
    #[serde(default)]
    pub custom_compliance: bool,
}

impl ComplianceRule {
    /// The comparison strategy this rule runs under.
    ///
    /// The custom flag overrides the declared type, and a CLI rule whose
    /// match_config opens with the hier_config marker is hierarchical.
    pub fn effective_type(&self) -> ConfigType {
        if self.custom_compliance || self.config_type == ConfigType::Custom {
            return ConfigType::Custom;
        }
        match self.config_type {
            ConfigType::Cli if self.has_hier_marker() => ConfigType::HierConfig,
            other => other,
        }
    }

    pub fn specificity_rank(&self) -> u8 {
        self.effective_type().specificity_rank()
    }

    fn has_hier_marker(&self) -> bool {
        self.match_config
            .lines()
            .next()
            .map(|first| first.trim().starts_with(HIER_CONFIG_MARKER))
            .unwrap_or(false)
    }

    /// Section markers for CLI rules, or top-level keys for JSON rules.
    pub fn sections(&self) -> Vec<String> {
        self.match_config
            .lines()
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.platform, self.feature.name)
    }

    /// Reject rules that can never evaluate.
    pub fn validate(&self) -> Result<()> {
        match self.effective_type() {
            ConfigType::Cli if self.sections().is_empty() => Err(ComplianceError::InvalidMatchConfig {
                rule: self.label(),
                reason: "CLI configuration set, but no configuration set to match".to_string(),
            }),
            ConfigType::HierConfig => parse_selectors(&self.match_config)
                .map(|_| ())
                .map_err(|reason| ComplianceError::InvalidMatchConfig {
                    rule: self.label(),
                    reason,
                }),
            _ => Ok(()),
        }
    }
}

/// A device as seen by the compliance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub name: String,
    /// Network driver of the device's platform.
    pub platform: String,
}

/// Regex line removal applied to backups of one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRemove {
    pub name: String,
    pub platform: String,
    pub regex: String,
}

/// Regex substitution applied to backups of one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigReplace {
    pub name: String,
    pub platform: String,
    pub regex: String,
    pub replace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RemediationType {
    #[default]
    #[serde(rename = "hierconfig")]
    HierConfig,
    #[serde(rename = "custom_remediation")]
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationSetting {
    pub platform: String,
    #[serde(default)]
    pub remediation_type: RemediationType,
    #[serde(default)]
    pub remediation_options: Value,
}
