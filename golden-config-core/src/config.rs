//! Engine settings.
//!
//! Loaded from the host's plugin settings JSON. Missing keys fall back to
//! defaults so older settings documents keep working.

use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, Result};
use crate::rules::model::{ConfigRemove, ConfigReplace, RemediationSetting};

/// Default width of the per-device worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Devices evaluated concurrently within a batch.
    pub max_workers: usize,
    /// Apply ConfigRemove/ConfigReplace to backups before comparison.
    pub sanitize_backup: bool,
    /// Compute remediation text for non-compliant records.
    pub remediation_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            sanitize_backup: true,
            remediation_enabled: true,
        }
    }
}

impl EngineSettings {
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: EngineSettings =
            serde_json::from_str(raw).map_err(|e| ComplianceError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(ComplianceError::InvalidSettings(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform-scoped settings shipped alongside the rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub config_remove: Vec<ConfigRemove>,
    pub config_replace: Vec<ConfigReplace>,
    pub remediation: Vec<RemediationSetting>,
}

impl PlatformSettings {
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| ComplianceError::InvalidSettings(e.to_string()))
    }
}
