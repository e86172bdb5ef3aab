#![allow(dead_code)]

use golden_config_core::compliance::CustomRegistry;
use golden_config_core::logging::LogContext;
use golden_config_core::pipeline::{ComplianceJob, MemoryArtifactSource};
use golden_config_core::rules::{ComplianceFeature, ComplianceRule, ConfigType, Device};
use golden_config_core::storage::ConfigKind;
use uuid::Uuid;

pub fn feature(name: &str) -> ComplianceFeature {
    ComplianceFeature {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: name.to_lowercase(),
        description: String::new(),
    }
}

pub fn rule(feature: &ComplianceFeature, config_type: ConfigType, match_config: &str, ordered: bool) -> ComplianceRule {
    ComplianceRule {
        id: Uuid::new_v4(),
        feature: feature.clone(),
        platform: "cisco_ios".to_string(),
        description: String::new(),
        config_ordered: ordered,
        config_remediation: false,
        match_config: match_config.to_string(),
        config_type,
        custom_compliance: false,
    }
}

pub fn device(name: &str) -> Device {
    Device {
        id: Uuid::new_v4(),
        name: name.to_string(),
        platform: "cisco_ios".to_string(),
    }
}

pub fn job(rules: Vec<ComplianceRule>, registry: CustomRegistry) -> ComplianceJob {
    ComplianceJob::build(rules, &[], &[], vec![], registry, &LogContext::new("run-it")).expect("job builds")
}

pub fn artifacts(entries: &[(&Device, &str, &str)]) -> MemoryArtifactSource {
    let mut source = MemoryArtifactSource::new();
    for (device, actual, intended) in entries {
        source
            .insert(&device.name, ConfigKind::Actual, *actual)
            .insert(&device.name, ConfigKind::Intended, *intended);
    }
    source
}
