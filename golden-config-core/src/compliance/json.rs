//! JSON key-subset comparison.

use serde_json::{Map, Value};

use crate::error::{ComplianceError, Result};
use crate::pipeline::context::DeviceContext;
use crate::rules::resolver::IndexedRule;
use crate::storage::models::ConfigKind;

use super::element::ConfigElement;
use super::strategy::ComparisonStrategy;

/// Keeps the rule's top-level keys from each document. A listed key absent
/// from a document is simply absent from that side's element.
pub struct JsonStrategy;

impl ComparisonStrategy for JsonStrategy {
    fn compare(
        &self,
        rule: &IndexedRule,
        actual: &str,
        intended: &str,
        device: &DeviceContext,
    ) -> Result<(ConfigElement, ConfigElement)> {
        let actual = parse_document(actual, ConfigKind::Actual, device)?;
        let intended = parse_document(intended, ConfigKind::Intended, device)?;

        Ok((
            ConfigElement::Document(scope(actual, &rule.sections, ConfigKind::Actual, device)?),
            ConfigElement::Document(scope(intended, &rule.sections, ConfigKind::Intended, device)?),
        ))
    }
}

pub fn parse_document(raw: &str, kind: ConfigKind, device: &DeviceContext) -> Result<Value> {
    serde_json::from_str(raw).map_err(|source| ComplianceError::MalformedInput {
        device: device.device_name.clone(),
        kind,
        source,
    })
}

fn scope(document: Value, keys: &[String], kind: ConfigKind, device: &DeviceContext) -> Result<Value> {
    if keys.is_empty() {
        return Ok(document);
    }
    let mut map = match document {
        Value::Object(map) => map,
        other => {
            return Err(ComplianceError::NotAnObject {
                device: device.device_name.clone(),
                kind,
                document: other,
            })
        }
    };
    let mut scoped = Map::new();
    for key in keys {
        if let Some(value) = map.remove(key.trim()) {
            scoped.insert(key.trim().to_string(), value);
        }
    }
    Ok(Value::Object(scoped))
}
