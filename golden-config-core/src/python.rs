//! Python bindings.
//!
//! Payloads cross the boundary as JSON strings so the host can hand over
//! ORM rows without building Python-side wrappers. Custom callables receive
//! the evaluation input as a JSON string: compliance callables return a
//! JSON object, remediation callables return the remediation text.

use std::collections::HashMap;

use pyo3::exceptions::{PyLookupError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use serde_json::Value;
use uuid::Uuid;

use crate::compliance::custom::{CustomInput, CustomRegistry, CUSTOM_COMPLIANCE, CUSTOM_REMEDIATION};
use crate::config::{EngineSettings, PlatformSettings};
use crate::error::ComplianceError;
use crate::grouping::HashGroupingEngine;
use crate::log_info;
use crate::logging::init_logger;
use crate::normalize;
use crate::pipeline::{run_compliance, ArtifactSource, ComplianceJob, FsArtifactSource, MemoryArtifactSource, RunContext};
use crate::rules::model::{ComplianceRule, Device};
use crate::storage::models::ConfigKind;
use crate::storage::queries;
use crate::storage::store::{ComplianceStore, StoreSnapshot};

fn to_py_err(err: ComplianceError) -> PyErr {
    match err {
        ComplianceError::FeatureNotFound { .. } => PyLookupError::new_err(err.to_string()),
        other => PyValueError::new_err(format!("{}: {}", other.kind(), other)),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> PyResult<T> {
    serde_json::from_str(raw).map_err(|e| PyValueError::new_err(format!("invalid {}: {}", what, e)))
}

fn parse_content(content: &str) -> Value {
    serde_json::from_str(content).unwrap_or_else(|_| Value::String(content.to_string()))
}

/// Canonical form of a payload. JSON text is parsed first; anything else
/// is treated as a plain string.
#[pyfunction]
fn normalize_config_content(content: &str) -> String {
    normalize::normalize_config_content(&parse_content(content))
}

/// SHA-256 hex digest of the canonical form of a payload.
#[pyfunction]
fn compute_config_hash(content: &str) -> String {
    normalize::compute_config_hash(&parse_content(content))
}

fn registry_from(custom_compliance: Option<PyObject>, custom_remediation: Option<PyObject>) -> CustomRegistry {
    let mut registry = CustomRegistry::new();

    if let Some(callable) = custom_compliance {
        registry.register_compliance(CUSTOM_COMPLIANCE, move |input: &CustomInput| -> anyhow::Result<Value> {
            let payload = serde_json::to_string(input)?;
            Python::with_gil(|py| {
                let result: String = callable.call1(py, (payload,))?.extract(py)?;
                Ok(serde_json::from_str(&result)?)
            })
        });
    }

    if let Some(callable) = custom_remediation {
        registry.register_remediation(CUSTOM_REMEDIATION, move |input: &CustomInput| -> anyhow::Result<String> {
            let payload = serde_json::to_string(input)?;
            Python::with_gil(|py| Ok(callable.call1(py, (payload,))?.extract::<String>(py)?))
        });
    }

    registry
}

/// Run compliance for a set of devices.
///
/// # Arguments
/// * `rules` - JSON list of compliance rules
/// * `devices` - JSON list of `{id, name, platform}`
/// * `artifacts` - device name to `(actual, intended)`; when absent,
///   `repositories` gives `(backup_root, backup_template, intended_root,
///   intended_template)`
/// * `settings` - engine settings JSON
/// * `platform_settings` - ConfigRemove / ConfigReplace / remediation JSON
/// * `snapshot` - store snapshot from a previous run
///
/// # Returns
/// Dict with the batch report and the updated `snapshot` as JSON
#[pyfunction]
#[pyo3(signature = (rules, devices, artifacts=None, repositories=None, settings=None, platform_settings=None, custom_compliance=None, custom_remediation=None, snapshot=None, run_timestamp=None))]
#[allow(clippy::too_many_arguments)]
fn run_config_compliance(
    py: Python<'_>,
    rules: String,
    devices: String,
    artifacts: Option<HashMap<String, (String, String)>>,
    repositories: Option<(String, String, String, String)>,
    settings: Option<String>,
    platform_settings: Option<String>,
    custom_compliance: Option<PyObject>,
    custom_remediation: Option<PyObject>,
    snapshot: Option<String>,
    run_timestamp: Option<String>,
) -> PyResult<Py<PyAny>> {
    init_logger();

    let rules: Vec<ComplianceRule> = parse_json(&rules, "rules")?;
    let devices: Vec<Device> = parse_json(&devices, "devices")?;
    let settings = EngineSettings::from_json(settings.as_deref().unwrap_or_default()).map_err(to_py_err)?;
    let platform = PlatformSettings::from_json(platform_settings.as_deref().unwrap_or_default()).map_err(to_py_err)?;
    let store = match snapshot.as_deref() {
        Some(raw) => ComplianceStore::from_snapshot(parse_json::<StoreSnapshot>(raw, "snapshot")?),
        None => ComplianceStore::new(),
    };

    let source: Box<dyn ArtifactSource> = match (artifacts, repositories) {
        (Some(artifacts), _) => {
            let mut memory = MemoryArtifactSource::new();
            for (device, (actual, intended)) in artifacts {
                memory
                    .insert(&device, ConfigKind::Actual, actual)
                    .insert(&device, ConfigKind::Intended, intended);
            }
            Box::new(memory)
        }
        (None, Some((backup_root, backup_template, intended_root, intended_template))) => Box::new(
            FsArtifactSource::new(backup_root, intended_root).with_templates(&backup_template, &intended_template),
        ),
        (None, None) => {
            return Err(PyValueError::new_err("either artifacts or repositories is required"));
        }
    };

    let ctx = RunContext::with_timestamp(settings, run_timestamp.as_deref());
    let job = ComplianceJob::build(
        rules,
        &platform.config_remove,
        &platform.config_replace,
        platform.remediation,
        registry_from(custom_compliance, custom_remediation),
        &ctx.log_context(),
    )
    .map_err(to_py_err)?;

    log_info!(
        ctx.log_context(),
        "COMPLIANCE_RUN_RECEIVED",
        devices = devices.len(),
        rules = job.rules.len()
    );

    let report = py.allow_threads(|| run_compliance(&ctx, &job, &store, &devices, source.as_ref()));
    let snapshot = serde_json::to_string(&store.snapshot())
        .map_err(|e| PyValueError::new_err(format!("snapshot serialization failed: {}", e)))?;

    let py_result = PyDict::new(py);
    py_result.set_item("run_id", &report.run_id)?;
    py_result.set_item("received", report.received)?;
    py_result.set_item("succeeded", report.succeeded)?;
    py_result.set_item("failed", report.failed)?;

    let devices_list = PyList::empty(py);
    for outcome in report.devices {
        let device_dict = PyDict::new(py);
        device_dict.set_item("device", &outcome.device)?;
        device_dict.set_item("ok", outcome.ok)?;
        device_dict.set_item("records", outcome.records)?;
        device_dict.set_item("non_compliant", outcome.non_compliant)?;
        if let Some(kind) = &outcome.error_kind {
            device_dict.set_item("error_kind", kind)?;
        }
        if let Some(message) = &outcome.message {
            device_dict.set_item("message", message)?;
        }
        if let Some(diff) = &outcome.compliance_config {
            device_dict.set_item("compliance_config", diff)?;
        }
        devices_list.append(device_dict)?;
    }
    py_result.set_item("devices", devices_list)?;
    py_result.set_item("snapshot", snapshot)?;

    Ok(py_result.into())
}

/// Device ids sharing one non-compliant configuration for a feature.
#[pyfunction]
fn device_ids_for_hash_group(snapshot: String, feature_id: String, config_hash: String) -> PyResult<Vec<String>> {
    init_logger();

    let feature_id = Uuid::parse_str(&feature_id).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let store = ComplianceStore::from_snapshot(parse_json(&snapshot, "snapshot")?);
    let devices = HashGroupingEngine::new(&store)
        .device_ids_for_hash_group(feature_id, &config_hash)
        .map_err(to_py_err)?;
    Ok(devices.iter().map(Uuid::to_string).collect())
}

/// SQL statements for hosts persisting grouping rows themselves.
#[pyfunction]
fn hash_grouping_sql() -> HashMap<String, String> {
    queries::all_statements()
        .into_iter()
        .map(|(name, sql)| (name.to_string(), sql))
        .collect()
}

/// Python module definition
#[pymodule]
fn golden_config_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize_config_content, m)?)?;
    m.add_function(wrap_pyfunction!(compute_config_hash, m)?)?;
    m.add_function(wrap_pyfunction!(run_config_compliance, m)?)?;
    m.add_function(wrap_pyfunction!(device_ids_for_hash_group, m)?)?;
    m.add_function(wrap_pyfunction!(hash_grouping_sql, m)?)?;
    Ok(())
}
