//! Compliance run across a device fleet.
//!
//! Devices are evaluated on a bounded pool of scoped worker threads. Each
//! device succeeds or fails on its own; a failure is reported and the
//! remaining devices continue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;
use serde::Serialize;

use crate::rules::model::Device;
use crate::storage::store::ComplianceStore;
use crate::{log_error, log_info};

use super::artifacts::ArtifactSource;
use super::context::RunContext;
use super::evaluation::{evaluate_device, ComplianceJob};

/// Result for a single device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceOutcome {
    pub device: String,
    pub ok: bool,
    pub error_kind: Option<String>,
    pub message: Option<String>,
    /// Compliance records written.
    pub records: usize,
    pub non_compliant: usize,
    /// Unified backup vs intended diff; absent when the device failed.
    pub compliance_config: Option<String>,
}

/// Result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: String,
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub devices: Vec<DeviceOutcome>,
}

/// Evaluate every device and report per device, in input order.
pub fn run_compliance(
    ctx: &RunContext,
    job: &ComplianceJob,
    store: &ComplianceStore,
    devices: &[Device],
    source: &dyn ArtifactSource,
) -> BatchReport {
    let log_ctx = ctx.log_context();
    store.register_rules(&job.rule_models());

    let workers = ctx.settings.max_workers.clamp(1, devices.len().max(1));
    log_info!(log_ctx, "RUN_START", devices = devices.len(), workers = workers);

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<DeviceOutcome>>> = Mutex::new(vec![None; devices.len()]);

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(device) = devices.get(index) else {
                    break;
                };
                let outcome = run_device(ctx, job, store, device, source);
                slots.lock()[index] = Some(outcome);
            });
        }
    });

    let outcomes: Vec<DeviceOutcome> = slots.into_inner().into_iter().flatten().collect();
    let succeeded = outcomes.iter().filter(|o| o.ok).count();
    let failed = outcomes.len() - succeeded;

    log_info!(
        log_ctx,
        "RUN_COMPLETE",
        received = devices.len(),
        succeeded = succeeded,
        failed = failed
    );

    BatchReport {
        run_id: ctx.run_id.clone(),
        received: devices.len(),
        succeeded,
        failed,
        devices: outcomes,
    }
}

fn run_device(
    ctx: &RunContext,
    job: &ComplianceJob,
    store: &ComplianceStore,
    device: &Device,
    source: &dyn ArtifactSource,
) -> DeviceOutcome {
    match evaluate_device(ctx, job, store, device, source) {
        Ok(evaluation) => DeviceOutcome {
            device: device.name.clone(),
            ok: true,
            error_kind: None,
            message: None,
            non_compliant: evaluation.records.iter().filter(|r| !r.compliance).count(),
            records: evaluation.records.len(),
            compliance_config: Some(evaluation.compliance_config),
        },
        Err(err) => {
            log_error!(
                ctx.log_context().with_device(&device.name),
                "DEVICE_FAILED",
                kind = err.kind(),
                error = err.to_string()
            );
            DeviceOutcome {
                device: device.name.clone(),
                ok: false,
                error_kind: Some(err.kind().to_string()),
                message: Some(err.to_string()),
                records: 0,
                non_compliant: 0,
                compliance_config: None,
            }
        }
    }
}
