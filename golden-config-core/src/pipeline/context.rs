//! Pipeline context management.
//!
//! Provides run and device context for logging and record timestamps.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::logging::structured::LogContext;
use crate::rules::model::Device;

/// Context for one compliance run across many devices.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub run_timestamp: DateTime<Utc>,
    pub settings: EngineSettings,
}

impl RunContext {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_timestamp(settings, None)
    }

    /// Build a context stamped with the host's job start time.
    ///
    /// An absent or unparseable timestamp falls back to now.
    pub fn with_timestamp(settings: EngineSettings, run_timestamp: Option<&str>) -> Self {
        let run_id = format!("run-{}", &Uuid::new_v4().to_string()[..8]);

        let run_timestamp = run_timestamp
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Self {
            run_id,
            run_timestamp,
            settings,
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.run_id)
    }

    /// Create a device context for this run.
    pub fn device_context(&self, device: &Device) -> DeviceContext {
        DeviceContext {
            run_id: self.run_id.clone(),
            device_id: device.id,
            device_name: device.name.clone(),
            platform: device.platform.clone(),
            evaluated_at: self.run_timestamp,
        }
    }
}

/// Context for a single device within a run.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub run_id: String,
    pub device_id: Uuid,
    pub device_name: String,
    pub platform: String,
    pub evaluated_at: DateTime<Utc>,
}

impl DeviceContext {
    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.run_id).with_device(&self.device_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_timestamp_parsed() {
        let ctx = RunContext::with_timestamp(EngineSettings::default(), Some("2024-05-01T12:00:00Z"));
        assert_eq!(ctx.run_timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert!(ctx.run_id.starts_with("run-"));
        assert_eq!(ctx.run_id.len(), 12);
    }

    #[test]
    fn test_device_context_carries_run() {
        let run = RunContext::new(EngineSettings::default());
        let device = Device {
            id: Uuid::new_v4(),
            name: "nyc-rtr-01".to_string(),
            platform: "cisco_ios".to_string(),
        };
        let ctx = run.device_context(&device);
        assert_eq!(ctx.run_id, run.run_id);
        assert_eq!(
            format!("{}", ctx.log_context()),
            format!("[run={}] [device=nyc-rtr-01]", run.run_id)
        );
    }
}
