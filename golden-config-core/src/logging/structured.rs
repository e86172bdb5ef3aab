//! Structured logging utilities.
//!
//! Provides context-aware logging with run, device and rule included
//! in every log message.

use std::fmt;

/// Initialize the process-wide logger.
///
/// Safe to call repeatedly; only the first call installs the logger.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}

/// Logging context for a compliance run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub device: Option<String>,
    pub rule: Option<String>,
}

impl LogContext {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            device: None,
            rule: None,
        }
    }

    pub fn with_device(&self, device: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            device: Some(device.to_string()),
            rule: None,
        }
    }

    pub fn with_rule(&self, rule: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            device: self.device.clone(),
            rule: Some(rule.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[run={}]", self.run_id)?;
        if let Some(device) = &self.device {
            write!(f, " [device={}]", device)?;
        }
        if let Some(rule) = &self.rule {
            write!(f, " [rule={}]", rule)?;
        }
        Ok(())
    }
}

/// Log an info message with context.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::info!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a warning message with context.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::warn!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log an error message with context.
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::error!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}

/// Log a debug message with context.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        log::debug!(
            "{} {} {}",
            $ctx,
            $event,
            format_args!(concat!($(stringify!($key), "={:?} "),*), $($value),*)
        );
    };
}
