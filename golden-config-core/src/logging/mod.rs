//! Structured logging with run context.
//!
//! Provides logging macros and utilities that include the run id, device and
//! rule in every log message for easy correlation.

pub mod structured;

pub use structured::*;
