// crates/probe-gate-driver/src/error.rs
// ============================================================================
// Module: Driver Errors
// Description: Infrastructure failures raised by the driver.
// Purpose: Separate run-level failures from per-invocation outcomes.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Probe failures never surface here; they become sentinel records. These
//! errors cover the client, the task runtime, and run bookkeeping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while preparing or running a suite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// HTTP client construction failed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Join(String),
    /// A scenario plan cannot be executed.
    #[error("invalid scenario plan: {0}")]
    InvalidPlan(String),
    /// A scenario filter named a scenario the suite does not declare.
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
    /// The run start timestamp could not be formatted.
    #[error("timestamp formatting failed: {0}")]
    Timestamp(String),
}
