// crates/probe-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Probe Gate Interfaces
// Description: Predicate and metrics sink contracts.
// Purpose: Define the seams between assertions, execution, and aggregation.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces keep the assertion engine and the execution driver independent
//! of concrete check rules and metric storage. Implementations must be safe to
//! share across concurrent workers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::CheckError;
use crate::core::CheckName;
use crate::core::CheckResult;
use crate::core::ResponseRecord;
use crate::core::ScenarioName;
use crate::core::TagSet;

// ============================================================================
// SECTION: Predicate
// ============================================================================

/// Named predicate evaluated against one response.
pub trait Predicate: Send + Sync {
    /// Returns the name shown in reports.
    fn name(&self) -> &CheckName;

    /// Evaluates the predicate.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] when the response cannot be evaluated (for
    /// example, the body is not JSON). Callers record this as a failed check.
    fn evaluate(&self, record: &ResponseRecord) -> Result<bool, CheckError>;
}

// ============================================================================
// SECTION: Metrics Sink
// ============================================================================

/// Append-only destination for per-invocation outcomes.
///
/// Implementations are shared by every worker of every scenario and must
/// accept concurrent appends.
pub trait MetricsSink: Send + Sync {
    /// Records one finished invocation and its check results.
    fn record_invocation(&self, record: &ResponseRecord, failed: bool, checks: &[CheckResult]);

    /// Records an arrival dropped because the worker pool was saturated.
    fn record_dropped(&self, scenario: &ScenarioName, tags: &TagSet);
}
