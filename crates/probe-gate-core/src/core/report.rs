// crates/probe-gate-core/src/core/report.rs
// ============================================================================
// Module: Suite Reports
// Description: Threshold outcomes, scenario summaries, and the suite verdict.
// Purpose: Provide the serializable end-of-run report and its text rendering.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Reports are assembled once, after every scenario has drained. The suite
//! passes iff every threshold passes and no end-to-end assertion failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::core::identifiers::CheckName;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::ScenarioName;
use crate::core::identifiers::SuiteName;
use crate::core::record::FailureKind;
use crate::core::threshold::ThresholdSpec;

// ============================================================================
// SECTION: Threshold Outcomes
// ============================================================================

/// Result of evaluating one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    /// Threshold that was evaluated.
    #[serde(rename = "threshold")]
    pub spec: ThresholdSpec,
    /// Observed aggregate, or `None` when the group had no samples.
    pub observed: Option<f64>,
    /// Whether the threshold held.
    pub passed: bool,
}

impl fmt::Display for ThresholdOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "✓" } else { "✗" };
        match self.observed {
            Some(value) => write!(f, "{mark} {} observed={value:.3}", self.spec),
            None => write!(f, "{mark} {} observed=n/a (no samples)", self.spec),
        }
    }
}

/// Outcomes of every declared threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ThresholdReport {
    /// One outcome per threshold, in declaration order.
    pub outcomes: Vec<ThresholdOutcome>,
}

impl ThresholdReport {
    /// Returns true when every threshold passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.passed)
    }

    /// Iterates violated thresholds.
    pub fn violations(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed)
    }
}

impl fmt::Display for ThresholdReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Scenario Summaries
// ============================================================================

/// Pass/fail counts for one check name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    /// Check name.
    pub name: CheckName,
    /// Evaluations that passed.
    pub passed: u64,
    /// Evaluations that failed.
    pub failed: u64,
}

/// Aggregate view of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    /// Scenario name.
    pub name: ScenarioName,
    /// Executor label (`constant-vus`, `constant-arrival-rate`, `once`).
    pub executor: String,
    /// Invocations started.
    pub invocations: u64,
    /// Completed invocations that failed.
    pub failed: u64,
    /// Invocations aborted at drain.
    pub incomplete: u64,
    /// Arrivals dropped for lack of capacity.
    pub dropped: u64,
    /// Median latency of completed invocations.
    pub p50_ms: Option<f64>,
    /// 95th percentile latency of completed invocations.
    pub p95_ms: Option<f64>,
    /// Largest latency of completed invocations.
    pub max_ms: Option<f64>,
    /// Failed and incomplete invocations by kind.
    pub failures_by_kind: BTreeMap<FailureKind, u64>,
    /// Check counts in first-seen order.
    pub checks: Vec<CheckSummary>,
}

/// Failed hard assertion from an end-to-end scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    /// Correlation identifier of the failed invocation.
    pub correlation_id: CorrelationId,
    /// Check that failed.
    pub check: CheckName,
    /// Human-readable failure detail.
    pub detail: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "✗ {} {}: {}", self.correlation_id, self.check, self.detail)
    }
}

// ============================================================================
// SECTION: Suite Report
// ============================================================================

/// Overall suite outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every threshold and assertion held.
    Pass,
    /// At least one threshold or assertion failed.
    Fail,
}

impl Verdict {
    /// Returns the verdict label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

/// End-of-run report for one suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    /// Suite name.
    pub suite: SuiteName,
    /// API base URL the suite ran against.
    pub target: String,
    /// Run start time (RFC 3339).
    pub started_at: String,
    /// Wall-clock run duration in milliseconds.
    pub elapsed_ms: f64,
    /// Per-scenario summaries in declaration order.
    pub scenarios: Vec<ScenarioSummary>,
    /// Threshold outcomes.
    pub thresholds: ThresholdReport,
    /// Failed end-to-end assertions.
    pub assertion_failures: Vec<AssertionFailure>,
    /// Overall verdict.
    pub verdict: Verdict,
}

impl SuiteReport {
    /// Assembles a report and derives its verdict.
    #[must_use]
    pub fn new(
        suite: SuiteName,
        target: String,
        started_at: String,
        elapsed_ms: f64,
        scenarios: Vec<ScenarioSummary>,
        thresholds: ThresholdReport,
        assertion_failures: Vec<AssertionFailure>,
    ) -> Self {
        let verdict = if thresholds.passed() && assertion_failures.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        Self {
            suite,
            target,
            started_at,
            elapsed_ms,
            scenarios,
            thresholds,
            assertion_failures,
            verdict,
        }
    }

    /// Returns true when the suite passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Formats an optional millisecond value.
fn fmt_ms(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |ms| format!("{ms:.1}ms"))
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "suite {} against {} (started {}, {:.1}s)",
            self.suite,
            self.target,
            self.started_at,
            self.elapsed_ms / 1_000.0
        )?;
        for scenario in &self.scenarios {
            writeln!(
                f,
                "scenario {} [{}]: {} invocations, {} failed, {} incomplete, {} dropped, p50={} \
                 p95={} max={}",
                scenario.name,
                scenario.executor,
                scenario.invocations,
                scenario.failed,
                scenario.incomplete,
                scenario.dropped,
                fmt_ms(scenario.p50_ms),
                fmt_ms(scenario.p95_ms),
                fmt_ms(scenario.max_ms)
            )?;
            for check in &scenario.checks {
                let mark = if check.failed == 0 { "✓" } else { "✗" };
                let total = check.passed.saturating_add(check.failed);
                writeln!(f, "  {mark} {}: {}/{total}", check.name, check.passed)?;
            }
            for (kind, count) in &scenario.failures_by_kind {
                writeln!(f, "  {kind}: {count}")?;
            }
        }
        if !self.thresholds.outcomes.is_empty() {
            writeln!(f, "thresholds:")?;
            write!(f, "{}", self.thresholds)?;
        }
        if !self.assertion_failures.is_empty() {
            writeln!(f, "assertion failures:")?;
            for failure in &self.assertion_failures {
                writeln!(f, "  {failure}")?;
            }
        }
        write!(f, "verdict: {}", self.verdict.as_str())
    }
}
