// crates/probe-gate-core/src/runtime/metrics.rs
// ============================================================================
// Module: Run Metrics
// Description: Append-only metrics sink and immutable run snapshots.
// Purpose: Reduce response records to compact samples shared across workers.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`RunRecorder`] is the only state shared by workers. Each invocation is
//! reduced to a [`Sample`] (no body, no headers) plus per-check counters, so
//! memory stays bounded by the number of invocations rather than by response
//! sizes. [`RunRecorder::snapshot`] freezes the state into [`RunMetrics`],
//! which the threshold evaluator and report builder read.
//!
//! Incomplete invocations keep their sample but contribute no check counts,
//! matching their exclusion from durations and the error rate.
//!
//! Tag filters treat `scenario` as a pseudo tag that also matches the
//! sample's scenario name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use crate::core::CheckName;
use crate::core::CheckResult;
use crate::core::CheckSummary;
use crate::core::FailureKind;
use crate::core::ResponseRecord;
use crate::core::ScenarioName;
use crate::core::ScenarioSummary;
use crate::core::TagSet;
use crate::interfaces::MetricsSink;
use crate::runtime::assertion::classify;
use crate::runtime::evaluator::percentile;

// ============================================================================
// SECTION: Samples
// ============================================================================

/// Compact per-invocation sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Scenario that issued the invocation.
    pub scenario: ScenarioName,
    /// Metric grouping tags.
    pub tags: TagSet,
    /// Elapsed time until response or failure.
    pub elapsed: Duration,
    /// Whether the implicit status check failed.
    pub failed: bool,
    /// Whether the invocation was aborted at drain.
    pub incomplete: bool,
    /// Failure classification, if any.
    pub failure_kind: Option<FailureKind>,
}

/// Pass/fail counters for one check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckCounts {
    /// Evaluations that passed.
    pub passed: u64,
    /// Evaluations that failed.
    pub failed: u64,
}

impl CheckCounts {
    /// Returns the number of evaluations.
    #[must_use]
    pub const fn total(self) -> u64 {
        self.passed.saturating_add(self.failed)
    }
}

/// Check counters for one scenario, tag set, and check name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTally {
    /// Scenario that evaluated the check.
    pub scenario: ScenarioName,
    /// Tags of the evaluated invocations.
    pub tags: TagSet,
    /// Check name.
    pub name: CheckName,
    /// Counters.
    pub counts: CheckCounts,
}

/// Dropped-arrival counter for one scenario and tag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedTally {
    /// Scenario whose arrival was dropped.
    pub scenario: ScenarioName,
    /// Scenario tags.
    pub tags: TagSet,
    /// Dropped arrivals.
    pub count: u64,
}

/// Returns true when a sample's scenario and tags satisfy a tag filter.
#[must_use]
pub fn group_matches(filter: &TagSet, scenario: &ScenarioName, tags: &TagSet) -> bool {
    filter.iter().all(|(name, value)| match tags.get(name) {
        Some(actual) => actual == value,
        None => name == "scenario" && scenario.as_str() == value,
    })
}

/// Divides two counts, returning `None` for an empty denominator.
#[allow(clippy::cast_precision_loss, reason = "Invocation counts stay far below 2^52.")]
pub(crate) fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

/// Converts a duration to fractional milliseconds.
#[must_use]
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// Mutable recorder state behind the lock.
#[derive(Debug, Default)]
struct RecorderState {
    /// Samples in completion order.
    samples: Vec<Sample>,
    /// Check counters in first-seen order.
    checks: Vec<CheckTally>,
    /// Dropped-arrival counters in first-seen order.
    dropped: Vec<DroppedTally>,
}

/// Thread-safe, append-only metrics sink.
#[derive(Debug, Default)]
pub struct RunRecorder {
    /// Locked recorder state.
    state: Mutex<RecorderState>,
}

impl RunRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes the recorded state into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RunMetrics {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        RunMetrics {
            samples: state.samples.clone(),
            checks: state.checks.clone(),
            dropped: state.dropped.clone(),
        }
    }
}

impl MetricsSink for RunRecorder {
    fn record_invocation(&self, record: &ResponseRecord, failed: bool, checks: &[CheckResult]) {
        let sample = Sample {
            scenario: record.scenario().clone(),
            tags: record.tags.clone(),
            elapsed: record.elapsed,
            failed,
            incomplete: record.is_incomplete(),
            failure_kind: classify(record, failed, checks),
        };
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let counted = if sample.incomplete { &[][..] } else { checks };
        for result in counted {
            let position = state.checks.iter().position(|tally| {
                tally.name == result.name
                    && tally.scenario == sample.scenario
                    && tally.tags == sample.tags
            });
            let index = if let Some(index) = position {
                index
            } else {
                state.checks.push(CheckTally {
                    scenario: sample.scenario.clone(),
                    tags: sample.tags.clone(),
                    name: result.name.clone(),
                    counts: CheckCounts::default(),
                });
                state.checks.len() - 1
            };
            if let Some(tally) = state.checks.get_mut(index) {
                if result.passed {
                    tally.counts.passed = tally.counts.passed.saturating_add(1);
                } else {
                    tally.counts.failed = tally.counts.failed.saturating_add(1);
                }
            }
        }
        state.samples.push(sample);
    }

    fn record_dropped(&self, scenario: &ScenarioName, tags: &TagSet) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tally) = state
            .dropped
            .iter_mut()
            .find(|tally| tally.scenario == *scenario && tally.tags == *tags)
        {
            tally.count = tally.count.saturating_add(1);
            return;
        }
        state.dropped.push(DroppedTally {
            scenario: scenario.clone(),
            tags: tags.clone(),
            count: 1,
        });
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record_invocation(&self, _record: &ResponseRecord, _failed: bool, _checks: &[CheckResult]) {}

    fn record_dropped(&self, _scenario: &ScenarioName, _tags: &TagSet) {}
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable view of everything recorded during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Samples in completion order.
    samples: Vec<Sample>,
    /// Check counters.
    checks: Vec<CheckTally>,
    /// Dropped-arrival counters.
    dropped: Vec<DroppedTally>,
}

impl RunMetrics {
    /// Builds a snapshot directly from samples and tallies.
    #[must_use]
    pub const fn from_parts(
        samples: Vec<Sample>,
        checks: Vec<CheckTally>,
        dropped: Vec<DroppedTally>,
    ) -> Self {
        Self {
            samples,
            checks,
            dropped,
        }
    }

    /// Returns every sample.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Returns every check tally.
    #[must_use]
    pub fn check_tallies(&self) -> &[CheckTally] {
        &self.checks
    }

    /// Iterates samples matching a tag filter.
    fn matching<'a>(&'a self, filter: &'a TagSet) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples
            .iter()
            .filter(move |sample| group_matches(filter, &sample.scenario, &sample.tags))
    }

    /// Returns the number of started invocations, including incomplete ones.
    #[must_use]
    pub fn total_invocations(&self) -> u64 {
        self.iterations(&TagSet::new())
    }

    /// Returns the number of completed invocations that failed.
    #[must_use]
    pub fn failed_invocations(&self) -> u64 {
        count(self.samples.iter().filter(|sample| sample.failed && !sample.incomplete))
    }

    /// Returns the number of invocations aborted at drain.
    #[must_use]
    pub fn incomplete_invocations(&self) -> u64 {
        count(self.samples.iter().filter(|sample| sample.incomplete))
    }

    /// Returns the number of dropped arrivals.
    #[must_use]
    pub fn dropped_iterations(&self) -> u64 {
        self.dropped(&TagSet::new())
    }

    /// Returns latencies of completed invocations matching the filter.
    #[must_use]
    pub fn durations(&self, filter: &TagSet) -> Vec<Duration> {
        self.matching(filter)
            .filter(|sample| !sample.incomplete)
            .map(|sample| sample.elapsed)
            .collect()
    }

    /// Returns `failed / total` over completed invocations matching the filter.
    #[must_use]
    pub fn error_rate(&self, filter: &TagSet) -> Option<f64> {
        let (failed, total) = self
            .matching(filter)
            .filter(|sample| !sample.incomplete)
            .fold((0_u64, 0_u64), |(failed, total), sample| {
                (failed.saturating_add(u64::from(sample.failed)), total.saturating_add(1))
            });
        ratio(failed, total)
    }

    /// Returns `passed / total` over checks matching the filter.
    #[must_use]
    pub fn check_rate(&self, filter: &TagSet) -> Option<f64> {
        let (passed, total) = self
            .checks
            .iter()
            .filter(|tally| group_matches(filter, &tally.scenario, &tally.tags))
            .fold((0_u64, 0_u64), |(passed, total), tally| {
                (
                    passed.saturating_add(tally.counts.passed),
                    total.saturating_add(tally.counts.total()),
                )
            });
        ratio(passed, total)
    }

    /// Returns the number of started invocations matching the filter.
    #[must_use]
    pub fn iterations(&self, filter: &TagSet) -> u64 {
        count(self.matching(filter))
    }

    /// Returns the number of dropped arrivals matching the filter.
    #[must_use]
    pub fn dropped(&self, filter: &TagSet) -> u64 {
        self.dropped
            .iter()
            .filter(|tally| group_matches(filter, &tally.scenario, &tally.tags))
            .fold(0_u64, |acc, tally| acc.saturating_add(tally.count))
    }

    /// Returns check counters summed over tags, keyed by check name.
    #[must_use]
    pub fn check_counts(&self) -> BTreeMap<CheckName, CheckCounts> {
        let mut counts: BTreeMap<CheckName, CheckCounts> = BTreeMap::new();
        for tally in &self.checks {
            let entry = counts.entry(tally.name.clone()).or_default();
            entry.passed = entry.passed.saturating_add(tally.counts.passed);
            entry.failed = entry.failed.saturating_add(tally.counts.failed);
        }
        counts
    }

    /// Summarizes one scenario for the suite report.
    #[must_use]
    pub fn summarize(&self, scenario: &ScenarioName, executor: &str) -> ScenarioSummary {
        let samples: Vec<&Sample> =
            self.samples.iter().filter(|sample| sample.scenario == *scenario).collect();
        let latencies: Vec<Duration> = samples
            .iter()
            .filter(|sample| !sample.incomplete)
            .map(|sample| sample.elapsed)
            .collect();
        let mut failures_by_kind: BTreeMap<FailureKind, u64> = BTreeMap::new();
        for kind in samples.iter().filter_map(|sample| sample.failure_kind) {
            let entry = failures_by_kind.entry(kind).or_insert(0);
            *entry = entry.saturating_add(1);
        }
        let mut checks: Vec<CheckSummary> = Vec::new();
        for tally in self.checks.iter().filter(|tally| tally.scenario == *scenario) {
            if let Some(summary) = checks.iter_mut().find(|summary| summary.name == tally.name) {
                summary.passed = summary.passed.saturating_add(tally.counts.passed);
                summary.failed = summary.failed.saturating_add(tally.counts.failed);
            } else {
                checks.push(CheckSummary {
                    name: tally.name.clone(),
                    passed: tally.counts.passed,
                    failed: tally.counts.failed,
                });
            }
        }
        ScenarioSummary {
            name: scenario.clone(),
            executor: executor.to_string(),
            invocations: count(samples.iter()),
            failed: count(samples.iter().filter(|sample| sample.failed && !sample.incomplete)),
            incomplete: count(samples.iter().filter(|sample| sample.incomplete)),
            dropped: self
                .dropped
                .iter()
                .filter(|tally| tally.scenario == *scenario)
                .fold(0_u64, |acc, tally| acc.saturating_add(tally.count)),
            p50_ms: percentile(&latencies, 50.0).map(duration_ms),
            p95_ms: percentile(&latencies, 95.0).map(duration_ms),
            max_ms: latencies.iter().max().copied().map(duration_ms),
            failures_by_kind,
            checks,
        }
    }
}

/// Counts iterator items as `u64`.
fn count<I: Iterator>(iter: I) -> u64 {
    iter.fold(0_u64, |acc, _| acc.saturating_add(1))
}
