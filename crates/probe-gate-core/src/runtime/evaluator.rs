// crates/probe-gate-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Threshold Evaluator
// Description: Aggregate statistics and threshold verdicts.
// Purpose: Judge a finished run against its declared thresholds.
// Dependencies: crate::{core, runtime::metrics}
// ============================================================================

//! ## Overview
//! The evaluator runs once, after every scenario has drained. Each threshold
//! selects a group of samples by tag, aggregates it, and compares the
//! observed value against its bound.
//!
//! Percentiles use the nearest-rank method: over `N` samples sorted
//! ascending, the p-th percentile is the sample at 1-based rank
//! `ceil(p / 100 * N)`, clamped to `[1, N]`.
//!
//! A trend or rate threshold over an empty group has no observed value and
//! fails. Counter thresholds observe zero for an empty group.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::core::Aggregation;
use crate::core::MetricName;
use crate::core::ThresholdOutcome;
use crate::core::ThresholdReport;
use crate::core::ThresholdSpec;
use crate::runtime::metrics::RunMetrics;
use crate::runtime::metrics::duration_ms;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tolerance absorbing binary rounding of `p * N / 100` before rounding up.
const RANK_EPSILON: f64 = 1e-9;

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Returns the nearest-rank percentile of `samples`.
///
/// Returns `None` for an empty sample set or `p` outside `(0, 100]`.
#[must_use]
pub fn percentile(samples: &[Duration], p: f64) -> Option<Duration> {
    if samples.is_empty() || !(p > 0.0 && p <= 100.0) {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let rank = nearest_rank(sorted.len(), p);
    sorted.get(rank.saturating_sub(1)).copied()
}

/// Computes the 1-based nearest rank for `p` over `len` samples.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "The rank is a non-negative integral value clamped to [1, len]."
)]
fn nearest_rank(len: usize, p: f64) -> usize {
    let exact = p * len as f64 / 100.0;
    let rank = (exact - RANK_EPSILON).ceil().max(1.0);
    (rank as usize).min(len)
}

/// Returns the arithmetic mean of `samples` in milliseconds.
#[allow(clippy::cast_precision_loss, reason = "Sample counts stay far below 2^52.")]
fn mean_ms(samples: &[Duration]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total: f64 = samples.iter().copied().map(duration_ms).sum();
    Some(total / samples.len() as f64)
}

/// Converts a counter to the observed value of a threshold.
#[allow(clippy::cast_precision_loss, reason = "Counters stay far below 2^52.")]
fn counter_value(count: u64) -> f64 {
    count as f64
}

// ============================================================================
// SECTION: Threshold Evaluator
// ============================================================================

/// Evaluates thresholds over run metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdEvaluator;

impl ThresholdEvaluator {
    /// Evaluates every threshold in declaration order.
    #[must_use]
    pub fn evaluate(metrics: &RunMetrics, thresholds: &[ThresholdSpec]) -> ThresholdReport {
        let outcomes = thresholds
            .iter()
            .map(|spec| {
                let observed = Self::observe(metrics, spec);
                let passed = observed.is_some_and(|value| spec.op.holds(value, spec.bound));
                ThresholdOutcome {
                    spec: spec.clone(),
                    observed,
                    passed,
                }
            })
            .collect();
        ThresholdReport {
            outcomes,
        }
    }

    /// Computes the observed aggregate for one threshold.
    #[must_use]
    pub fn observe(metrics: &RunMetrics, spec: &ThresholdSpec) -> Option<f64> {
        let filter = &spec.selector.tags;
        match (spec.selector.metric, spec.aggregation) {
            (MetricName::HttpReqDuration, aggregation) => {
                let durations = metrics.durations(filter);
                match aggregation {
                    Aggregation::Percentile(p) => percentile(&durations, p).map(duration_ms),
                    Aggregation::Med => percentile(&durations, 50.0).map(duration_ms),
                    Aggregation::Avg => mean_ms(&durations),
                    Aggregation::Min => durations.iter().min().copied().map(duration_ms),
                    Aggregation::Max => durations.iter().max().copied().map(duration_ms),
                    Aggregation::Rate | Aggregation::Count => None,
                }
            }
            (MetricName::HttpReqFailed, Aggregation::Rate) => metrics.error_rate(filter),
            (MetricName::Checks, Aggregation::Rate) => metrics.check_rate(filter),
            (MetricName::Iterations, Aggregation::Count) => {
                Some(counter_value(metrics.iterations(filter)))
            }
            (MetricName::DroppedIterations, Aggregation::Count) => {
                Some(counter_value(metrics.dropped(filter)))
            }
            _ => None,
        }
    }
}
