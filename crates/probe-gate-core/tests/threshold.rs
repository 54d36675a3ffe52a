// crates/probe-gate-core/tests/threshold.rs
// ============================================================================
// Module: Threshold Parsing Tests
// Description: Selector and condition parsing for threshold declarations.
// Purpose: Ensure malformed thresholds are rejected before any invocation.
// Dependencies: probe-gate-core
// ============================================================================
//! ## Overview
//! Validates the load-tool threshold vocabulary accepted by suite files.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use probe_gate_core::Aggregation;
use probe_gate_core::MetricName;
use probe_gate_core::MetricSelector;
use probe_gate_core::ThresholdOp;
use probe_gate_core::ThresholdParseError;
use probe_gate_core::ThresholdSpec;

#[test]
fn parses_tagged_percentile_threshold() {
    let spec = ThresholdSpec::parse("http_req_duration{ep:models}", "p(95)<1200").unwrap();

    assert_eq!(spec.selector.metric, MetricName::HttpReqDuration);
    assert_eq!(spec.selector.tags.get("ep"), Some("models"));
    assert_eq!(spec.aggregation, Aggregation::Percentile(95.0));
    assert_eq!(spec.op, ThresholdOp::LessThan);
    assert!((spec.bound - 1200.0).abs() < f64::EPSILON);
    assert_eq!(spec.to_string(), "http_req_duration{ep:models} p(95)<1200");
}

#[test]
fn parses_rate_thresholds() {
    let failed = ThresholdSpec::parse("http_req_failed", "rate<0.01").unwrap();
    let checks = ThresholdSpec::parse("checks", "rate>0.99").unwrap();

    assert_eq!(failed.aggregation, Aggregation::Rate);
    assert_eq!(checks.op, ThresholdOp::GreaterThan);
    assert_eq!(checks.condition(), "rate>0.99");
}

#[test]
fn prefers_two_character_operators() {
    let spec = ThresholdSpec::parse("http_req_duration", "avg <= 250").unwrap();
    assert_eq!(spec.op, ThresholdOp::LessThanOrEqual);
    assert_eq!(spec.aggregation, Aggregation::Avg);

    let spec = ThresholdSpec::parse("dropped_iterations", "count==0").unwrap();
    assert_eq!(spec.op, ThresholdOp::Equal);
}

#[test]
fn accepts_fractional_percentiles_and_multiple_tags() {
    let spec = ThresholdSpec::parse("http_req_duration{scenario:healthz, ep:health}", "p(99.9)<500")
        .unwrap();

    assert_eq!(spec.aggregation, Aggregation::Percentile(99.9));
    assert_eq!(
        spec.selector,
        MetricSelector::new(MetricName::HttpReqDuration)
            .with_tag("ep", "health")
            .with_tag("scenario", "healthz")
    );
}

#[test]
fn rejects_malformed_declarations() {
    assert!(matches!(
        ThresholdSpec::parse("http_req_waiting", "p(95)<1"),
        Err(ThresholdParseError::UnknownMetric(_))
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration{ep}", "p(95)<1"),
        Err(ThresholdParseError::InvalidSelector(_))
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration{ep:models", "p(95)<1"),
        Err(ThresholdParseError::InvalidSelector(_))
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration", "p95<1"),
        Err(ThresholdParseError::UnknownAggregation(_))
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration", "p(0)<1"),
        Err(ThresholdParseError::PercentileOutOfRange(_))
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration", "p(101)<1"),
        Err(ThresholdParseError::PercentileOutOfRange(_))
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration", "p(95)"),
        Err(ThresholdParseError::MissingOperator(_))
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration", "p(95)<fast"),
        Err(ThresholdParseError::InvalidBound(_))
    ));
}

#[test]
fn rejects_aggregations_that_do_not_fit_the_metric() {
    assert!(matches!(
        ThresholdSpec::parse("http_req_failed", "p(95)<1"),
        Err(ThresholdParseError::IncompatibleAggregation { .. })
    ));
    assert!(matches!(
        ThresholdSpec::parse("http_req_duration", "rate<1"),
        Err(ThresholdParseError::IncompatibleAggregation { .. })
    ));
    assert!(matches!(
        ThresholdSpec::parse("iterations", "rate<1"),
        Err(ThresholdParseError::IncompatibleAggregation { .. })
    ));
}

#[test]
fn operators_compare_observed_against_bound() {
    assert!(ThresholdOp::LessThan.holds(1199.0, 1200.0));
    assert!(!ThresholdOp::LessThan.holds(1200.0, 1200.0));
    assert!(ThresholdOp::LessThanOrEqual.holds(1200.0, 1200.0));
    assert!(ThresholdOp::GreaterThan.holds(0.995, 0.99));
    assert!(ThresholdOp::Equal.holds(0.0, 0.0));
    assert!(ThresholdOp::NotEqual.holds(1.0, 0.0));
}
