// crates/probe-gate-driver/tests/runner.rs
// ============================================================================
// Module: Suite Runner Tests
// Description: End-to-end suite execution over a scripted transport.
// Purpose: Verify concurrent scenarios, threshold verdicts, and filtering.
// Dependencies: probe-gate-driver, probe-gate-config, probe-gate-core, tokio
// ============================================================================

//! ## Overview
//! Suites are parsed from TOML exactly as users write them, then run against
//! [`ScriptedTransport`] under a paused clock.

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

mod common;

use std::sync::Arc;
use std::time::Duration;

use probe_gate_config::SuitePlan;
use probe_gate_config::TargetConfig;
use probe_gate_config::parse_suite;
use probe_gate_core::Verdict;
use probe_gate_driver::DriverError;
use probe_gate_driver::SuiteRunner;
use tokio::time::Instant;

use crate::common::ScriptedTransport;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const LATENCY_SUITE: &str = r#"
[suite]
name = "latency"

[[scenarios]]
name = "models"
tags = { ep = "models" }

[scenarios.executor]
type = "constant-vus"
vus = 2
duration = "10s"

[scenarios.request]
path = "/v1/models"

[[scenarios.checks]]
name = "status 200"
rule = "status"
equals = 200

[[thresholds]]
metric = "http_req_duration{ep:models}"
condition = "p(95)<1000"

[[thresholds]]
metric = "http_req_failed"
condition = "rate<0.01"
"#;

const TWO_SCENARIO_SUITE: &str = r#"
[suite]
name = "pair"

[[scenarios]]
name = "healthz"

[scenarios.executor]
type = "constant-arrival-rate"
rate = 5
duration = "2s"
pre_allocated_vus = 1
max_vus = 4

[scenarios.request]
path = "/healthz"

[[scenarios]]
name = "models"

[scenarios.executor]
type = "constant-vus"
vus = 1
duration = "2s"

[scenarios.request]
path = "/v1/models"

[[thresholds]]
metric = "http_req_duration{scenario:healthz}"
condition = "p(95)<300"

[[thresholds]]
metric = "http_req_duration{scenario:models}"
condition = "p(95)<300"
"#;

fn plan(source: &str) -> SuitePlan {
    parse_suite(source, &TargetConfig::local().unwrap()).unwrap()
}

// ============================================================================
// SECTION: Verdicts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn slow_responses_fail_the_latency_threshold() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(2000)));
    let runner = SuiteRunner::new(transport);

    let report = runner.run(&plan(LATENCY_SUITE)).await.unwrap();

    assert_eq!(report.verdict, Verdict::Fail);
    let latency = &report.thresholds.outcomes[0];
    assert!(!latency.passed);
    assert_eq!(latency.observed, Some(2000.0));
    let errors = &report.thresholds.outcomes[1];
    assert!(errors.passed);
    assert_eq!(report.scenarios.len(), 1);
    assert_eq!(report.scenarios[0].p95_ms, Some(2000.0));
    assert_eq!(report.target, "http://localhost:8082/");
}

#[tokio::test(start_paused = true)]
async fn fast_responses_pass_every_threshold() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(120)));
    let runner = SuiteRunner::new(transport);

    let report = runner.run(&plan(LATENCY_SUITE)).await.unwrap();

    assert!(report.passed());
    assert!(report.assertion_failures.is_empty());
    let checks = &report.scenarios[0].checks;
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].failed, 0);
    assert!(checks[0].passed > 0);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_fail_the_error_rate_threshold() {
    let transport = Arc::new(ScriptedTransport::refusing(Duration::from_millis(5)));
    let runner = SuiteRunner::new(transport);

    let report = runner.run(&plan(LATENCY_SUITE)).await.unwrap();

    assert!(!report.passed());
    assert_eq!(report.thresholds.outcomes[1].observed, Some(1.0));
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[tokio::test(start_paused = true)]
async fn scenarios_run_concurrently_and_report_in_declaration_order() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(100)));
    let runner = SuiteRunner::new(transport.clone());

    let start = Instant::now();
    let report = runner.run(&plan(TWO_SCENARIO_SUITE)).await.unwrap();

    let names: Vec<&str> = report.scenarios.iter().map(|summary| summary.name.as_str()).collect();
    assert_eq!(names, ["healthz", "models"]);
    assert_eq!(report.scenarios[0].executor, "constant-arrival-rate");
    assert_eq!(report.scenarios[0].invocations, 10);
    assert_eq!(report.scenarios[1].executor, "constant-vus");
    assert!(Instant::now() - start < Duration::from_secs(3));
    assert!(report.passed());
}

// ============================================================================
// SECTION: Scenario Filter
// ============================================================================

#[tokio::test(start_paused = true)]
async fn filter_runs_only_named_scenarios_and_their_thresholds() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(100)));
    let runner = SuiteRunner::new(transport).with_scenario_filter(["models"]);

    let report = runner.run(&plan(TWO_SCENARIO_SUITE)).await.unwrap();

    assert_eq!(report.scenarios.len(), 1);
    assert_eq!(report.scenarios[0].name.as_str(), "models");
    assert_eq!(report.thresholds.outcomes.len(), 1);
    assert_eq!(
        report.thresholds.outcomes[0].spec.selector.tags.get("scenario"),
        Some("models")
    );
}

#[tokio::test(start_paused = true)]
async fn filter_naming_unknown_scenario_is_rejected_before_running() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(100)));
    let runner = SuiteRunner::new(transport.clone()).with_scenario_filter(["models", "chat"]);

    let err = runner.run(&plan(TWO_SCENARIO_SUITE)).await.unwrap_err();

    assert_eq!(err, DriverError::UnknownScenario("chat".to_string()));
    assert!(transport.issued().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_filter_runs_everything() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(100)));
    let runner = SuiteRunner::new(transport).with_scenario_filter(Vec::<String>::new());

    let report = runner.run(&plan(TWO_SCENARIO_SUITE)).await.unwrap();

    assert_eq!(report.scenarios.len(), 2);
    assert_eq!(report.thresholds.outcomes.len(), 2);
}
