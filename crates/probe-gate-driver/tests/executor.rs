// crates/probe-gate-driver/tests/executor.rs
// ============================================================================
// Module: Execution Driver Tests
// Description: Scheduling properties of the load executors.
// Purpose: Verify worker bounds, deadlines, drops, drain, and once failures.
// Dependencies: probe-gate-driver, probe-gate-core, tokio
// ============================================================================

//! ## Overview
//! Runs scenarios against [`ScriptedTransport`] under a paused tokio clock so
//! every schedule is deterministic and a 30 second scenario finishes
//! instantly.

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

use probe_gate_core::Check;
use probe_gate_core::CheckRule;
use probe_gate_core::DEFAULT_GRACEFUL_STOP;
use probe_gate_core::Execution;
use probe_gate_core::FailureKind;
use probe_gate_core::LoadProfile;
use probe_gate_core::RunRecorder;
use probe_gate_core::ScenarioName;
use probe_gate_core::TagSet;
use probe_gate_driver::DriverError;
use probe_gate_driver::ExecutionDriver;
use tokio::time::Instant;

use crate::common::ScriptedTransport;
use crate::common::scenario;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn virtual_users(count: usize, duration: Duration, think_time: Duration) -> Execution {
    Execution::Load {
        profile: LoadProfile::ConstantVirtualUsers {
            count,
            duration,
            think_time,
        },
        graceful_stop: DEFAULT_GRACEFUL_STOP,
    }
}

fn arrival_rate(rate_per_second: f64, duration: Duration, max_workers: usize) -> Execution {
    Execution::Load {
        profile: LoadProfile::ConstantArrivalRate {
            rate_per_second,
            duration,
            min_workers: 1,
            max_workers,
        },
        graceful_stop: DEFAULT_GRACEFUL_STOP,
    }
}

fn driver(transport: &Arc<ScriptedTransport>) -> (ExecutionDriver, Arc<RunRecorder>) {
    let recorder = Arc::new(RunRecorder::new());
    let driver = ExecutionDriver::new(transport.clone(), recorder.clone());
    (driver, recorder)
}

// ============================================================================
// SECTION: Constant Virtual Users
// ============================================================================

#[tokio::test(start_paused = true)]
async fn virtual_users_never_exceed_count_or_issue_after_deadline() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(100)));
    let (driver, recorder) = driver(&transport);
    let plan = scenario("models", virtual_users(3, Duration::from_secs(1), Duration::ZERO), vec![]);

    let start = Instant::now();
    let run = driver.run_scenario(&plan).await.unwrap();

    let issued = transport.issued();
    assert!(transport.peak_in_flight() <= 3);
    assert!(issued.iter().all(|at| *at < start + Duration::from_secs(1)));
    assert!((27 ..= 30).contains(&issued.len()), "issued {}", issued.len());
    assert_eq!(run.invocations, issued.len() as u64);
    assert_eq!(run.peak_workers, 3);
    assert_eq!(run.executor, "constant-vus");
    assert_eq!(recorder.snapshot().total_invocations(), run.invocations);
}

#[tokio::test(start_paused = true)]
async fn think_time_spaces_invocations_of_one_worker() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(10)));
    let (driver, _recorder) = driver(&transport);
    let plan = scenario(
        "metrics",
        virtual_users(1, Duration::from_secs(2), Duration::from_millis(490)),
        vec![],
    );

    driver.run_scenario(&plan).await.unwrap();

    let issued = transport.issued();
    assert_eq!(issued.len(), 4);
    for pair in issued.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(500));
    }
}

#[tokio::test(start_paused = true)]
async fn graceful_stop_cancels_slow_invocations_as_incomplete() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_secs(5)));
    let (driver, recorder) = driver(&transport);
    let plan = scenario(
        "slow",
        Execution::Load {
            profile: LoadProfile::ConstantVirtualUsers {
                count: 2,
                duration: Duration::from_secs(1),
                think_time: Duration::ZERO,
            },
            graceful_stop: Duration::from_millis(500),
        },
        vec![],
    );

    let start = Instant::now();
    let run = driver.run_scenario(&plan).await.unwrap();

    let snapshot = recorder.snapshot();
    assert_eq!(run.invocations, 2);
    assert_eq!(run.transport_errors, 0);
    assert_eq!(snapshot.total_invocations(), 2);
    assert_eq!(snapshot.incomplete_invocations(), 2);
    assert!(Instant::now() - start < Duration::from_secs(2));
    let summary = snapshot.summarize(&ScenarioName::new("slow"), run.executor);
    assert_eq!(summary.failures_by_kind.get(&FailureKind::Incomplete), Some(&2));
}

#[tokio::test(start_paused = true)]
async fn invocations_that_finish_within_grace_are_complete() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(800)));
    let (driver, recorder) = driver(&transport);
    let plan =
        scenario("grace", virtual_users(1, Duration::from_secs(1), Duration::ZERO), vec![]);

    let run = driver.run_scenario(&plan).await.unwrap();

    assert_eq!(run.invocations, 2);
    assert_eq!(recorder.snapshot().incomplete_invocations(), 0);
}

// ============================================================================
// SECTION: Constant Arrival Rate
// ============================================================================

#[tokio::test(start_paused = true)]
async fn arrival_rate_issues_on_schedule_when_capacity_allows() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(50)));
    let (driver, recorder) = driver(&transport);
    let plan = scenario("healthz", arrival_rate(10.0, Duration::from_secs(1), 2), vec![]);

    let start = Instant::now();
    let run = driver.run_scenario(&plan).await.unwrap();

    assert_eq!(run.invocations, 10);
    assert_eq!(run.dropped, 0);
    assert_eq!(run.executor, "constant-arrival-rate");
    assert_eq!(recorder.snapshot().dropped_iterations(), 0);
    assert!(transport.issued().iter().all(|at| *at < start + Duration::from_secs(1)));
}

#[tokio::test(start_paused = true)]
async fn saturated_pool_drops_arrivals_instead_of_queueing() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_secs(1)));
    let (driver, recorder) = driver(&transport);
    let plan = scenario("healthz", arrival_rate(10.0, Duration::from_secs(1), 2), vec![]);

    let run = driver.run_scenario(&plan).await.unwrap();

    let snapshot = recorder.snapshot();
    assert_eq!(run.invocations, 2);
    assert_eq!(run.dropped, 8);
    assert_eq!(run.peak_workers, 2);
    assert_eq!(transport.peak_in_flight(), 2);
    assert_eq!(snapshot.dropped_iterations(), 8);
    assert_eq!(snapshot.dropped(&TagSet::new().with("scenario", "healthz")), 8);
}

#[tokio::test(start_paused = true)]
async fn oversized_worker_pool_is_rejected_before_any_invocation() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(10)));
    let (driver, _recorder) = driver(&transport);
    let plan = scenario("healthz", arrival_rate(5.0, Duration::from_secs(1), usize::MAX), vec![]);

    let err = driver.run_scenario(&plan).await.unwrap_err();

    assert!(matches!(err, DriverError::InvalidPlan(ref message) if message.contains("max_vus")));
    assert!(transport.issued().is_empty());
}

// ============================================================================
// SECTION: Once
// ============================================================================

#[tokio::test(start_paused = true)]
async fn once_reports_each_failed_check() {
    let transport = Arc::new(
        ScriptedTransport::responding(500, Duration::from_millis(20)).with_body(r#"{"data":[]}"#),
    );
    let (driver, recorder) = driver(&transport);
    let checks = vec![Check::status("status 200", 200), Check::status("status 500", 500)];
    let plan = scenario("models api", Execution::Once, checks);

    let run = driver.run_scenario(&plan).await.unwrap();

    assert_eq!(run.invocations, 1);
    assert_eq!(run.executor, "once");
    assert_eq!(run.assertion_failures.len(), 2);
    let implicit = &run.assertion_failures[0];
    assert_eq!(implicit.check.as_str(), "status");
    assert_eq!(implicit.detail, "unexpected status 500 (expected 200)");
    let declared = &run.assertion_failures[1];
    assert_eq!(declared.check.as_str(), "status 200");
    assert!(declared.detail.contains("status 500"), "{}", declared.detail);
    assert_eq!(recorder.snapshot().total_invocations(), 1);
}

#[tokio::test(start_paused = true)]
async fn once_fails_unexpected_status_without_a_declared_status_check() {
    let transport = Arc::new(
        ScriptedTransport::responding(503, Duration::from_millis(20))
            .with_body("<html>busy</html>"),
    );
    let (driver, recorder) = driver(&transport);
    let checks = vec![Check::new(
        "mentions busy",
        CheckRule::BodyContains {
            needle: "busy".to_string(),
        },
    )];
    let plan = scenario("web home", Execution::Once, checks);

    let run = driver.run_scenario(&plan).await.unwrap();

    assert_eq!(run.assertion_failures.len(), 1);
    assert_eq!(run.assertion_failures[0].check.as_str(), "status");
    assert_eq!(run.assertion_failures[0].detail, "unexpected status 503 (expected 200)");
    assert_eq!(recorder.snapshot().failed_invocations(), 1);
}

#[tokio::test(start_paused = true)]
async fn once_reports_transport_error_as_request_failure() {
    let transport = Arc::new(ScriptedTransport::refusing(Duration::from_millis(5)));
    let (driver, _recorder) = driver(&transport);
    let plan = scenario("web home", Execution::Once, vec![]);

    let run = driver.run_scenario(&plan).await.unwrap();

    assert_eq!(run.transport_errors, 1);
    assert_eq!(run.assertion_failures.len(), 1);
    assert_eq!(run.assertion_failures[0].check.as_str(), "request");
    assert!(run.assertion_failures[0].detail.contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn once_with_passing_checks_has_no_failures() {
    let transport = Arc::new(ScriptedTransport::responding(200, Duration::from_millis(5)));
    let (driver, _recorder) = driver(&transport);
    let plan = scenario("web home", Execution::Once, vec![Check::status("status 200", 200)]);

    let run = driver.run_scenario(&plan).await.unwrap();

    assert!(run.assertion_failures.is_empty());
}
