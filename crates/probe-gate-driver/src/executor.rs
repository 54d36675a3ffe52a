// crates/probe-gate-driver/src/executor.rs
// ============================================================================
// Module: Execution Driver
// Description: Runs one scenario under its load profile.
// Purpose: Schedule invocations, assert responses, and drain in-flight work.
// Dependencies: probe-gate-core, probe-gate-config, tokio, tracing
// ============================================================================

//! ## Overview
//! The driver dispatches on [`Execution`]:
//!
//! - Constant virtual users: `count` looping workers on a [`JoinSet`]. A
//!   worker never starts an invocation at or after the deadline, and think
//!   time is cut short at the deadline.
//! - Constant arrival rate: a scheduler ticks every `1/rate` seconds
//!   (missed ticks burst to keep the rate). Each arrival spawns a task that
//!   holds one of `max_workers` slots; nothing is pre-allocated, and
//!   `min_workers` only seeds the reported peak pool size. An arrival that
//!   finds every slot taken is dropped and counted as `dropped_iterations`;
//!   arrivals are never queued.
//! - Once: a single invocation whose failed checks are assertion failures.
//!   A status outside the probe's expected set fails the implicit `status`
//!   check even when no declared check looks at the status.
//!
//! At the deadline the schedule stops and in-flight invocations get
//! `graceful_stop` to finish. Anything still running afterwards is cancelled
//! through a shutdown signal and recorded as [`ProbeError::Incomplete`], so
//! every started invocation produces exactly one record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use probe_gate_config::ScenarioPlan;
use probe_gate_core::Assessment;
use probe_gate_core::AssertionEngine;
use probe_gate_core::AssertionFailure;
use probe_gate_core::Check;
use probe_gate_core::CorrelationId;
use probe_gate_core::Execution;
use probe_gate_core::LoadProfile;
use probe_gate_core::MetricsSink;
use probe_gate_core::ProbeError;
use probe_gate_core::ProbeSpec;
use probe_gate_core::ResponseRecord;
use probe_gate_core::ScenarioName;
use tokio::sync::Semaphore;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio::time::interval_at;
use tokio::time::sleep_until;
use tokio::time::timeout_at;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::error::DriverError;
use crate::transport::ProbeTransport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Transport errors logged individually per scenario before suppression.
const TRANSPORT_WARN_LIMIT: u64 = 10;
/// Check name used for the implicit request assertion of a once scenario.
const REQUEST_CHECK: &str = "request";
/// Check name used for the implicit status assertion of a once scenario.
const STATUS_CHECK: &str = "status";

// ============================================================================
// SECTION: Scenario Run
// ============================================================================

/// Bookkeeping for one finished scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    /// Scenario name.
    pub scenario: ScenarioName,
    /// Executor label.
    pub executor: &'static str,
    /// Started invocations.
    pub invocations: u64,
    /// Arrivals dropped because the worker pool was saturated.
    pub dropped: u64,
    /// Invocations that produced a transport error (excluding drain aborts).
    pub transport_errors: u64,
    /// Largest worker pool used by an arrival-rate scenario.
    pub peak_workers: usize,
    /// Failed assertions of a once scenario.
    pub assertion_failures: Vec<AssertionFailure>,
    /// Wall-clock time from start to the end of drain.
    pub elapsed: Duration,
}

// ============================================================================
// SECTION: Execution Driver
// ============================================================================

/// Runs scenarios against a transport and records into a shared sink.
#[derive(Clone)]
pub struct ExecutionDriver {
    /// Transport used for every invocation.
    transport: Arc<dyn ProbeTransport>,
    /// Metrics sink shared by every worker.
    sink: Arc<dyn MetricsSink>,
}

impl ExecutionDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new(transport: Arc<dyn ProbeTransport>, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            transport,
            sink,
        }
    }

    /// Runs one scenario to completion, including drain.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidPlan`] when the execution mode fails
    /// validation and [`DriverError::Join`] when a worker task panics.
    pub async fn run_scenario(&self, plan: &ScenarioPlan) -> Result<ScenarioRun, DriverError> {
        plan.execution
            .validate()
            .map_err(|err| DriverError::InvalidPlan(format!("scenario '{}': {err}", plan.name)))?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let context = Arc::new(ScenarioContext {
            scenario: plan.name.clone(),
            base_url: plan.base_url.clone(),
            probe: Arc::clone(&plan.probe),
            checks: plan.checks.clone(),
            transport: Arc::clone(&self.transport),
            sink: Arc::clone(&self.sink),
            sequence: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            shutdown: shutdown_rx,
        });
        let executor = plan.execution.executor_label();
        info!(scenario = %plan.name, executor, execution = %plan.execution, "scenario started");
        let started = Instant::now();

        let mut dropped = 0;
        let mut peak_workers = 0;
        let mut assertion_failures = Vec::new();
        match plan.execution {
            Execution::Load {
                profile:
                    LoadProfile::ConstantVirtualUsers {
                        count,
                        duration,
                        think_time,
                    },
                graceful_stop,
            } => {
                let deadline = started + duration;
                let workers = spawn_virtual_users(&context, count, deadline, think_time);
                drain(workers, deadline + graceful_stop, &shutdown_tx).await?;
                peak_workers = count;
            }
            Execution::Load {
                profile:
                    profile @ LoadProfile::ConstantArrivalRate {
                        duration,
                        min_workers,
                        max_workers,
                        ..
                    },
                graceful_stop,
            } => {
                let period = profile.arrival_interval().ok_or_else(|| {
                    DriverError::InvalidPlan(format!("scenario '{}': rate out of range", plan.name))
                })?;
                let deadline = started + duration;
                let pool = WorkerPool {
                    period,
                    min_workers,
                    max_workers,
                };
                let outcome = schedule_arrivals(&context, pool, started, deadline).await?;
                drain(outcome.workers, deadline + graceful_stop, &shutdown_tx).await?;
                dropped = outcome.dropped;
                peak_workers = outcome.peak_workers;
            }
            Execution::Once => {
                let (record, assessment) = context.invoke().await;
                assertion_failures = once_failures(&plan.probe, &record, &assessment);
            }
        }

        let invocations = context.sequence.load(Ordering::Relaxed);
        let transport_errors = context.transport_errors.load(Ordering::Relaxed);
        if transport_errors > TRANSPORT_WARN_LIMIT {
            warn!(
                scenario = %plan.name,
                transport_errors,
                suppressed = transport_errors - TRANSPORT_WARN_LIMIT,
                "further transport errors were not logged individually"
            );
        }
        let elapsed = started.elapsed();
        info!(
            scenario = %plan.name,
            invocations,
            dropped,
            elapsed_ms = elapsed.as_secs_f64() * 1_000.0,
            "scenario finished"
        );
        Ok(ScenarioRun {
            scenario: plan.name.clone(),
            executor,
            invocations,
            dropped,
            transport_errors,
            peak_workers,
            assertion_failures,
            elapsed,
        })
    }
}

// ============================================================================
// SECTION: Scenario Context
// ============================================================================

/// State shared by every worker of one scenario.
struct ScenarioContext {
    /// Scenario name.
    scenario: ScenarioName,
    /// Base URL for relative probe paths.
    base_url: Url,
    /// Probe issued by every invocation.
    probe: Arc<ProbeSpec>,
    /// Checks evaluated per response.
    checks: Vec<Check>,
    /// Transport for invocations.
    transport: Arc<dyn ProbeTransport>,
    /// Shared metrics sink.
    sink: Arc<dyn MetricsSink>,
    /// Last issued invocation sequence number.
    sequence: AtomicU64,
    /// Transport errors seen so far.
    transport_errors: AtomicU64,
    /// Drain cancellation signal.
    shutdown: watch::Receiver<bool>,
}

impl ScenarioContext {
    /// Runs one invocation: issue, assert, record.
    async fn invoke(&self) -> (ResponseRecord, Assessment) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let correlation_id = CorrelationId::new(self.scenario.clone(), sequence);
        let started = Instant::now();
        let request = self.transport.invoke(&self.base_url, &self.probe, correlation_id.clone());
        let record = tokio::select! {
            biased;
            record = request => record,
            () = wait_for_shutdown(self.shutdown.clone()) => ResponseRecord::failed(
                correlation_id,
                ProbeError::Incomplete,
                started.elapsed(),
                self.probe.tags().clone(),
            ),
        };
        let assessment = AssertionEngine::assess(&self.probe, &record, &self.checks);
        self.sink.record_invocation(&record, assessment.failed, &assessment.results);
        self.log_invocation(&record);
        (record, assessment)
    }

    /// Emits per-invocation events, rate-limiting transport warnings.
    fn log_invocation(&self, record: &ResponseRecord) {
        debug!(
            correlation_id = %record.correlation_id,
            status = record.status,
            elapsed_ms = record.elapsed_ms(),
            "invocation finished"
        );
        if let Some(error) = &record.error
            && !record.is_incomplete()
        {
            let seen = self.transport_errors.fetch_add(1, Ordering::Relaxed) + 1;
            if seen <= TRANSPORT_WARN_LIMIT {
                warn!(correlation_id = %record.correlation_id, %error, "probe transport error");
            }
        }
    }
}

/// Resolves once the shutdown signal is raised; never resolves otherwise.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let raised = shutdown.wait_for(|stopped| *stopped).await.is_ok();
    if !raised {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Constant Virtual Users
// ============================================================================

/// Spawns `count` looping workers that stop issuing at `deadline`.
fn spawn_virtual_users(
    context: &Arc<ScenarioContext>,
    count: usize,
    deadline: Instant,
    think_time: Duration,
) -> JoinSet<()> {
    let mut workers = JoinSet::new();
    for _ in 0 .. count {
        let context = Arc::clone(context);
        workers.spawn(async move {
            while Instant::now() < deadline {
                context.invoke().await;
                if !think_time.is_zero() {
                    sleep_until((Instant::now() + think_time).min(deadline)).await;
                }
            }
        });
    }
    workers
}

// ============================================================================
// SECTION: Constant Arrival Rate
// ============================================================================

/// Result of the arrival schedule.
struct ArrivalOutcome {
    /// Invocations still owned by the pool.
    workers: JoinSet<()>,
    /// Arrivals dropped for lack of capacity.
    dropped: u64,
    /// Largest pool size reached.
    peak_workers: usize,
}

/// Arrival schedule and worker bounds.
#[derive(Debug, Clone, Copy)]
struct WorkerPool {
    /// Time between two arrivals.
    period: Duration,
    /// Floor of the reported pool size.
    min_workers: usize,
    /// Upper bound on concurrent invocations.
    max_workers: usize,
}

/// Issues arrivals at a fixed rate until `deadline`.
async fn schedule_arrivals(
    context: &Arc<ScenarioContext>,
    pool: WorkerPool,
    start: Instant,
    deadline: Instant,
) -> Result<ArrivalOutcome, DriverError> {
    let WorkerPool {
        period,
        min_workers,
        max_workers,
    } = pool;
    let slots = Arc::new(Semaphore::new(max_workers));
    let mut workers = JoinSet::new();
    let mut dropped = 0;
    let mut pool_size = min_workers;
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        let scheduled = ticker.tick().await;
        if scheduled >= deadline {
            break;
        }
        while let Some(joined) = workers.try_join_next() {
            joined.map_err(|err| DriverError::Join(err.to_string()))?;
        }
        let Ok(slot) = Arc::clone(&slots).try_acquire_owned() else {
            dropped += 1;
            context.sink.record_dropped(&context.scenario, context.probe.tags());
            debug!(
                scenario = %context.scenario,
                max_workers,
                "arrival dropped: worker pool saturated"
            );
            continue;
        };
        let busy = max_workers - slots.available_permits();
        if busy > pool_size {
            pool_size = busy;
            debug!(scenario = %context.scenario, workers = pool_size, "worker pool grew");
        }
        let context = Arc::clone(context);
        workers.spawn(async move {
            let _slot = slot;
            context.invoke().await;
        });
    }
    Ok(ArrivalOutcome {
        workers,
        dropped,
        peak_workers: pool_size,
    })
}

// ============================================================================
// SECTION: Drain
// ============================================================================

/// Waits for in-flight work, cancelling it once the grace period ends.
async fn drain(
    mut workers: JoinSet<()>,
    grace_deadline: Instant,
    shutdown: &watch::Sender<bool>,
) -> Result<(), DriverError> {
    if let Ok(joined) = timeout_at(grace_deadline, join_all(&mut workers)).await {
        return joined;
    }
    debug!(in_flight = workers.len(), "graceful stop elapsed; cancelling in-flight invocations");
    shutdown.send_replace(true);
    join_all(&mut workers).await
}

/// Joins every task in the set.
async fn join_all(workers: &mut JoinSet<()>) -> Result<(), DriverError> {
    while let Some(joined) = workers.join_next().await {
        joined.map_err(|err| DriverError::Join(err.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Once
// ============================================================================

/// Converts a once invocation into assertion failures.
///
/// The implicit status check is reported ahead of the declared checks.
fn once_failures(
    probe: &ProbeSpec,
    record: &ResponseRecord,
    assessment: &Assessment,
) -> Vec<AssertionFailure> {
    let mut failures = Vec::new();
    if let Some(error) = &record.error {
        failures.push(AssertionFailure {
            correlation_id: record.correlation_id.clone(),
            check: REQUEST_CHECK.into(),
            detail: error.to_string(),
        });
    } else if assessment.failed {
        let expected =
            probe.expected_status().iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        failures.push(AssertionFailure {
            correlation_id: record.correlation_id.clone(),
            check: STATUS_CHECK.into(),
            detail: format!("unexpected status {} (expected {expected})", record.status),
        });
    }
    failures.extend(assessment.results.iter().filter(|result| !result.passed).map(|result| {
        AssertionFailure {
            correlation_id: result.correlation_id.clone(),
            check: result.name.clone(),
            detail: result.error.as_ref().map_or_else(
                || {
                    format!(
                        "not satisfied (status {}, {:.0}ms)",
                        record.status,
                        record.elapsed_ms()
                    )
                },
                ToString::to_string,
            ),
        }
    }));
    failures
}
