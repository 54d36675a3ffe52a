// crates/probe-gate-driver/src/runner.rs
// ============================================================================
// Module: Suite Runner
// Description: Concurrent execution of every scenario in a suite.
// Purpose: Share one recorder across scenarios and assemble the report.
// Dependencies: probe-gate-core, probe-gate-config, time, tokio, tracing
// ============================================================================

//! ## Overview
//! Every selected scenario starts at the same time on its own task and
//! records into one shared [`RunRecorder`]. Once all scenarios have drained,
//! the recorder is frozen and thresholds are judged over the snapshot.
//! Scenario summaries keep suite declaration order regardless of which
//! scenario finished first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use probe_gate_config::ScenarioPlan;
use probe_gate_config::SuitePlan;
use probe_gate_core::MetricsSink;
use probe_gate_core::RunRecorder;
use probe_gate_core::SuiteReport;
use probe_gate_core::ThresholdEvaluator;
use probe_gate_core::ThresholdSpec;
use probe_gate_core::runtime::duration_ms;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::time::Instant;
use tracing::info;
use tracing::warn;

use crate::error::DriverError;
use crate::executor::ExecutionDriver;
use crate::executor::ScenarioRun;
use crate::transport::ProbeTransport;

// ============================================================================
// SECTION: Suite Runner
// ============================================================================

/// Runs suites against a shared transport.
#[derive(Clone)]
pub struct SuiteRunner {
    /// Transport shared by every scenario.
    transport: Arc<dyn ProbeTransport>,
    /// Scenario names to run; `None` runs all of them.
    scenario_filter: Option<BTreeSet<String>>,
}

impl SuiteRunner {
    /// Creates a runner that executes every scenario.
    #[must_use]
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self {
            transport,
            scenario_filter: None,
        }
    }

    /// Restricts the run to the named scenarios.
    ///
    /// An empty list leaves the runner unfiltered.
    #[must_use]
    pub fn with_scenario_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        self.scenario_filter = (!names.is_empty()).then_some(names);
        self
    }

    /// Runs the suite and returns its report.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnknownScenario`] when the filter names a
    /// scenario the suite does not declare, and [`DriverError::Join`] when a
    /// scenario task fails.
    pub async fn run(&self, plan: &SuitePlan) -> Result<SuiteReport, DriverError> {
        let scenarios = self.select_scenarios(plan)?;
        let thresholds = self.select_thresholds(plan);
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| DriverError::Timestamp(err.to_string()))?;
        let recorder = Arc::new(RunRecorder::new());
        let sink: Arc<dyn MetricsSink> = recorder.clone();
        let driver = ExecutionDriver::new(Arc::clone(&self.transport), sink);
        info!(
            suite = %plan.name,
            target = %plan.target.base_url,
            scenarios = scenarios.len(),
            thresholds = thresholds.len(),
            "suite started"
        );
        let started = Instant::now();

        let handles: Vec<_> = scenarios
            .into_iter()
            .map(|scenario| {
                let driver = driver.clone();
                tokio::spawn(async move { driver.run_scenario(&scenario).await })
            })
            .collect();
        let mut runs: Vec<ScenarioRun> = Vec::with_capacity(handles.len());
        for handle in handles {
            let run = handle.await.map_err(|err| DriverError::Join(err.to_string()))??;
            runs.push(run);
        }
        let elapsed = started.elapsed();

        let metrics = recorder.snapshot();
        let threshold_report = ThresholdEvaluator::evaluate(&metrics, &thresholds);
        for violation in threshold_report.violations() {
            warn!(suite = %plan.name, outcome = %violation, "threshold violated");
        }
        let summaries =
            runs.iter().map(|run| metrics.summarize(&run.scenario, run.executor)).collect();
        let assertion_failures =
            runs.into_iter().flat_map(|run| run.assertion_failures).collect::<Vec<_>>();
        let report = SuiteReport::new(
            plan.name.clone(),
            plan.target.base_url.to_string(),
            started_at,
            duration_ms(elapsed),
            summaries,
            threshold_report,
            assertion_failures,
        );
        info!(
            suite = %plan.name,
            verdict = report.verdict.as_str(),
            invocations = metrics.total_invocations(),
            elapsed_ms = report.elapsed_ms,
            "suite finished"
        );
        Ok(report)
    }

    /// Returns the scenarios selected by the filter, in declaration order.
    fn select_scenarios(&self, plan: &SuitePlan) -> Result<Vec<ScenarioPlan>, DriverError> {
        let Some(filter) = &self.scenario_filter else {
            return Ok(plan.scenarios.clone());
        };
        if let Some(unknown) = filter.iter().find(|name| plan.scenario(name).is_none()) {
            return Err(DriverError::UnknownScenario(unknown.clone()));
        }
        Ok(plan
            .scenarios
            .iter()
            .filter(|scenario| filter.contains(scenario.name.as_str()))
            .cloned()
            .collect())
    }

    /// Drops thresholds scoped to a scenario excluded by the filter.
    fn select_thresholds(&self, plan: &SuitePlan) -> Vec<ThresholdSpec> {
        let Some(filter) = &self.scenario_filter else {
            return plan.thresholds.clone();
        };
        plan.thresholds
            .iter()
            .filter(|spec| {
                spec.selector.tags.get("scenario").is_none_or(|name| filter.contains(name))
            })
            .cloned()
            .collect()
    }
}
