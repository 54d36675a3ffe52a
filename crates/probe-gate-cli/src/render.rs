// crates/probe-gate-cli/src/render.rs
// ============================================================================
// Module: CLI Rendering
// Description: Text and JSON renderings for CLI output.
// Purpose: Keep output formatting separate from command dispatch.
// Dependencies: probe-gate-config, probe-gate-core, probe-gate-driver, serde_json
// ============================================================================

//! ## Overview
//! Renderers return strings; writing them is the dispatcher's job. Suite
//! plans render as an indented key/value outline close to the suite-file
//! layout so `print` output can seed a new file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use probe_gate_config::BuiltinSuite;
use probe_gate_config::ScenarioPlan;
use probe_gate_config::SuitePlan;
use probe_gate_core::Execution;
use probe_gate_core::SuiteReport;
use probe_gate_driver::request_url;

// ============================================================================
// SECTION: Suite Listing
// ============================================================================

/// Renders built-in suites as aligned `name  description` rows.
pub(crate) fn render_suite_list(suites: &[BuiltinSuite]) -> String {
    let width = suites.iter().map(|suite| suite.name.len()).max().unwrap_or(0);
    suites
        .iter()
        .map(|suite| format!("{:<width$}  {}", suite.name, suite.description))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// SECTION: Suite Plans
// ============================================================================

/// Renders a resolved suite plan.
///
/// # Errors
///
/// Returns a serialization error when a check cannot be encoded as JSON.
pub(crate) fn render_plan(plan: &SuitePlan) -> Result<String, serde_json::Error> {
    let mut lines = vec![format!("suite {}", plan.name)];
    if !plan.description.is_empty() {
        lines.push(format!("  {}", plan.description));
    }
    lines.push("target".to_string());
    for (name, value) in plan.target.variables() {
        lines.push(format!("  {name} = {value}"));
    }
    lines.push(format!("  headless = {}", plan.target.headless));
    for scenario in &plan.scenarios {
        render_scenario(scenario, &mut lines)?;
    }
    for threshold in &plan.thresholds {
        lines.push(format!("threshold {threshold}"));
    }
    Ok(lines.join("\n"))
}

/// Appends the outline of one scenario.
fn render_scenario(
    scenario: &ScenarioPlan,
    lines: &mut Vec<String>,
) -> Result<(), serde_json::Error> {
    let probe = &scenario.probe;
    lines.push(format!("scenario {}", scenario.name));
    lines.push(format!("  executor = {}", scenario.execution));
    if let Execution::Load {
        graceful_stop, ..
    } = scenario.execution
    {
        lines.push(format!("  graceful_stop = {}", seconds(graceful_stop)));
    }
    let url = request_url(&scenario.base_url, probe)
        .map_or_else(|_| probe.path().to_string(), |url| url.to_string());
    let expected =
        probe.expected_status().iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
    lines.push(format!(
        "  request = {} {url} (timeout {}, expect {expected})",
        probe.method(),
        seconds(probe.timeout())
    ));
    if !probe.tags().is_empty() {
        lines.push(format!("  tags = {}", probe.tags()));
    }
    for check in &scenario.checks {
        lines.push(format!("  check \"{}\" = {}", check.name, serde_json::to_string(&check.rule)?));
    }
    Ok(())
}

/// Formats a duration in seconds.
fn seconds(duration: Duration) -> String {
    format!("{}s", duration.as_secs_f64())
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Renders a suite report as pretty JSON.
///
/// # Errors
///
/// Returns a serialization error when the report cannot be encoded.
pub(crate) fn render_report_json(report: &SuiteReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
