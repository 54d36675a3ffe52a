// crates/probe-gate-config/src/suite.rs
// ============================================================================
// Module: Suite Files
// Description: TOML suite schema, placeholder substitution, and validation.
// Purpose: Convert suite definitions into validated execution plans.
// Dependencies: probe-gate-core, serde, toml, url
// ============================================================================

//! ## Overview
//! A suite file names a suite, lists scenarios (one probe plus its checks and
//! executor each), and declares thresholds over the collected metrics. The
//! executor vocabulary follows the load tool the suites were written for
//! (`vus`, `rate`, `time_unit`, `pre_allocated_vus`, `max_vus`).
//!
//! Loading is fail-closed: the file is size capped and must be UTF-8, every
//! `${var}` placeholder must resolve against the target variables, and every
//! probe, profile, check, and threshold is validated before a plan is
//! returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use probe_gate_core::Check;
use probe_gate_core::CheckRule;
use probe_gate_core::DEFAULT_GRACEFUL_STOP;
use probe_gate_core::Execution;
use probe_gate_core::HttpMethod;
use probe_gate_core::LoadProfile;
use probe_gate_core::ProbeBody;
use probe_gate_core::ProbeSpec;
use probe_gate_core::ScenarioName;
use probe_gate_core::SuiteName;
use probe_gate_core::TagSet;
use probe_gate_core::ThresholdSpec;
use probe_gate_core::runtime::select_json;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::ConfigError;
use crate::duration::parse_duration;
use crate::target::TargetConfig;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum suite file size in bytes.
pub const MAX_SUITE_FILE_SIZE: usize = 1024 * 1024;
/// Tag carrying the scenario name on every probe.
const SCENARIO_TAG: &str = "scenario";

// ============================================================================
// SECTION: Plans
// ============================================================================

/// Validated suite ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct SuitePlan {
    /// Suite name.
    pub name: SuiteName,
    /// Human-readable description.
    pub description: String,
    /// Target the suite was resolved against.
    pub target: TargetConfig,
    /// Scenarios in declaration order.
    pub scenarios: Vec<ScenarioPlan>,
    /// Thresholds evaluated after every scenario finished.
    pub thresholds: Vec<ThresholdSpec>,
}

impl SuitePlan {
    /// Returns the scenario with the given name.
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioPlan> {
        self.scenarios.iter().find(|scenario| scenario.name.as_str() == name)
    }
}

/// One validated scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioPlan {
    /// Scenario name, also present as the `scenario` tag.
    pub name: ScenarioName,
    /// Base URL relative probe paths are joined onto.
    pub base_url: Url,
    /// Probe issued by every invocation.
    pub probe: Arc<ProbeSpec>,
    /// Checks evaluated against every response.
    pub checks: Vec<Check>,
    /// Execution mode.
    pub execution: Execution,
}

// ============================================================================
// SECTION: File Schema
// ============================================================================

/// Top-level suite file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteFile {
    /// Suite header.
    suite: SuiteHeader,
    /// Scenario entries.
    #[serde(default)]
    scenarios: Vec<ScenarioEntry>,
    /// Threshold entries.
    #[serde(default)]
    thresholds: Vec<ThresholdEntry>,
}

/// `[suite]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteHeader {
    /// Suite name.
    name: String,
    /// Optional description.
    #[serde(default)]
    description: String,
}

/// Which resolved URL a scenario targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TargetKind {
    /// API base URL.
    #[default]
    Api,
    /// Web front-end URL.
    Web,
}

/// `[[scenarios]]` entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioEntry {
    /// Scenario name.
    name: String,
    /// Target URL selection.
    #[serde(default)]
    target: TargetKind,
    /// Extra metric tags.
    #[serde(default)]
    tags: BTreeMap<String, String>,
    /// Executor table.
    executor: ExecutorEntry,
    /// Request table.
    request: RequestEntry,
    /// Checks list.
    #[serde(default)]
    checks: Vec<Check>,
}

/// Executor table keyed by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
enum ExecutorEntry {
    /// Fixed number of looping virtual users.
    ConstantVus {
        /// Number of virtual users.
        vus: usize,
        /// Scenario duration.
        duration: String,
        /// Sleep between iterations of one user.
        #[serde(default)]
        think_time: Option<String>,
        /// Drain period after the deadline.
        #[serde(default)]
        graceful_stop: Option<String>,
    },
    /// Fixed arrival rate.
    ConstantArrivalRate {
        /// Arrivals per `time_unit`.
        rate: f64,
        /// Unit the rate is expressed in.
        #[serde(default)]
        time_unit: Option<String>,
        /// Scenario duration.
        duration: String,
        /// Workers allocated before the first arrival.
        pre_allocated_vus: usize,
        /// Upper bound on workers; defaults to `pre_allocated_vus`.
        #[serde(default)]
        max_vus: Option<usize>,
        /// Drain period after the deadline.
        #[serde(default)]
        graceful_stop: Option<String>,
    },
    /// Single invocation with hard assertions; braced so stray keys are rejected.
    Once {},
}

/// `request` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestEntry {
    /// HTTP method; defaults to GET.
    #[serde(default)]
    method: Option<HttpMethod>,
    /// Rooted path or absolute URL.
    path: String,
    /// Request headers.
    #[serde(default)]
    headers: BTreeMap<String, String>,
    /// Optional body.
    #[serde(default)]
    body: Option<ProbeBody>,
    /// Per-invocation timeout.
    #[serde(default)]
    timeout: Option<String>,
    /// Status codes counted as success.
    #[serde(default)]
    expected_status: Option<Vec<u16>>,
}

/// `[[thresholds]]` entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdEntry {
    /// Metric selector, optionally with a tag filter.
    metric: String,
    /// Aggregation, operator, and bound.
    condition: String,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and validates a suite file from disk.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Parse`] for malformed TOML, and [`ConfigError::Invalid`]
/// when the file is too large, not UTF-8, or fails validation.
pub fn load_suite_file(path: &Path, target: &TargetConfig) -> Result<SuitePlan, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_SUITE_FILE_SIZE {
        return Err(ConfigError::Invalid("suite file exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| ConfigError::Invalid("suite file must be utf-8".to_string()))?;
    parse_suite(content, target)
}

/// Parses and validates suite TOML against a resolved target.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::Invalid`] when any scenario or threshold is invalid.
pub fn parse_suite(content: &str, target: &TargetConfig) -> Result<SuitePlan, ConfigError> {
    if content.len() > MAX_SUITE_FILE_SIZE {
        return Err(ConfigError::Invalid("suite file exceeds size limit".to_string()));
    }
    let file: SuiteFile =
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
    let name = file.suite.name.trim();
    if name.is_empty() {
        return Err(ConfigError::Invalid("suite.name must not be empty".to_string()));
    }
    if file.scenarios.is_empty() {
        return Err(ConfigError::Invalid(format!("suite '{name}' declares no scenarios")));
    }

    let variables = target.variables();
    let mut seen = BTreeSet::new();
    let mut scenarios = Vec::with_capacity(file.scenarios.len());
    for entry in file.scenarios {
        if !seen.insert(entry.name.clone()) {
            return Err(ConfigError::Invalid(format!("duplicate scenario name: {}", entry.name)));
        }
        scenarios.push(build_scenario(entry, target, &variables)?);
    }

    let thresholds = file
        .thresholds
        .iter()
        .map(|entry| {
            ThresholdSpec::parse(&entry.metric, &entry.condition).map_err(|err| {
                ConfigError::Invalid(format!(
                    "threshold '{} {}': {err}",
                    entry.metric, entry.condition
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SuitePlan {
        name: SuiteName::new(name),
        description: file.suite.description,
        target: target.clone(),
        scenarios,
        thresholds,
    })
}

// ============================================================================
// SECTION: Scenario Construction
// ============================================================================

/// Builds and validates one scenario.
fn build_scenario(
    entry: ScenarioEntry,
    target: &TargetConfig,
    variables: &BTreeMap<&'static str, String>,
) -> Result<ScenarioPlan, ConfigError> {
    let name = entry.name.trim();
    if name.is_empty() {
        return Err(ConfigError::Invalid("scenario name must not be empty".to_string()));
    }
    let context = |err: String| ConfigError::Invalid(format!("scenario '{name}': {err}"));

    let request = entry.request;
    let path = substitute(&request.path, variables).map_err(context)?;
    let mut probe = ProbeSpec::new(request.method.unwrap_or(HttpMethod::Get), path);
    for (header, value) in &request.headers {
        probe = probe.with_header(header, substitute(value, variables).map_err(context)?);
    }
    if let Some(body) = request.body {
        probe = probe.with_body(substitute_body(body, variables).map_err(context)?);
    }
    if let Some(raw) = &request.timeout {
        probe = probe.with_timeout(parse_duration(raw)?);
    }
    if let Some(codes) = request.expected_status {
        probe = probe.with_expected_status(codes);
    }
    let mut tags: TagSet = entry.tags.into_iter().collect();
    tags.insert(SCENARIO_TAG, name);
    probe = probe.with_tags(tags);
    probe.validate().map_err(|err| context(err.to_string()))?;

    for check in &entry.checks {
        validate_check(check).map_err(context)?;
    }

    let execution = build_execution(entry.executor).map_err(|err| match err {
        ConfigError::Invalid(message) => context(message),
        other => other,
    })?;
    execution.validate().map_err(|err| context(err.to_string()))?;

    let base_url = match entry.target {
        TargetKind::Api => target.base_url.clone(),
        TargetKind::Web => target.web_url.clone(),
    };
    Ok(ScenarioPlan {
        name: ScenarioName::new(name),
        base_url,
        probe: Arc::new(probe),
        checks: entry.checks,
        execution,
    })
}

/// Converts an executor table into an execution mode.
fn build_execution(entry: ExecutorEntry) -> Result<Execution, ConfigError> {
    match entry {
        ExecutorEntry::ConstantVus {
            vus,
            duration,
            think_time,
            graceful_stop,
        } => Ok(Execution::Load {
            profile: LoadProfile::ConstantVirtualUsers {
                count: vus,
                duration: parse_duration(&duration)?,
                think_time: optional_duration(think_time.as_deref(), Duration::ZERO)?,
            },
            graceful_stop: optional_duration(graceful_stop.as_deref(), DEFAULT_GRACEFUL_STOP)?,
        }),
        ExecutorEntry::ConstantArrivalRate {
            rate,
            time_unit,
            duration,
            pre_allocated_vus,
            max_vus,
            graceful_stop,
        } => {
            let unit = optional_duration(time_unit.as_deref(), Duration::from_secs(1))?;
            if unit.is_zero() {
                return Err(ConfigError::Invalid("time_unit must be greater than zero".to_string()));
            }
            Ok(Execution::Load {
                profile: LoadProfile::ConstantArrivalRate {
                    rate_per_second: rate / unit.as_secs_f64(),
                    duration: parse_duration(&duration)?,
                    min_workers: pre_allocated_vus,
                    max_workers: max_vus.unwrap_or(pre_allocated_vus),
                },
                graceful_stop: optional_duration(graceful_stop.as_deref(), DEFAULT_GRACEFUL_STOP)?,
            })
        }
        ExecutorEntry::Once {} => Ok(Execution::Once),
    }
}

/// Parses an optional duration with a fallback.
fn optional_duration(raw: Option<&str>, fallback: Duration) -> Result<Duration, ConfigError> {
    raw.map_or(Ok(fallback), parse_duration)
}

/// Validates selectors and operands of one check.
fn validate_check(check: &Check) -> Result<(), String> {
    let name = check.name.as_str();
    if name.trim().is_empty() {
        return Err("check name must not be empty".to_string());
    }
    match &check.rule {
        CheckRule::Json {
            path,
            comparator,
            expected,
        } => {
            validate_selector(name, path)?;
            if comparator.requires_expected() && expected.is_none() {
                return Err(format!("check '{name}': comparator needs an expected value"));
            }
            Ok(())
        }
        CheckRule::JsonAnyTruthy {
            paths,
        } => {
            if paths.is_empty() {
                return Err(format!("check '{name}': paths must not be empty"));
            }
            paths.iter().try_for_each(|path| validate_selector(name, path))
        }
        CheckRule::StatusIn {
            codes,
        } if codes.is_empty() => Err(format!("check '{name}': codes must not be empty")),
        CheckRule::HeaderContains {
            header, ..
        } if header.trim().is_empty() => Err(format!("check '{name}': header must not be empty")),
        _ => Ok(()),
    }
}

/// Rejects selectors the `JSONPath` engine cannot compile.
fn validate_selector(name: &str, path: &str) -> Result<(), String> {
    select_json(&Value::Null, path)
        .map(|_| ())
        .map_err(|err| format!("check '{name}': {err}"))
}

// ============================================================================
// SECTION: Placeholders
// ============================================================================

/// Replaces `${var}` placeholders with target variables.
fn substitute(input: &str, variables: &BTreeMap<&'static str, String>) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[.. start]);
        let after = &rest[start + 2 ..];
        let Some(end) = after.find('}') else {
            return Err(format!("unterminated placeholder in '{input}'"));
        };
        let key = after[.. end].trim();
        let Some(value) = variables.get(key) else {
            return Err(format!("unknown placeholder '${{{key}}}'"));
        };
        output.push_str(value);
        rest = &after[end + 1 ..];
    }
    output.push_str(rest);
    Ok(output)
}

/// Substitutes placeholders in every string leaf of a body.
fn substitute_body(
    body: ProbeBody,
    variables: &BTreeMap<&'static str, String>,
) -> Result<ProbeBody, String> {
    match body {
        ProbeBody::Json(value) => substitute_value(value, variables).map(ProbeBody::Json),
        ProbeBody::Text(text) => substitute(&text, variables).map(ProbeBody::Text),
    }
}

/// Recursively substitutes placeholders in JSON string leaves.
fn substitute_value(
    value: Value,
    variables: &BTreeMap<&'static str, String>,
) -> Result<Value, String> {
    match value {
        Value::String(text) => substitute(&text, variables).map(Value::String),
        Value::Array(items) => items
            .into_iter()
            .map(|item| substitute_value(item, variables))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(fields) => fields
            .into_iter()
            .map(|(key, item)| substitute_value(item, variables).map(|item| (key, item)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other),
    }
}
