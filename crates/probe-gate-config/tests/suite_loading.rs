//! Suite file loading tests for probe-gate-config.
// crates/probe-gate-config/tests/suite_loading.rs
// =============================================================================
// Module: Suite Loading Tests
// Description: Validate suite parsing, substitution, and loading guards.
// Purpose: Ensure suite input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use probe_gate_config::ConfigError;
use probe_gate_config::MAX_SUITE_FILE_SIZE;
use probe_gate_config::MapEnv;
use probe_gate_config::SuitePlan;
use probe_gate_config::TargetConfig;
use probe_gate_config::load_suite_file;
use probe_gate_config::parse_suite;
use probe_gate_core::Execution;
use probe_gate_core::HttpMethod;
use probe_gate_core::LoadProfile;
use probe_gate_core::ProbeBody;
use serde_json::json;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

const VALID_SUITE: &str = r#"
[suite]
name = "router"
description = "router checks"

[[scenarios]]
name = "chat"
tags = { ep = "responses" }

[scenarios.executor]
type = "constant-arrival-rate"
rate = 120
time_unit = "1m"
duration = "45s"
pre_allocated_vus = 4
graceful_stop = "0"

[scenarios.request]
method = "POST"
path = "/v1/responses"
headers = { Authorization = "Bearer ${model}" }
body = { json = { model = "${model}", input = ["ping", "${model}"] } }
timeout = "2.5s"
expected_status = [200, 202]

[[scenarios.checks]]
name = "accepted"
rule = "status_in"
codes = [200, 202]

[[scenarios]]
name = "home"
target = "web"

[scenarios.executor]
type = "once"

[scenarios.request]
path = "/"

[[thresholds]]
metric = "http_req_duration{scenario:chat}"
condition = "p(99)<2000"

[[thresholds]]
metric = "http_req_duration{scenario:chat}"
condition = "avg<800"
"#;

fn target() -> Result<TargetConfig, String> {
    TargetConfig::resolve(&MapEnv::new().with("PROBE_GATE_MODEL", "tiny"))
        .map_err(|err| err.to_string())
}

fn assert_invalid(result: Result<SuitePlan, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid suite".to_string()),
    }
}

fn ensure(condition: bool, message: &str) -> TestResult {
    if condition { Ok(()) } else { Err(message.to_string()) }
}

fn with_single_scenario(executor: &str, request: &str, checks: &str) -> String {
    format!(
        "[suite]\nname = \"s\"\n\n[[scenarios]]\nname = \"one\"\n\n\
         [scenarios.executor]\n{executor}\n\n[scenarios.request]\n{request}\n\n{checks}\n"
    )
}

#[test]
fn parses_full_suite_with_substitution() -> TestResult {
    let plan = parse_suite(VALID_SUITE, &target()?).map_err(|err| err.to_string())?;
    ensure(plan.name.as_str() == "router", "suite name")?;
    ensure(plan.scenarios.len() == 2, "scenario count")?;
    ensure(plan.thresholds.len() == 2, "threshold count")?;

    let chat = plan.scenario("chat").ok_or("chat scenario missing")?;
    ensure(chat.probe.method() == HttpMethod::Post, "method")?;
    let authorization = chat.probe.headers().get("Authorization").map(String::as_str);
    ensure(authorization == Some("Bearer tiny"), "header")?;
    let body = ProbeBody::Json(json!({"model": "tiny", "input": ["ping", "tiny"]}));
    ensure(chat.probe.body() == Some(&body), "body substitution")?;
    ensure(chat.probe.timeout() == Duration::from_millis(2_500), "timeout")?;
    ensure(chat.probe.expects(202), "expected status")?;
    ensure(chat.probe.tags().get("scenario") == Some("chat"), "scenario tag")?;
    ensure(chat.probe.tags().get("ep") == Some("responses"), "custom tag")?;
    ensure(chat.base_url.as_str() == "http://localhost:8082/", "api target")?;
    ensure(
        chat.execution
            == Execution::Load {
                profile: LoadProfile::ConstantArrivalRate {
                    rate_per_second: 2.0,
                    duration: Duration::from_secs(45),
                    min_workers: 4,
                    max_workers: 4,
                },
                graceful_stop: Duration::ZERO,
            },
        "arrival-rate execution",
    )?;

    let home = plan.scenario("home").ok_or("home scenario missing")?;
    ensure(home.execution == Execution::Once, "once execution")?;
    ensure(home.probe.method() == HttpMethod::Get, "default method")?;
    ensure(home.base_url.as_str() == "http://localhost:3001/", "web target")?;
    Ok(())
}

#[test]
fn rejects_duplicate_scenario_names() -> TestResult {
    let duplicated = format!(
        "{VALID_SUITE}\n[[scenarios]]\nname = \"chat\"\n[scenarios.executor]\ntype = \"once\"\n\
         [scenarios.request]\npath = \"/\"\n"
    );
    assert_invalid(parse_suite(&duplicated, &target()?), "duplicate scenario name: chat")?;
    Ok(())
}

#[test]
fn rejects_unknown_placeholders() -> TestResult {
    let suite = with_single_scenario("type = \"once\"", "path = \"/v1/${tenant}/models\"", "");
    assert_invalid(parse_suite(&suite, &target()?), "unknown placeholder '${tenant}'")?;
    let suite = with_single_scenario("type = \"once\"", "path = \"/v1/${model\"", "");
    assert_invalid(parse_suite(&suite, &target()?), "unterminated placeholder")?;
    Ok(())
}

#[test]
fn rejects_invalid_thresholds() -> TestResult {
    let suite = format!(
        "{}\n[[thresholds]]\nmetric = \"http_req_failed\"\ncondition = \"p(95)<1\"\n",
        with_single_scenario("type = \"once\"", "path = \"/\"", "")
    );
    assert_invalid(parse_suite(&suite, &target()?), "threshold 'http_req_failed p(95)<1'")?;
    Ok(())
}

#[test]
fn rejects_invalid_probes_profiles_and_checks() -> TestResult {
    let target = target()?;
    let cases = [
        (
            with_single_scenario("type = \"once\"", "path = \"healthz\"", ""),
            "scenario 'one': invalid probe",
        ),
        (
            with_single_scenario(
                "type = \"constant-vus\"\nvus = 0\nduration = \"10s\"",
                "path = \"/\"",
                "",
            ),
            "scenario 'one': invalid load profile",
        ),
        (
            with_single_scenario(
                "type = \"constant-arrival-rate\"\nrate = 5\nduration = \"10s\"\n\
                 pre_allocated_vus = 10\nmax_vus = 2",
                "path = \"/\"",
                "",
            ),
            "invalid load profile",
        ),
        (
            with_single_scenario(
                "type = \"once\"",
                "path = \"/\"",
                "[[scenarios.checks]]\nname = \"bad\"\nrule = \"json\"\npath = \"$[\"\n\
                 comparator = \"exists\"",
            ),
            "check 'bad'",
        ),
        (
            with_single_scenario(
                "type = \"once\"",
                "path = \"/\"",
                "[[scenarios.checks]]\nname = \"eq\"\nrule = \"json\"\npath = \"$.ok\"\n\
                 comparator = \"equals\"",
            ),
            "comparator needs an expected value",
        ),
        (
            with_single_scenario("type = \"once\"", "path = \"/\"\ntimeout = \"3 days\"", ""),
            "invalid duration",
        ),
    ];
    for (suite, needle) in cases {
        assert_invalid(parse_suite(&suite, &target), needle)?;
    }
    Ok(())
}

#[test]
fn rejects_malformed_toml_and_unknown_fields() -> TestResult {
    let target = target()?;
    match parse_suite("[suite\nname = 1", &target) {
        Err(ConfigError::Parse(_)) => {}
        other => return Err(format!("expected parse error, got {other:?}")),
    }
    let suite = with_single_scenario("type = \"once\"", "path = \"/\"\nretries = 3", "");
    match parse_suite(&suite, &target) {
        Err(ConfigError::Parse(message)) if message.contains("retries") => {}
        other => return Err(format!("expected unknown field error, got {other:?}")),
    }
    assert_invalid(parse_suite("[suite]\nname = \"empty\"\n", &target), "declares no scenarios")?;
    Ok(())
}

#[test]
fn rejects_misspelled_executor_keys() -> TestResult {
    let target = target()?;
    let suite = with_single_scenario(
        "type = \"constant-arrival-rate\"\nrate = 5\nduration = \"10s\"\n\
         pre_allocated_vus = 2\nmax_vu = 50",
        "path = \"/\"",
        "",
    );
    match parse_suite(&suite, &target) {
        Err(ConfigError::Parse(message)) if message.contains("max_vu") => {}
        other => return Err(format!("expected unknown executor field error, got {other:?}")),
    }
    let once = with_single_scenario("type = \"once\"\nvus = 3", "path = \"/\"", "");
    match parse_suite(&once, &target) {
        Err(ConfigError::Parse(message)) if message.contains("vus") => Ok(()),
        other => Err(format!("expected unknown executor field error, got {other:?}")),
    }
}

#[test]
fn load_reads_suite_from_disk() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(VALID_SUITE.as_bytes()).map_err(|err| err.to_string())?;
    let plan = load_suite_file(file.path(), &target()?).map_err(|err| err.to_string())?;
    ensure(plan.scenarios.len() == 2, "scenario count")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; MAX_SUITE_FILE_SIZE + 1];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(load_suite_file(file.path(), &target()?), "suite file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(load_suite_file(file.path(), &target()?), "suite file must be utf-8")?;
    Ok(())
}

#[test]
fn load_reports_missing_file_as_io_error() -> TestResult {
    match load_suite_file(Path::new("/nonexistent/probe-gate/suite.toml"), &target()?) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}
