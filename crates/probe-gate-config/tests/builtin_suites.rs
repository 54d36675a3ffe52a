//! Built-in suite tests for probe-gate-config.
// crates/probe-gate-config/tests/builtin_suites.rs
// =============================================================================
// Module: Built-in Suite Tests
// Description: Validate the shipped suites resolve with expected parameters.
// Purpose: Ensure built-in suites keep their load shapes and gates.
// =============================================================================

use std::time::Duration;

use probe_gate_config::MapEnv;
use probe_gate_config::TargetConfig;
use probe_gate_config::builtin_suite;
use probe_gate_config::builtin_suite_names;
use probe_gate_config::builtin_suite_toml;
use probe_gate_config::builtin_suites;
use probe_gate_core::CheckRule;
use probe_gate_core::Execution;
use probe_gate_core::HttpMethod;
use probe_gate_core::LoadProfile;
use probe_gate_core::ProbeBody;
use serde_json::json;

type TestResult = Result<(), String>;

fn ensure(condition: bool, message: &str) -> TestResult {
    if condition { Ok(()) } else { Err(message.to_string()) }
}

fn conditions(plan: &probe_gate_config::SuitePlan) -> Vec<String> {
    plan.thresholds.iter().map(ToString::to_string).collect()
}

#[test]
fn every_builtin_suite_resolves_against_defaults() -> TestResult {
    let target = TargetConfig::local().map_err(|err| err.to_string())?;
    ensure(builtin_suite_names() == ["smoke", "models", "responses", "metrics", "e2e"], "names")?;
    for suite in builtin_suites() {
        let plan = builtin_suite(suite.name, &target).map_err(|err| err.to_string())?;
        ensure(plan.name.as_str() == suite.name, "suite name matches registry")?;
        ensure(!plan.description.is_empty(), "description present")?;
        ensure(builtin_suite_toml(suite.name) == Some(suite.toml), "toml lookup")?;
    }
    Ok(())
}

#[test]
fn unknown_builtin_suite_lists_alternatives() -> TestResult {
    let target = TargetConfig::local().map_err(|err| err.to_string())?;
    match builtin_suite("soak", &target) {
        Err(err) if err.to_string().contains("available: smoke, models") => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn smoke_suite_uses_arrival_rate_scenarios() -> TestResult {
    let target = TargetConfig::local().map_err(|err| err.to_string())?;
    let plan = builtin_suite("smoke", &target).map_err(|err| err.to_string())?;
    let healthz = plan.scenario("healthz").ok_or("healthz missing")?;
    ensure(
        healthz.execution
            == Execution::Load {
                profile: LoadProfile::ConstantArrivalRate {
                    rate_per_second: 15.0,
                    duration: Duration::from_secs(30),
                    min_workers: 10,
                    max_workers: 50,
                },
                graceful_stop: Duration::from_secs(30),
            },
        "healthz profile",
    )?;
    ensure(healthz.probe.timeout() == Duration::from_secs(3), "healthz timeout")?;
    ensure(healthz.probe.path() == "/healthz", "healthz path")?;
    let models = plan.scenario("models").ok_or("models missing")?;
    ensure(models.probe.timeout() == Duration::from_secs(5), "models timeout")?;
    ensure(
        conditions(&plan)
            == [
                "http_req_duration{scenario:healthz} p(95)<300",
                "http_req_duration{scenario:models} p(95)<300",
                "checks rate>0.99",
            ],
        "smoke thresholds",
    )?;
    Ok(())
}

#[test]
fn responses_suite_posts_the_resolved_model() -> TestResult {
    let env = MapEnv::new().with("K6_MODEL", "gpt-4.1-mini").with("BASE_URL", "http://router:8082");
    let target = TargetConfig::resolve(&env).map_err(|err| err.to_string())?;
    let plan = builtin_suite("responses", &target).map_err(|err| err.to_string())?;
    let scenario = plan.scenario("responses").ok_or("responses missing")?;
    ensure(scenario.probe.method() == HttpMethod::Post, "method")?;
    let body = ProbeBody::Json(json!({"model": "gpt-4.1-mini", "input": "ping"}));
    ensure(scenario.probe.body() == Some(&body), "body")?;
    ensure(scenario.probe.tags().get("ep") == Some("responses"), "ep tag")?;
    ensure(scenario.base_url.as_str() == "http://router:8082/", "base url")?;
    ensure(
        scenario.execution
            == Execution::Load {
                profile: LoadProfile::ConstantVirtualUsers {
                    count: 10,
                    duration: Duration::from_secs(30),
                    think_time: Duration::from_millis(200),
                },
                graceful_stop: Duration::from_secs(30),
            },
        "responses profile",
    )?;
    ensure(
        conditions(&plan)
            == ["http_req_failed rate<0.01", "http_req_duration{ep:responses} p(95)<1200"],
        "responses thresholds",
    )?;
    Ok(())
}

#[test]
fn metrics_and_models_suites_keep_their_checks() -> TestResult {
    let target = TargetConfig::local().map_err(|err| err.to_string())?;
    let metrics = builtin_suite("metrics", &target).map_err(|err| err.to_string())?;
    let scrape = metrics.scenario("metrics").ok_or("metrics missing")?;
    let names: Vec<&str> = scrape.checks.iter().map(|check| check.name.as_str()).collect();
    ensure(names == ["status 200", "text content"], "metrics checks")?;
    ensure(metrics.thresholds.is_empty(), "metrics has no thresholds")?;

    let models = builtin_suite("models", &target).map_err(|err| err.to_string())?;
    let listing = models.scenario("models").ok_or("models missing")?;
    let names: Vec<&str> = listing.checks.iter().map(|check| check.name.as_str()).collect();
    ensure(names == ["200", "tem data"], "models checks")?;
    Ok(())
}

#[test]
fn e2e_suite_targets_web_and_api() -> TestResult {
    let env = MapEnv::new()
        .with("PLAYWRIGHT_BASE_URL", "http://webui:3001")
        .with("PROBE_GATE_BASE_URL", "http://router:8082/");
    let target = TargetConfig::resolve(&env).map_err(|err| err.to_string())?;
    let plan = builtin_suite("e2e", &target).map_err(|err| err.to_string())?;

    let home = plan.scenario("web home").ok_or("web home missing")?;
    ensure(home.execution == Execution::Once, "home is once")?;
    ensure(home.base_url.as_str() == "http://webui:3001/", "home uses web url")?;
    ensure(
        home.checks.iter().any(|check| check.rule == CheckRule::DocumentBodyVisible),
        "body visibility check",
    )?;

    let api = plan.scenario("models api").ok_or("models api missing")?;
    ensure(api.probe.path() == "http://router:8082/v1/models", "absolute api url")?;
    ensure(api.probe.is_absolute(), "api path is absolute")?;
    ensure(plan.thresholds.is_empty(), "e2e has no thresholds")?;
    Ok(())
}
