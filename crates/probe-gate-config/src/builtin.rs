// crates/probe-gate-config/src/builtin.rs
// ============================================================================
// Module: Built-in Suites
// Description: Canonical suites shipped with the binary.
// Purpose: Provide ready-to-run smoke, load, and end-to-end suites.
// Dependencies: crate::suite
// ============================================================================

//! ## Overview
//! Built-in suites are stored as suite-file TOML and parsed through the same
//! loader as user files, so `probe-gate print` output and the files users
//! write share one schema. Placeholders resolve against the caller's
//! [`TargetConfig`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::ConfigError;
use crate::suite::SuitePlan;
use crate::suite::parse_suite;
use crate::target::TargetConfig;

// ============================================================================
// SECTION: Suite Sources
// ============================================================================

/// Prometheus scrape at one virtual user.
const METRICS_SUITE: &str = r#"
[suite]
name = "metrics"
description = "Scrape /metrics with one virtual user and expect a text exposition."

[[scenarios]]
name = "metrics"
tags = { ep = "metrics" }

[scenarios.executor]
type = "constant-vus"
vus = 1
duration = "10s"
think_time = "500ms"

[scenarios.request]
method = "GET"
path = "/metrics"
timeout = "10s"

[[scenarios.checks]]
name = "status 200"
rule = "status"
equals = 200

[[scenarios.checks]]
name = "text content"
rule = "header_contains"
header = "content-type"
needle = "text/plain"
"#;

/// Model listing under steady load.
const MODELS_SUITE: &str = r#"
[suite]
name = "models"
description = "GET /v1/models with 10 virtual users for 30s; p95 under 1200ms."

[[scenarios]]
name = "models"
tags = { ep = "models" }

[scenarios.executor]
type = "constant-vus"
vus = 10
duration = "30s"
think_time = "200ms"

[scenarios.request]
method = "GET"
path = "/v1/models"
timeout = "10s"

[[scenarios.checks]]
name = "200"
rule = "status"
equals = 200

[[scenarios.checks]]
name = "tem data"
rule = "json"
path = "$.data"
comparator = "is_array"

[[thresholds]]
metric = "http_req_failed"
condition = "rate<0.01"

[[thresholds]]
metric = "http_req_duration{ep:models}"
condition = "p(95)<1200"
"#;

/// Responses endpoint under steady load.
const RESPONSES_SUITE: &str = r#"
[suite]
name = "responses"
description = "POST /v1/responses with 10 virtual users for 30s; p95 under 1200ms."

[[scenarios]]
name = "responses"
tags = { ep = "responses" }

[scenarios.executor]
type = "constant-vus"
vus = 10
duration = "30s"
think_time = "200ms"

[scenarios.request]
method = "POST"
path = "/v1/responses"
timeout = "60s"
headers = { "Content-Type" = "application/json" }
body = { json = { model = "${model}", input = "ping" } }

[[scenarios.checks]]
name = "status 200"
rule = "status"
equals = 200

[[scenarios.checks]]
name = "tem output"
rule = "json_any_truthy"
paths = ["$.output_text", "$.output", "$.choices"]

[[thresholds]]
metric = "http_req_failed"
condition = "rate<0.01"

[[thresholds]]
metric = "http_req_duration{ep:responses}"
condition = "p(95)<1200"
"#;

/// Arrival-rate smoke over health and models.
const SMOKE_SUITE: &str = r#"
[suite]
name = "smoke"
description = "Arrival-rate smoke of /healthz (15/s) and /v1/models (10/s) for 30s."

[[scenarios]]
name = "healthz"

[scenarios.executor]
type = "constant-arrival-rate"
rate = 15
time_unit = "1s"
duration = "30s"
pre_allocated_vus = 10
max_vus = 50

[scenarios.request]
method = "GET"
path = "/healthz"
timeout = "3s"

[[scenarios.checks]]
name = "status 200"
rule = "status"
equals = 200

[[scenarios.checks]]
name = "ok true"
rule = "json"
path = "$.ok"
comparator = "equals"
expected = true

[[scenarios]]
name = "models"

[scenarios.executor]
type = "constant-arrival-rate"
rate = 10
time_unit = "1s"
duration = "30s"
pre_allocated_vus = 10
max_vus = 50

[scenarios.request]
method = "GET"
path = "/v1/models"
timeout = "5s"

[[scenarios.checks]]
name = "status 200"
rule = "status"
equals = 200

[[scenarios.checks]]
name = "data list"
rule = "json"
path = "$.data"
comparator = "is_array"

[[thresholds]]
metric = "http_req_duration{scenario:healthz}"
condition = "p(95)<300"

[[thresholds]]
metric = "http_req_duration{scenario:models}"
condition = "p(95)<300"

[[thresholds]]
metric = "checks"
condition = "rate>0.99"
"#;

/// Single-shot end-to-end assertions.
const E2E_SUITE: &str = r#"
[suite]
name = "e2e"
description = "One-shot checks of the web home page and the models API."

[[scenarios]]
name = "web home"
target = "web"

[scenarios.executor]
type = "once"

[scenarios.request]
method = "GET"
path = "/"
timeout = "10s"

[[scenarios.checks]]
name = "status 200"
rule = "status"
equals = 200

[[scenarios.checks]]
name = "pseudop95<1500ms"
rule = "latency_below"
max_ms = 1500

[[scenarios.checks]]
name = "body visible"
rule = "document_body_visible"

[[scenarios]]
name = "models api"
target = "web"

[scenarios.executor]
type = "once"

[scenarios.request]
method = "GET"
path = "${base_url}/v1/models"
timeout = "10s"

[[scenarios.checks]]
name = "status 200"
rule = "status"
equals = 200

[[scenarios.checks]]
name = "has data"
rule = "json"
path = "$.data"
comparator = "exists"

[[scenarios.checks]]
name = "pseudop95<1200ms"
rule = "latency_below"
max_ms = 1200
"#;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Built-in suite source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSuite {
    /// Suite name accepted by `--suite`.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Suite-file TOML.
    pub toml: &'static str,
}

/// Registered built-in suites in listing order.
const BUILTIN_SUITES: [BuiltinSuite; 5] = [
    BuiltinSuite {
        name: "smoke",
        description: "Arrival-rate smoke of /healthz and /v1/models with p95 and check gates.",
        toml: SMOKE_SUITE,
    },
    BuiltinSuite {
        name: "models",
        description: "Constant-VU load on GET /v1/models with p95 and error-rate gates.",
        toml: MODELS_SUITE,
    },
    BuiltinSuite {
        name: "responses",
        description: "Constant-VU load on POST /v1/responses with p95 and error-rate gates.",
        toml: RESPONSES_SUITE,
    },
    BuiltinSuite {
        name: "metrics",
        description: "Single-VU scrape of /metrics expecting a text exposition.",
        toml: METRICS_SUITE,
    },
    BuiltinSuite {
        name: "e2e",
        description: "One-shot assertions on the web home page and the models API.",
        toml: E2E_SUITE,
    },
];

/// Returns every built-in suite.
#[must_use]
pub const fn builtin_suites() -> &'static [BuiltinSuite] {
    &BUILTIN_SUITES
}

/// Returns built-in suite names in listing order.
#[must_use]
pub fn builtin_suite_names() -> Vec<&'static str> {
    BUILTIN_SUITES.iter().map(|suite| suite.name).collect()
}

/// Returns the TOML source of a built-in suite.
#[must_use]
pub fn builtin_suite_toml(name: &str) -> Option<&'static str> {
    BUILTIN_SUITES.iter().find(|suite| suite.name == name).map(|suite| suite.toml)
}

/// Resolves a built-in suite against a target.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for an unknown suite name, or any loader
/// error raised while resolving the suite.
pub fn builtin_suite(name: &str, target: &TargetConfig) -> Result<SuitePlan, ConfigError> {
    let source = builtin_suite_toml(name).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "unknown built-in suite '{name}' (available: {})",
            builtin_suite_names().join(", ")
        ))
    })?;
    parse_suite(source, target)
}
