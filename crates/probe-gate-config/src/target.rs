// crates/probe-gate-config/src/target.rs
// ============================================================================
// Module: Target Resolver
// Description: Environment-backed resolution of the service under test.
// Purpose: Produce base URL, web URL, model, and headless settings.
// Dependencies: url
// ============================================================================

//! ## Overview
//! The target is read from environment keys with documented fallbacks. Each
//! setting has a primary key and a legacy key understood by the load and
//! browser tools the suites replace; the first non-blank value wins. Absent
//! values fall back to local defaults. Only an unusable URL is an error, and
//! it is reported before any invocation. Environment values are read with
//! strict UTF-8 validation so a mangled value fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use url::Url;

use crate::ConfigError;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Base URL used when no environment override is present.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8082";
/// Web URL used when no environment override is present.
pub const DEFAULT_WEB_URL: &str = "http://localhost:3001";
/// Model name used when no environment override is present.
pub const DEFAULT_MODEL: &str = "gpt-5-codex";

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys consulted by the target resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEnv {
    /// Primary base URL key.
    BaseUrl,
    /// Legacy base URL key.
    LegacyBaseUrl,
    /// Primary web URL key.
    WebUrl,
    /// Legacy web URL key used by browser test runners.
    LegacyWebUrl,
    /// Primary model key.
    Model,
    /// Legacy model key used by load scripts.
    LegacyModel,
    /// Primary headless key.
    Headless,
    /// Legacy headless key used by browser test runners.
    LegacyHeadless,
}

impl TargetEnv {
    /// Returns the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "PROBE_GATE_BASE_URL",
            Self::LegacyBaseUrl => "BASE_URL",
            Self::WebUrl => "PROBE_GATE_WEB_URL",
            Self::LegacyWebUrl => "PLAYWRIGHT_BASE_URL",
            Self::Model => "PROBE_GATE_MODEL",
            Self::LegacyModel => "K6_MODEL",
            Self::Headless => "PROBE_GATE_HEADLESS",
            Self::LegacyHeadless => "PLAYWRIGHT_HEADLESS",
        }
    }
}

// ============================================================================
// SECTION: Environment Sources
// ============================================================================

/// Read-only view of environment variables.
pub trait EnvSource {
    /// Returns the value of `name`, or `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value cannot be read as UTF-8.
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError>;
}

/// Process environment with strict UTF-8 validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
        std::env::var_os(name).map_or(Ok(None), |raw| {
            raw.into_string()
                .map(Some)
                .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
        })
    }
}

/// In-memory environment, used by tests and embedders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv(BTreeMap<String, String>);

impl MapEnv {
    /// Creates an empty environment.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the environment with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.0.get(name).cloned())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
    }
}

// ============================================================================
// SECTION: Target Config
// ============================================================================

/// Resolved service under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// API base URL.
    pub base_url: Url,
    /// Web front-end URL.
    pub web_url: Url,
    /// Model name sent in request bodies.
    pub model: String,
    /// Browser headless preference.
    ///
    /// Resolved and shown by `print`, but no check reads it: documents are
    /// judged from the HTTP response without launching a browser.
    pub headless: bool,
}

/// Explicit overrides applied on top of the resolved target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOverrides {
    /// Base URL override.
    pub base_url: Option<String>,
    /// Web URL override.
    pub web_url: Option<String>,
    /// Model override.
    pub model: Option<String>,
}

impl TargetConfig {
    /// Resolves the target from an environment source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a URL value is unusable or an
    /// environment value is not valid UTF-8.
    pub fn resolve(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let base_url = first_non_blank(env, &[TargetEnv::BaseUrl, TargetEnv::LegacyBaseUrl])?;
        let web_url = first_non_blank(env, &[TargetEnv::WebUrl, TargetEnv::LegacyWebUrl])?;
        let model = first_non_blank(env, &[TargetEnv::Model, TargetEnv::LegacyModel])?;
        let headless = first_non_blank(env, &[TargetEnv::Headless, TargetEnv::LegacyHeadless])?;
        let base_url = base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let web_url = web_url.as_deref().unwrap_or(DEFAULT_WEB_URL);
        Ok(Self {
            base_url: parse_target_url("base URL", base_url)?,
            web_url: parse_target_url("web URL", web_url)?,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            headless: headless.as_deref().is_none_or(parse_headless),
        })
    }

    /// Resolves the target with defaults only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a default URL fails to parse.
    pub fn local() -> Result<Self, ConfigError> {
        Self::resolve(&MapEnv::new())
    }

    /// Applies explicit overrides, validating any replaced URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override URL is unusable.
    pub fn with_overrides(mut self, overrides: &TargetOverrides) -> Result<Self, ConfigError> {
        if let Some(raw) = non_blank(overrides.base_url.as_deref()) {
            self.base_url = parse_target_url("base URL", raw)?;
        }
        if let Some(raw) = non_blank(overrides.web_url.as_deref()) {
            self.web_url = parse_target_url("web URL", raw)?;
        }
        if let Some(model) = non_blank(overrides.model.as_deref()) {
            self.model = model.to_string();
        }
        Ok(self)
    }

    /// Returns placeholder values for suite substitution.
    ///
    /// URLs are rendered without a trailing slash so `${base_url}/v1/models`
    /// joins cleanly.
    #[must_use]
    pub fn variables(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("base_url", self.base_url.as_str().trim_end_matches('/').to_string()),
            ("web_url", self.web_url.as_str().trim_end_matches('/').to_string()),
            ("model", self.model.clone()),
        ])
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the first non-blank value among `keys`, trimmed.
fn first_non_blank(
    env: &dyn EnvSource,
    keys: &[TargetEnv],
) -> Result<Option<String>, ConfigError> {
    for key in keys {
        if let Some(value) = env.var(key.as_str())? {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }
    Ok(None)
}

/// Filters out blank override values.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Only the literals `false` and `0` disable headless mode.
fn parse_headless(raw: &str) -> bool {
    !matches!(raw, "false" | "0")
}

/// Parses a target URL and requires an http(s) scheme with a host.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the URL does not parse or is not a
/// usable HTTP endpoint.
pub(crate) fn parse_target_url(label: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|err| {
        ConfigError::Invalid(format!("{label} '{raw}' is not a valid URL: {err}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!("{label} '{raw}' must use http or https")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::Invalid(format!("{label} '{raw}' must include a host")));
    }
    Ok(url)
}
