// crates/probe-gate-core/src/core/probe.rs
// ============================================================================
// Module: Probe Definitions
// Description: Immutable description of a single HTTP interaction.
// Purpose: Capture method, path, headers, body, tags, timeout, and expected status.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ProbeSpec`] describes one HTTP interaction. It is built once at suite
//! start through consuming builder methods and then shared read-only (usually
//! behind an `Arc`) by every worker that invokes it.
//!
//! Invariants:
//! - `path` is either rooted (`/...`) or an absolute `http(s)://` URL.
//! - `timeout` is non-zero and `expected_status` is non-empty after
//!   [`ProbeSpec::validate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::TagSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-invocation timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Status code expected when a probe does not declare one.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

// ============================================================================
// SECTION: Method and Body
// ============================================================================

/// HTTP method issued by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// PATCH request.
    Patch,
    /// DELETE request.
    Delete,
    /// HEAD request.
    Head,
    /// OPTIONS request.
    Options,
}

impl HttpMethod {
    /// Returns the canonical method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload attached to a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeBody {
    /// JSON document, sent with `Content-Type: application/json`.
    Json(Value),
    /// Opaque text payload sent as-is.
    Text(String),
}

// ============================================================================
// SECTION: Probe Specification
// ============================================================================

/// One HTTP interaction plus the metadata used to group its metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSpec {
    /// HTTP method.
    method: HttpMethod,
    /// Rooted path joined onto the base URL, or an absolute URL.
    path: String,
    /// Request headers in name order.
    headers: BTreeMap<String, String>,
    /// Optional request body.
    body: Option<ProbeBody>,
    /// Metric grouping tags.
    tags: TagSet,
    /// Per-invocation deadline.
    timeout: Duration,
    /// Status codes that count as a successful invocation.
    expected_status: BTreeSet<u16>,
}

impl ProbeSpec {
    /// Creates a probe with default timeout and expected status `200`.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            tags: TagSet::new(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            expected_status: BTreeSet::from([DEFAULT_EXPECTED_STATUS]),
        }
    }

    /// Adds or replaces a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: ProbeBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a metric grouping tag.
    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name, value);
        self
    }

    /// Replaces all tags.
    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the per-invocation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the set of status codes that count as success.
    #[must_use]
    pub fn with_expected_status(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_status = codes.into_iter().collect();
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the path or absolute URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the request body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&ProbeBody> {
        self.body.as_ref()
    }

    /// Returns the metric grouping tags.
    #[must_use]
    pub const fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Returns the per-invocation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the expected status codes.
    #[must_use]
    pub const fn expected_status(&self) -> &BTreeSet<u16> {
        &self.expected_status
    }

    /// Returns true when `status` is one of the expected codes.
    #[must_use]
    pub fn expects(&self, status: u16) -> bool {
        self.expected_status.contains(&status)
    }

    /// Returns true when the path is an absolute URL that bypasses the base URL.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }

    /// Validates the probe for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidProbe`] when the path, timeout, expected
    /// status set, or a header name is invalid.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.path.trim().is_empty() {
            return Err(SpecError::InvalidProbe("path must not be empty".to_string()));
        }
        if !self.path.starts_with('/') && !self.is_absolute() {
            return Err(SpecError::InvalidProbe(format!(
                "path must start with '/' or be an absolute http(s) url: {}",
                self.path
            )));
        }
        if self.timeout.is_zero() {
            return Err(SpecError::InvalidProbe("timeout must be greater than zero".to_string()));
        }
        if self.expected_status.is_empty() {
            return Err(SpecError::InvalidProbe(
                "expected status set must not be empty".to_string(),
            ));
        }
        let invalid = self.expected_status.iter().find(|code| !(100 ..= 599).contains(*code));
        if let Some(code) = invalid {
            return Err(SpecError::InvalidProbe(format!("expected status {code} is not valid")));
        }
        for name in self.headers.keys() {
            if name.is_empty() || name.chars().any(|ch| ch.is_whitespace() || ch == ':') {
                return Err(SpecError::InvalidProbe(format!("invalid header name: '{name}'")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while validating probe and profile definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// Probe definition is invalid.
    #[error("invalid probe: {0}")]
    InvalidProbe(String),
    /// Load profile is invalid.
    #[error("invalid load profile: {0}")]
    InvalidProfile(String),
}
