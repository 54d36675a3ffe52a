// crates/probe-gate-core/src/core/record.rs
// ============================================================================
// Module: Response Records
// Description: Per-invocation response records, check results, and error kinds.
// Purpose: Represent every probe outcome, including transport failures, as data.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every probe invocation produces exactly one [`ResponseRecord`]. Transport
//! failures do not surface as `Err`; they produce a sentinel record with
//! `status == 0` and a [`ProbeError`] describing what went wrong. Records are
//! consumed by the assertion engine and then reduced to compact samples.
//!
//! Invariants:
//! - `status == 0` if and only if `error.is_some()`.
//! - Header names are stored lower-cased.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::CheckName;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::ScenarioName;
use crate::core::identifiers::TagSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status code carried by sentinel records for failed invocations.
pub const SENTINEL_STATUS: u16 = 0;

// ============================================================================
// SECTION: Probe Errors
// ============================================================================

/// Per-invocation failure. Recorded, never fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeError {
    /// Target unreachable or connection dropped.
    #[error("connection error: {0}")]
    Connection(String),
    /// No response within the per-invocation deadline.
    #[error("timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline that elapsed, in milliseconds.
        timeout_ms: u64,
    },
    /// Response could not be read or exceeded the body size cap.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Request could not be built (for example, an unjoinable URL).
    #[error("request error: {0}")]
    Request(String),
    /// Invocation was still in flight when the run drained and was aborted.
    #[error("aborted at drain before completion")]
    Incomplete,
}

// ============================================================================
// SECTION: Response Record
// ============================================================================

/// Outcome of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Correlation identifier shared with the invocation's check results.
    pub correlation_id: CorrelationId,
    /// HTTP status code, or [`SENTINEL_STATUS`] on failure.
    pub status: u16,
    /// Response headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Time from request start to full body receipt (or failure).
    pub elapsed: Duration,
    /// Metric grouping tags copied from the probe.
    pub tags: TagSet,
    /// Failure description for sentinel records.
    pub error: Option<ProbeError>,
}

impl ResponseRecord {
    /// Builds a record for a completed HTTP exchange.
    #[must_use]
    pub fn completed(
        correlation_id: CorrelationId,
        status: u16,
        headers: impl IntoIterator<Item = (String, String)>,
        body: Vec<u8>,
        elapsed: Duration,
        tags: TagSet,
    ) -> Self {
        Self {
            correlation_id,
            status,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
            body,
            elapsed,
            tags,
            error: None,
        }
    }

    /// Builds a sentinel record for an invocation that produced no response.
    #[must_use]
    pub const fn failed(
        correlation_id: CorrelationId,
        error: ProbeError,
        elapsed: Duration,
        tags: TagSet,
    ) -> Self {
        Self {
            correlation_id,
            status: SENTINEL_STATUS,
            headers: BTreeMap::new(),
            body: Vec::new(),
            elapsed,
            tags,
            error: Some(error),
        }
    }

    /// Returns the scenario that produced the record.
    #[must_use]
    pub const fn scenario(&self) -> &ScenarioName {
        &self.correlation_id.scenario
    }

    /// Returns true when no HTTP response was obtained.
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Returns true when the invocation was aborted at drain.
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self.error, Some(ProbeError::Incomplete))
    }

    /// Looks up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::NoResponse`] for sentinel records and
    /// [`CheckError::BodyNotJson`] when the body is not valid JSON.
    pub fn json(&self) -> Result<Value, CheckError> {
        if self.is_transport_failure() {
            return Err(CheckError::NoResponse);
        }
        serde_json::from_slice(&self.body).map_err(|err| CheckError::BodyNotJson(err.to_string()))
    }

    /// Returns the elapsed time in fractional milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1_000.0
    }
}

// ============================================================================
// SECTION: Check Results
// ============================================================================

/// Reason a predicate could not be evaluated to a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CheckError {
    /// The invocation failed before a response arrived.
    #[error("no response")]
    NoResponse,
    /// The body was expected to be JSON but is not.
    #[error("body is not valid json: {0}")]
    BodyNotJson(String),
    /// A JSON selector could not be compiled.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    /// An expected field is absent.
    #[error("missing field: {0}")]
    MissingField(String),
    /// A field has the wrong type for the comparison.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// Outcome of one named predicate against one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Correlation identifier of the evaluated response.
    pub correlation_id: CorrelationId,
    /// Check name.
    pub name: CheckName,
    /// Whether the predicate held.
    pub passed: bool,
    /// Evaluation error, when the predicate failed to evaluate.
    pub error: Option<CheckError>,
}

// ============================================================================
// SECTION: Failure Classification
// ============================================================================

/// Classification of a failed invocation for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Target unreachable.
    Connection,
    /// No response within the deadline.
    Timeout,
    /// Response arrived with a status outside the expected set.
    UnexpectedStatus,
    /// Response body missing an expected field or not parseable.
    BodyShape,
    /// Aborted at drain.
    Incomplete,
}

impl FailureKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::UnexpectedStatus => "unexpected_status",
            Self::BodyShape => "body_shape",
            Self::Incomplete => "incomplete",
        }
    }

    /// Classifies a probe error.
    #[must_use]
    pub const fn from_probe_error(error: &ProbeError) -> Self {
        match error {
            ProbeError::Connection(_) | ProbeError::Request(_) => Self::Connection,
            ProbeError::Timeout {
                ..
            } => Self::Timeout,
            ProbeError::InvalidResponse(_) => Self::BodyShape,
            ProbeError::Incomplete => Self::Incomplete,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
