// crates/probe-gate-core/src/core/check.rs
// ============================================================================
// Module: Check Definitions
// Description: Declarative response checks and JSON comparators.
// Purpose: Describe named predicates attached to a probe.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Check`] pairs a display name (for example `status 200`) with a
//! [`CheckRule`]. Checks are plain data so suite files can declare them; the
//! runtime assertion engine evaluates them through the
//! [`crate::interfaces::Predicate`] interface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CheckName;

// ============================================================================
// SECTION: Comparators
// ============================================================================

/// Comparator applied to a JSON value selected from a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Value equality.
    Equals,
    /// Value inequality.
    NotEquals,
    /// Numeric greater-than.
    GreaterThan,
    /// Numeric greater-than-or-equal.
    GreaterThanOrEqual,
    /// Numeric less-than.
    LessThan,
    /// Numeric less-than-or-equal.
    LessThanOrEqual,
    /// String or array containment.
    Contains,
    /// Membership in an expected array.
    InSet,
    /// Selected value is present.
    Exists,
    /// Selected value is absent.
    NotExists,
    /// Selected value is an array.
    IsArray,
    /// Selected value is an object.
    IsObject,
    /// Selected value is not null, false, zero, or the empty string.
    Truthy,
}

impl Comparator {
    /// Returns true when the comparator needs an expected operand.
    #[must_use]
    pub const fn requires_expected(self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::NotEquals
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
                | Self::LessThan
                | Self::LessThanOrEqual
                | Self::Contains
                | Self::InSet
        )
    }
}

// ============================================================================
// SECTION: Check Rules
// ============================================================================

/// Rule evaluated against one response record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CheckRule {
    /// Status code equals a value.
    Status {
        /// Expected status code.
        equals: u16,
    },
    /// Status code is one of a set.
    StatusIn {
        /// Accepted status codes.
        codes: Vec<u16>,
    },
    /// Header value contains a substring. A missing header fails the check.
    HeaderContains {
        /// Header name (case-insensitive).
        header: String,
        /// Substring to look for.
        needle: String,
    },
    /// `JSONPath` selection followed by a comparator.
    Json {
        /// `JSONPath` expression (for example `$.data`).
        path: String,
        /// Comparator applied to the selection.
        comparator: Comparator,
        /// Expected operand, for comparators that take one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected: Option<Value>,
    },
    /// Any of several selections is truthy.
    JsonAnyTruthy {
        /// `JSONPath` expressions tried in order.
        paths: Vec<String>,
    },
    /// Body text contains a substring.
    BodyContains {
        /// Substring to look for.
        needle: String,
    },
    /// Body is an HTML document whose `<body>` has visible text.
    DocumentBodyVisible,
    /// Invocation completed within a latency bound.
    LatencyBelow {
        /// Exclusive upper bound in milliseconds.
        max_ms: u64,
    },
}

// ============================================================================
// SECTION: Check
// ============================================================================

/// Named check attached to a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Name shown in reports.
    pub name: CheckName,
    /// Rule to evaluate.
    #[serde(flatten)]
    pub rule: CheckRule,
}

impl Check {
    /// Creates a named check.
    #[must_use]
    pub fn new(name: impl Into<CheckName>, rule: CheckRule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }

    /// Status equality check.
    #[must_use]
    pub fn status(name: impl Into<CheckName>, equals: u16) -> Self {
        Self::new(
            name,
            CheckRule::Status {
                equals,
            },
        )
    }

    /// `JSONPath` comparator check.
    #[must_use]
    pub fn json(
        name: impl Into<CheckName>,
        path: impl Into<String>,
        comparator: Comparator,
        expected: Option<Value>,
    ) -> Self {
        Self::new(
            name,
            CheckRule::Json {
                path: path.into(),
                comparator,
                expected,
            },
        )
    }
}
