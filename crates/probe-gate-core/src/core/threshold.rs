// crates/probe-gate-core/src/core/threshold.rs
// ============================================================================
// Module: Threshold Specifications
// Description: Metric selectors, aggregations, and threshold conditions.
// Purpose: Parse declared service-level objectives into typed specifications.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A threshold is declared as a metric selector plus a condition, using the
//! load-tool vocabulary:
//!
//! ```text
//! http_req_duration{ep:models}   p(95)<1200
//! http_req_failed                rate<0.01
//! checks                         rate>0.99
//! ```
//!
//! [`ThresholdSpec::parse`] turns that pair into a typed specification. Parse
//! errors are configuration errors and are raised before any invocation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

use crate::core::identifiers::TagSet;

// ============================================================================
// SECTION: Metric Names
// ============================================================================

/// Shape of the values a metric produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Distribution of durations in milliseconds.
    Trend,
    /// Fraction of positive outcomes.
    Rate,
    /// Monotonic count.
    Counter,
}

/// Built-in metric emitted by the execution driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricName {
    /// Completed invocation latency in milliseconds.
    HttpReqDuration,
    /// Fraction of completed invocations that failed.
    HttpReqFailed,
    /// Fraction of checks that passed.
    Checks,
    /// Number of started invocations.
    Iterations,
    /// Number of arrivals dropped for lack of capacity.
    DroppedIterations,
}

impl MetricName {
    /// Returns the metric name as written in suite files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpReqDuration => "http_req_duration",
            Self::HttpReqFailed => "http_req_failed",
            Self::Checks => "checks",
            Self::Iterations => "iterations",
            Self::DroppedIterations => "dropped_iterations",
        }
    }

    /// Returns the metric kind.
    #[must_use]
    pub const fn kind(self) -> MetricKind {
        match self {
            Self::HttpReqDuration => MetricKind::Trend,
            Self::HttpReqFailed | Self::Checks => MetricKind::Rate,
            Self::Iterations | Self::DroppedIterations => MetricKind::Counter,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = ThresholdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "http_req_duration" => Ok(Self::HttpReqDuration),
            "http_req_failed" => Ok(Self::HttpReqFailed),
            "checks" => Ok(Self::Checks),
            "iterations" => Ok(Self::Iterations),
            "dropped_iterations" => Ok(Self::DroppedIterations),
            other => Err(ThresholdParseError::UnknownMetric(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Metric Selector
// ============================================================================

/// Metric plus an optional tag filter, e.g. `http_req_duration{ep:models}`.
///
/// The pseudo tag `scenario` matches the scenario name of each sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelector {
    /// Selected metric.
    pub metric: MetricName,
    /// Tags every sample in the group must carry.
    pub tags: TagSet,
}

impl MetricSelector {
    /// Creates a selector without a tag filter.
    #[must_use]
    pub const fn new(metric: MetricName) -> Self {
        Self {
            metric,
            tags: TagSet::new(),
        }
    }

    /// Adds a tag filter.
    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name, value);
        self
    }

    /// Parses `name` or `name{key:value,...}`.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdParseError`] for unknown metrics or malformed tag
    /// filters.
    pub fn parse(input: &str) -> Result<Self, ThresholdParseError> {
        let input = input.trim();
        let Some(open) = input.find('{') else {
            return Ok(Self::new(input.parse()?));
        };
        let metric: MetricName = input[.. open].trim().parse()?;
        let Some(inner) = input[open + 1 ..].strip_suffix('}') else {
            return Err(ThresholdParseError::InvalidSelector(input.to_string()));
        };
        let mut selector = Self::new(metric);
        for pair in inner.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
            let Some((name, value)) = pair.split_once(':') else {
                return Err(ThresholdParseError::InvalidSelector(input.to_string()));
            };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                return Err(ThresholdParseError::InvalidSelector(input.to_string()));
            }
            selector.tags.insert(name, value);
        }
        Ok(selector)
    }
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.metric, self.tags)
    }
}

// ============================================================================
// SECTION: Aggregations and Operators
// ============================================================================

/// Aggregation applied to the selected samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    /// Nearest-rank percentile, `0 < p <= 100`.
    Percentile(f64),
    /// Arithmetic mean.
    Avg,
    /// Smallest sample.
    Min,
    /// Largest sample.
    Max,
    /// Median, equal to `Percentile(50)`.
    Med,
    /// Fraction for rate metrics.
    Rate,
    /// Total for counter metrics.
    Count,
}

impl Aggregation {
    /// Returns true when the aggregation applies to metrics of `kind`.
    #[must_use]
    pub const fn supports(self, kind: MetricKind) -> bool {
        match self {
            Self::Percentile(_) | Self::Avg | Self::Min | Self::Max | Self::Med => {
                matches!(kind, MetricKind::Trend)
            }
            Self::Rate => matches!(kind, MetricKind::Rate),
            Self::Count => matches!(kind, MetricKind::Counter),
        }
    }

    /// Parses an aggregation token such as `p(95)`, `avg`, or `rate`.
    fn parse(token: &str) -> Result<Self, ThresholdParseError> {
        match token {
            "avg" => return Ok(Self::Avg),
            "min" => return Ok(Self::Min),
            "max" => return Ok(Self::Max),
            "med" => return Ok(Self::Med),
            "rate" => return Ok(Self::Rate),
            "count" => return Ok(Self::Count),
            _ => {}
        }
        let Some(raw) = token.strip_prefix("p(").and_then(|rest| rest.strip_suffix(')')) else {
            return Err(ThresholdParseError::UnknownAggregation(token.to_string()));
        };
        let percentile: f64 = raw
            .trim()
            .parse()
            .map_err(|_| ThresholdParseError::UnknownAggregation(token.to_string()))?;
        if !percentile.is_finite() || percentile <= 0.0 || percentile > 100.0 {
            return Err(ThresholdParseError::PercentileOutOfRange(token.to_string()));
        }
        Ok(Self::Percentile(percentile))
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percentile(p) => write!(f, "p({p})"),
            Self::Avg => f.write_str("avg"),
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::Med => f.write_str("med"),
            Self::Rate => f.write_str("rate"),
            Self::Count => f.write_str("count"),
        }
    }
}

/// Comparison operator of a threshold condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdOp {
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

impl ThresholdOp {
    /// Operators ordered so two-character tokens are matched first.
    const TOKENS: [(&'static str, Self); 6] = [
        ("<=", Self::LessThanOrEqual),
        (">=", Self::GreaterThanOrEqual),
        ("==", Self::Equal),
        ("!=", Self::NotEqual),
        ("<", Self::LessThan),
        (">", Self::GreaterThan),
    ];

    /// Returns the operator token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    /// Applies the operator to `observed op bound`.
    #[must_use]
    pub fn holds(self, observed: f64, bound: f64) -> bool {
        match self {
            Self::LessThan => observed < bound,
            Self::LessThanOrEqual => observed <= bound,
            Self::GreaterThan => observed > bound,
            Self::GreaterThanOrEqual => observed >= bound,
            Self::Equal => (observed - bound).abs() < f64::EPSILON,
            Self::NotEqual => (observed - bound).abs() >= f64::EPSILON,
        }
    }
}

impl fmt::Display for ThresholdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Threshold Specification
// ============================================================================

/// Declared pass/fail bound on an aggregate metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSpec {
    /// Metric and tag filter.
    pub selector: MetricSelector,
    /// Aggregation applied to the selected samples.
    pub aggregation: Aggregation,
    /// Comparison operator.
    pub op: ThresholdOp,
    /// Bound compared against the observed value.
    pub bound: f64,
}

impl ThresholdSpec {
    /// Parses a selector/condition pair such as
    /// `("http_req_duration{ep:models}", "p(95)<1200")`.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdParseError`] when either side is malformed or the
    /// aggregation does not apply to the metric.
    pub fn parse(selector: &str, condition: &str) -> Result<Self, ThresholdParseError> {
        let selector = MetricSelector::parse(selector)?;
        let condition = condition.trim();
        let Some((position, token, op)) = ThresholdOp::TOKENS
            .iter()
            .filter_map(|(token, op)| condition.find(token).map(|pos| (pos, *token, *op)))
            .min_by_key(|(pos, token, _)| (*pos, Reverse(token.len())))
        else {
            return Err(ThresholdParseError::MissingOperator(condition.to_string()));
        };
        let aggregation = Aggregation::parse(condition[.. position].trim())?;
        let raw_bound = condition[position + token.len() ..].trim();
        let bound: f64 = raw_bound
            .parse()
            .map_err(|_| ThresholdParseError::InvalidBound(raw_bound.to_string()))?;
        if !bound.is_finite() {
            return Err(ThresholdParseError::InvalidBound(raw_bound.to_string()));
        }
        if !aggregation.supports(selector.metric.kind()) {
            return Err(ThresholdParseError::IncompatibleAggregation {
                metric: selector.metric.to_string(),
                aggregation: aggregation.to_string(),
            });
        }
        Ok(Self {
            selector,
            aggregation,
            op,
            bound,
        })
    }

    /// Renders the condition part, e.g. `p(95)<1200`.
    #[must_use]
    pub fn condition(&self) -> String {
        format!("{}{}{}", self.aggregation, self.op, self.bound)
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.selector, self.condition())
    }
}

impl Serialize for ThresholdSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Threshold declaration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdParseError {
    /// Metric name is not a built-in metric.
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    /// Tag filter is malformed.
    #[error("invalid metric selector: {0}")]
    InvalidSelector(String),
    /// Aggregation token is not recognized.
    #[error("unknown aggregation: {0}")]
    UnknownAggregation(String),
    /// Percentile outside `(0, 100]`.
    #[error("percentile out of range: {0}")]
    PercentileOutOfRange(String),
    /// Condition lacks a comparison operator.
    #[error("missing comparison operator in condition: {0}")]
    MissingOperator(String),
    /// Bound is not a finite number.
    #[error("invalid threshold bound: {0}")]
    InvalidBound(String),
    /// Aggregation does not apply to the metric kind.
    #[error("aggregation {aggregation} does not apply to metric {metric}")]
    IncompatibleAggregation {
        /// Metric name.
        metric: String,
        /// Aggregation token.
        aggregation: String,
    },
}
