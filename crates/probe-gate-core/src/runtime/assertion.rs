// crates/probe-gate-core/src/runtime/assertion.rs
// ============================================================================
// Module: Assertion Engine
// Description: Check evaluation against response records.
// Purpose: Produce one check result per predicate and classify invocations.
// Dependencies: crate::{core, interfaces}, jsonpath_lib, scraper, serde_json
// ============================================================================

//! ## Overview
//! The assertion engine evaluates every predicate of a probe against one
//! [`ResponseRecord`]. A predicate error never aborts the run: it becomes a
//! failed [`CheckResult`] carrying the error. Sentinel records fail every check
//! with [`CheckError::NoResponse`] without invoking the predicate.
//!
//! Document visibility parses the body with `scraper` and looks for text or
//! self-rendering elements outside `script`, `style`, `noscript` and
//! `template`. Comments and raw script text never count.
//!
//! The implicit status check ([`invocation_failed`]) decides whether an
//! invocation counts against the error rate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use jsonpath_lib::select;
use scraper::ElementRef;
use scraper::Html;
use scraper::Selector;
use serde_json::Value;

use crate::core::Check;
use crate::core::CheckError;
use crate::core::CheckName;
use crate::core::CheckResult;
use crate::core::CheckRule;
use crate::core::FailureKind;
use crate::core::ProbeSpec;
use crate::core::ResponseRecord;
use crate::interfaces::Predicate;
use crate::runtime::comparator::evaluate_comparator;
use crate::runtime::comparator::is_truthy;

// ============================================================================
// SECTION: Built-in Checks
// ============================================================================

impl Predicate for Check {
    fn name(&self) -> &CheckName {
        &self.name
    }

    fn evaluate(&self, record: &ResponseRecord) -> Result<bool, CheckError> {
        match &self.rule {
            CheckRule::Status {
                equals,
            } => Ok(record.status == *equals),
            CheckRule::StatusIn {
                codes,
            } => Ok(codes.contains(&record.status)),
            CheckRule::HeaderContains {
                header,
                needle,
            } => Ok(record.header(header).is_some_and(|value| value.contains(needle.as_str()))),
            CheckRule::Json {
                path,
                comparator,
                expected,
            } => {
                let document = record.json()?;
                let selected = select_json(&document, path)?;
                evaluate_comparator(*comparator, expected.as_ref(), selected.as_ref(), path)
            }
            CheckRule::JsonAnyTruthy {
                paths,
            } => {
                let document = record.json()?;
                for path in paths {
                    if select_json(&document, path)?.is_some_and(|value| is_truthy(&value)) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            CheckRule::BodyContains {
                needle,
            } => Ok(record.body_text().contains(needle.as_str())),
            CheckRule::DocumentBodyVisible => Ok(document_body_visible(&record.body_text())),
            CheckRule::LatencyBelow {
                max_ms,
            } => Ok(record.elapsed.as_millis() < u128::from(*max_ms)),
        }
    }
}

/// Selects values using a `JSONPath` expression.
///
/// A single match is returned as-is; several matches are collected into an
/// array.
///
/// # Errors
///
/// Returns [`CheckError::InvalidSelector`] when the expression does not compile.
pub fn select_json(document: &Value, path: &str) -> Result<Option<Value>, CheckError> {
    let matches =
        select(document, path).map_err(|_| CheckError::InvalidSelector(path.to_string()))?;
    match matches.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some((*single).clone())),
        many => Ok(Some(Value::Array(many.iter().map(|value| (*value).clone()).collect()))),
    }
}

// ============================================================================
// SECTION: Document Visibility
// ============================================================================

/// Elements that render content without any text.
const VISIBLE_ELEMENTS: [&str; 8] =
    ["img", "svg", "canvas", "video", "iframe", "input", "button", "picture"];
/// Elements whose content never renders.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Returns true when an HTML document has a `<body>` with visible content.
fn document_body_visible(html: &str) -> bool {
    let Ok(selector) = Selector::parse("body") else {
        return false;
    };
    let document = Html::parse_document(html);
    document.select(&selector).next().is_some_and(renders_content)
}

/// Returns true when an element holds non-blank text or a self-rendering element.
fn renders_content(element: ElementRef<'_>) -> bool {
    element.children().any(|node| {
        if let Some(child) = ElementRef::wrap(node) {
            let name = child.value().name();
            if HIDDEN_ELEMENTS.contains(&name) {
                return false;
            }
            VISIBLE_ELEMENTS.contains(&name) || renders_content(child)
        } else {
            node.value().as_text().is_some_and(|text| !text.trim().is_empty())
        }
    })
}

// ============================================================================
// SECTION: Assertion Engine
// ============================================================================

/// Outcome of asserting one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// One result per predicate, in declaration order.
    pub results: Vec<CheckResult>,
    /// Whether the invocation counts as failed for the error rate.
    pub failed: bool,
    /// Classification of the invocation's problem, if any.
    pub failure_kind: Option<FailureKind>,
}

/// Evaluates predicates against response records.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertionEngine;

impl AssertionEngine {
    /// Evaluates every predicate against the record.
    ///
    /// Results are returned in predicate order and share the record's
    /// correlation identifier.
    #[must_use]
    pub fn evaluate<P: Predicate>(record: &ResponseRecord, predicates: &[P]) -> Vec<CheckResult> {
        predicates
            .iter()
            .map(|predicate| {
                let outcome = if record.is_transport_failure() {
                    Err(CheckError::NoResponse)
                } else {
                    predicate.evaluate(record)
                };
                let (passed, error) = match outcome {
                    Ok(passed) => (passed, None),
                    Err(err) => (false, Some(err)),
                };
                CheckResult {
                    correlation_id: record.correlation_id.clone(),
                    name: predicate.name().clone(),
                    passed,
                    error,
                }
            })
            .collect()
    }

    /// Evaluates checks and classifies the invocation.
    #[must_use]
    pub fn assess<P: Predicate>(
        probe: &ProbeSpec,
        record: &ResponseRecord,
        predicates: &[P],
    ) -> Assessment {
        let results = Self::evaluate(record, predicates);
        let failed = invocation_failed(probe, record);
        let failure_kind = classify(record, failed, &results);
        Assessment {
            results,
            failed,
            failure_kind,
        }
    }
}

/// Returns true when the invocation failed its implicit status check.
#[must_use]
pub fn invocation_failed(probe: &ProbeSpec, record: &ResponseRecord) -> bool {
    record.is_transport_failure() || !probe.expects(record.status)
}

/// Classifies an invocation for the failure breakdown.
///
/// `failed` is the outcome of [`invocation_failed`]. Body shape problems are
/// reported here but do not count against the error rate on their own.
#[must_use]
pub fn classify(
    record: &ResponseRecord,
    failed: bool,
    results: &[CheckResult],
) -> Option<FailureKind> {
    if let Some(error) = &record.error {
        return Some(FailureKind::from_probe_error(error));
    }
    if failed {
        return Some(FailureKind::UnexpectedStatus);
    }
    let body_shape = results.iter().any(|result| {
        matches!(
            result.error,
            Some(
                CheckError::BodyNotJson(_)
                    | CheckError::MissingField(_)
                    | CheckError::TypeMismatch(_)
            )
        )
    });
    body_shape.then_some(FailureKind::BodyShape)
}
