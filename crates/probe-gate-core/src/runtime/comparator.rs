// crates/probe-gate-core/src/runtime/comparator.rs
// ============================================================================
// Module: Comparator Logic
// Description: Comparator evaluation for JSON selections.
// Purpose: Convert selected response values into check outcomes.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Comparators turn a value selected from a response body into a boolean.
//! Presence comparators (`exists`, `not_exists`) accept a missing selection;
//! every other comparator reports a missing selection as
//! [`CheckError::MissingField`] and an operand of the wrong shape as
//! [`CheckError::TypeMismatch`]. Both count as failed checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde_json::Value;

use crate::core::CheckError;
use crate::core::Comparator;

// ============================================================================
// SECTION: Comparator Evaluation
// ============================================================================

/// Evaluates a comparator against a selected value.
///
/// # Errors
///
/// Returns [`CheckError`] when the selection is missing or the operands have
/// incompatible types.
pub fn evaluate_comparator(
    comparator: Comparator,
    expected: Option<&Value>,
    selected: Option<&Value>,
    path: &str,
) -> Result<bool, CheckError> {
    match comparator {
        Comparator::Exists => return Ok(selected.is_some()),
        Comparator::NotExists => return Ok(selected.is_none()),
        _ => {}
    }
    let Some(value) = selected else {
        return Err(CheckError::MissingField(path.to_string()));
    };
    match comparator {
        Comparator::IsArray => return Ok(value.is_array()),
        Comparator::IsObject => return Ok(value.is_object()),
        Comparator::Truthy => return Ok(is_truthy(value)),
        _ => {}
    }
    let Some(expected) = expected else {
        return Err(CheckError::TypeMismatch(format!(
            "{path}: comparator requires an expected value"
        )));
    };
    match comparator {
        Comparator::Equals => Ok(json_equals(value, expected)),
        Comparator::NotEquals => Ok(!json_equals(value, expected)),
        Comparator::GreaterThan
        | Comparator::GreaterThanOrEqual
        | Comparator::LessThan
        | Comparator::LessThanOrEqual => compare_ordering(comparator, value, expected, path),
        Comparator::Contains => compare_contains(value, expected, path),
        Comparator::InSet => compare_in_set(value, expected, path),
        Comparator::Exists
        | Comparator::NotExists
        | Comparator::IsArray
        | Comparator::IsObject
        | Comparator::Truthy => Ok(false),
    }
}

/// Returns true for values other than null, false, zero, and the empty string.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Compares JSON values for equality, treating `1` and `1.0` as equal.
fn json_equals(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) if left.is_finite() && right.is_finite() => {
            left.partial_cmp(&right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

/// Compares numeric JSON values using ordering comparators.
fn compare_ordering(
    comparator: Comparator,
    left: &Value,
    right: &Value,
    path: &str,
) -> Result<bool, CheckError> {
    let (Some(left), Some(right)) = (left.as_f64(), right.as_f64()) else {
        return Err(CheckError::TypeMismatch(format!("{path}: ordering requires numbers")));
    };
    let Some(ordering) = left.partial_cmp(&right) else {
        return Err(CheckError::TypeMismatch(format!("{path}: numbers are not comparable")));
    };
    Ok(match comparator {
        Comparator::GreaterThan => ordering.is_gt(),
        Comparator::GreaterThanOrEqual => ordering.is_ge(),
        Comparator::LessThan => ordering.is_lt(),
        Comparator::LessThanOrEqual => ordering.is_le(),
        _ => false,
    })
}

/// Evaluates containment semantics for JSON values.
fn compare_contains(left: &Value, right: &Value, path: &str) -> Result<bool, CheckError> {
    match (left, right) {
        (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Array(haystack), Value::Array(needle)) => {
            Ok(needle.iter().all(|item| haystack.iter().any(|value| json_equals(value, item))))
        }
        (Value::Array(haystack), needle) => {
            Ok(haystack.iter().any(|value| json_equals(value, needle)))
        }
        _ => Err(CheckError::TypeMismatch(format!("{path}: contains requires a string or array"))),
    }
}

/// Evaluates set membership for JSON values.
fn compare_in_set(value: &Value, expected: &Value, path: &str) -> Result<bool, CheckError> {
    let Value::Array(values) = expected else {
        return Err(CheckError::TypeMismatch(format!("{path}: in_set requires an array operand")));
    };
    match value {
        Value::Array(_) | Value::Object(_) => {
            Err(CheckError::TypeMismatch(format!("{path}: in_set requires a scalar value")))
        }
        _ => Ok(values.iter().any(|candidate| json_equals(value, candidate))),
    }
}
