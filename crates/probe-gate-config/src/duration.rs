// crates/probe-gate-config/src/duration.rs
// ============================================================================
// Module: Duration Parsing
// Description: Humane duration strings used by suite files.
// Purpose: Parse values such as "30s", "500ms", "2m", or "1m30s".
// Dependencies: std
// ============================================================================

//! ## Overview
//! A duration is one or more `<number><unit>` segments. Units are `ms`, `s`,
//! `m`, and `h`; numbers may carry a fractional part (`0.5s`). A bare `0` is
//! accepted as zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::ConfigError;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a humane duration string.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the string is empty, has an unknown
/// unit, or overflows.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let input = raw.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err(invalid(raw, "empty duration"));
    }
    let mut total_nanos: u128 = 0;
    let mut rest = input;
    while !rest.is_empty() {
        let number_len =
            rest.find(|ch: char| !(ch.is_ascii_digit() || ch == '.')).unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid(raw, "expected a number"));
        }
        let number = &rest[.. number_len];
        rest = &rest[number_len ..];
        let unit_len = rest.find(|ch: char| !ch.is_ascii_alphabetic()).unwrap_or(rest.len());
        let nanos_per_unit: u128 = match &rest[.. unit_len] {
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            "" => return Err(invalid(raw, "missing unit (ms, s, m, h)")),
            _ => return Err(invalid(raw, "unknown unit (expected ms, s, m, h)")),
        };
        rest = &rest[unit_len ..];
        let segment = segment_nanos(number, nanos_per_unit)
            .ok_or_else(|| invalid(raw, "malformed number"))?;
        total_nanos =
            total_nanos.checked_add(segment).ok_or_else(|| invalid(raw, "duration out of range"))?;
    }
    let nanos = u64::try_from(total_nanos).map_err(|_| invalid(raw, "duration out of range"))?;
    Ok(Duration::from_nanos(nanos))
}

/// Converts `<int>[.<frac>]` units into nanoseconds without floating point.
fn segment_nanos(number: &str, nanos_per_unit: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > 9 || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(nanos_per_unit)?;
    if !fraction.is_empty() {
        let digits: u128 = fraction.parse().ok()?;
        let scale = 10_u128.checked_pow(u32::try_from(fraction.len()).ok()?)?;
        nanos = nanos.checked_add(digits.checked_mul(nanos_per_unit)? / scale)?;
    }
    Some(nanos)
}

/// Builds an invalid-duration error.
fn invalid(raw: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid(format!("invalid duration '{raw}': {reason}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
