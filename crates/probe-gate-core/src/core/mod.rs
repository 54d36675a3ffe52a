// crates/probe-gate-core/src/core/mod.rs
// ============================================================================
// Module: Probe Gate Core Types
// Description: Probe, profile, record, check, threshold, and report types.
// Purpose: Provide the stable data model shared by config, driver, and CLI.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types describe what a suite probes, how it is loaded, what each
//! invocation produced, and how the run is judged. Definitions are immutable
//! once a suite starts; records are produced per invocation and reduced into
//! aggregate metrics.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod check;
pub mod identifiers;
pub mod probe;
pub mod profile;
pub mod record;
pub mod report;
pub mod threshold;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use check::Check;
pub use check::CheckRule;
pub use check::Comparator;
pub use identifiers::CheckName;
pub use identifiers::CorrelationId;
pub use identifiers::ScenarioName;
pub use identifiers::SuiteName;
pub use identifiers::TagSet;
pub use probe::DEFAULT_EXPECTED_STATUS;
pub use probe::DEFAULT_PROBE_TIMEOUT;
pub use probe::HttpMethod;
pub use probe::ProbeBody;
pub use probe::ProbeSpec;
pub use probe::SpecError;
pub use profile::DEFAULT_GRACEFUL_STOP;
pub use profile::Execution;
pub use profile::LoadProfile;
pub use profile::MAX_WORKERS;
pub use record::CheckError;
pub use record::CheckResult;
pub use record::FailureKind;
pub use record::ProbeError;
pub use record::ResponseRecord;
pub use record::SENTINEL_STATUS;
pub use report::AssertionFailure;
pub use report::CheckSummary;
pub use report::ScenarioSummary;
pub use report::SuiteReport;
pub use report::ThresholdOutcome;
pub use report::ThresholdReport;
pub use report::Verdict;
pub use threshold::Aggregation;
pub use threshold::MetricKind;
pub use threshold::MetricName;
pub use threshold::MetricSelector;
pub use threshold::ThresholdOp;
pub use threshold::ThresholdParseError;
pub use threshold::ThresholdSpec;
