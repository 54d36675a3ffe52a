// crates/probe-gate-core/src/lib.rs
// ============================================================================
// Module: Probe Gate Core Library
// Description: Public API surface for the Probe Gate core.
// Purpose: Expose probe types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Probe Gate core defines HTTP probes, load profiles, response records, and
//! the synchronous logic that judges them: the assertion engine, the
//! append-only metrics sink, and the threshold evaluator. It performs no I/O;
//! network execution lives in the driver crate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::MetricsSink;
pub use interfaces::Predicate;
pub use runtime::Assessment;
pub use runtime::AssertionEngine;
pub use runtime::NoopSink;
pub use runtime::RunMetrics;
pub use runtime::RunRecorder;
pub use runtime::Sample;
pub use runtime::ThresholdEvaluator;
pub use runtime::invocation_failed;
pub use runtime::percentile;
