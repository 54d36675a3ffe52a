// crates/probe-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Probe Gate Runtime
// Description: Assertion engine, metrics sink, and threshold evaluator.
// Purpose: Judge individual responses and the run as a whole.
// Dependencies: crate::{core, interfaces}, jsonpath_lib
// ============================================================================

//! ## Overview
//! Runtime modules are synchronous and free of I/O. The execution driver
//! calls the assertion engine per response, appends to the metrics sink, and
//! hands the final snapshot to the threshold evaluator.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod assertion;
pub mod comparator;
pub mod evaluator;
pub mod metrics;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertion::Assessment;
pub use assertion::AssertionEngine;
pub use assertion::classify;
pub use assertion::invocation_failed;
pub use assertion::select_json;
pub use comparator::evaluate_comparator;
pub use comparator::is_truthy;
pub use evaluator::ThresholdEvaluator;
pub use evaluator::percentile;
pub use metrics::CheckCounts;
pub use metrics::CheckTally;
pub use metrics::DroppedTally;
pub use metrics::NoopSink;
pub use metrics::RunMetrics;
pub use metrics::RunRecorder;
pub use metrics::Sample;
pub use metrics::duration_ms;
pub use metrics::group_matches;
