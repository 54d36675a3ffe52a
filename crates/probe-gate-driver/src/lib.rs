// crates/probe-gate-driver/src/lib.rs
// ============================================================================
// Module: Probe Gate Driver Library
// Description: Network execution of validated suite plans.
// Purpose: Issue probes under load profiles and assemble suite reports.
// Dependencies: probe-gate-core, probe-gate-config, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! The driver owns everything that touches the network or the clock: the
//! [`ProbeTransport`] seam and its reqwest-backed [`HttpTransport`], the
//! [`ExecutionDriver`] that runs one scenario under its load profile, and the
//! [`SuiteRunner`] that runs every scenario of a suite concurrently and
//! judges the shared metrics. Per-invocation failures are recorded as data;
//! only infrastructure problems surface as [`DriverError`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod executor;
pub mod runner;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::DriverError;
pub use executor::ExecutionDriver;
pub use executor::ScenarioRun;
pub use runner::SuiteRunner;
pub use transport::DEFAULT_MAX_REDIRECTS;
pub use transport::DEFAULT_MAX_RESPONSE_BYTES;
pub use transport::HttpTransport;
pub use transport::HttpTransportConfig;
pub use transport::ProbeTransport;
pub use transport::request_url;
