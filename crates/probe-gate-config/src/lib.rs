// crates/probe-gate-config/src/lib.rs
// ============================================================================
// Module: Probe Gate Config Library
// Description: Target resolution, suite files, and built-in suites.
// Purpose: Turn environment and TOML input into validated suite plans.
// Dependencies: probe-gate-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `probe-gate-config` resolves the target under test from the environment
//! and turns suite definitions (TOML files or the built-in suites) into
//! validated [`SuitePlan`] values. Every error here is a configuration error
//! and is raised before any invocation is attempted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod builtin;
pub mod duration;
pub mod suite;
pub mod target;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use builtin::BuiltinSuite;
pub use builtin::builtin_suite;
pub use builtin::builtin_suite_names;
pub use builtin::builtin_suite_toml;
pub use builtin::builtin_suites;
pub use duration::parse_duration;
pub use suite::MAX_SUITE_FILE_SIZE;
pub use suite::ScenarioPlan;
pub use suite::SuitePlan;
pub use suite::load_suite_file;
pub use suite::parse_suite;
pub use target::DEFAULT_BASE_URL;
pub use target::DEFAULT_MODEL;
pub use target::DEFAULT_WEB_URL;
pub use target::EnvSource;
pub use target::MapEnv;
pub use target::ProcessEnv;
pub use target::TargetConfig;
pub use target::TargetEnv;
pub use target::TargetOverrides;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading a suite file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}
