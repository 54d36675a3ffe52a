// crates/probe-gate-core/src/core/profile.rs
// ============================================================================
// Module: Load Profiles
// Description: Execution modes and load profiles for scenarios.
// Purpose: Describe how often and how concurrently a probe is invoked.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A scenario either runs under a [`LoadProfile`] for a bounded duration or
//! runs exactly once as an end-to-end assertion ([`Execution::Once`]). The
//! execution driver dispatches on these enums with `match`; profiles are never
//! mutated after suite start.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::core::probe::SpecError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default grace period granted to in-flight invocations after the deadline.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);
/// Upper bound on virtual users and arrival-rate workers per scenario.
pub const MAX_WORKERS: usize = 100_000;

// ============================================================================
// SECTION: Load Profile
// ============================================================================

/// Load profile governing concurrency over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum LoadProfile {
    /// Fixed number of looping workers for a fixed duration.
    ConstantVirtualUsers {
        /// Number of concurrent workers.
        count: usize,
        /// Wall-clock duration of the scenario.
        duration: Duration,
        /// Fixed delay between consecutive invocations of one worker.
        think_time: Duration,
    },
    /// Fixed invocation rate independent of response latency.
    ConstantArrivalRate {
        /// New invocations started per second.
        rate_per_second: f64,
        /// Wall-clock duration of the scenario.
        duration: Duration,
        /// Workers allocated before the first arrival.
        min_workers: usize,
        /// Upper bound on concurrent in-flight invocations.
        max_workers: usize,
    },
}

impl LoadProfile {
    /// Returns the wall-clock duration of the profile.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        match self {
            Self::ConstantVirtualUsers {
                duration, ..
            }
            | Self::ConstantArrivalRate {
                duration, ..
            } => *duration,
        }
    }

    /// Returns the maximum number of concurrent workers the profile may use.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        match self {
            Self::ConstantVirtualUsers {
                count, ..
            } => *count,
            Self::ConstantArrivalRate {
                max_workers, ..
            } => *max_workers,
        }
    }

    /// Returns the time between two arrivals for arrival-rate profiles.
    ///
    /// Returns `None` for virtual-user profiles and for rates whose interval
    /// is not representable as a non-zero duration.
    #[must_use]
    pub fn arrival_interval(&self) -> Option<Duration> {
        match self {
            Self::ConstantVirtualUsers {
                ..
            } => None,
            Self::ConstantArrivalRate {
                rate_per_second, ..
            } => Duration::try_from_secs_f64(1.0 / rate_per_second)
                .ok()
                .filter(|interval| !interval.is_zero()),
        }
    }

    /// Validates profile parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidProfile`] when counts, rates, or durations
    /// are out of range.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.duration().is_zero() {
            return Err(SpecError::InvalidProfile("duration must be greater than zero".to_string()));
        }
        match self {
            Self::ConstantVirtualUsers {
                count, ..
            } => {
                if *count == 0 {
                    return Err(SpecError::InvalidProfile("vus must be at least 1".to_string()));
                }
                if *count > MAX_WORKERS {
                    return Err(SpecError::InvalidProfile(format!(
                        "vus ({count}) exceeds the limit of {MAX_WORKERS}"
                    )));
                }
            }
            Self::ConstantArrivalRate {
                rate_per_second,
                min_workers,
                max_workers,
                ..
            } => {
                if !rate_per_second.is_finite() || *rate_per_second <= 0.0 {
                    return Err(SpecError::InvalidProfile(
                        "rate must be a positive number of arrivals per second".to_string(),
                    ));
                }
                if self.arrival_interval().is_none() {
                    return Err(SpecError::InvalidProfile(format!(
                        "rate {rate_per_second}/s is out of range"
                    )));
                }
                if *max_workers == 0 {
                    return Err(SpecError::InvalidProfile("max_vus must be at least 1".to_string()));
                }
                if *max_workers > MAX_WORKERS {
                    return Err(SpecError::InvalidProfile(format!(
                        "max_vus ({max_workers}) exceeds the limit of {MAX_WORKERS}"
                    )));
                }
                if min_workers > max_workers {
                    return Err(SpecError::InvalidProfile(format!(
                        "pre_allocated_vus ({min_workers}) exceeds max_vus ({max_workers})"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Execution Mode
// ============================================================================

/// How a scenario is executed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Execution {
    /// Run under a load profile, then drain.
    Load {
        /// Load profile to apply.
        profile: LoadProfile,
        /// Grace period for in-flight invocations after the deadline.
        graceful_stop: Duration,
    },
    /// Run one invocation whose checks are hard assertions.
    Once,
}

impl Execution {
    /// Creates a load execution with the default graceful stop.
    #[must_use]
    pub const fn load(profile: LoadProfile) -> Self {
        Self::Load {
            profile,
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        }
    }

    /// Returns the executor label shown in reports.
    #[must_use]
    pub const fn executor_label(&self) -> &'static str {
        match self {
            Self::Load {
                profile: LoadProfile::ConstantVirtualUsers {
                    ..
                },
                ..
            } => "constant-vus",
            Self::Load {
                profile: LoadProfile::ConstantArrivalRate {
                    ..
                },
                ..
            } => "constant-arrival-rate",
            Self::Once => "once",
        }
    }

    /// Validates the execution mode.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidProfile`] when the load profile is invalid.
    pub fn validate(&self) -> Result<(), SpecError> {
        match self {
            Self::Load {
                profile, ..
            } => profile.validate(),
            Self::Once => Ok(()),
        }
    }
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load {
                profile:
                    LoadProfile::ConstantVirtualUsers {
                        count,
                        duration,
                        ..
                    },
                ..
            } => write!(f, "constant-vus: {count} vus for {}s", duration.as_secs_f64()),
            Self::Load {
                profile:
                    LoadProfile::ConstantArrivalRate {
                        rate_per_second,
                        duration,
                        min_workers,
                        max_workers,
                    },
                ..
            } => write!(
                f,
                "constant-arrival-rate: {rate_per_second}/s for {}s ({min_workers}..={max_workers} \
                 workers)",
                duration.as_secs_f64()
            ),
            Self::Once => f.write_str("once"),
        }
    }
}
