// crates/probe-gate-driver/tests/common/mod.rs
// ============================================================================
// Module: Driver Test Support
// Description: Scripted transport and plan builders shared by driver tests.
// Purpose: Drive executors deterministically under a paused tokio clock.
// Dependencies: probe-gate-config, probe-gate-core, probe-gate-driver, tokio
// ============================================================================

//! ## Overview
//! [`ScriptedTransport`] answers every probe after a fixed latency with a
//! fixed status and body. It records when each invocation was issued and the
//! peak number of invocations in flight so scheduling properties can be
//! asserted without a network.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers.")]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use probe_gate_config::ScenarioPlan;
use probe_gate_core::Check;
use probe_gate_core::CorrelationId;
use probe_gate_core::Execution;
use probe_gate_core::HttpMethod;
use probe_gate_core::ProbeError;
use probe_gate_core::ProbeSpec;
use probe_gate_core::ResponseRecord;
use probe_gate_core::ScenarioName;
use probe_gate_driver::ProbeTransport;
use tokio::time::Instant;
use url::Url;

// ============================================================================
// SECTION: Scripted Transport
// ============================================================================

/// Fixed-latency transport that never touches the network.
pub struct ScriptedTransport {
    /// Time each invocation takes.
    latency: Duration,
    /// Status returned by every invocation; `None` returns a connection error.
    status: Option<u16>,
    /// Body returned by every invocation.
    body: Vec<u8>,
    /// Issue instants in call order.
    issued: Mutex<Vec<Instant>>,
    /// Invocations currently in flight.
    in_flight: AtomicUsize,
    /// Largest number of concurrent invocations seen.
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn responding(status: u16, latency: Duration) -> Self {
        Self {
            latency,
            status: Some(status),
            body: Vec::new(),
            issued: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn refusing(latency: Duration) -> Self {
        Self {
            status: None,
            ..Self::responding(0, latency)
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    pub fn issued(&self) -> Vec<Instant> {
        self.issued.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the invocation is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn invoke(
        &self,
        _base_url: &Url,
        probe: &ProbeSpec,
        correlation_id: CorrelationId,
    ) -> ResponseRecord {
        self.issued.lock().unwrap().push(Instant::now());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        tokio::time::sleep(self.latency).await;
        match self.status {
            Some(status) => ResponseRecord::completed(
                correlation_id,
                status,
                vec![("Content-Type".to_string(), "application/json".to_string())],
                self.body.clone(),
                self.latency,
                probe.tags().clone(),
            ),
            None => ResponseRecord::failed(
                correlation_id,
                ProbeError::Connection("connection refused".to_string()),
                self.latency,
                probe.tags().clone(),
            ),
        }
    }
}

// ============================================================================
// SECTION: Plan Builders
// ============================================================================

pub fn base_url() -> Url {
    Url::parse("http://127.0.0.1:8082").unwrap()
}

pub fn scenario(name: &str, execution: Execution, checks: Vec<Check>) -> ScenarioPlan {
    ScenarioPlan {
        name: ScenarioName::new(name),
        base_url: base_url(),
        probe: Arc::new(ProbeSpec::new(HttpMethod::Get, "/v1/models").with_tag("scenario", name)),
        checks,
        execution,
    }
}
