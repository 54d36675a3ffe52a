// crates/probe-gate-driver/src/transport.rs
// ============================================================================
// Module: Probe Transport
// Description: Network seam that turns a probe into a response record.
// Purpose: Issue HTTP requests with bounded bodies and classified failures.
// Dependencies: async-trait, probe-gate-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! [`ProbeTransport`] is infallible by contract: every failure is folded into
//! a sentinel [`ResponseRecord`] so the executor records exactly one outcome
//! per invocation. [`HttpTransport`] shares one connection pool across all
//! workers, follows a bounded number of redirects, applies the probe's
//! timeout to the whole exchange, and caps response bodies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use probe_gate_core::CorrelationId;
use probe_gate_core::HttpMethod;
use probe_gate_core::ProbeBody;
use probe_gate_core::ProbeError;
use probe_gate_core::ProbeSpec;
use probe_gate_core::ResponseRecord;
use reqwest::Client;
use reqwest::Method;
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tokio::time::Instant;
use url::Url;

use crate::error::DriverError;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default cap on response body size.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
/// Default number of redirects followed.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

// ============================================================================
// SECTION: Transport Interface
// ============================================================================

/// Issues one probe and reports its outcome.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Invokes `probe` against `base_url`.
    ///
    /// Never fails: transport problems produce a sentinel record carrying a
    /// [`ProbeError`].
    async fn invoke(
        &self,
        base_url: &Url,
        probe: &ProbeSpec,
        correlation_id: CorrelationId,
    ) -> ResponseRecord;
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Maximum redirects followed before the response is rejected.
    pub max_redirects: usize,
    /// Maximum response body size in bytes.
    pub max_response_bytes: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("probe-gate/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

/// reqwest-backed transport with a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Pooled HTTP client.
    client: Client,
    /// Response body cap.
    max_response_bytes: usize,
}

impl HttpTransport {
    /// Builds a transport.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ClientBuild`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, DriverError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(config.max_redirects))
            .build()
            .map_err(|err| DriverError::ClientBuild(err.to_string()))?;
        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Sends the request and reads the bounded body.
    async fn exchange(
        &self,
        url: Url,
        probe: &ProbeSpec,
    ) -> Result<(u16, Vec<(String, String)>, Vec<u8>), ProbeError> {
        let timeout = probe.timeout();
        let mut request =
            self.client.request(reqwest_method(probe.method()), url).timeout(timeout);
        for (name, value) in probe.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        match probe.body() {
            Some(ProbeBody::Json(value)) => {
                let payload = serde_json::to_vec(value)
                    .map_err(|err| ProbeError::Request(format!("body serialization: {err}")))?;
                if !has_header(probe, CONTENT_TYPE.as_str()) {
                    request = request.header(CONTENT_TYPE, "application/json");
                }
                request = request.body(payload);
            }
            Some(ProbeBody::Text(text)) => request = request.body(text.clone()),
            None => {}
        }
        let response = request.send().await.map_err(|err| classify_error(&err, timeout))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let body = read_body_limited(response, self.max_response_bytes, timeout).await?;
        Ok((status, headers, body))
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn invoke(
        &self,
        base_url: &Url,
        probe: &ProbeSpec,
        correlation_id: CorrelationId,
    ) -> ResponseRecord {
        let started = Instant::now();
        let outcome = match request_url(base_url, probe) {
            Ok(url) => self.exchange(url, probe).await,
            Err(err) => Err(err),
        };
        let elapsed = started.elapsed();
        match outcome {
            Ok((status, headers, body)) => ResponseRecord::completed(
                correlation_id,
                status,
                headers,
                body,
                elapsed,
                probe.tags().clone(),
            ),
            Err(error) => {
                ResponseRecord::failed(correlation_id, error, elapsed, probe.tags().clone())
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the request URL for a probe.
///
/// Absolute probe paths are used as-is. Rooted paths are appended to the
/// base URL so a base path prefix (`http://host/api`) is preserved.
///
/// # Errors
///
/// Returns [`ProbeError::Request`] when the resulting URL does not parse.
pub fn request_url(base_url: &Url, probe: &ProbeSpec) -> Result<Url, ProbeError> {
    let raw = if probe.is_absolute() {
        probe.path().to_string()
    } else {
        format!("{}{}", base_url.as_str().trim_end_matches('/'), probe.path())
    };
    Url::parse(&raw).map_err(|err| ProbeError::Request(format!("invalid url '{raw}': {err}")))
}

/// Maps a probe method onto reqwest.
fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

/// Returns true when the probe declares a header (case-insensitive).
fn has_header(probe: &ProbeSpec, name: &str) -> bool {
    probe.headers().keys().any(|declared| declared.eq_ignore_ascii_case(name))
}

/// Classifies a reqwest error into a probe error.
fn classify_error(err: &reqwest::Error, timeout: Duration) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if err.is_builder() {
        ProbeError::Request(err.to_string())
    } else if err.is_redirect() || err.is_body() || err.is_decode() {
        ProbeError::InvalidResponse(err.to_string())
    } else {
        ProbeError::Connection(err.to_string())
    }
}

/// Reads the response body while enforcing a byte limit.
async fn read_body_limited(
    mut response: Response,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<u8>, ProbeError> {
    let too_large = || ProbeError::InvalidResponse(format!("response body exceeds {limit} bytes"));
    if let Some(expected) = response.content_length()
        && !usize::try_from(expected).is_ok_and(|expected| expected <= limit)
    {
        return Err(too_large());
    }
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|err| classify_error(&err, timeout))? {
        let next_total = body.len().checked_add(chunk.len()).ok_or_else(too_large)?;
        if next_total > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
