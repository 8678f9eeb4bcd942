//! `FetchClient`: GET a JSON document with bounded retry and backoff.
//!
//! Classification of each attempt:
//! - 2xx with a JSON body: done
//! - 429, 5xx, transport failure, undecodable 2xx body: retry after
//!   `min(cap, 2^attempt)` seconds (429 honors a numeric `Retry-After`)
//! - anything else (4xx, stray 1xx/3xx): fail immediately
//!
//! Retry state lives on the stack of a single [`FetchClient::fetch`] call.
//! Two concurrent fetches through the same client never share a counter.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::{FetchCause, FetchError};

// ── Constants ───────────────────────────────────────────────────────

pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = concat!("country-insights/", env!("CARGO_PKG_VERSION"));

// ── Retry policy ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub backoff_cap_secs: u64,
    /// Per-request timeout handed to the HTTP client.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_cap_secs: DEFAULT_BACKOFF_CAP_SECS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (1-based).
    pub fn backoff_secs(&self, attempt: u32) -> u64 {
        2u64.saturating_pow(attempt).min(self.backoff_cap_secs)
    }
}

// ── Transport seam ──────────────────────────────────────────────────

/// What the retry loop needs to know about one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, retry_after_secs: None, body: body.into() }
    }

    pub fn status(status: u16) -> Self {
        Self { status, retry_after_secs: None, body: String::new() }
    }
}

/// One GET, no retries. `Err` carries a transport-level failure message.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<RawResponse, String>;
}

/// Blocking reqwest transport used outside of tests.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");
        Self { http }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<RawResponse, String> {
        let resp = self.http.get(url).send().map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let retry_after_secs = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = resp.text().map_err(|e| format!("failed to read body: {e}"))?;
        Ok(RawResponse { status, retry_after_secs, body })
    }
}

/// Blocking pause between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles retry, backoff, and error classification.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            transport: Arc::new(HttpTransport::new(policy.timeout)),
            sleeper: Arc::new(ThreadSleeper),
            policy,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and parse the body as JSON, retrying per the policy.
    pub fn fetch(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let (cause, retry_after) = match self.transport.get(url) {
                Ok(resp) => match classify(&resp) {
                    Ok(body) => return Ok(body),
                    Err(cause) => (cause, resp.retry_after_secs),
                },
                Err(msg) => (FetchCause::Transport(msg), None),
            };

            if !cause.is_retryable() || attempt >= max_attempts {
                return Err(FetchError {
                    url: url.to_string(),
                    attempts: attempt,
                    last_cause: cause,
                });
            }

            let wait = match (&cause, retry_after) {
                (FetchCause::Status(429), Some(secs)) => secs.min(self.policy.backoff_cap_secs),
                _ => self.policy.backoff_secs(attempt),
            };

            log::warn!(
                "retry {}/{} in {}s ({}): {}",
                attempt,
                max_attempts - 1,
                wait,
                cause,
                url,
            );
            self.sleeper.sleep(Duration::from_secs(wait));
        }
    }
}

fn classify(resp: &RawResponse) -> Result<serde_json::Value, FetchCause> {
    match resp.status {
        200..=299 => {
            // Some providers prefix JSON with a BOM
            let trimmed = resp.body.trim_start_matches('\u{feff}');
            serde_json::from_str(trimmed).map_err(|e| {
                FetchCause::Decode(format!(
                    "{} (body: {})",
                    e,
                    &trimmed[..floor_char_boundary(trimmed, 200)],
                ))
            })
        }
        429 | 500..=599 => Err(FetchCause::Status(resp.status)),
        other => Err(FetchCause::Rejected(other)),
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

// ── Tests ───────────────────────────────────────────────────────────
