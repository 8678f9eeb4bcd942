use std::fmt;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// Timeout, connection refused, DNS failure, truncated body.
    Transport(String),
    /// 429 or 5xx. Retryable.
    Status(u16),
    /// 4xx other than 429. Never retried.
    Rejected(u16),
    /// 2xx with a body that is not JSON.
    Decode(String),
    /// The URL could not be built. Never retried.
    InvalidUrl(String),
}

impl FetchCause {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_) | Self::InvalidUrl(_))
    }
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status(429) => write!(f, "rate limited (HTTP 429)"),
            Self::Status(code) => write!(f, "upstream error (HTTP {code})"),
            Self::Rejected(code) => write!(f, "request rejected (HTTP {code})"),
            Self::Decode(msg) => write!(f, "invalid JSON body: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "invalid URL: {msg}"),
        }
    }
}

/// Terminal failure of a fetch: retries exhausted, or a non-retryable status.
#[derive(Debug, Clone)]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub last_cause: FetchCause,
}

impl FetchError {
    /// True when the request was rejected outright rather than retried to exhaustion.
    pub fn is_rejected(&self) -> bool {
        !self.last_cause.is_retryable()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_rejected() {
            write!(f, "GET {} failed: {}", self.url, self.last_cause)
        } else {
            write!(
                f,
                "GET {} failed after {} attempt(s): {}",
                self.url, self.attempts, self.last_cause
            )
        }
    }
}

impl std::error::Error for FetchError {}
