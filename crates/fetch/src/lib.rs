//! `insights-fetch`: resilient GET + page collection for remote providers.
//!
//! No knowledge of any provider's row schema; callers map rows themselves.

pub mod client;
pub mod error;
pub mod pager;

pub use client::{FetchClient, RawResponse, RetryPolicy, Sleeper, ThreadSleeper, Transport};
pub use error::{FetchCause, FetchError};
pub use pager::PageCollector;
