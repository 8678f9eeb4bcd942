//! Page-numbered listing endpoints.
//!
//! Envelope shape (World Bank v2 style):
//!
//! ```json
//! [ { "page": 1, "pages": 3, "per_page": "50", "total": 130 }, [ row, row, ... ] ]
//! ```
//!
//! Collection stops when the reported page count is reached, when a page
//! without a page count comes back empty, or when a response is not the
//! two-part envelope at all. Providers return malformed tails (a lone error
//! object, a `null` row array), so that last case is end-of-data, not an error.

use serde_json::Value;
use url::Url;

use crate::client::FetchClient;
use crate::error::{FetchCause, FetchError};

pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// One parsed page.
#[derive(Debug, PartialEq)]
pub(crate) struct Envelope {
    pub pages: Option<u64>,
    pub rows: Vec<Value>,
}

/// Drives a page-numbered listing to completion through a [`FetchClient`].
pub struct PageCollector<'a> {
    client: &'a FetchClient,
}

impl<'a> PageCollector<'a> {
    pub fn new(client: &'a FetchClient) -> Self {
        Self { client }
    }

    /// Fetch every page of `base_url`, returning all rows in source order.
    ///
    /// `page` and `per_page` query parameters are set on `base_url`; any other
    /// parameters are passed through unchanged. A [`FetchError`] on any page
    /// aborts the whole collection.
    pub fn collect_all(&self, base_url: &str, page_size: u32) -> Result<Vec<Value>, FetchError> {
        let mut rows = Vec::new();
        let mut page = 1u64;

        loop {
            let url = page_url(base_url, page, page_size)?;
            let body = self.client.fetch(&url)?;

            let Some(envelope) = parse_envelope(body) else {
                log::debug!("page {page}: not a paged envelope, treating as end of data");
                break;
            };

            let count = envelope.rows.len();
            log::debug!(
                "page {}/{}: {} rows",
                page,
                envelope.pages.map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
                count,
            );
            rows.extend(envelope.rows);

            let done = match envelope.pages {
                Some(total) => page >= total,
                None => count == 0,
            };
            if done {
                break;
            }
            page += 1;
        }

        Ok(rows)
    }
}

/// Set `page` and `per_page` on `base`, replacing any existing values.
pub fn page_url(base: &str, page: u64, page_size: u32) -> Result<String, FetchError> {
    let mut url = Url::parse(base).map_err(|e| FetchError {
        url: base.to_string(),
        attempts: 0,
        last_cause: FetchCause::InvalidUrl(e.to_string()),
    })?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page" && k != "per_page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("page", &page.to_string());
        pairs.append_pair("per_page", &page_size.to_string());
    }

    Ok(url.into())
}

pub(crate) fn parse_envelope(body: Value) -> Option<Envelope> {
    let Value::Array(mut parts) = body else {
        return None;
    };
    if parts.len() < 2 || !parts[0].is_object() {
        return None;
    }
    let rows = match parts.swap_remove(1) {
        Value::Array(rows) => rows,
        _ => return None,
    };
    let pages = parts[0].get("pages").and_then(as_count);
    Some(Envelope { pages, rows })
}

/// Page counts arrive as numbers or numeric strings depending on endpoint.
fn as_count(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
