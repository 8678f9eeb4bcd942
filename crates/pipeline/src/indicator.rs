//! World Bank indicator listings for all countries.

use serde_json::Value;

use insights_fetch::{FetchClient, PageCollector};

use crate::adapter::{number, text, year};
use crate::error::IndicatorFetchError;
use crate::model::{CountryCode, IndicatorObservation};

pub struct IndicatorSeriesFetcher {
    client: FetchClient,
    base_url: String,
    page_size: u32,
}

impl IndicatorSeriesFetcher {
    pub fn new(client: FetchClient, base_url: impl Into<String>, page_size: u32) -> Self {
        Self { client, base_url: base_url.into(), page_size }
    }

    pub fn series_url(&self, indicator_code: &str, (start, end): (i32, i32)) -> String {
        format!(
            "{}/country/all/indicator/{}?format=json&date={}:{}",
            self.base_url.trim_end_matches('/'),
            indicator_code,
            start,
            end,
        )
    }

    /// Every observation of `indicator_code` within the inclusive year range.
    pub fn fetch_series(
        &self,
        indicator_code: &str,
        years: (i32, i32),
    ) -> Result<Vec<IndicatorObservation>, IndicatorFetchError> {
        let url = self.series_url(indicator_code, years);
        let rows = PageCollector::new(&self.client)
            .collect_all(&url, self.page_size)
            .map_err(|error| IndicatorFetchError {
                indicator_code: indicator_code.to_string(),
                error,
            })?;

        let observations = normalize_rows(&rows);
        log::debug!(
            "{}: {} raw rows, {} with a country code",
            indicator_code,
            rows.len(),
            observations.len(),
        );
        Ok(observations)
    }
}

/// Map raw listing rows to observations. Rows without a valid code are
/// dropped; unparseable years and values become `None`.
pub fn normalize_rows(rows: &[Value]) -> Vec<IndicatorObservation> {
    rows.iter()
        .filter_map(|row| {
            let code = text(&row["countryiso3code"]).and_then(|raw| CountryCode::parse(&raw))?;
            Some(IndicatorObservation {
                code,
                year: year(&row["date"]),
                value: number(&row["value"]),
            })
        })
        .collect()
}
