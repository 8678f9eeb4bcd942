//! World Bank country listing (`/v2/country?format=json`), paged.

use serde_json::Value;

use insights_fetch::{FetchClient, PageCollector};

use super::{finish, number, text, MasterFetch, RowVerdict, SourceAdapter};
use crate::error::AdapterError;
use crate::model::{CountryCode, CountryRecord};

const SOURCE: &str = "world_bank";

pub struct WorldBankRegistry {
    client: FetchClient,
    base_url: String,
    page_size: u32,
}

impl WorldBankRegistry {
    pub fn new(client: FetchClient, base_url: impl Into<String>, page_size: u32) -> Self {
        Self { client, base_url: base_url.into(), page_size }
    }

    fn listing_url(&self) -> String {
        format!("{}/country?format=json", self.base_url.trim_end_matches('/'))
    }
}

impl SourceAdapter for WorldBankRegistry {
    fn name(&self) -> &str {
        SOURCE
    }

    fn fetch_master(&self) -> Result<MasterFetch, AdapterError> {
        let rows = PageCollector::new(&self.client)
            .collect_all(&self.listing_url(), self.page_size)
            .map_err(|error| AdapterError::Fetch { source: SOURCE.to_string(), error })?;

        if !rows.is_empty() && !rows.iter().any(Value::is_object) {
            return Err(AdapterError::Schema {
                source: SOURCE.to_string(),
                detail: format!("{} row(s), none of them objects", rows.len()),
            });
        }

        Ok(finish(SOURCE, rows.iter().map(map_row)))
    }
}

/// Regional and income-group rollups share the listing with real countries.
fn is_aggregate(row: &Value) -> bool {
    text(&row["region"]["value"]).as_deref() == Some("Aggregates")
        || text(&row["region"]["id"]).as_deref() == Some("NA")
}

fn map_row(row: &Value) -> RowVerdict {
    if is_aggregate(row) {
        return RowVerdict::Aggregate;
    }

    // `id` is the three-letter code on this endpoint; `iso2Code` is not.
    let code = text(&row["id"])
        .or_else(|| text(&row["countryiso3code"]))
        .and_then(|raw| CountryCode::parse(&raw));
    let Some(code) = code else {
        return RowVerdict::InvalidCode;
    };

    let mut record = CountryRecord::new(
        code,
        text(&row["name"]).unwrap_or_default(),
        text(&row["region"]["value"]).unwrap_or_default(),
    );
    record.income_level = text(&row["incomeLevel"]["value"]);
    record.capital = text(&row["capitalCity"]);
    record.latitude = number(&row["latitude"]);
    record.longitude = number(&row["longitude"]);

    RowVerdict::Country(record)
}
