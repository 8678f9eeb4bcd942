//! REST Countries bulk endpoint: one unpaged JSON array of every country.

use serde_json::Value;

use insights_fetch::FetchClient;

use super::{finish, number, text, MasterFetch, RowVerdict, SourceAdapter};
use crate::error::AdapterError;
use crate::model::{CountryCode, CountryRecord};

const SOURCE: &str = "rest_countries";

pub struct RestCountriesRegistry {
    client: FetchClient,
    url: String,
}

impl RestCountriesRegistry {
    pub fn new(client: FetchClient, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

impl SourceAdapter for RestCountriesRegistry {
    fn name(&self) -> &str {
        SOURCE
    }

    fn fetch_master(&self) -> Result<MasterFetch, AdapterError> {
        let body = self
            .client
            .fetch(&self.url)
            .map_err(|error| AdapterError::Fetch { source: SOURCE.to_string(), error })?;

        let rows = match body {
            Value::Array(rows) => rows,
            other => {
                return Err(AdapterError::Schema {
                    source: SOURCE.to_string(),
                    detail: format!("expected a JSON array, got {}", kind_of(&other)),
                })
            }
        };

        Ok(finish(SOURCE, rows.iter().map(map_row)))
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn map_row(row: &Value) -> RowVerdict {
    // Placeholder entries carry no region
    let Some(region) = text(&row["region"]) else {
        return RowVerdict::Aggregate;
    };

    let Some(code) = text(&row["cca3"]).and_then(|raw| CountryCode::parse(&raw)) else {
        return RowVerdict::InvalidCode;
    };

    let name = text(&row["name"]["common"])
        .or_else(|| text(&row["name"]["official"]))
        .or_else(|| text(&row["name"]))
        .unwrap_or_default();

    let mut record = CountryRecord::new(code, name, region);
    record.subregion = text(&row["subregion"]);
    record.capital = match &row["capital"] {
        Value::Array(items) => items.iter().find_map(text),
        other => text(other),
    };
    if let Value::Array(latlng) = &row["latlng"] {
        record.latitude = latlng.first().and_then(number);
        record.longitude = latlng.get(1).and_then(number);
    }
    record.population = number(&row["population"])
        .filter(|p| *p >= 0.0 && p.fract() == 0.0)
        .map(|p| p as u64);

    RowVerdict::Country(record)
}
