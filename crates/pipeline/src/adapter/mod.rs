//! Country registries.
//!
//! Each adapter knows one provider's payload and maps it onto
//! [`CountryRecord`]. The shared tail (aggregate exclusion, code validation,
//! first-wins dedup, drop accounting) lives here so every adapter reports the
//! same provenance.

mod rest_countries;
mod world_bank;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::error::AdapterError;
use crate::model::CountryRecord;

pub use rest_countries::RestCountriesRegistry;
pub use world_bank::WorldBankRegistry;

/// A provider of the country master table.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_master(&self) -> Result<MasterFetch, AdapterError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MasterFetch {
    pub records: Vec<CountryRecord>,
    pub provenance: AdapterProvenance,
}

/// Row accounting for one registry fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdapterProvenance {
    pub source: String,
    pub rows_seen: usize,
    pub aggregates_excluded: usize,
    pub invalid_code_dropped: usize,
    pub duplicates_dropped: usize,
    pub records: usize,
}

/// How an adapter classified one raw row.
#[derive(Debug)]
pub(crate) enum RowVerdict {
    Aggregate,
    InvalidCode,
    Country(CountryRecord),
}

/// Apply the shared filtering tail and tally what was dropped.
pub(crate) fn finish(source: &str, verdicts: impl IntoIterator<Item = RowVerdict>) -> MasterFetch {
    let mut provenance = AdapterProvenance {
        source: source.to_string(),
        ..AdapterProvenance::default()
    };
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for verdict in verdicts {
        provenance.rows_seen += 1;
        match verdict {
            RowVerdict::Aggregate => provenance.aggregates_excluded += 1,
            RowVerdict::InvalidCode => provenance.invalid_code_dropped += 1,
            RowVerdict::Country(record) => {
                if seen.insert(record.code.clone()) {
                    records.push(record);
                } else {
                    provenance.duplicates_dropped += 1;
                }
            }
        }
    }

    provenance.records = records.len();
    if provenance.invalid_code_dropped > 0 || provenance.duplicates_dropped > 0 {
        log::info!(
            "{}: dropped {} row(s) without a valid code, {} duplicate(s)",
            source,
            provenance.invalid_code_dropped,
            provenance.duplicates_dropped,
        );
    }

    MasterFetch { records, provenance }
}

// ── JSON coercion ───────────────────────────────────────────────────

/// Non-empty trimmed string.
pub(crate) fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

/// Finite number from a JSON number or a numeric string. Anything else is missing.
pub(crate) fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Whole year from a JSON number or a numeric string.
pub(crate) fn year(v: &Value) -> Option<i32> {
    let n = number(v)?;
    (n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64).then_some(n as i32)
}
