//! Pick one registry's country table.
//!
//! Registries are tried in priority order. An error or an empty table moves
//! on to the next one. The first non-empty table wins as-is: rows from two
//! registries are never mixed, since their notions of region and capital
//! differ.

use crate::adapter::{AdapterProvenance, SourceAdapter};
use crate::error::{AdapterAttempt, AttemptOutcome, NoMasterData};
use crate::model::CountryRecord;

#[derive(Debug, Clone)]
pub struct ResolvedMaster {
    pub source: String,
    pub records: Vec<CountryRecord>,
    pub provenance: AdapterProvenance,
    /// Every registry asked, in order, ending with the selected one.
    pub attempts: Vec<AdapterAttempt>,
}

pub struct CountryMasterResolver {
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl CountryMasterResolver {
    pub fn new(adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn sources(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn resolve(&self) -> Result<ResolvedMaster, NoMasterData> {
        let mut attempts = Vec::new();

        for adapter in &self.adapters {
            let source = adapter.name().to_string();
            match adapter.fetch_master() {
                Ok(fetched) if fetched.records.is_empty() => {
                    log::warn!("{source}: registry returned no countries, trying next");
                    attempts.push(AdapterAttempt { source, outcome: AttemptOutcome::Empty });
                }
                Ok(fetched) => {
                    log::info!("{source}: selected with {} countries", fetched.records.len());
                    attempts.push(AdapterAttempt {
                        source: source.clone(),
                        outcome: AttemptOutcome::Selected { records: fetched.records.len() },
                    });
                    return Ok(ResolvedMaster {
                        source,
                        records: fetched.records,
                        provenance: fetched.provenance,
                        attempts,
                    });
                }
                Err(e) => {
                    log::warn!("{e}; trying next registry");
                    attempts.push(AdapterAttempt {
                        source,
                        outcome: AttemptOutcome::Failed { reason: e.to_string() },
                    });
                }
            }
        }

        Err(NoMasterData { attempts })
    }
}
