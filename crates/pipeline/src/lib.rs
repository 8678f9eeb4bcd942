//! `insights-pipeline`: builds one country reference table from several
//! remote registries and indicator series.
//!
//! Stages, in run order:
//!
//! 1. [`CountryMasterResolver`] picks the first registry that yields
//!    countries ([`SourceAdapter`] per provider).
//! 2. [`IndicatorSeriesFetcher`] pulls each configured indicator.
//! 3. [`reduce_latest`] keeps the latest value per country.
//! 4. [`merge`] left-joins everything onto the master table.
//! 5. [`QualityGate`] checks the result.
//!
//! [`Pipeline`] sequences the stages from a [`PipelineConfig`].

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod merge;
pub mod model;
pub mod quality;
pub mod reduce;
pub mod resolver;

pub use adapter::{AdapterProvenance, MasterFetch, RestCountriesRegistry, SourceAdapter, WorldBankRegistry};
pub use config::{IndicatorDef, PipelineConfig, SourceKind};
pub use engine::{Pipeline, QaStatus, RunOutput, SeriesOutcome};
pub use error::{
    AdapterAttempt, AdapterError, AttemptOutcome, ConfigError, IndicatorFetchError, NoMasterData,
    PipelineError,
};
pub use indicator::IndicatorSeriesFetcher;
pub use merge::merge;
pub use model::{Cell, CountryCode, CountryRecord, IndicatorObservation, MergedDataset, ReducedIndicator, ReducedSeries};
pub use quality::{MissingRate, QualityCheck, QualityGate, QualityReport};
pub use reduce::reduce_latest;
pub use resolver::{CountryMasterResolver, ResolvedMaster};
