//! Run orchestration: resolve master, fetch and reduce indicators, merge,
//! evaluate.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use insights_fetch::FetchClient;

use crate::adapter::{RestCountriesRegistry, SourceAdapter, WorldBankRegistry};
use crate::config::{IndicatorDef, PipelineConfig, SourceKind};
use crate::error::{IndicatorFetchError, PipelineError};
use crate::indicator::IndicatorSeriesFetcher;
use crate::merge::merge;
use crate::model::{IndicatorObservation, MergedDataset, ReducedSeries};
use crate::quality::{QualityGate, QualityReport};
use crate::reduce::reduce_latest;
use crate::resolver::{CountryMasterResolver, ResolvedMaster};

/// One configured indicator after its fetch settled.
#[derive(Debug, Clone)]
pub struct SeriesOutcome {
    pub name: String,
    pub code: String,
    /// Raw observations. Empty when the fetch failed.
    pub observations: Vec<IndicatorObservation>,
    pub error: Option<IndicatorFetchError>,
}

/// Machine-readable summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaStatus {
    pub passed: bool,
    pub as_of_utc: String,
    pub row_count: usize,
    pub master_source: String,
    pub failed_checks: Vec<String>,
    pub failed_indicators: Vec<String>,
}

/// Everything a writer needs to persist a run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub master: ResolvedMaster,
    pub series: Vec<SeriesOutcome>,
    pub dataset: MergedDataset,
    pub report: QualityReport,
    pub status: QaStatus,
}

type Progress = Box<dyn Fn(&str) + Send + Sync>;

pub struct Pipeline {
    indicators: Vec<IndicatorDef>,
    years: (i32, i32),
    parallel: bool,
    resolver: CountryMasterResolver,
    fetcher: IndicatorSeriesFetcher,
    gate: QualityGate,
    progress: Option<Progress>,
}

impl Pipeline {
    /// Validate `config` and wire real HTTP clients for it.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = FetchClient::new(config.retry.policy());
        Self::with_client(config, client)
    }

    /// Like [`from_config`](Self::from_config) over a caller-built client.
    pub fn with_client(config: &PipelineConfig, client: FetchClient) -> Result<Self, PipelineError> {
        config.validate()?;

        let sources = &config.sources;
        let adapters: Vec<Box<dyn SourceAdapter>> = sources
            .priority
            .iter()
            .map(|kind| -> Box<dyn SourceAdapter> {
                match kind {
                    SourceKind::WorldBank => Box::new(WorldBankRegistry::new(
                        client.clone(),
                        sources.world_bank_base_url.clone(),
                        config.paging.page_size,
                    )),
                    SourceKind::RestCountries => Box::new(RestCountriesRegistry::new(
                        client.clone(),
                        sources.rest_countries_url.clone(),
                    )),
                }
            })
            .collect();

        let fetcher = IndicatorSeriesFetcher::new(
            client,
            sources.world_bank_base_url.clone(),
            config.paging.page_size,
        );

        Ok(Self::with_parts(config, CountryMasterResolver::new(adapters), fetcher))
    }

    /// Assemble from prebuilt parts. `config` supplies indicators, years,
    /// quality settings and the parallelism switch.
    pub fn with_parts(
        config: &PipelineConfig,
        resolver: CountryMasterResolver,
        fetcher: IndicatorSeriesFetcher,
    ) -> Self {
        Self {
            indicators: config.indicators.clone(),
            years: config.years.bounds(),
            parallel: config.run.parallel,
            resolver,
            fetcher,
            gate: QualityGate::new(config.quality.top_n, config.non_negative_columns()),
            progress: None,
        }
    }

    /// Receive one line per stage, for a human-readable narrative.
    pub fn on_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn run(&self) -> Result<RunOutput, PipelineError> {
        self.run_at(Utc::now())
    }

    /// Run with a fixed timestamp stamped on every row.
    pub fn run_at(&self, run_at: DateTime<Utc>) -> Result<RunOutput, PipelineError> {
        self.report(&format!("resolving country master from {}", self.resolver.sources().join(", ")));
        let master = self.resolver.resolve()?;
        self.report(&format!("country master: {} rows from {}", master.records.len(), master.source));

        let (start, end) = self.years;
        self.report(&format!("fetching {} indicator(s) for {start}..={end}", self.indicators.len()));
        let series = self.fetch_all();

        let reduced: Vec<ReducedSeries> = series
            .iter()
            .map(|s| ReducedSeries { name: s.name.clone(), rows: reduce_latest(&s.observations) })
            .collect();
        for (outcome, r) in series.iter().zip(&reduced) {
            match &outcome.error {
                Some(e) => self.report(&format!("  {}: FAILED, left empty ({e})", outcome.name)),
                None => self.report(&format!(
                    "  {}: {} observations, {} countries",
                    outcome.name,
                    outcome.observations.len(),
                    r.rows.len()
                )),
            }
        }

        let dataset = merge(&master.records, &reduced, run_at);
        let report = self.gate.evaluate(&dataset);
        self.report(&format!(
            "quality gate: {}",
            if report.passed { "passed".to_string() } else { format!("FAILED ({})", report.failed_checks().join(", ")) }
        ));

        let status = QaStatus {
            passed: report.passed,
            as_of_utc: dataset.as_of_utc.clone(),
            row_count: dataset.len(),
            master_source: master.source.clone(),
            failed_checks: report.failed_checks(),
            failed_indicators: series
                .iter()
                .filter(|s| s.error.is_some())
                .map(|s| s.name.clone())
                .collect(),
        };

        Ok(RunOutput { master, series, dataset, report, status })
    }

    /// Fetch every indicator. A failed fetch becomes an empty series; output
    /// order follows configuration order.
    fn fetch_all(&self) -> Vec<SeriesOutcome> {
        let fetch_one = |def: &IndicatorDef| -> SeriesOutcome {
            match self.fetcher.fetch_series(&def.code, self.years) {
                Ok(observations) => SeriesOutcome {
                    name: def.name.clone(),
                    code: def.code.clone(),
                    observations,
                    error: None,
                },
                Err(e) => {
                    log::warn!("{e}; substituting an empty series for {}", def.name);
                    SeriesOutcome {
                        name: def.name.clone(),
                        code: def.code.clone(),
                        observations: Vec::new(),
                        error: Some(e),
                    }
                }
            }
        };

        if self.parallel {
            self.indicators.par_iter().map(fetch_one).collect()
        } else {
            self.indicators.iter().map(fetch_one).collect()
        }
    }

    fn report(&self, line: &str) {
        log::info!("{line}");
        if let Some(progress) = &self.progress {
            progress(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use insights_fetch::{RawResponse, RetryPolicy, Sleeper, Transport};

    /// Serves canned bodies by URL prefix; anything else is a 404.
    struct Routes(HashMap<String, String>);

    impl Transport for Routes {
        fn get(&self, url: &str) -> Result<RawResponse, String> {
            let body = self
                .0
                .iter()
                .find(|(prefix, _)| url.starts_with(prefix.as_str()))
                .map(|(_, body)| body.clone());
            Ok(body.map(RawResponse::ok).unwrap_or_else(|| RawResponse::status(404)))
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _: Duration) {}
    }

    fn client(routes: &[(&str, String)]) -> FetchClient {
        let routes = routes.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        FetchClient::new(RetryPolicy { max_attempts: 2, ..Default::default() })
            .with_transport(Arc::new(Routes(routes)))
            .with_sleeper(Arc::new(NoSleep))
    }

    fn page(rows: serde_json::Value) -> String {
        serde_json::json!([{ "page": 1, "pages": 1, "per_page": 1000, "total": 1 }, rows]).to_string()
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.sources.world_bank_base_url = "http://wb.test/v2".into();
        config.sources.rest_countries_url = "http://rc.test/all".into();
        config.indicators = vec![
            IndicatorDef::new("population", "SP.POP.TOTL"),
            IndicatorDef::new("gdp_usd", "NY.GDP.MKTP.CD"),
        ];
        config.years.start = 2019;
        config.years.end = Some(2021);
        config
    }

    fn countries() -> String {
        page(serde_json::json!([
            { "id": "USA", "name": "United States", "region": { "id": "NAC", "value": "North America" } },
            { "id": "WLD", "name": "World", "region": { "id": "NA", "value": "Aggregates" } }
        ]))
    }

    fn population() -> String {
        page(serde_json::json!([
            { "countryiso3code": "USA", "date": "2021", "value": 330 },
            { "countryiso3code": "USA", "date": "2019", "value": 300 }
        ]))
    }

    fn run_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-01T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn failed_indicator_is_substituted_and_recorded() {
        let client = client(&[
            ("http://wb.test/v2/country?", countries()),
            ("http://wb.test/v2/country/all/indicator/SP.POP.TOTL", population()),
        ]);
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = lines.clone();
        let pipeline = Pipeline::with_client(&config(), client)
            .unwrap()
            .on_progress(move |l| sink.lock().unwrap().push(l.to_string()));

        let out = pipeline.run_at(run_at()).unwrap();

        assert_eq!(out.master.source, "world_bank");
        assert_eq!(out.dataset.len(), 1);
        assert_eq!(out.series[0].name, "population");
        assert_eq!(out.series[1].name, "gdp_usd");
        assert!(out.series[1].error.is_some());
        assert!(out.series[1].observations.is_empty());
        assert_eq!(out.status.failed_indicators, vec!["gdp_usd"]);
        assert!(out.status.passed);
        assert_eq!(out.status.row_count, 1);
        assert_eq!(out.status.as_of_utc, "2026-05-01T12:00:00Z");
        assert!(out.dataset.has_column("gdp_usd"));
        assert_eq!(out.dataset.lookup("USA", "population"), Some(crate::model::Cell::Number(330.0)));
        assert!(lines.lock().unwrap().iter().any(|l| l.contains("gdp_usd: FAILED")));
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let routes = [
            ("http://wb.test/v2/country?", countries()),
            ("http://wb.test/v2/country/all/indicator/SP.POP.TOTL", population()),
            ("http://wb.test/v2/country/all/indicator/NY.GDP.MKTP.CD", page(serde_json::json!([]))),
        ];
        let mut sequential = config();
        sequential.run.parallel = false;

        let a = Pipeline::with_client(&config(), client(&routes)).unwrap().run_at(run_at()).unwrap();
        let b = Pipeline::with_client(&sequential, client(&routes)).unwrap().run_at(run_at()).unwrap();

        assert_eq!(a.dataset, b.dataset);
        assert_eq!(a.status, b.status);
    }

    #[test]
    fn no_master_data_is_fatal() {
        let err = Pipeline::with_client(&config(), client(&[])).unwrap().run().unwrap_err();
        assert!(matches!(err, PipelineError::NoMasterData(ref e) if e.attempts.len() == 2));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut bad = config();
        bad.indicators.clear();
        assert!(matches!(
            Pipeline::with_client(&bad, client(&[])),
            Err(PipelineError::Config(_))
        ));
    }
}
