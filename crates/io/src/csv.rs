// CSV export of run tables

use std::fs::File;
use std::path::Path;

use insights_pipeline::model::COUNTRY_COLUMNS;
use insights_pipeline::{CountryRecord, IndicatorObservation, MergedDataset, QualityReport};

use crate::WriteError;

fn writer(path: &Path) -> Result<csv::Writer<File>, WriteError> {
    csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|e| WriteError::csv(path, e))
}

fn finish(mut writer: csv::Writer<File>, path: &Path) -> Result<(), WriteError> {
    writer.flush().map_err(|e| WriteError::io(path, e))
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// The merged table. Header always, one line per country, missing as empty.
pub fn export_dataset(dataset: &MergedDataset, path: &Path) -> Result<(), WriteError> {
    let mut w = writer(path)?;
    w.write_record(dataset.columns()).map_err(|e| WriteError::csv(path, e))?;

    for index in 0..dataset.len() {
        let Some(cells) = dataset.row_cells(index) else {
            break;
        };
        let record: Vec<String> = cells.iter().map(|c| c.render()).collect();
        w.write_record(&record).map_err(|e| WriteError::csv(path, e))?;
    }

    finish(w, path)
}

/// `field,missing_rate`, highest rate first.
pub fn export_missingness(report: &QualityReport, path: &Path) -> Result<(), WriteError> {
    let mut w = writer(path)?;
    w.write_record(["field", "missing_rate"]).map_err(|e| WriteError::csv(path, e))?;
    for rate in &report.missingness {
        w.write_record([rate.field.clone(), rate.missing_rate.to_string()])
            .map_err(|e| WriteError::csv(path, e))?;
    }
    finish(w, path)
}

/// Every check with its outcome.
pub fn export_checks(report: &QualityReport, path: &Path) -> Result<(), WriteError> {
    let mut w = writer(path)?;
    w.write_record(["check", "passed", "count", "detail"])
        .map_err(|e| WriteError::csv(path, e))?;
    for check in &report.checks {
        w.write_record([
            check.name.clone(),
            check.passed.to_string(),
            opt(check.count),
            check.detail.clone(),
        ])
        .map_err(|e| WriteError::csv(path, e))?;
    }
    finish(w, path)
}

/// Raw snapshot of the selected registry's countries.
pub fn export_countries(records: &[CountryRecord], path: &Path) -> Result<(), WriteError> {
    let mut w = writer(path)?;
    w.write_record(COUNTRY_COLUMNS).map_err(|e| WriteError::csv(path, e))?;
    for r in records {
        w.write_record([
            r.code.to_string(),
            r.display_name.clone(),
            r.region.clone(),
            opt(r.subregion.as_deref()),
            opt(r.income_level.as_deref()),
            opt(r.capital.as_deref()),
            opt(r.latitude),
            opt(r.longitude),
            opt(r.population),
        ])
        .map_err(|e| WriteError::csv(path, e))?;
    }
    finish(w, path)
}

/// Raw snapshot of one indicator series, before reduction.
pub fn export_observations(observations: &[IndicatorObservation], path: &Path) -> Result<(), WriteError> {
    let mut w = writer(path)?;
    w.write_record(["iso3", "year", "value"]).map_err(|e| WriteError::csv(path, e))?;
    for obs in observations {
        w.write_record([obs.code.to_string(), opt(obs.year), opt(obs.value)])
            .map_err(|e| WriteError::csv(path, e))?;
    }
    finish(w, path)
}
