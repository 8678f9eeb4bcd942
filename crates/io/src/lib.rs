//! `insights-io`: persists a pipeline run as files.
//!
//! Layout under the output directory:
//!
//! ```text
//! processed/country_insights_latest.csv
//! processed/qa_missingness_report.csv
//! processed/qa_checks.csv
//! processed/qa_status.json
//! raw/countries_<source>.csv
//! raw/indicator_<name>.csv
//! ```

pub mod csv;
pub mod json;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use insights_pipeline::RunOutput;

pub const PROCESSED_DIR: &str = "processed";
pub const RAW_DIR: &str = "raw";
pub const DATASET_FILE: &str = "country_insights_latest.csv";
pub const MISSINGNESS_FILE: &str = "qa_missingness_report.csv";
pub const CHECKS_FILE: &str = "qa_checks.csv";
pub const STATUS_FILE: &str = "qa_status.json";

#[derive(Debug)]
pub enum WriteError {
    Io { path: PathBuf, message: String },
    Csv { path: PathBuf, message: String },
    Json { path: PathBuf, message: String },
}

impl WriteError {
    pub(crate) fn io(path: &Path, e: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), message: e.to_string() }
    }

    pub(crate) fn csv(path: &Path, e: ::csv::Error) -> Self {
        Self::Csv { path: path.to_path_buf(), message: e.to_string() }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Csv { path, .. } | Self::Json { path, .. } => path,
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot write {}: {message}", path.display()),
            Self::Csv { path, message } => write!(f, "CSV error in {}: {message}", path.display()),
            Self::Json { path, message } => write!(f, "JSON error in {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for WriteError {}

/// Where each artifact of a run landed.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dataset: PathBuf,
    pub missingness: PathBuf,
    pub checks: PathBuf,
    pub status: PathBuf,
    pub raw: Vec<PathBuf>,
}

/// Write every artifact of `run` under `out_dir`, creating directories.
pub fn write_artifacts(out_dir: &Path, run: &RunOutput) -> Result<ArtifactPaths, WriteError> {
    let processed = out_dir.join(PROCESSED_DIR);
    let raw = out_dir.join(RAW_DIR);
    fs::create_dir_all(&processed).map_err(|e| WriteError::io(&processed, e))?;
    fs::create_dir_all(&raw).map_err(|e| WriteError::io(&raw, e))?;

    let mut raw_paths = Vec::with_capacity(run.series.len() + 1);

    let countries = raw.join(format!("countries_{}.csv", file_stem(&run.master.source)));
    crate::csv::export_countries(&run.master.records, &countries)?;
    raw_paths.push(countries);

    for series in &run.series {
        let path = raw.join(format!("indicator_{}.csv", file_stem(&series.name)));
        crate::csv::export_observations(&series.observations, &path)?;
        raw_paths.push(path);
    }

    let paths = ArtifactPaths {
        dataset: processed.join(DATASET_FILE),
        missingness: processed.join(MISSINGNESS_FILE),
        checks: processed.join(CHECKS_FILE),
        status: processed.join(STATUS_FILE),
        raw: raw_paths,
    };

    crate::csv::export_dataset(&run.dataset, &paths.dataset)?;
    crate::csv::export_missingness(&run.report, &paths.missingness)?;
    crate::csv::export_checks(&run.report, &paths.checks)?;
    json::export_status(&run.status, &paths.status)?;

    log::info!("wrote artifacts under {}", out_dir.display());
    Ok(paths)
}

/// Keep names filesystem-safe: anything outside `[A-Za-z0-9_-]` becomes `_`.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
