//! Post-merge quality checks.
//!
//! Findings never abort a run. They only flip [`QualityReport::passed`], so
//! the artifacts can still be written and inspected.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{MergedDataset, CODE_COLUMN};

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityCheck {
    pub name: String,
    pub passed: bool,
    /// Offending row count, for checks that count something.
    pub count: Option<usize>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingRate {
    pub field: String,
    pub missing_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub passed: bool,
    pub checks: Vec<QualityCheck>,
    /// Highest missing rates first, at most `top_n` entries.
    pub missingness: Vec<MissingRate>,
}

impl QualityReport {
    pub fn check(&self, name: &str) -> Option<&QualityCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn failed_checks(&self) -> Vec<String> {
        self.checks.iter().filter(|c| !c.passed).map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct QualityGate {
    top_n: usize,
    non_negative: Vec<String>,
}

impl QualityGate {
    pub fn new(top_n: usize, non_negative: Vec<String>) -> Self {
        Self { top_n, non_negative }
    }

    pub fn evaluate(&self, dataset: &MergedDataset) -> QualityReport {
        let mut checks = Vec::new();

        if dataset.has_column(CODE_COLUMN) {
            let duplicates = duplicate_rows(dataset);
            checks.push(QualityCheck {
                name: format!("unique_{CODE_COLUMN}"),
                passed: duplicates == 0,
                count: Some(duplicates),
                detail: format!("{duplicates} row(s) share a country code"),
            });
        }

        checks.push(QualityCheck {
            name: "missingness_ok".into(),
            passed: true,
            count: None,
            detail: "see report".into(),
        });

        for column in &self.non_negative {
            let Some(cells) = dataset.column_cells(column) else {
                log::debug!("non-negative check skipped, no column {column}");
                continue;
            };
            let negatives = cells
                .iter()
                .filter_map(|c| c.as_f64())
                .filter(|v| *v < 0.0)
                .count();
            checks.push(QualityCheck {
                name: format!("{column}_non_negative"),
                passed: negatives == 0,
                count: Some(negatives),
                detail: format!("{negatives} negative value(s)"),
            });
        }

        let passed = checks.iter().all(|c| c.passed);
        QualityReport { passed, checks, missingness: self.missingness(dataset) }
    }

    fn missingness(&self, dataset: &MergedDataset) -> Vec<MissingRate> {
        let total = dataset.len();
        let mut rates: Vec<MissingRate> = dataset
            .columns()
            .into_iter()
            .map(|field| {
                let missing = dataset
                    .column_cells(&field)
                    .map(|cells| cells.iter().filter(|c| c.is_missing()).count())
                    .unwrap_or(0);
                let missing_rate = if total == 0 { 0.0 } else { missing as f64 / total as f64 };
                MissingRate { field, missing_rate }
            })
            .collect();

        // Stable, so equal rates keep column order
        rates.sort_by(|a, b| b.missing_rate.total_cmp(&a.missing_rate));
        rates.truncate(self.top_n);
        rates
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N, Vec::new())
    }
}

/// Rows whose code appears more than once, counting every such row.
fn duplicate_rows(dataset: &MergedDataset) -> usize {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for row in &dataset.rows {
        *seen.entry(row.country.code.as_str()).or_default() += 1;
    }
    seen.values().filter(|n| **n > 1).sum()
}
