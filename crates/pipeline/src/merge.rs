//! Left join of the country master with every reduced indicator.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{CountryRecord, IndicatorCell, MergedDataset, MergedRow, ReducedSeries};

/// Second-precision UTC stamp written on every row.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Every master row survives, in master order. Each series adds a value and
/// a year column; codes absent from a series get neither.
pub fn merge(master: &[CountryRecord], series: &[ReducedSeries], run_at: DateTime<Utc>) -> MergedDataset {
    let lookups: Vec<HashMap<&str, IndicatorCell>> = series
        .iter()
        .map(|s| {
            let mut by_code = HashMap::with_capacity(s.rows.len());
            for row in &s.rows {
                by_code.entry(row.code.as_str()).or_insert(IndicatorCell {
                    value: row.value,
                    observed_year: row.observed_year,
                });
            }
            by_code
        })
        .collect();

    let rows = master
        .iter()
        .map(|country| MergedRow {
            country: country.clone(),
            indicators: lookups
                .iter()
                .map(|by_code| by_code.get(country.code.as_str()).copied())
                .collect(),
        })
        .collect();

    MergedDataset {
        indicator_names: series.iter().map(|s| s.name.clone()).collect(),
        rows,
        as_of_utc: format_timestamp(run_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, CountryCode, ReducedIndicator};
    use chrono::TimeZone;

    fn code(s: &str) -> CountryCode {
        CountryCode::parse(s).unwrap()
    }

    fn run_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn series(name: &str, rows: &[(&str, f64, Option<i32>)]) -> ReducedSeries {
        ReducedSeries {
            name: name.into(),
            rows: rows
                .iter()
                .map(|(c, value, observed_year)| ReducedIndicator {
                    code: code(c),
                    value: *value,
                    observed_year: *observed_year,
                })
                .collect(),
        }
    }

    #[test]
    fn usa_population_scenario() {
        let master = vec![CountryRecord::new(code("USA"), "United States", "North America")];
        let reduced = crate::reduce::reduce_latest(&[
            crate::model::IndicatorObservation { code: code("USA"), year: Some(2019), value: Some(300.0) },
            crate::model::IndicatorObservation { code: code("USA"), year: Some(2021), value: Some(330.0) },
        ]);

        let ds = merge(&master, &[ReducedSeries { name: "population".into(), rows: reduced }], run_at());

        assert_eq!(ds.len(), 1);
        assert_eq!(ds.lookup("USA", "iso3"), Some(Cell::Text("USA".into())));
        assert_eq!(ds.lookup("USA", "country"), Some(Cell::Text("United States".into())));
        assert_eq!(ds.lookup("USA", "population"), Some(Cell::Number(330.0)));
        assert_eq!(ds.lookup("USA", "population_year"), Some(Cell::Integer(2021)));
        assert_eq!(ds.lookup("USA", "as_of_utc"), Some(Cell::Text("2026-03-14T09:26:53Z".into())));
    }

    #[test]
    fn left_join_keeps_uncovered_rows_in_master_order() {
        let master = vec![
            CountryRecord::new(code("ZWE"), "Zimbabwe", "Sub-Saharan Africa"),
            CountryRecord::new(code("AFG"), "Afghanistan", "South Asia"),
            CountryRecord::new(code("TUV"), "Tuvalu", "East Asia & Pacific"),
        ];
        let gdp = series("gdp_usd", &[("AFG", 14.5e9, Some(2021)), ("ZWE", 28.0e9, Some(2022)), ("XXX", 1.0, None)]);
        let life = series("life_expectancy", &[("TUV", 64.5, Some(2020))]);

        let ds = merge(&master, &[gdp, life], run_at());

        let codes: Vec<&str> = ds.rows.iter().map(|r| r.country.code.as_str()).collect();
        assert_eq!(codes, vec!["ZWE", "AFG", "TUV"]);
        assert_eq!(ds.lookup("TUV", "gdp_usd"), Some(Cell::Missing));
        assert_eq!(ds.lookup("TUV", "gdp_usd_year"), Some(Cell::Missing));
        assert_eq!(ds.lookup("TUV", "life_expectancy"), Some(Cell::Number(64.5)));
        assert_eq!(ds.lookup("ZWE", "life_expectancy"), Some(Cell::Missing));
        assert!(ds.lookup("XXX", "gdp_usd").is_none());
        assert_eq!(
            ds.columns()[9..],
            ["gdp_usd", "gdp_usd_year", "life_expectancy", "life_expectancy_year", "as_of_utc"]
        );
    }

    #[test]
    fn empty_series_yields_missing_columns() {
        let master = vec![CountryRecord::new(code("FRA"), "France", "Europe & Central Asia")];
        let ds = merge(&master, &[series("population", &[])], run_at());
        assert!(ds.has_column("population"));
        assert_eq!(ds.lookup("FRA", "population"), Some(Cell::Missing));
    }

    #[test]
    fn merge_is_idempotent() {
        let master = vec![
            CountryRecord::new(code("USA"), "United States", "North America"),
            CountryRecord::new(code("CAN"), "Canada", "North America"),
        ];
        let all = [series("population", &[("USA", 330.0, Some(2021)), ("CAN", 38.0, Some(2021))])];

        let first = merge(&master, &all, run_at());
        let second = merge(&master, &all, run_at());

        assert_eq!(first, second);
        assert_eq!(first.columns(), second.columns());
    }
}
