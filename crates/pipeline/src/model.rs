use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Join key
// ---------------------------------------------------------------------------

/// Three-letter country code. The only key shared by every source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    /// Accepts exactly three ASCII letters (surrounding whitespace ignored),
    /// normalized to uppercase. Anything else is not a country code.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 3 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            Some(Self(trimmed.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Master table
// ---------------------------------------------------------------------------

/// One country as described by a single registry. Fields the registry does
/// not provide stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRecord {
    pub code: CountryCode,
    pub display_name: String,
    pub region: String,
    pub subregion: Option<String>,
    pub income_level: Option<String>,
    pub capital: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<u64>,
}

impl CountryRecord {
    pub fn new(code: CountryCode, display_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            code,
            display_name: display_name.into(),
            region: region.into(),
            subregion: None,
            income_level: None,
            capital: None,
            latitude: None,
            longitude: None,
            population: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Indicator series
// ---------------------------------------------------------------------------

/// Raw unit of a time series. Many per code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorObservation {
    pub code: CountryCode,
    pub year: Option<i32>,
    pub value: Option<f64>,
}

/// Latest known value for one code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedIndicator {
    pub code: CountryCode,
    pub value: f64,
    pub observed_year: Option<i32>,
}

/// A reduced series under its output column name.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedSeries {
    pub name: String,
    pub rows: Vec<ReducedIndicator>,
}

// ---------------------------------------------------------------------------
// Merged table
// ---------------------------------------------------------------------------

pub const CODE_COLUMN: &str = "iso3";
pub const TIMESTAMP_COLUMN: &str = "as_of_utc";

/// Columns contributed by the country master, in output order.
pub const COUNTRY_COLUMNS: [&str; 9] = [
    CODE_COLUMN,
    "country",
    "region",
    "subregion",
    "income_level",
    "capital",
    "latitude",
    "longitude",
    "registry_population",
];

/// Column names an indicator may not take.
pub fn is_reserved_column(name: &str) -> bool {
    name == TIMESTAMP_COLUMN
        || COUNTRY_COLUMNS.contains(&name)
        || name
            .strip_suffix("_year")
            .is_some_and(|base| COUNTRY_COLUMNS.contains(&base))
}

/// A single table value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
    Integer(i64),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Integer(_) => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if !n.is_nan() => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text rendering for row-oriented output. Missing renders empty.
    pub fn render(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.is_nan() => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Integer(i) => i.to_string(),
        }
    }
}

fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

fn opt_text(value: &Option<String>) -> Cell {
    value.as_deref().map(text).unwrap_or(Cell::Missing)
}

fn opt_number(value: Option<f64>) -> Cell {
    value.map(Cell::Number).unwrap_or(Cell::Missing)
}

/// Value and provenance year of one indicator on one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorCell {
    pub value: f64,
    pub observed_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub country: CountryRecord,
    /// Aligned with [`MergedDataset::indicator_names`].
    pub indicators: Vec<Option<IndicatorCell>>,
}

/// Country master left-joined with every reduced indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDataset {
    pub indicator_names: Vec<String>,
    pub rows: Vec<MergedRow>,
    pub as_of_utc: String,
}

impl MergedDataset {
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = COUNTRY_COLUMNS.iter().map(|c| c.to_string()).collect();
        for name in &self.indicator_names {
            columns.push(name.clone());
            columns.push(format!("{name}_year"));
        }
        columns.push(TIMESTAMP_COLUMN.to_string());
        columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.locate(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of `column`, top to bottom. `None` if there is no such column.
    pub fn column_cells(&self, column: &str) -> Option<Vec<Cell>> {
        let slot = self.locate(column)?;
        Some(self.rows.iter().map(|row| self.cell_at(row, slot)).collect())
    }

    /// One row rendered in [`columns`](Self::columns) order.
    pub fn row_cells(&self, index: usize) -> Option<Vec<Cell>> {
        let row = self.rows.get(index)?;
        let mut cells: Vec<Cell> = (0..COUNTRY_COLUMNS.len())
            .map(|i| self.cell_at(row, Slot::Country(i)))
            .collect();
        for i in 0..self.indicator_names.len() {
            cells.push(self.cell_at(row, Slot::Value(i)));
            cells.push(self.cell_at(row, Slot::Year(i)));
        }
        cells.push(self.cell_at(row, Slot::Timestamp));
        Some(cells)
    }

    /// Value of `column` for the row with `code`.
    pub fn lookup(&self, code: &str, column: &str) -> Option<Cell> {
        let slot = self.locate(column)?;
        let row = self.rows.iter().find(|r| r.country.code.as_str() == code)?;
        Some(self.cell_at(row, slot))
    }

    fn locate(&self, column: &str) -> Option<Slot> {
        if column == TIMESTAMP_COLUMN {
            return Some(Slot::Timestamp);
        }
        if let Some(i) = COUNTRY_COLUMNS.iter().position(|c| *c == column) {
            return Some(Slot::Country(i));
        }
        if let Some(i) = self.indicator_names.iter().position(|n| n == column) {
            return Some(Slot::Value(i));
        }
        let base = column.strip_suffix("_year")?;
        self.indicator_names.iter().position(|n| n == base).map(Slot::Year)
    }

    fn cell_at(&self, row: &MergedRow, slot: Slot) -> Cell {
        let c = &row.country;
        match slot {
            Slot::Country(0) => text(c.code.as_str()),
            Slot::Country(1) => text(&c.display_name),
            Slot::Country(2) => text(&c.region),
            Slot::Country(3) => opt_text(&c.subregion),
            Slot::Country(4) => opt_text(&c.income_level),
            Slot::Country(5) => opt_text(&c.capital),
            Slot::Country(6) => opt_number(c.latitude),
            Slot::Country(7) => opt_number(c.longitude),
            Slot::Country(_) => c
                .population
                .map(|p| Cell::Integer(p as i64))
                .unwrap_or(Cell::Missing),
            Slot::Value(i) => row
                .indicators
                .get(i)
                .copied()
                .flatten()
                .map(|ind| Cell::Number(ind.value))
                .unwrap_or(Cell::Missing),
            Slot::Year(i) => row
                .indicators
                .get(i)
                .copied()
                .flatten()
                .and_then(|ind| ind.observed_year)
                .map(|y| Cell::Integer(y as i64))
                .unwrap_or(Cell::Missing),
            Slot::Timestamp => text(&self.as_of_utc),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Country(usize),
    Value(usize),
    Year(usize),
    Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_parse() {
        assert_eq!(CountryCode::parse("USA").unwrap().as_str(), "USA");
        assert_eq!(CountryCode::parse(" deu ").unwrap().as_str(), "DEU");
        assert!(CountryCode::parse("US").is_none());
        assert!(CountryCode::parse("USAA").is_none());
        assert!(CountryCode::parse("").is_none());
        assert!(CountryCode::parse("U1A").is_none());
        assert!(CountryCode::parse("ÄBC").is_none());
    }

    #[test]
    fn test_reserved_columns() {
        assert!(is_reserved_column("iso3"));
        assert!(is_reserved_column("as_of_utc"));
        assert!(is_reserved_column("region_year"));
        assert!(!is_reserved_column("population"));
        assert!(!is_reserved_column("gdp_usd"));
    }

    #[test]
    fn test_cell_missing_and_render() {
        assert!(Cell::Missing.is_missing());
        assert!(Cell::Text(String::new()).is_missing());
        assert!(Cell::Number(f64::NAN).is_missing());
        assert!(!Cell::Integer(0).is_missing());
        assert_eq!(Cell::Number(330.0).render(), "330");
        assert_eq!(Cell::Number(1.5).render(), "1.5");
        assert_eq!(Cell::Missing.render(), "");
    }

    #[test]
    fn test_columns_and_lookup() {
        let code = CountryCode::parse("USA").unwrap();
        let ds = MergedDataset {
            indicator_names: vec!["population".into()],
            rows: vec![MergedRow {
                country: CountryRecord::new(code, "United States", "North America"),
                indicators: vec![Some(IndicatorCell { value: 330.0, observed_year: Some(2021) })],
            }],
            as_of_utc: "2026-01-01T00:00:00Z".into(),
        };

        let columns = ds.columns();
        assert_eq!(columns.len(), COUNTRY_COLUMNS.len() + 3);
        assert_eq!(&columns[9..], &["population", "population_year", "as_of_utc"]);

        assert_eq!(ds.lookup("USA", "population"), Some(Cell::Number(330.0)));
        assert_eq!(ds.lookup("USA", "population_year"), Some(Cell::Integer(2021)));
        assert_eq!(ds.lookup("USA", "capital"), Some(Cell::Missing));
        assert_eq!(ds.lookup("USA", "gdp_usd"), None);
        assert!(!ds.has_column("gdp_usd_year"));

        let cells = ds.row_cells(0).unwrap();
        assert_eq!(cells.len(), columns.len());
        assert_eq!(cells[0], Cell::Text("USA".into()));
    }
}
