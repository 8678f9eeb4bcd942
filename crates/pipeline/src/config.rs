use std::collections::HashSet;
use std::time::Duration;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use insights_fetch::RetryPolicy;

use crate::error::ConfigError;
use crate::model::is_reserved_column;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything a run needs to know. Every section has defaults, so an empty
/// TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Output name → provider code, in output column order.
    pub indicators: Vec<IndicatorDef>,
    pub years: YearRange,
    pub retry: RetryConfig,
    pub paging: PagingConfig,
    pub sources: SourcesConfig,
    pub quality: QualityConfig,
    pub run: RunConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            indicators: vec![
                IndicatorDef::new("population", "SP.POP.TOTL"),
                IndicatorDef::new("gdp_usd", "NY.GDP.MKTP.CD"),
                IndicatorDef::new("gdp_per_capita_usd", "NY.GDP.PCAP.CD"),
                IndicatorDef::new("life_expectancy", "SP.DYN.LE00.IN"),
            ],
            years: YearRange::default(),
            retry: RetryConfig::default(),
            paging: PagingConfig::default(),
            sources: SourcesConfig::default(),
            quality: QualityConfig::default(),
            run: RunConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Indicators + years
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorDef {
    pub name: String,
    pub code: String,
}

impl IndicatorDef {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self { name: name.into(), code: code.into() }
    }
}

/// Inclusive year window for indicator history. `end` defaults to the
/// current UTC year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearRange {
    pub start: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i32>,
}

impl Default for YearRange {
    fn default() -> Self {
        Self { start: 2010, end: None }
    }
}

impl YearRange {
    pub fn bounds(&self) -> (i32, i32) {
        let end = self.end.unwrap_or_else(|| chrono::Utc::now().year());
        (self.start, end)
    }
}

// ---------------------------------------------------------------------------
// Fetch behavior
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub cap_secs: u64,
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            cap_secs: policy.backoff_cap_secs,
            timeout_secs: policy.timeout.as_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_cap_secs: self.cap_secs,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self { page_size: insights_fetch::pager::DEFAULT_PAGE_SIZE }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    WorldBank,
    RestCountries,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorldBank => "world_bank",
            Self::RestCountries => "rest_countries",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Registries to try for the country master, most trusted first.
    pub priority: Vec<SourceKind>,
    /// World Bank API root; serves both the country listing and indicators.
    pub world_bank_base_url: String,
    /// REST Countries bulk endpoint, including its field selection.
    pub rest_countries_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            priority: vec![SourceKind::WorldBank, SourceKind::RestCountries],
            world_bank_base_url: "https://api.worldbank.org/v2".to_string(),
            rest_countries_url:
                "https://restcountries.com/v3.1/all?fields=name,cca3,region,subregion,capital,latlng,population"
                    .to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Quality + run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Rows in the missingness report.
    pub top_n: usize,
    /// Columns that must not hold negative values. Defaults to every indicator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_negative: Option<Vec<String>>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self { top_n: 10, non_negative: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fetch indicators concurrently.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Columns checked for negative values.
    pub fn non_negative_columns(&self) -> Vec<String> {
        match &self.quality.non_negative {
            Some(columns) => columns.clone(),
            None => self.indicators.iter().map(|i| i.name.clone()).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indicators.is_empty() {
            return Err(ConfigError::Validation("at least one indicator is required".into()));
        }

        let names: HashSet<&str> = self.indicators.iter().map(|i| i.name.as_str()).collect();
        if names.len() != self.indicators.len() {
            return Err(ConfigError::Validation("indicator names must be unique".into()));
        }

        for def in &self.indicators {
            if def.name.trim().is_empty() || def.code.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "indicator name and code must be non-empty".into(),
                ));
            }
            if is_reserved_column(&def.name) {
                return Err(ConfigError::Validation(format!(
                    "indicator name '{}' collides with a country column",
                    def.name
                )));
            }
            if let Some(base) = def.name.strip_suffix("_year") {
                if names.contains(base) {
                    return Err(ConfigError::Validation(format!(
                        "indicator name '{}' collides with the year column of '{base}'",
                        def.name
                    )));
                }
            }
        }

        let (start, end) = self.years.bounds();
        if start > end {
            return Err(ConfigError::Validation(format!(
                "years.start ({start}) must not be after years.end ({end})"
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation("retry.max_attempts must be at least 1".into()));
        }

        if self.paging.page_size == 0 {
            return Err(ConfigError::Validation("paging.page_size must be at least 1".into()));
        }

        if self.sources.priority.is_empty() {
            return Err(ConfigError::Validation(
                "sources.priority must name at least one registry".into(),
            ));
        }
        let unique: HashSet<&SourceKind> = self.sources.priority.iter().collect();
        if unique.len() != self.sources.priority.len() {
            return Err(ConfigError::Validation(
                "sources.priority must not repeat a registry".into(),
            ));
        }

        if self.quality.top_n == 0 {
            return Err(ConfigError::Validation("quality.top_n must be at least 1".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.indicators.len(), 4);
        assert_eq!(config.indicators[0].name, "population");
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.cap_secs, 60);
        assert_eq!(config.quality.top_n, 10);
        assert!(config.run.parallel);
        assert_eq!(
            config.sources.priority,
            vec![SourceKind::WorldBank, SourceKind::RestCountries]
        );
    }

    #[test]
    fn parse_custom_sections() {
        let input = r#"
[[indicators]]
name = "co2_kt"
code = "EN.ATM.CO2E.KT"

[[indicators]]
name = "population"
code = "SP.POP.TOTL"

[years]
start = 2015
end = 2020

[retry]
max_attempts = 3

[sources]
priority = ["rest_countries"]

[quality]
top_n = 5
non_negative = ["population"]

[run]
parallel = false
"#;
        let config = PipelineConfig::from_toml(input).unwrap();
        assert_eq!(config.indicators.len(), 2);
        assert_eq!(config.indicators[0], IndicatorDef::new("co2_kt", "EN.ATM.CO2E.KT"));
        assert_eq!(config.years.bounds(), (2015, 2020));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.cap_secs, 60);
        assert_eq!(config.sources.priority, vec![SourceKind::RestCountries]);
        assert_eq!(config.sources.world_bank_base_url, "https://api.worldbank.org/v2");
        assert_eq!(config.non_negative_columns(), vec!["population"]);
        assert!(!config.run.parallel);
    }

    #[test]
    fn non_negative_defaults_to_indicator_names() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.non_negative_columns(),
            vec!["population", "gdp_usd", "gdp_per_capita_usd", "life_expectancy"]
        );
    }

    #[test]
    fn open_ended_years_run_to_current_year() {
        let (start, end) = YearRange::default().bounds();
        assert_eq!(start, 2010);
        assert!(end >= 2024);
    }

    #[test]
    fn retry_config_maps_to_policy() {
        let policy = RetryConfig { max_attempts: 2, cap_secs: 8, timeout_secs: 5 }.policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.backoff_secs(5), 8);
        assert_eq!(policy.timeout, Duration::from_secs(5));
    }

    #[test]
    fn toml_round_trip_of_defaults() {
        let text = PipelineConfig::default().to_toml().unwrap();
        assert!(text.contains("SP.POP.TOTL"));
        let back = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(back, PipelineConfig::default());
    }

    #[test]
    fn reject_unknown_source() {
        let err = PipelineConfig::from_toml("[sources]\npriority = [\"wikipedia\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reject_repeated_source() {
        let err = PipelineConfig::from_toml("[sources]\npriority = [\"world_bank\", \"world_bank\"]\n")
            .unwrap_err();
        assert!(err.to_string().contains("must not repeat"));
    }

    #[test]
    fn reject_inverted_years() {
        let err = PipelineConfig::from_toml("[years]\nstart = 2022\nend = 2020\n").unwrap_err();
        assert!(err.to_string().contains("years.start"));
    }

    #[test]
    fn reject_future_start_with_open_end() {
        let err = PipelineConfig::from_toml("[years]\nstart = 2099\n").unwrap_err();
        assert!(err.to_string().contains("years.start (2099)"), "{err}");
    }

    #[test]
    fn reject_reserved_indicator_name() {
        let input = "[[indicators]]\nname = \"capital\"\ncode = \"X.Y\"\n";
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("collides with a country column"));
    }

    #[test]
    fn reject_year_column_collision() {
        let input = r#"
[[indicators]]
name = "gdp"
code = "A"

[[indicators]]
name = "gdp_year"
code = "B"
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("year column of 'gdp'"));
    }

    #[test]
    fn reject_duplicate_indicator_names() {
        let input = r#"
[[indicators]]
name = "gdp"
code = "A"

[[indicators]]
name = "gdp"
code = "B"
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("unique"));
    }

    #[test]
    fn reject_zero_attempts_and_page_size() {
        assert!(PipelineConfig::from_toml("[retry]\nmax_attempts = 0\n").is_err());
        assert!(PipelineConfig::from_toml("[paging]\npage_size = 0\n").is_err());
        assert!(PipelineConfig::from_toml("[quality]\ntop_n = 0\n").is_err());
    }
}
