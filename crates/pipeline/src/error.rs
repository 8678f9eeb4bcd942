use std::fmt;

use insights_fetch::FetchError;

#[derive(Debug)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Structurally valid but unusable (empty indicator set, inverted years, ...).
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One registry could not produce a master table.
#[derive(Debug)]
pub enum AdapterError {
    /// The registry could not be reached (retries exhausted or request rejected).
    Fetch { source: String, error: FetchError },
    /// The registry answered, but not in a shape this adapter can map.
    Schema { source: String, detail: String },
}

impl AdapterError {
    pub fn source_name(&self) -> &str {
        match self {
            Self::Fetch { source, .. } | Self::Schema { source, .. } => source,
        }
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { source, error } => write!(f, "{source}: {error}"),
            Self::Schema { source, detail } => write!(f, "{source}: unexpected payload: {detail}"),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch { error, .. } => Some(error),
            Self::Schema { .. } => None,
        }
    }
}

/// What happened when the resolver asked one registry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Selected { records: usize },
    Empty,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AdapterAttempt {
    pub source: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Every registry failed or came back empty. Fatal for the run.
#[derive(Debug, Clone)]
pub struct NoMasterData {
    pub attempts: Vec<AdapterAttempt>,
}

impl fmt::Display for NoMasterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "no country master data: no registries configured");
        }
        write!(f, "no country master data from any registry")?;
        for attempt in &self.attempts {
            match &attempt.outcome {
                AttemptOutcome::Empty => write!(f, "; {}: no rows", attempt.source)?,
                AttemptOutcome::Failed { reason } => write!(f, "; {reason}")?,
                AttemptOutcome::Selected { .. } => {}
            }
        }
        Ok(())
    }
}

impl std::error::Error for NoMasterData {}

/// One indicator's paged fetch gave up.
#[derive(Debug, Clone)]
pub struct IndicatorFetchError {
    pub indicator_code: String,
    pub error: FetchError,
}

impl fmt::Display for IndicatorFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "indicator {}: {}", self.indicator_code, self.error)
    }
}

impl std::error::Error for IndicatorFetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Errors that stop a pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigError),
    NoMasterData(NoMasterData),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::NoMasterData(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<NoMasterData> for PipelineError {
    fn from(e: NoMasterData) -> Self {
        Self::NoMasterData(e)
    }
}
