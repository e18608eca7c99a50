use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────

/// Raised by `MetricsOptions::validate()`. Always fatal to startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("you must use either the request url or the mapping url pattern as the metric path")]
    NoLabelSource,

    #[error("you can't use both the request url and the mapping url pattern as the metric path")]
    ConflictingLabelSource,

    #[error("max expected latency must be a positive finite number of milliseconds, got {0}")]
    InvalidMaxExpectedLatency(f64),

    #[error("percentile {0} is outside [0, 1]")]
    InvalidPercentile(f64),

    #[error("metric prefix {0:?} must be non-empty ASCII alphanumerics or '_'")]
    InvalidPrefix(String),
}

// ─── Startup ─────────────────────────────────────────────────────

/// Anything that must abort the process before the first request is served.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("expected exactly one scrape target registry, found {found}")]
    ScrapeTargetCount { found: usize },

    #[error("invalid stub mapping pattern {pattern:?}: {source}")]
    InvalidMapping {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ─── Recording ───────────────────────────────────────────────────

/// A single observation could not be stored. Recorders log these and move on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("metric {0:?} has not been registered")]
    UnknownMetric(String),

    #[error("label {0:?} must not be empty")]
    EmptyLabel(&'static str),

    #[error("observation {0} is not a non-negative finite number")]
    InvalidValue(f64),

    #[error("histogram allocation failed: {0}")]
    Histogram(String),
}
