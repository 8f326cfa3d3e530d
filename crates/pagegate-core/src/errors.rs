//! Error types for the quality-gate engine.

use std::time::Duration;

/// Engine errors.
///
/// Per-rule and per-page errors are caught at that granularity by the run
/// fold and turned into [`ProcessingError`] entries; only configuration
/// problems abort a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Aggregation requested over a series with no samples.
    #[error("empty series: no samples for {metric}")]
    EmptySeries { metric: String },

    /// Unknown aggregation function name.
    #[error("unsupported aggregation: {name}")]
    UnsupportedAggregation { name: String },

    /// Unknown comparison operator.
    #[error("unsupported comparison: {name}")]
    UnsupportedComparison { name: String },

    /// Rule targets a metric outside the fixed catalogue.
    #[error("unknown metric: {name}")]
    UnknownMetric { name: String },

    /// Rule source could not be read; the run degrades to an empty rule set.
    #[error("rule source unavailable: {reason}")]
    RuleSourceUnavailable { reason: String },

    /// Samples for one page could not be loaded; the page is skipped.
    #[error("sample source unavailable for {page}: {reason}")]
    SampleSourceUnavailable { page: String, reason: String },

    /// Loading a page exceeded its wall-clock budget; the page is skipped.
    #[error("page {page} timed out after {budget:?}")]
    PageTimeout { page: String, budget: Duration },
}

impl EngineError {
    pub fn empty_series(metric: impl Into<String>) -> Self {
        Self::EmptySeries {
            metric: metric.into(),
        }
    }

    pub fn sample_source(page: impl Into<String>, reason: impl ToString) -> Self {
        Self::SampleSourceUnavailable {
            page: page.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error means a page contributed nothing to the run.
    pub fn is_page_skip(&self) -> bool {
        matches!(
            self,
            Self::SampleSourceUnavailable { .. } | Self::PageTimeout { .. }
        )
    }
}

/// Configuration errors. These are the only fatal errors of a run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unsupported config version {found} (supported: {supported})")]
    Version { found: u32, supported: u32 },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A rule that could not be evaluated for one result set.
///
/// Recorded in the report instead of aborting the run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProcessingError {
    /// Descriptive name of the rule (name, else `scope target`).
    pub rule: String,
    /// Page identifier, `None` for the pooled pass or page-level failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    pub message: String,
}
