//! Threshold rules: wire decoding, validation and failure records.

pub mod evaluate;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregation;
use crate::errors::EngineError;
use crate::model::Metric;

pub use evaluate::{is_failed, is_failed_named, Comparison};

/// Which result set a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Once, against the pooled samples of every page.
    All,
    /// Once per page, against that page's aggregated metrics.
    Every,
    /// Only the page whose identifier matches exactly.
    Page(String),
}

impl Scope {
    pub fn matches_page(&self, identifier: &str) -> bool {
        matches!(self, Scope::Page(p) if p == identifier)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Every => f.write_str("every"),
            Scope::Page(p) => f.write_str(p),
        }
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        match s {
            "all" => Scope::All,
            "every" => Scope::Every,
            page => Scope::Page(page.to_string()),
        }
    }
}

/// Threshold rule as served by the rule source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawThresholdRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub scope: String,
    pub target: String,
    pub aggregation: String,
    pub comparison: String,
    #[serde(alias = "metric")]
    pub value: f64,
}

/// Validated threshold rule. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdRule", into = "RawThresholdRule")]
pub struct ThresholdRule {
    pub id: Option<String>,
    pub name: Option<String>,
    pub test: Option<String>,
    pub environment: Option<String>,
    pub scope: Scope,
    pub target: Metric,
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub value: f64,
}

impl ThresholdRule {
    pub fn new(
        scope: Scope,
        target: Metric,
        aggregation: Aggregation,
        comparison: Comparison,
        value: f64,
    ) -> Self {
        Self {
            id: None,
            name: None,
            test: None,
            environment: None,
            scope,
            target,
            aggregation,
            comparison,
            value,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Short label for logs and processing errors.
    pub fn label(&self) -> String {
        match &self.name {
            Some(n) if !n.is_empty() => n.clone(),
            _ => format!("{} {} {}", self.scope, self.target, self.aggregation),
        }
    }

    /// `aggregation(target) sign value`, e.g. `max(total) <= 3000`.
    pub fn describe(&self) -> String {
        format!(
            "{}({}) {} {}",
            self.aggregation,
            self.target,
            self.comparison.sign(),
            self.value
        )
    }
}

impl TryFrom<RawThresholdRule> for ThresholdRule {
    type Error = EngineError;

    fn try_from(raw: RawThresholdRule) -> Result<Self, Self::Error> {
        let id = raw.id.map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Ok(Self {
            id,
            name: raw.name,
            test: raw.test,
            environment: raw.environment,
            scope: Scope::from(raw.scope.as_str()),
            target: raw.target.parse()?,
            aggregation: raw.aggregation.parse()?,
            comparison: raw.comparison.parse()?,
            value: raw.value,
        })
    }
}

impl From<ThresholdRule> for RawThresholdRule {
    fn from(rule: ThresholdRule) -> Self {
        Self {
            id: rule.id.map(serde_json::Value::String),
            name: rule.name,
            test: rule.test,
            environment: rule.environment,
            scope: rule.scope.to_string(),
            target: rule.target.as_str().to_string(),
            aggregation: rule.aggregation.as_str().to_string(),
            comparison: rule.comparison.as_str().to_string(),
            value: rule.value,
        }
    }
}

/// A rule that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleReject {
    /// Position in the source list.
    pub index: usize,
    pub error: String,
}

/// Decode wire rules, keeping source order.
///
/// Invalid entries are returned as rejects instead of failing the batch.
pub fn decode_rules(values: Vec<serde_json::Value>) -> (Vec<ThresholdRule>, Vec<RuleReject>) {
    let mut rules = Vec::with_capacity(values.len());
    let mut rejects = Vec::new();
    for (index, value) in values.into_iter().enumerate() {
        let decoded = serde_json::from_value::<RawThresholdRule>(value)
            .map_err(|e| e.to_string())
            .and_then(|raw| ThresholdRule::try_from(raw).map_err(|e| e.to_string()));
        match decoded {
            Ok(rule) => rules.push(rule),
            Err(error) => {
                tracing::warn!(index, error = %error, "rejecting threshold rule");
                rejects.push(RuleReject { index, error });
            }
        }
    }
    (rules, rejects)
}

/// A rule evaluation that failed, with the offending value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedThreshold {
    #[serde(flatten)]
    pub rule: ThresholdRule,
    pub actual_value: f64,
    /// Page whose result triggered the failure; `None` for `all` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}
