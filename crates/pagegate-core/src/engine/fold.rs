//! Two-phase rule evaluation as an explicit fold over an ordered page list.
//!
//! Phase 1 visits pages in the given order: each page is aggregated, its
//! `every` rules and then its page-scoped rules are evaluated, and its
//! samples join the pooled series. Phase 2 evaluates the `all` rules once
//! against the pooled series. The accumulator is the only mutable state.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{aggregate_metric, Aggregator};
use crate::errors::{EngineError, ProcessingError};
use crate::model::{AggregatedMetrics, PageSamples, PooledSamples, RunTally};
use crate::scope::ScopeResolver;
use crate::thresholds::{is_failed, FailedThreshold, ThresholdRule};

/// One rule evaluation that produced a pass/fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub rule: String,
    /// `None` for the pooled pass.
    pub page: Option<String>,
    pub actual: f64,
    pub failed: bool,
}

/// Outcome of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub name: String,
    pub identifier: String,
    pub file_name: Option<String>,
    pub metrics: AggregatedMetrics,
    /// Evaluations of this page only.
    pub tally: RunTally,
}

/// Running state of a run.
///
/// The single fold step: [`fold_run`] drives it over pages already in
/// memory, the async runner drives it as pages arrive from a sample source.
/// Both go through [`evaluate_page`](Self::evaluate_page) and
/// [`finish`](Self::finish), so they count and order evaluations alike.
#[derive(Debug, Clone, Default)]
pub struct RunAccumulator {
    pub tally: RunTally,
    pub failed: Vec<FailedThreshold>,
    pub errors: Vec<ProcessingError>,
    pub evaluations: Vec<RuleEvaluation>,
    pub pages: Vec<PageResult>,
    pooled: PooledSamples,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunEvaluation {
    pub tally: RunTally,
    pub failed: Vec<FailedThreshold>,
    pub errors: Vec<ProcessingError>,
    pub evaluations: Vec<RuleEvaluation>,
    pub pages: Vec<PageResult>,
    /// Pooled series aggregated with the page aggregation function.
    pub pooled_metrics: AggregatedMetrics,
}

impl RunAccumulator {
    /// Phase 1 step for one page.
    pub fn evaluate_page(
        &mut self,
        resolver: &ScopeResolver,
        aggregator: Aggregator,
        page: &PageSamples,
    ) -> PageResult {
        let metrics = aggregator.page(page);
        let mut page_tally = RunTally::default();

        for rule in resolver.for_page(&page.identifier) {
            let actual = metrics
                .get(rule.target)
                .ok_or_else(|| EngineError::empty_series(rule.target.as_str()));
            if let Some(failed) = self.record(rule, actual, Some(&page.identifier)) {
                page_tally.record(failed);
            }
        }

        self.pooled.absorb(page);
        let result = PageResult {
            name: page.name.clone(),
            identifier: page.identifier.clone(),
            file_name: page.file_name.clone(),
            metrics,
            tally: page_tally,
        };
        self.pages.push(result.clone());
        result
    }

    /// Record a page that contributed nothing (load failure or timeout).
    pub fn skip_page(&mut self, page: &str, error: &EngineError) {
        warn!(page, error = %error, "skipping page");
        self.errors.push(ProcessingError {
            rule: "*".to_string(),
            page: Some(page.to_string()),
            message: error.to_string(),
        });
    }

    /// Phase 2: the `all` rules against the pooled series.
    pub fn finish(mut self, resolver: &ScopeResolver, aggregator: Aggregator) -> RunEvaluation {
        let pooled_metrics = aggregator.pooled(&self.pooled);

        for rule in resolver.pooled() {
            let actual = if rule.target.is_sampled() {
                let samples = self
                    .pooled
                    .series(rule.target)
                    .map(|s| s.samples())
                    .unwrap_or_default();
                aggregate_metric(rule.target, rule.aggregation, samples)
            } else {
                pooled_metrics
                    .get(rule.target)
                    .ok_or_else(|| EngineError::empty_series(rule.target.as_str()))
            };
            self.record(rule, actual, None);
        }

        RunEvaluation {
            tally: self.tally,
            failed: self.failed,
            errors: self.errors,
            evaluations: self.evaluations,
            pages: self.pages,
            pooled_metrics,
        }
    }

    pub fn pooled(&self) -> &PooledSamples {
        &self.pooled
    }

    /// Evaluate one rule; returns whether it failed, `None` if it could not be evaluated.
    fn record(
        &mut self,
        rule: &ThresholdRule,
        actual: Result<f64, EngineError>,
        page: Option<&str>,
    ) -> Option<bool> {
        let actual = match actual {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    rule = %rule.label(),
                    page = page.unwrap_or("all"),
                    error = %e,
                    "threshold could not be evaluated"
                );
                self.errors.push(ProcessingError {
                    rule: rule.label(),
                    page: page.map(str::to_string),
                    message: e.to_string(),
                });
                return None;
            }
        };

        let failed = is_failed(actual, rule.comparison, rule.value);
        self.tally.record(failed);
        let status = if failed { "FAILED" } else { "PASSED" };
        info!(
            "Threshold: {} {} {} {} value {} {} rule {} {} [{}]",
            rule.label(),
            rule.scope,
            rule.target,
            rule.aggregation,
            actual,
            if failed { "violates" } else { "complies with" },
            rule.comparison,
            rule.value,
            status
        );

        if failed {
            self.failed.push(FailedThreshold {
                rule: rule.clone(),
                actual_value: actual,
                page: page.map(str::to_string),
            });
        }
        self.evaluations.push(RuleEvaluation {
            rule: rule.label(),
            page: page.map(str::to_string),
            actual,
            failed,
        });
        Some(failed)
    }
}

/// Fold every page, then run the pooled pass.
///
/// `observer` sees each page's result and the running tally right after
/// the page's `every` and page-scoped rules were evaluated.
pub fn fold_run<'a, I, F>(
    resolver: &ScopeResolver,
    aggregator: Aggregator,
    pages: I,
    mut observer: F,
) -> RunEvaluation
where
    I: IntoIterator<Item = &'a PageSamples>,
    F: FnMut(&PageResult, &RunTally),
{
    let acc = pages
        .into_iter()
        .fold(RunAccumulator::default(), |mut acc, page| {
            let result = acc.evaluate_page(resolver, aggregator, page);
            observer(&result, &acc.tally);
            acc
        });
    acc.finish(resolver, aggregator)
}
