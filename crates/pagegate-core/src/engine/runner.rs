use std::sync::Arc;

use chrono::Utc;
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

use crate::aggregate::Aggregator;
use crate::config::RunConfig;
use crate::engine::fold::{RunAccumulator, RunEvaluation};
use crate::errors::EngineError;
use crate::interfaces::{
    ExportSink, NotificationDispatcher, ReportSink, RuleSource, SampleSource,
};
use crate::model::RunTally;
use crate::notify::Notification;
use crate::report::{finalize, GateOutcome, PageReport, RecordBuilder, ReportPayload};
use crate::scope::ScopeResolver;

/// One progress update: pages done, pages listed, tally so far.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
    pub tally: RunTally,
}

/// Called after each page completes.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// What a run produced.
pub struct RunOutcome {
    pub outcome: GateOutcome,
    pub payload: ReportPayload,
    pub evaluation: RunEvaluation,
    pub export_location: Option<String>,
    /// Delivery of the final report failed. The verdict still stands.
    pub report_error: Option<anyhow::Error>,
    /// The sample source could not list its pages; the report covers no pages.
    pub listing_error: Option<EngineError>,
}

pub struct Runner {
    pub config: RunConfig,
    pub rules: Arc<dyn RuleSource>,
    pub samples: Arc<dyn SampleSource>,
    pub report: Arc<dyn ReportSink>,
    pub export: Option<Arc<dyn ExportSink>>,
    pub notifier: Option<Arc<dyn NotificationDispatcher>>,
    page_timeout: Duration,
}

impl Runner {
    pub fn new(
        config: RunConfig,
        rules: Arc<dyn RuleSource>,
        samples: Arc<dyn SampleSource>,
        report: Arc<dyn ReportSink>,
    ) -> Self {
        let page_timeout = config.page_timeout();
        Self {
            config,
            rules,
            samples,
            report,
            export: None,
            notifier: None,
            page_timeout,
        }
    }

    pub fn with_export(mut self, export: Arc<dyn ExportSink>) -> Self {
        self.export = Some(export);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_page_timeout(mut self, page_timeout: Duration) -> Self {
        self.page_timeout = page_timeout;
        self
    }

    /// Evaluate every page, then the pooled rules, then deliver.
    ///
    /// Collaborator failures degrade the run instead of aborting it: a page
    /// list that cannot be read yields a report without pages, recorded in
    /// [`RunOutcome::listing_error`]. The final report is always offered to
    /// the report sink.
    pub async fn run(&self, progress: Option<ProgressSink>) -> anyhow::Result<RunOutcome> {
        let cfg = &self.config;
        let started = Utc::now();

        let rules = match self.rules.fetch_rules(&cfg.test_name, &cfg.environment).await {
            Ok(rules) => rules,
            Err(e) => {
                warn!(source = self.rules.name(), error = %e, "no thresholds available, evaluating without rules");
                Vec::new()
            }
        };
        info!(
            source = self.rules.name(),
            count = rules.len(),
            test = %cfg.test_name,
            environment = %cfg.environment,
            "loaded thresholds"
        );
        let resolver = ScopeResolver::new(rules);
        let aggregator = Aggregator::new(cfg.page_aggregation);
        let records = RecordBuilder::new(started, cfg.bucket.clone());

        let mut acc = RunAccumulator::default();
        let (keys, listing_error) = match self.samples.list_pages().await {
            Ok(keys) => (keys, None),
            Err(e) => {
                acc.skip_page("*", &e);
                (Vec::new(), Some(e))
            }
        };
        let total = keys.len();
        let mut page_reports = Vec::with_capacity(total);
        let mut rows = Vec::new();

        for (done, key) in keys.iter().enumerate() {
            let loaded = match timeout(self.page_timeout, self.samples.load_page(key)).await {
                Ok(loaded) => loaded,
                Err(_) => Err(EngineError::PageTimeout {
                    page: key.clone(),
                    budget: self.page_timeout,
                }),
            };
            match loaded {
                Ok(page) => {
                    let result = acc.evaluate_page(&resolver, aggregator, &page);
                    rows.extend(records.page_records(&page, &result.metrics));
                    let report = PageReport::new(
                        result.name,
                        result.identifier,
                        result.metrics,
                        result.tally,
                    )
                    .with_provenance(cfg.bucket.clone(), result.file_name.as_deref());
                    if let Err(e) = self.report.page_update(&cfg.report_id, &report).await {
                        warn!(page = %report.identifier, error = %e, "failed to send page report");
                    }
                    page_reports.push(report);
                }
                Err(e) => acc.skip_page(key, &e),
            }
            if let Some(ref sink) = progress {
                sink(ProgressEvent {
                    done: done + 1,
                    total,
                    tally: acc.tally,
                });
            }
        }

        let evaluation = acc.finish(&resolver, aggregator);
        let outcome = finalize(evaluation.tally, cfg.quality_gate_percent);
        match &outcome.message {
            Some(m) if outcome.verdict.is_success() => info!("{}", m),
            Some(m) => warn!("{}", m),
            None => info!("no thresholds were evaluated"),
        }

        let payload = ReportPayload::new(&cfg.report_id, Utc::now(), evaluation.tally, &outcome)
            .with_test(&cfg.test_name, &cfg.environment)
            .with_pooled_metrics(evaluation.pooled_metrics.clone())
            .with_failures(evaluation.failed.clone(), evaluation.errors.clone())
            .with_pages(page_reports, rows);

        let report_error = match self.report.finalize(&payload).await {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "failed to send final report");
                Some(e)
            }
        };

        let export_location = match &self.export {
            Some(export) => match export.export(&cfg.report_id, &payload.records).await {
                Ok(location) => Some(location),
                Err(e) => {
                    warn!(error = %e, "bulk export failed");
                    None
                }
            },
            None => None,
        };

        if let Some(notifier) = &self.notifier {
            if !cfg.notifications.is_empty() {
                let notification = Notification {
                    channels: cfg.notifications.clone(),
                    test_name: cfg.test_name.clone(),
                    environment: cfg.environment.clone(),
                    test_id: cfg.test_id.clone(),
                    report_id: cfg.report_id.clone(),
                    verdict: outcome.verdict,
                    tally: evaluation.tally,
                    failed_thresholds: evaluation.failed.clone(),
                    engagement: cfg.engagement.clone(),
                };
                if let Err(e) = notifier.dispatch(&notification).await {
                    warn!(error = %e, "notification dispatch failed");
                }
            }
        }

        Ok(RunOutcome {
            outcome,
            payload,
            evaluation,
            export_location,
            report_error,
            listing_error,
        })
    }
}
