use std::sync::Arc;

use anyhow::Context;
use pagegate_client::{ObserverClient, ObserverConfig};
use pagegate_core::adapters::{
    CsvExportSink, FileRuleSource, JsonSampleSource, LocalReportSink, OutboxDispatcher,
    REPORT_FILE,
};
use pagegate_core::config::{load_config, RunConfig};
use pagegate_core::engine::{ProgressEvent, ProgressSink, Runner};
use pagegate_core::interfaces::{ReportSink, RuleSource};
use pagegate_core::report::console::print_summary;
use pagegate_core::report::write_report;
use tracing::{info, warn};

use crate::cli::args::RunArgs;
use crate::exit_codes;

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let cfg = match resolve_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e:#}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let observer = match &cfg.observer {
        Some(settings) => Some(Arc::new(
            ObserverClient::new(ObserverConfig::from(settings))
                .context("failed to create observer client")?,
        )),
        None => None,
    };

    let rules: Arc<dyn RuleSource> = match (&args.rules, &observer) {
        (Some(path), _) => Arc::new(FileRuleSource::new(path)),
        (None, Some(client)) => client.clone(),
        (None, None) => {
            eprintln!("config error: pass --rules or configure an observer to fetch thresholds");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let report: Arc<dyn ReportSink> = match &observer {
        Some(client) => client.clone(),
        None => Arc::new(LocalReportSink::new(&args.out)),
    };

    let mut runner = Runner::new(
        cfg.clone(),
        rules,
        Arc::new(JsonSampleSource::new(&args.samples)),
        report,
    )
    .with_notifier(Arc::new(OutboxDispatcher::new(args.out.join("outbox"))));
    if !args.no_export {
        runner = runner.with_export(Arc::new(CsvExportSink::new(&args.out)));
    }

    let progress: ProgressSink = Arc::new(|e: ProgressEvent| {
        info!(
            done = e.done,
            total = e.total,
            failed = e.tally.thresholds_failed,
            evaluated = e.tally.thresholds_total,
            "page processed"
        );
    });
    let outcome = runner.run(Some(progress)).await?;

    // The observer only receives totals; keep the full payload next to the export.
    if observer.is_some() {
        let path = args.out.join(REPORT_FILE);
        if let Err(e) = write_report(&outcome.payload, &path) {
            warn!(path = %path.display(), error = %e, "failed to write local report");
        }
    }
    if let Some(e) = &outcome.report_error {
        warn!(error = %e, "final report was not delivered");
    }

    print_summary(&outcome.payload);

    if let Some(e) = &outcome.listing_error {
        eprintln!("input error: {e}");
        return Ok(exit_codes::CONFIG_ERROR);
    }
    Ok(if outcome.outcome.verdict.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::GATE_FAILED
    })
}

/// File, then `PAGEGATE_*`, then flags.
fn resolve_config(args: &RunArgs) -> anyhow::Result<RunConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    }
    .apply_env_overrides()?;

    if let Some(gate) = args.quality_gate {
        cfg.quality_gate_percent = gate;
    }
    if let Some(aggregation) = args.aggregation {
        cfg.page_aggregation = aggregation;
    }
    if let Some(name) = &args.test_name {
        cfg.test_name = name.clone();
    }
    if let Some(env) = &args.environment {
        cfg.environment = env.clone();
    }
    if let Some(id) = &args.report_id {
        cfg.report_id = id.clone();
    }
    if cfg.report_id.is_empty() {
        cfg.report_id = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
    }

    cfg.validate()?;
    Ok(cfg)
}
