//! Run command arguments.

use std::path::PathBuf;

use clap::Parser;
use pagegate_core::Aggregation;

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// YAML run config; defaults apply when omitted
    #[arg(long, env = "PAGEGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Page samples: a JSON file with an array of pages, or a directory of page files
    #[arg(long)]
    pub samples: PathBuf,

    /// Threshold rules file; without it rules come from the configured observer
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Directory for report.json, pages.jsonl, records.csv.gz and the outbox
    #[arg(long, default_value = ".pagegate")]
    pub out: PathBuf,

    /// Maximum tolerated share of failed thresholds, in percent
    #[arg(long)]
    pub quality_gate: Option<f64>,

    /// Per-page aggregation function
    #[arg(long)]
    pub aggregation: Option<Aggregation>,

    #[arg(long)]
    pub test_name: Option<String>,

    #[arg(long)]
    pub environment: Option<String>,

    #[arg(long)]
    pub report_id: Option<String>,

    /// Skip the records.csv.gz export
    #[arg(long)]
    pub no_export: bool,
}
