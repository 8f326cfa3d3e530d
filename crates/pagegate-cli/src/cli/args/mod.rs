use clap::{Parser, Subcommand, ValueEnum};

pub mod run;
pub use run::*;

use std::path::PathBuf;

use pagegate_core::Aggregation;

#[derive(Parser)]
#[command(
    name = "pagegate",
    version,
    about = "Threshold quality gate for page performance runs"
)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate a run against its thresholds and write the report
    Run(RunArgs),
    /// Check a rules file without running anything
    Validate(ValidateArgs),
    /// Aggregate numbers with one of the supported functions
    Aggregate(AggregateArgs),
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Clone, Debug)]
pub struct ValidateArgs {
    #[arg(long)]
    pub rules: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Clone, Debug)]
pub struct AggregateArgs {
    /// max | min | avg | pct50 | pct95
    #[arg(long = "fn", default_value = "max")]
    pub function: Aggregation,

    #[arg(required = true, allow_negative_numbers = true)]
    pub values: Vec<f64>,
}
