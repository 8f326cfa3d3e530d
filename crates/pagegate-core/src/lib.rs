//! Metric aggregation and threshold quality gate for page performance runs.
//!
//! A run folds over an ordered list of pages. Each page's samples are
//! aggregated and checked against the `every` rules and the rules scoped to
//! that page; once all pages are in, the `all` rules are checked against the
//! pooled samples. The resulting tally decides the verdict:
//!
//! ```
//! use pagegate_core::model::RunTally;
//! use pagegate_core::report::{finalize, Verdict};
//!
//! let tally = RunTally { thresholds_total: 10, thresholds_failed: 3 };
//! let outcome = finalize(tally, 20.0);
//! assert_eq!(outcome.verdict, Verdict::Failed);
//! ```

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod engine;
pub mod errors;
pub mod interfaces;
pub mod model;
pub mod notify;
pub mod report;
pub mod scope;
pub mod thresholds;

pub use aggregate::{aggregate, Aggregation, Aggregator};
pub use config::{load_config, RunConfig};
pub use engine::{fold_run, Runner};
pub use errors::{ConfigError, EngineError, ProcessingError};
pub use report::{finalize, GateOutcome, Verdict};
pub use scope::ScopeResolver;
pub use thresholds::{Comparison, Scope, ThresholdRule};
