pub mod fold;
pub mod runner;

pub use fold::{fold_run, PageResult, RuleEvaluation, RunAccumulator, RunEvaluation};
pub use runner::{ProgressEvent, ProgressSink, RunOutcome, Runner};
