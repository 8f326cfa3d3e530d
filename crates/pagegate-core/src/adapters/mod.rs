//! File-backed collaborators.

mod local;
mod outbox;
mod rules;
mod samples;

pub use local::{CsvExportSink, LocalReportSink, EXPORT_FILE, PAGES_FILE, REPORT_FILE};
pub use outbox::OutboxDispatcher;
pub use rules::{load_rules_file, parse_rules, FileRuleSource};
pub use samples::{JsonSampleSource, PageFile};
