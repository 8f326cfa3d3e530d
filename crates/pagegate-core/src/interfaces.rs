//! Collaborators the runner talks to.
//!
//! File-backed implementations live in [`crate::adapters`]; the HTTP
//! observer implementation lives in the client crate.

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::model::PageSamples;
use crate::notify::Notification;
use crate::report::{PageReport, ReportPayload, ReportRecord};
use crate::thresholds::ThresholdRule;

/// Supplies the threshold rules of a test in one environment.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Unavailability is reported as [`EngineError::RuleSourceUnavailable`];
    /// the runner degrades it to an empty rule set.
    async fn fetch_rules(
        &self,
        test_name: &str,
        environment: &str,
    ) -> Result<Vec<ThresholdRule>, EngineError>;

    fn name(&self) -> &'static str;
}

/// Supplies raw samples page by page, in report order.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Page keys in the order they are to be evaluated.
    async fn list_pages(&self) -> Result<Vec<String>, EngineError>;

    async fn load_page(&self, key: &str) -> Result<PageSamples, EngineError>;
}

/// Receives partial page reports and the final report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn page_update(&self, report_id: &str, page: &PageReport) -> anyhow::Result<()>;

    async fn finalize(&self, payload: &ReportPayload) -> anyhow::Result<()>;
}

/// Bulk export of normalized report rows.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Returns where the export ended up.
    async fn export(&self, report_id: &str, records: &[ReportRecord]) -> anyhow::Result<String>;
}

/// Delivers the end-of-run notification.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> anyhow::Result<()>;
}
