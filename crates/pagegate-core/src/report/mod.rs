//! Quality-gate verdict and report payloads.

pub mod console;
pub mod csv;
pub mod records;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ProcessingError;
use crate::model::{AggregatedMetrics, RunTally};
use crate::thresholds::FailedThreshold;

pub use records::{RecordBuilder, RecordLoop, ReportRecord};

/// Default maximum tolerable share of failed thresholds, in percent.
pub const DEFAULT_QUALITY_GATE_PERCENT: f64 = 20.0;

/// Final classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Success,
    Failed,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }
}

/// Verdict plus the figures it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub verdict: Verdict,
    /// Failed share in percent, rounded to 2 decimals. `None` without rules.
    pub violated_percent: Option<f64>,
    /// Human-readable description. `None` when nothing was gated.
    pub message: Option<String>,
}

impl GateOutcome {
    /// Exception text for the observer API: the message on failure, else empty.
    pub fn exception(&self) -> String {
        match (self.verdict, &self.message) {
            (Verdict::Failed, Some(m)) => m.clone(),
            _ => String::new(),
        }
    }
}

/// Derive the verdict from a tally.
///
/// Pure: the same tally and gate always give the same outcome.
pub fn finalize(tally: RunTally, quality_gate_percent: f64) -> GateOutcome {
    if tally.thresholds_total == 0 {
        return GateOutcome {
            verdict: Verdict::Success,
            violated_percent: None,
            message: None,
        };
    }
    let violated = violated_percent(tally);
    if violated > quality_gate_percent {
        GateOutcome {
            verdict: Verdict::Failed,
            violated_percent: Some(violated),
            message: Some(format!(
                "Failed thresholds rate more than {}%",
                format_percent(violated)
            )),
        }
    } else {
        GateOutcome {
            verdict: Verdict::Success,
            violated_percent: Some(violated),
            message: Some(format!(
                "Successfully met more than {}% of thresholds",
                format_percent(round2(100.0 - violated))
            )),
        }
    }
}

/// `round(100 * failed / total, 2)`; 0 when there are no rules.
pub fn violated_percent(tally: RunTally) -> f64 {
    if tally.thresholds_total == 0 {
        return 0.0;
    }
    round2(100.0 * f64::from(tally.thresholds_failed) / f64::from(tally.thresholds_total))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Percent figure with at least one decimal: `30.0`, `33.33`.
pub fn format_percent(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Partial per-page update handed to the report sink as pages complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
    pub metrics: AggregatedMetrics,
    pub bucket_name: String,
    pub file_name: String,
    pub resolution: String,
    pub browser_version: String,
    pub thresholds_total: u32,
    pub thresholds_failed: u32,
}

impl PageReport {
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        metrics: AggregatedMetrics,
        tally: RunTally,
    ) -> Self {
        Self {
            name: name.into(),
            kind: "page".to_string(),
            identifier: identifier.into(),
            metrics,
            bucket_name: "reports".to_string(),
            file_name: String::new(),
            resolution: "auto".to_string(),
            browser_version: "chrome".to_string(),
            thresholds_total: tally.thresholds_total,
            thresholds_failed: tally.thresholds_failed,
        }
    }

    pub fn with_provenance(mut self, bucket: impl Into<String>, file_name: Option<&str>) -> Self {
        self.bucket_name = bucket.into();
        self.file_name = file_name.unwrap_or_default().to_string();
        self
    }
}

/// Status of the final report.
pub const STATUS_FINISHED: &str = "Finished";

/// Final report payload for the report sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report_id: String,
    /// UTC, `%Y-%m-%d %H:%M:%S`.
    pub time: String,
    pub status: String,
    pub test_name: String,
    pub environment: String,
    pub thresholds_total: u32,
    pub thresholds_failed: u32,
    pub verdict: Verdict,
    /// Failure description, empty on success.
    pub exception: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub pooled_metrics: AggregatedMetrics,
    pub failed_thresholds: Vec<FailedThreshold>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub processing_errors: Vec<ProcessingError>,
    pub pages: Vec<PageReport>,
    pub records: Vec<ReportRecord>,
}

impl ReportPayload {
    pub fn new(
        report_id: impl Into<String>,
        time: chrono::DateTime<chrono::Utc>,
        tally: RunTally,
        outcome: &GateOutcome,
    ) -> Self {
        Self {
            report_id: report_id.into(),
            time: time.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: STATUS_FINISHED.to_string(),
            test_name: String::new(),
            environment: String::new(),
            thresholds_total: tally.thresholds_total,
            thresholds_failed: tally.thresholds_failed,
            verdict: outcome.verdict,
            exception: outcome.exception(),
            description: outcome.message.clone(),
            pooled_metrics: AggregatedMetrics::default(),
            failed_thresholds: Vec::new(),
            processing_errors: Vec::new(),
            pages: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn with_test(mut self, test_name: impl Into<String>, environment: impl Into<String>) -> Self {
        self.test_name = test_name.into();
        self.environment = environment.into();
        self
    }

    pub fn with_pooled_metrics(mut self, metrics: AggregatedMetrics) -> Self {
        self.pooled_metrics = metrics;
        self
    }

    pub fn with_failures(
        mut self,
        failed: Vec<FailedThreshold>,
        errors: Vec<ProcessingError>,
    ) -> Self {
        self.failed_thresholds = failed;
        self.processing_errors = errors;
        self
    }

    pub fn with_pages(mut self, pages: Vec<PageReport>, records: Vec<ReportRecord>) -> Self {
        self.pages = pages;
        self.records = records;
        self
    }

    pub fn tally(&self) -> RunTally {
        RunTally {
            thresholds_total: self.thresholds_total,
            thresholds_failed: self.thresholds_failed,
        }
    }
}

/// Write the payload as pretty JSON.
pub fn write_report(payload: &ReportPayload, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(out, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(total: u32, failed: u32) -> RunTally {
        RunTally {
            thresholds_total: total,
            thresholds_failed: failed,
        }
    }

    #[test]
    fn zero_total_is_success_without_message() {
        for failed in [0, 3] {
            let out = finalize(tally(0, failed), 20.0);
            assert_eq!(out.verdict, Verdict::Success);
            assert!(out.message.is_none());
            assert_eq!(out.exception(), "");
        }
    }

    #[test]
    fn thirty_percent_fails_a_twenty_percent_gate() {
        let out = finalize(tally(10, 3), 20.0);
        assert_eq!(out.verdict, Verdict::Failed);
        assert_eq!(out.violated_percent, Some(30.0));
        let msg = out.message.clone().unwrap();
        assert!(msg.contains("30.0%"), "{msg}");
        assert_eq!(out.exception(), msg);
    }

    #[test]
    fn ten_percent_passes_a_twenty_percent_gate() {
        let out = finalize(tally(10, 1), 20.0);
        assert_eq!(out.verdict, Verdict::Success);
        assert_eq!(
            out.message.as_deref(),
            Some("Successfully met more than 90.0% of thresholds")
        );
        assert_eq!(out.exception(), "");
    }

    #[test]
    fn rate_equal_to_gate_passes() {
        assert_eq!(finalize(tally(5, 1), 20.0).verdict, Verdict::Success);
    }

    #[test]
    fn fractional_rates_keep_two_decimals() {
        let out = finalize(tally(3, 1), 20.0);
        assert_eq!(out.violated_percent, Some(33.33));
        assert_eq!(
            out.message.as_deref(),
            Some("Failed thresholds rate more than 33.33%")
        );
        let ok = finalize(tally(3, 1), 50.0);
        assert_eq!(
            ok.message.as_deref(),
            Some("Successfully met more than 66.67% of thresholds")
        );
    }

    #[test]
    fn finalize_is_idempotent() {
        let t = tally(7, 2);
        assert_eq!(finalize(t, 20.0), finalize(t, 20.0));
    }

    #[test]
    fn payload_carries_tally_and_exception() {
        let t = tally(4, 4);
        let out = finalize(t, 20.0);
        let time = chrono::DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let payload = ReportPayload::new("r-1", time, t, &out).with_test("checkout", "Default");
        assert_eq!(payload.time, "2026-01-02 03:04:05");
        assert_eq!(payload.status, "Finished");
        assert_eq!(payload.tally(), t);
        assert_eq!(payload.exception, "Failed thresholds rate more than 100.0%");
    }
}
