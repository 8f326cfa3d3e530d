use super::{format_percent, ReportPayload, Verdict};
use crate::thresholds::FailedThreshold;

/// One line per page, then failed rules, then the verdict.
#[must_use]
pub fn format_summary(payload: &ReportPayload) -> Vec<String> {
    let mut lines = Vec::new();
    for page in &payload.pages {
        let icon = if page.thresholds_failed == 0 { "✅" } else { "❌" };
        lines.push(format!(
            "{} {:<40} {}/{} thresholds failed",
            icon, page.identifier, page.thresholds_failed, page.thresholds_total
        ));
    }
    if !payload.failed_thresholds.is_empty() {
        lines.push(String::new());
        lines.push("Failed thresholds:".to_string());
        for f in &payload.failed_thresholds {
            lines.push(format!("  → {}", format_failure(f)));
        }
    }
    for e in &payload.processing_errors {
        let page = e.page.as_deref().unwrap_or("all");
        lines.push(format!("⚠️  {} [{}]: {}", e.rule, page, e.message));
    }
    lines.push(String::new());
    let verdict = match payload.verdict {
        Verdict::Success => "SUCCESS",
        Verdict::Failed => "FAILED",
    };
    let rate = super::violated_percent(payload.tally());
    lines.push(format!(
        "Verdict: {} ({} of {} thresholds failed, {}%)",
        verdict,
        payload.thresholds_failed,
        payload.thresholds_total,
        format_percent(rate)
    ));
    if let Some(d) = &payload.description {
        lines.push(format!("    {}", d));
    }
    lines
}

fn format_failure(f: &FailedThreshold) -> String {
    let at = f.page.as_deref().unwrap_or("all pages");
    format!(
        "{} @ {}: actual {} violates {}",
        f.rule.label(),
        at,
        f.actual_value,
        f.rule.describe()
    )
}

pub fn print_summary(payload: &ReportPayload) {
    eprintln!();
    for line in format_summary(payload) {
        eprintln!("{}", line);
    }
}
