//! End-of-run notifications: the e-mail event and the issue-tracker payload.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::RunTally;
use crate::report::{format_percent, violated_percent, Verdict};
use crate::thresholds::FailedThreshold;

/// Delivery channels a run can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Issue,
}

/// Everything a dispatcher needs to tell someone about a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channels: Vec<Channel>,
    pub test_name: String,
    pub environment: String,
    pub test_id: String,
    pub report_id: String,
    pub verdict: Verdict,
    pub tally: RunTally,
    pub failed_thresholds: Vec<FailedThreshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<String>,
}

impl Notification {
    pub fn wants(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }

    pub fn email_event(&self) -> EmailEvent {
        EmailEvent {
            notification_type: "ui".to_string(),
            test_id: self.test_id.clone(),
            report_id: self.report_id.clone(),
        }
    }

    /// Issue payload, or `None` when nothing failed.
    pub fn issue(&self) -> Option<IssuePayload> {
        if self.failed_thresholds.is_empty() || self.tally.thresholds_total == 0 {
            return None;
        }
        let title = issue_title(&self.test_name, &self.environment, self.tally);
        Some(IssuePayload {
            issue_id: issue_hash(&title),
            description: issue_description(&self.failed_thresholds),
            title,
            severity: "High".to_string(),
            project: None,
            asset: None,
            kind: "Bug".to_string(),
            engagement: self.engagement.clone(),
            source: "ui_performance".to_string(),
        })
    }
}

/// Event posted to the e-mail notification task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailEvent {
    pub notification_type: String,
    pub test_id: String,
    pub report_id: String,
}

/// Issue-tracker finding for a run that missed thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuePayload {
    /// Hex SHA-256 of the trimmed title; the tracker dedupes on it.
    pub issue_id: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub project: Option<String>,
    pub asset: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub engagement: Option<String>,
    pub source: String,
}

pub fn issue_title(test_name: &str, environment: &str, tally: RunTally) -> String {
    format!(
        "UI test: {}. {} environment. Missed more than {}% thresholds.",
        test_name,
        environment,
        format_percent(violated_percent(tally))
    )
}

pub fn issue_hash(title: &str) -> String {
    hex::encode(Sha256::digest(title.trim().as_bytes()))
}

/// Markdown-ish listing of the failed rules.
pub fn issue_description(failed: &[FailedThreshold]) -> String {
    let mut text = String::from("Failed Thresholds:\n\n---\n");
    for f in failed {
        let rule = &f.rule;
        let fields = [
            ("name", rule.name.clone()),
            ("test", rule.test.clone()),
            ("environment", rule.environment.clone()),
            ("scope", Some(rule.scope.to_string())),
            ("page", f.page.clone()),
            ("actual_value", Some(f.actual_value.to_string())),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                text.push_str(&format!("{}: {}\n", field_label(field), value));
            }
        }
        text.push_str(&format!("Rule: {}\n", rule.describe()));
    }
    text
}

// "actual_value" -> "Actual value"
fn field_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregation;
    use crate::model::Metric;
    use crate::thresholds::{Comparison, Scope, ThresholdRule};

    fn notification(failed: Vec<FailedThreshold>) -> Notification {
        Notification {
            channels: vec![Channel::Email, Channel::Issue],
            test_name: "checkout".into(),
            environment: "staging".into(),
            test_id: "t-1".into(),
            report_id: "r-9".into(),
            verdict: Verdict::Failed,
            tally: RunTally {
                thresholds_total: 10,
                thresholds_failed: 3,
            },
            failed_thresholds: failed,
            engagement: Some("eng-1".into()),
        }
    }

    fn failure() -> FailedThreshold {
        FailedThreshold {
            rule: ThresholdRule::new(
                Scope::Every,
                Metric::Total,
                Aggregation::Pct95,
                Comparison::Lte,
                3000.0,
            )
            .with_name("load budget"),
            actual_value: 3500.0,
            page: Some("https://shop.test/@open".into()),
        }
    }

    #[test]
    fn title_and_hash() {
        let issue = notification(vec![failure()]).issue().unwrap();
        assert_eq!(
            issue.title,
            "UI test: checkout. staging environment. Missed more than 30.0% thresholds."
        );
        assert_eq!(issue.issue_id, issue_hash(&format!("  {}  ", issue.title)));
        assert_eq!(issue.issue_id.len(), 64);
        assert_eq!(issue.severity, "High");
        assert_eq!(issue.kind, "Bug");
        assert_eq!(issue.source, "ui_performance");
    }

    #[test]
    fn description_lists_fields_then_rule() {
        let text = issue_description(&[failure()]);
        assert_eq!(
            text,
            "Failed Thresholds:\n\n---\n\
             Name: load budget\n\
             Scope: every\n\
             Page: https://shop.test/@open\n\
             Actual value: 3500\n\
             Rule: pct95(total) <= 3000\n"
        );
    }

    #[test]
    fn no_issue_without_failures() {
        assert!(notification(vec![]).issue().is_none());
    }

    #[test]
    fn email_event_shape() {
        let v = serde_json::to_value(notification(vec![]).email_event()).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"notification_type": "ui", "test_id": "t-1", "report_id": "r-9"})
        );
    }
}
