#![allow(deprecated)] // cargo_bin is deprecated but still supported by assert_cmd
use std::fs;
use std::io::Read;
use std::path::Path;

use assert_cmd::Command;
use flate2::read::GzDecoder;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

const PAGES: &str = r#"[
  {"name": "https://shop.test/", "samples": {"total": [1200, 1300, 1250]}},
  {"name": "https://shop.test/cart", "file_name": "cart.html", "samples": {"total": [1500, 1700]}}
]"#;

const PASSING_RULES: &str = r#"
- scope: every
  target: total
  aggregation: max
  comparison: lte
  value: 3000
- scope: all
  target: total
  aggregation: pct50
  comparison: lt
  value: 2000
"#;

const FAILING_RULES: &str = r#"
- name: tight budget
  scope: every
  target: total
  aggregation: max
  comparison: lte
  value: 1000
"#;

fn pagegate() -> Command {
    let mut cmd = Command::cargo_bin("pagegate").expect("pagegate binary");
    for key in [
        "PAGEGATE_CONFIG",
        "PAGEGATE_OBSERVER_URL",
        "PAGEGATE_PROJECT_ID",
        "PAGEGATE_TOKEN",
        "PAGEGATE_QUALITY_GATE",
        "PAGEGATE_NOTIFICATIONS",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn write_inputs(dir: &Path, rules: &str) {
    fs::write(dir.join("pages.json"), PAGES).unwrap();
    fs::write(dir.join("rules.yaml"), rules).unwrap();
}

fn read_report(out: &Path) -> Value {
    let content = fs::read_to_string(out.join("report.json")).expect("report.json missing");
    serde_json::from_str(&content).expect("Invalid JSON in report.json")
}

#[test]
fn version_prints_package_version() {
    pagegate()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn aggregate_prints_value() {
    pagegate()
        .args(["aggregate", "--fn", "pct95", "10", "20", "30", "40"])
        .assert()
        .success()
        .stdout("40\n");

    pagegate()
        .args(["aggregate", "--fn", "avg", "1", "2", "3", "4"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn aggregate_rejects_unknown_function() {
    pagegate()
        .args(["aggregate", "--fn", "median", "1"])
        .assert()
        .failure();
}

#[test]
fn validate_reports_rejected_rules() {
    let dir = tempdir().unwrap();
    let rules = dir.path().join("rules.yaml");
    fs::write(
        &rules,
        r#"
- scope: every
  target: total
  aggregation: max
  comparison: lte
  value: 3000
- scope: every
  target: total
  aggregation: median
  comparison: lte
  value: 3000
"#,
    )
    .unwrap();

    pagegate()
        .args(["validate", "--format", "json", "--rules"])
        .arg(&rules)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"valid\": 1"))
        .stdout(predicate::str::contains("\"index\": 1"));
}

#[test]
fn validate_missing_file_is_config_error() {
    let dir = tempdir().unwrap();
    pagegate()
        .args(["validate", "--rules"])
        .arg(dir.path().join("absent.yaml"))
        .assert()
        .code(2);
}

#[test]
fn run_within_gate_exits_zero_and_writes_outputs() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), PASSING_RULES);
    let out = dir.path().join("out");

    pagegate()
        .current_dir(dir.path())
        .args([
            "run",
            "--samples",
            "pages.json",
            "--rules",
            "rules.yaml",
            "--test-name",
            "shop",
            "--report-id",
            "r-1",
            "--out",
        ])
        .arg(&out)
        .assert()
        .success();

    let report = read_report(&out);
    assert_eq!(report["report_id"], "r-1");
    assert_eq!(report["thresholds_total"], 3);
    assert_eq!(report["thresholds_failed"], 0);
    assert_eq!(report["exception"], "");

    let mut csv = String::new();
    GzDecoder::new(fs::File::open(out.join("records.csv.gz")).unwrap())
        .read_to_string(&mut csv)
        .unwrap();
    assert!(csv.contains("reports/cart.html"), "{csv}");
}

#[test]
fn run_over_gate_exits_one() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), FAILING_RULES);
    let out = dir.path().join("out");

    pagegate()
        .current_dir(dir.path())
        .args([
            "run",
            "--samples",
            "pages.json",
            "--rules",
            "rules.yaml",
            "--report-id",
            "r-2",
            "--no-export",
            "--out",
        ])
        .arg(&out)
        .assert()
        .code(1);

    let report = read_report(&out);
    assert_eq!(report["thresholds_failed"], 2);
    assert_eq!(
        report["exception"],
        "Failed thresholds rate more than 100.0%"
    );
    assert!(!out.join("records.csv.gz").exists());
}

#[test]
fn run_gate_flag_overrides_default() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), FAILING_RULES);

    pagegate()
        .current_dir(dir.path())
        .args([
            "run",
            "--samples",
            "pages.json",
            "--rules",
            "rules.yaml",
            "--quality-gate",
            "100",
            "--out",
            "out",
        ])
        .assert()
        .success();
}

#[test]
fn run_with_unreadable_samples_still_writes_report() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), PASSING_RULES);
    let out = dir.path().join("out");

    pagegate()
        .current_dir(dir.path())
        .args([
            "run",
            "--samples",
            "missing.json",
            "--rules",
            "rules.yaml",
            "--report-id",
            "r-3",
            "--out",
        ])
        .arg(&out)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("input error"));

    let report = read_report(&out);
    assert_eq!(report["report_id"], "r-3");
    assert_eq!(report["thresholds_total"], 0);
    assert_eq!(report["processing_errors"][0]["page"], "*");
}

#[test]
fn run_without_rule_source_is_config_error() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), PASSING_RULES);

    pagegate()
        .current_dir(dir.path())
        .args(["run", "--samples", "pages.json", "--out", "out"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--rules"));
}

#[test]
fn run_rejects_config_with_wrong_version() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), PASSING_RULES);
    fs::write(dir.path().join("pagegate.yaml"), "version: 9\n").unwrap();

    pagegate()
        .current_dir(dir.path())
        .args([
            "run",
            "--config",
            "pagegate.yaml",
            "--samples",
            "pages.json",
            "--rules",
            "rules.yaml",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config error"));
}
