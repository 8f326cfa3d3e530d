use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::interfaces::{ExportSink, ReportSink};
use crate::report::csv::write_csv_gz;
use crate::report::{PageReport, ReportPayload, ReportRecord};

pub const PAGES_FILE: &str = "pages.jsonl";
pub const REPORT_FILE: &str = "report.json";
pub const EXPORT_FILE: &str = "records.csv.gz";

/// Writes page updates and the final report under one directory.
#[derive(Debug, Clone)]
pub struct LocalReportSink {
    dir: PathBuf,
}

impl LocalReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }
}

#[async_trait]
impl ReportSink for LocalReportSink {
    async fn page_update(&self, report_id: &str, page: &PageReport) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut line = serde_json::to_vec(&serde_json::json!({
            "report_id": report_id,
            "page": page,
        }))?;
        line.push(b'\n');
        let path = self.dir.join(PAGES_FILE);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn finalize(&self, payload: &ReportPayload) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.report_path();
        tokio::fs::write(&path, serde_json::to_vec_pretty(payload)?)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Writes `records.csv.gz` under a directory.
#[derive(Debug, Clone)]
pub struct CsvExportSink {
    dir: PathBuf,
}

impl CsvExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for CsvExportSink {
    async fn export(&self, report_id: &str, records: &[ReportRecord]) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(EXPORT_FILE);
        let mut buf = Vec::new();
        write_csv_gz(&mut buf, records)?;
        tokio::fs::write(&path, buf)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(report_id, rows = records.len(), path = %path.display(), "exported records");
        Ok(path.display().to_string())
    }
}
