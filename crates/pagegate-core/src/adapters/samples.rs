use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::interfaces::SampleSource;
use crate::model::{Metric, MetricSeries, PageSamples, Sample};

/// One page as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub samples: BTreeMap<String, Vec<Sample>>,
}

impl PageFile {
    /// Identifier defaults to `{name}@open`. Unknown and derived metric
    /// keys are dropped with a warning.
    pub fn into_samples(self) -> PageSamples {
        let identifier = self
            .identifier
            .unwrap_or_else(|| format!("{}@open", self.name));
        let mut page = PageSamples::new(self.name, identifier);
        page.file_name = self.file_name;
        for (key, values) in self.samples {
            match key.parse::<Metric>() {
                Ok(metric) if metric.is_sampled() => {
                    page.series.insert(metric, MetricSeries::new(values));
                }
                Ok(metric) => {
                    debug!(page = %page.identifier, %metric, "ignoring derived metric in samples");
                }
                Err(e) => {
                    warn!(page = %page.identifier, error = %e, "ignoring sample series");
                }
            }
        }
        page
    }
}

/// Samples from JSON on disk.
///
/// The path is either one file holding an array of pages, or a directory
/// with one page per `.json` file, evaluated oldest first (ties by name).
/// Pages of an array file are decoded one at a time, so a malformed entry
/// only costs that page.
#[derive(Debug)]
pub struct JsonSampleSource {
    path: PathBuf,
    bundle: OnceCell<Vec<serde_json::Value>>,
}

const BUNDLE_KEY_PREFIX: &str = "#";

impl JsonSampleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bundle: OnceCell::new(),
        }
    }

    async fn bundle(&self) -> Result<&Vec<serde_json::Value>, EngineError> {
        self.bundle
            .get_or_try_init(|| async {
                let raw = tokio::fs::read_to_string(&self.path)
                    .await
                    .map_err(|e| EngineError::sample_source(self.path.display().to_string(), e))?;
                serde_json::from_str::<Vec<serde_json::Value>>(&raw)
                    .map_err(|e| EngineError::sample_source(self.path.display().to_string(), e))
            })
            .await
    }

    async fn is_dir(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

#[async_trait]
impl SampleSource for JsonSampleSource {
    async fn list_pages(&self) -> Result<Vec<String>, EngineError> {
        if !self.is_dir().await {
            let count = self.bundle().await?.len();
            return Ok((0..count).map(|i| format!("{BUNDLE_KEY_PREFIX}{i}")).collect());
        }

        let unavailable = |e: std::io::Error| {
            EngineError::sample_source(self.path.display().to_string(), e)
        };
        let mut entries = tokio::fs::read_dir(&self.path).await.map_err(unavailable)?;
        let mut files: Vec<(SystemTime, String, PathBuf)> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push((modified, name, path));
        }
        files.sort();
        Ok(files
            .into_iter()
            .map(|(_, _, path)| path.display().to_string())
            .collect())
    }

    async fn load_page(&self, key: &str) -> Result<PageSamples, EngineError> {
        if let Some(index) = key.strip_prefix(BUNDLE_KEY_PREFIX) {
            let index: usize = index
                .parse()
                .map_err(|_| EngineError::sample_source(key, "bad page index"))?;
            let value = self
                .bundle()
                .await?
                .get(index)
                .cloned()
                .ok_or_else(|| EngineError::sample_source(key, "no such page"))?;
            let file: PageFile =
                serde_json::from_value(value).map_err(|e| EngineError::sample_source(key, e))?;
            return Ok(file.into_samples());
        }

        let path = Path::new(key);
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::sample_source(key, e))?;
        let mut file: PageFile =
            serde_json::from_str(&raw).map_err(|e| EngineError::sample_source(key, e))?;
        if file.file_name.is_none() {
            file.file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
        }
        Ok(file.into_samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_json(name: &str, total: &[f64]) -> String {
        serde_json::json!({"name": name, "samples": {"total": total, "speed_index": [1.0]}})
            .to_string()
    }

    #[tokio::test]
    async fn bundle_file_lists_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.json");
        let body = format!(
            "[{},{}]",
            page_json("https://a.test/", &[1.0, 2.0]),
            page_json("https://b.test/", &[3.0])
        );
        std::fs::write(&path, body).unwrap();

        let source = JsonSampleSource::new(&path);
        let keys = source.list_pages().await.unwrap();
        assert_eq!(keys, vec!["#0", "#1"]);
        let b = source.load_page(&keys[1]).await.unwrap();
        assert_eq!(b.identifier, "https://b.test/@open");
        assert_eq!(b.series(Metric::Total).unwrap().samples(), &[3.0]);
    }

    #[tokio::test]
    async fn malformed_bundle_entry_only_skips_that_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.json");
        let body = format!(
            "[{},{{\"samples\": {{\"total\": \"fast\"}}}},{}]",
            page_json("https://a.test/", &[1.0]),
            page_json("https://c.test/", &[2.0])
        );
        std::fs::write(&path, body).unwrap();

        let source = JsonSampleSource::new(&path);
        let keys = source.list_pages().await.unwrap();
        assert_eq!(keys.len(), 3);
        assert!(source.load_page(&keys[0]).await.is_ok());
        let err = source.load_page(&keys[1]).await.unwrap_err();
        assert!(err.is_page_skip());
        let c = source.load_page(&keys[2]).await.unwrap();
        assert_eq!(c.name, "https://c.test/");
    }

    #[tokio::test]
    async fn bundle_that_is_not_an_array_cannot_be_listed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.json");
        std::fs::write(&path, "{\"name\": \"solo\"}").unwrap();

        let err = JsonSampleSource::new(&path).list_pages().await.unwrap_err();
        assert!(matches!(err, EngineError::SampleSourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn directory_pages_get_their_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), page_json("a", &[1.0])).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = JsonSampleSource::new(dir.path());
        let keys = source.list_pages().await.unwrap();
        assert_eq!(keys.len(), 1);
        let page = source.load_page(&keys[0]).await.unwrap();
        assert_eq!(page.file_name.as_deref(), Some("a.json"));
    }

    #[tokio::test]
    async fn broken_page_is_a_sample_source_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let source = JsonSampleSource::new(dir.path());
        let keys = source.list_pages().await.unwrap();
        let err = source.load_page(&keys[0]).await.unwrap_err();
        assert!(err.is_page_skip());
    }

    #[test]
    fn unknown_metric_keys_are_dropped() {
        let file: PageFile = serde_json::from_value(serde_json::json!({
            "name": "p",
            "identifier": "p-id",
            "samples": {"total": [1.0], "ttfb": [2.0], "requests": [9.0]}
        }))
        .unwrap();
        let page = file.into_samples();
        assert_eq!(page.identifier, "p-id");
        assert_eq!(page.series.len(), 1);
    }
}
