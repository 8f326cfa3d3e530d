//! Normalized report rows, one per (page, iteration) plus one aggregate row per page.
//!
//! Every row carries every column. A metric the page has no value for is
//! written as `0` so tabular consumers always see the same column count.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{AggregatedMetrics, Metric, PageSamples};

/// Bulk-export column order.
pub const COLUMNS: [&str; 15] = [
    "timestamp",
    "name",
    "identifier",
    "type",
    "loop",
    "load_time",
    "dom",
    "tti",
    "fcp",
    "lcp",
    "cls",
    "tbt",
    "fvc",
    "lvc",
    "file",
];

/// Placeholder for a metric the source has no value for.
pub const MISSING_VALUE: f64 = 0.0;

/// Iteration a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLoop {
    /// 1-based iteration number.
    Iteration(usize),
    /// The page's aggregated values.
    Aggregate,
}

impl RecordLoop {
    pub const AGGREGATE_MARKER: &'static str = "aggregated";
}

impl std::fmt::Display for RecordLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordLoop::Iteration(n) => write!(f, "{}", n),
            RecordLoop::Aggregate => f.write_str(Self::AGGREGATE_MARKER),
        }
    }
}

impl Serialize for RecordLoop {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordLoop::Iteration(n) => s.serialize_u64(*n as u64),
            RecordLoop::Aggregate => s.serialize_str(Self::AGGREGATE_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for RecordLoop {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(usize),
            Marker(String),
        }
        match Wire::deserialize(d)? {
            Wire::Number(n) => Ok(RecordLoop::Iteration(n)),
            Wire::Marker(s) if s == RecordLoop::AGGREGATE_MARKER => Ok(RecordLoop::Aggregate),
            Wire::Marker(s) => Err(serde::de::Error::custom(format!(
                "loop must be a number or \"{}\", got {s:?}",
                RecordLoop::AGGREGATE_MARKER
            ))),
        }
    }
}

/// One normalized report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub timestamp: String,
    pub name: String,
    pub identifier: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "loop")]
    pub loop_index: RecordLoop,
    pub load_time: f64,
    pub dom: f64,
    pub tti: f64,
    pub fcp: f64,
    pub lcp: f64,
    pub cls: f64,
    pub tbt: f64,
    pub fvc: f64,
    pub lvc: f64,
    pub file_name: String,
    pub bucket: String,
}

impl ReportRecord {
    /// Numeric values in column order.
    pub fn values(&self) -> [f64; 9] {
        [
            self.load_time,
            self.dom,
            self.tti,
            self.fcp,
            self.lcp,
            self.cls,
            self.tbt,
            self.fvc,
            self.lvc,
        ]
    }

    /// `bucket/file_name`, or whichever part is present.
    pub fn file_reference(&self) -> String {
        match (self.bucket.is_empty(), self.file_name.is_empty()) {
            (false, false) => format!("{}/{}", self.bucket, self.file_name),
            (true, _) => self.file_name.clone(),
            (false, true) => self.bucket.clone(),
        }
    }

    /// All columns rendered as text, in [`COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.timestamp.clone(),
            self.name.clone(),
            self.identifier.clone(),
            self.kind.clone(),
            self.loop_index.to_string(),
        ];
        row.extend(self.values().iter().map(|v| v.to_string()));
        row.push(self.file_reference());
        row
    }
}

/// Builds [`ReportRecord`]s with shared provenance.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    timestamp: String,
    bucket: String,
}

impl RecordBuilder {
    pub fn new(timestamp: chrono::DateTime<chrono::Utc>, bucket: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            bucket: bucket.into(),
        }
    }

    /// Build one row; `value` supplies each metric, `None` becomes the placeholder.
    pub fn build_record(
        &self,
        page: &PageSamples,
        loop_index: RecordLoop,
        value: impl Fn(Metric) -> Option<f64>,
    ) -> ReportRecord {
        let v = |m: Metric| value(m).unwrap_or(MISSING_VALUE);
        ReportRecord {
            timestamp: self.timestamp.clone(),
            name: page.name.clone(),
            identifier: page.identifier.clone(),
            kind: "page".to_string(),
            loop_index,
            load_time: v(Metric::Total),
            dom: v(Metric::DomProcessing),
            tti: v(Metric::TimeToInteractive),
            fcp: v(Metric::FirstContentfulPaint),
            lcp: v(Metric::LargestContentfulPaint),
            cls: v(Metric::CumulativeLayoutShift),
            tbt: v(Metric::TotalBlockingTime),
            fvc: v(Metric::FirstVisualChange),
            lvc: v(Metric::LastVisualChange),
            file_name: page.file_name.clone().unwrap_or_default(),
            bucket: self.bucket.clone(),
        }
    }

    /// Row for a 0-based iteration, taken from the page's raw series.
    pub fn iteration(&self, page: &PageSamples, iteration: usize) -> ReportRecord {
        self.build_record(page, RecordLoop::Iteration(iteration + 1), |m| {
            page.series(m).and_then(|s| s.at(iteration))
        })
    }

    /// Row with the page's aggregated values.
    pub fn aggregate(&self, page: &PageSamples, metrics: &AggregatedMetrics) -> ReportRecord {
        self.build_record(page, RecordLoop::Aggregate, |m| metrics.get(m))
    }

    /// Every iteration row of a page followed by its aggregate row.
    pub fn page_records(&self, page: &PageSamples, metrics: &AggregatedMetrics) -> Vec<ReportRecord> {
        let mut rows: Vec<ReportRecord> = (0..page.iterations())
            .map(|i| self.iteration(page, i))
            .collect();
        rows.push(self.aggregate(page, metrics));
        rows
    }
}
