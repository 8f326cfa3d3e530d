//! Data model: metrics, sample series, aggregated metrics and run tallies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// One numeric measurement of a metric for one page, one iteration.
pub type Sample = f64;

/// Fixed catalogue of page metrics.
///
/// The first twelve variants are sampled per iteration; `Requests`,
/// `Domains` and `TimeToInteractive` are derived page facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Total,
    SpeedIndex,
    TimeToFirstByte,
    TimeToFirstPaint,
    DomContentLoading,
    DomProcessing,
    FirstContentfulPaint,
    LargestContentfulPaint,
    CumulativeLayoutShift,
    TotalBlockingTime,
    FirstVisualChange,
    LastVisualChange,
    Requests,
    Domains,
    TimeToInteractive,
}

impl Metric {
    /// Metrics that carry per-iteration samples.
    pub const SAMPLED: [Metric; 12] = [
        Metric::Total,
        Metric::SpeedIndex,
        Metric::TimeToFirstByte,
        Metric::TimeToFirstPaint,
        Metric::DomContentLoading,
        Metric::DomProcessing,
        Metric::FirstContentfulPaint,
        Metric::LargestContentfulPaint,
        Metric::CumulativeLayoutShift,
        Metric::TotalBlockingTime,
        Metric::FirstVisualChange,
        Metric::LastVisualChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Total => "total",
            Metric::SpeedIndex => "speed_index",
            Metric::TimeToFirstByte => "time_to_first_byte",
            Metric::TimeToFirstPaint => "time_to_first_paint",
            Metric::DomContentLoading => "dom_content_loading",
            Metric::DomProcessing => "dom_processing",
            Metric::FirstContentfulPaint => "first_contentful_paint",
            Metric::LargestContentfulPaint => "largest_contentful_paint",
            Metric::CumulativeLayoutShift => "cumulative_layout_shift",
            Metric::TotalBlockingTime => "total_blocking_time",
            Metric::FirstVisualChange => "first_visual_change",
            Metric::LastVisualChange => "last_visual_change",
            Metric::Requests => "requests",
            Metric::Domains => "domains",
            Metric::TimeToInteractive => "time_to_interactive",
        }
    }

    pub fn is_sampled(&self) -> bool {
        Self::SAMPLED.contains(self)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SAMPLED
            .into_iter()
            .chain([Metric::Requests, Metric::Domains, Metric::TimeToInteractive])
            .find(|m| m.as_str() == s)
            .ok_or_else(|| EngineError::UnknownMetric { name: s.to_string() })
    }
}

/// Ordered samples of one metric. Insertion order is iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSeries(Vec<Sample>);

impl MetricSeries {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self(samples)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sample recorded for a 0-based iteration.
    pub fn at(&self, iteration: usize) -> Option<Sample> {
        self.0.get(iteration).copied()
    }

    fn append(&mut self, other: &MetricSeries) {
        self.0.extend_from_slice(&other.0);
    }
}

impl From<Vec<Sample>> for MetricSeries {
    fn from(v: Vec<Sample>) -> Self {
        Self(v)
    }
}

/// Raw samples of one page, as supplied by the sample source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSamples {
    /// Page name (usually the URL).
    pub name: String,
    /// Identifier page-scoped rules match against, e.g. `https://x.test/@open`.
    pub identifier: String,
    /// Artifact file this page's results came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub series: BTreeMap<Metric, MetricSeries>,
}

impl PageSamples {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            file_name: None,
            series: BTreeMap::new(),
        }
    }

    pub fn with_series(mut self, metric: Metric, samples: Vec<Sample>) -> Self {
        self.series.insert(metric, MetricSeries::new(samples));
        self
    }

    pub fn series(&self, metric: Metric) -> Option<&MetricSeries> {
        self.series.get(&metric)
    }

    /// Number of iterations the page was loaded.
    ///
    /// Counted from the `total` series; falls back to the longest series.
    pub fn iterations(&self) -> usize {
        match self.series.get(&Metric::Total) {
            Some(s) if !s.is_empty() => s.len(),
            _ => self.series.values().map(MetricSeries::len).max().unwrap_or(0),
        }
    }
}

/// Samples of every page concatenated, per metric. Append-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PooledSamples {
    series: BTreeMap<Metric, MetricSeries>,
    pages: usize,
}

impl PooledSamples {
    pub fn absorb(&mut self, page: &PageSamples) {
        for (metric, series) in &page.series {
            self.series.entry(*metric).or_default().append(series);
        }
        self.pages += 1;
    }

    pub fn series(&self, metric: Metric) -> Option<&MetricSeries> {
        self.series.get(&metric)
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &MetricSeries)> {
        self.series.iter()
    }
}

/// Metric name to single aggregated value. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedMetrics(BTreeMap<Metric, f64>);

impl AggregatedMetrics {
    pub fn from_map(values: BTreeMap<Metric, f64>) -> Self {
        Self(values)
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Total and failed threshold evaluations of a run (or of one page).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    pub thresholds_total: u32,
    pub thresholds_failed: u32,
}

impl RunTally {
    /// Count one evaluation. Keeps `failed <= total`.
    pub fn record(&mut self, failed: bool) {
        self.thresholds_total += 1;
        if failed {
            self.thresholds_failed += 1;
        }
    }

    pub fn merge(&mut self, other: RunTally) {
        self.thresholds_total += other.thresholds_total;
        self.thresholds_failed += other.thresholds_failed;
    }
}
