//! Reduction of a metric series to a single statistic.
//!
//! Percentiles use the nearest-rank method: sort ascending, take the element
//! at `ceil(size * p / 100) - 1` (floored at 0).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::model::{AggregatedMetrics, Metric, PageSamples, PooledSamples, Sample};

/// Aggregation function over a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Max,
    Min,
    /// Mean truncated toward zero.
    Avg,
    Pct50,
    Pct95,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Avg => "avg",
            Aggregation::Pct50 => "pct50",
            Aggregation::Pct95 => "pct95",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Aggregation::Max),
            "min" => Ok(Aggregation::Min),
            "avg" => Ok(Aggregation::Avg),
            "pct50" => Ok(Aggregation::Pct50),
            "pct95" => Ok(Aggregation::Pct95),
            other => Err(EngineError::UnsupportedAggregation {
                name: other.to_string(),
            }),
        }
    }
}

/// Reduce `series` with `function`.
///
/// Fails with [`EngineError::EmptySeries`] when there is nothing to reduce.
pub fn aggregate(function: Aggregation, series: &[Sample]) -> Result<f64, EngineError> {
    if series.is_empty() {
        return Err(EngineError::empty_series("series"));
    }
    let value = match function {
        Aggregation::Max => series.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregation::Min => series.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Avg => (series.iter().sum::<f64>() / series.len() as f64).trunc(),
        Aggregation::Pct50 => percentile(series, 50),
        Aggregation::Pct95 => percentile(series, 95),
    };
    Ok(value)
}

/// Like [`aggregate`], resolving the function by name first.
pub fn aggregate_named(function: &str, series: &[Sample]) -> Result<f64, EngineError> {
    aggregate(function.parse()?, series)
}

/// Like [`aggregate`], naming `metric` in the empty-series error.
pub fn aggregate_metric(
    metric: Metric,
    function: Aggregation,
    series: &[Sample],
) -> Result<f64, EngineError> {
    aggregate(function, series).map_err(|e| match e {
        EngineError::EmptySeries { .. } => EngineError::empty_series(metric.as_str()),
        other => other,
    })
}

// Caller guarantees a non-empty series.
fn percentile(series: &[Sample], pct: usize) -> f64 {
    let mut sorted = series.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (sorted.len() * pct).div_ceil(100);
    sorted[rank.saturating_sub(1)]
}

/// Builds [`AggregatedMetrics`] for pages and for the pooled series.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    function: Aggregation,
}

impl Aggregator {
    pub fn new(function: Aggregation) -> Self {
        Self { function }
    }

    pub fn function(&self) -> Aggregation {
        self.function
    }

    /// Aggregated metrics of one page.
    ///
    /// Sampled metrics without samples are left out. `requests` is the
    /// iteration count, `domains` is 1 and `time_to_interactive` is an
    /// explicit 0 because the measurement is not available.
    pub fn page(&self, page: &PageSamples) -> AggregatedMetrics {
        let mut values = self.reduce(page.series.iter());
        values.insert(Metric::Requests, page.iterations() as f64);
        values.insert(Metric::Domains, 1.0);
        values.insert(Metric::TimeToInteractive, 0.0);
        AggregatedMetrics::from_map(values)
    }

    /// Aggregated metrics of every page's samples concatenated.
    pub fn pooled(&self, pooled: &PooledSamples) -> AggregatedMetrics {
        let mut values = self.reduce(pooled.iter());
        let iterations = pooled
            .series(Metric::Total)
            .map(|s| s.len())
            .unwrap_or_default();
        values.insert(Metric::Requests, iterations as f64);
        values.insert(Metric::Domains, pooled.pages() as f64);
        values.insert(Metric::TimeToInteractive, 0.0);
        AggregatedMetrics::from_map(values)
    }

    fn reduce<'a>(
        &self,
        series: impl Iterator<Item = (&'a Metric, &'a crate::model::MetricSeries)>,
    ) -> BTreeMap<Metric, f64> {
        series
            .filter(|(metric, _)| metric.is_sampled())
            .filter_map(|(metric, s)| {
                aggregate(self.function, s.samples())
                    .ok()
                    .map(|v| (*metric, v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn one_to(n: usize) -> Vec<f64> {
        (1..=n).map(|v| v as f64).collect()
    }

    #[test]
    fn avg_truncates_the_mean() {
        assert_eq!(aggregate(Aggregation::Avg, &[1.0, 2.0, 3.0, 4.0]).unwrap(), 2.0);
    }

    #[test]
    fn pct95_of_twenty_is_nineteenth_smallest() {
        let mut series = one_to(20);
        series.reverse();
        assert_eq!(aggregate(Aggregation::Pct95, &series).unwrap(), 19.0);
    }

    #[test]
    fn pct95_of_ten_is_the_maximum() {
        assert_eq!(aggregate(Aggregation::Pct95, &one_to(10)).unwrap(), 10.0);
    }

    #[test]
    fn pct50_of_four_is_second_smallest() {
        assert_eq!(
            aggregate(Aggregation::Pct50, &[40.0, 10.0, 30.0, 20.0]).unwrap(),
            20.0
        );
    }

    #[test]
    fn percentile_of_single_sample_is_that_sample() {
        assert_eq!(aggregate(Aggregation::Pct50, &[7.0]).unwrap(), 7.0);
        assert_eq!(aggregate(Aggregation::Pct95, &[7.0]).unwrap(), 7.0);
    }

    #[test]
    fn max_and_min() {
        let s = [3.0, 9.0, 1.0];
        assert_eq!(aggregate(Aggregation::Max, &s).unwrap(), 9.0);
        assert_eq!(aggregate(Aggregation::Min, &s).unwrap(), 1.0);
    }

    #[test]
    fn empty_series_is_an_error() {
        for f in [
            Aggregation::Max,
            Aggregation::Min,
            Aggregation::Avg,
            Aggregation::Pct50,
            Aggregation::Pct95,
        ] {
            assert!(matches!(
                aggregate(f, &[]),
                Err(EngineError::EmptySeries { .. })
            ));
        }
    }

    #[test]
    fn empty_series_error_names_the_metric() {
        let err = aggregate_metric(Metric::SpeedIndex, Aggregation::Max, &[]).unwrap_err();
        assert_eq!(err, EngineError::empty_series("speed_index"));
    }

    #[test]
    fn unknown_function_names_the_offender() {
        let err = aggregate_named("median", &[1.0]).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnsupportedAggregation {
                name: "median".into()
            }
        );
    }

    #[test]
    fn page_aggregation_fills_derived_facts_and_skips_missing_series() {
        let page = PageSamples::new("home", "home@open")
            .with_series(Metric::Total, vec![100.0, 300.0, 200.0])
            .with_series(Metric::SpeedIndex, vec![]);
        let agg = Aggregator::new(Aggregation::Max).page(&page);

        assert_eq!(agg.get(Metric::Total), Some(300.0));
        assert_eq!(agg.get(Metric::SpeedIndex), None);
        assert_eq!(agg.get(Metric::Requests), Some(3.0));
        assert_eq!(agg.get(Metric::Domains), Some(1.0));
        assert_eq!(agg.get(Metric::TimeToInteractive), Some(0.0));
    }

    #[test]
    fn pooled_aggregation_counts_pages_as_domains() {
        let mut pooled = PooledSamples::default();
        pooled.absorb(&PageSamples::new("a", "a@open").with_series(Metric::Total, vec![1.0]));
        pooled.absorb(&PageSamples::new("b", "b@open").with_series(Metric::Total, vec![5.0]));
        let agg = Aggregator::new(Aggregation::Min).pooled(&pooled);
        assert_eq!(agg.get(Metric::Total), Some(1.0));
        assert_eq!(agg.get(Metric::Requests), Some(2.0));
        assert_eq!(agg.get(Metric::Domains), Some(2.0));
    }

    proptest! {
        #[test]
        fn percentile_is_a_member_within_bounds(series in proptest::collection::vec(0u32..10_000, 1..64)) {
            let series: Vec<f64> = series.into_iter().map(f64::from).collect();
            let min = aggregate(Aggregation::Min, &series).unwrap();
            let max = aggregate(Aggregation::Max, &series).unwrap();
            for f in [Aggregation::Pct50, Aggregation::Pct95, Aggregation::Avg] {
                let v = aggregate(f, &series).unwrap();
                prop_assert!(v >= min.trunc() && v <= max);
            }
            let p50 = aggregate(Aggregation::Pct50, &series).unwrap();
            let p95 = aggregate(Aggregation::Pct95, &series).unwrap();
            prop_assert!(series.contains(&p50));
            prop_assert!(p50 <= p95);
        }
    }
}
