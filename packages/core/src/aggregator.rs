//! Windowed aggregation over the series registry.
//!
//! Every query takes a metric name, an exact label set and a trailing
//! window. Samples count toward the window when their timestamp is
//! strictly after `now - window`.
//!
//! Missing series and empty windows both yield `0.0`. Callers that need
//! to tell "no data" apart from a measured zero use
//! [`Aggregator::evaluate`], whose [`AggregateResult`] carries the number
//! of samples that contributed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::store::SeriesRegistry;
use crate::types::Labels;

/// Aggregation function understood by the query surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryFunction {
    Sum,
    Avg,
    Max,
    /// Samples per second landing in the window.
    Rate,
    /// Nearest-rank percentile, rank in `[0, 100]`.
    Percentile(f64),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown query function '{0}'")]
pub struct UnknownFunction(pub String);

impl FromStr for QueryFunction {
    type Err = UnknownFunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(QueryFunction::Sum),
            "avg" => Ok(QueryFunction::Avg),
            "max" => Ok(QueryFunction::Max),
            "rate" => Ok(QueryFunction::Rate),
            "p95" => Ok(QueryFunction::Percentile(95.0)),
            "p99" => Ok(QueryFunction::Percentile(99.0)),
            other => Err(UnknownFunction(other.to_string())),
        }
    }
}

impl fmt::Display for QueryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFunction::Sum => f.write_str("sum"),
            QueryFunction::Avg => f.write_str("avg"),
            QueryFunction::Max => f.write_str("max"),
            QueryFunction::Rate => f.write_str("rate"),
            QueryFunction::Percentile(rank) => write!(f, "p{}", rank),
        }
    }
}

impl QueryFunction {
    /// Apply the function to the values that fell inside `window`.
    pub fn apply<I>(self, values: I, window: Duration) -> AggregateResult
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter();
        match self {
            QueryFunction::Sum => {
                let (sum, count) = values.fold((0.0, 0), |(sum, n), v| (sum + v, n + 1));
                AggregateResult::new(sum, count)
            }
            QueryFunction::Avg => {
                let (sum, count) = values.fold((0.0, 0), |(sum, n), v| (sum + v, n + 1));
                if count == 0 {
                    return AggregateResult::empty();
                }
                AggregateResult::new(sum / count as f64, count)
            }
            QueryFunction::Max => {
                let (max, count) =
                    values.fold((f64::NEG_INFINITY, 0), |(max, n), v| (max.max(v), n + 1));
                if max == f64::NEG_INFINITY {
                    return AggregateResult::new(0.0, count);
                }
                AggregateResult::new(max, count)
            }
            QueryFunction::Rate => {
                let count = values.count();
                let seconds = window.as_secs_f64();
                if seconds == 0.0 {
                    return AggregateResult::new(0.0, count);
                }
                AggregateResult::new(count as f64 / seconds, count)
            }
            QueryFunction::Percentile(rank) => {
                let mut sorted: Vec<f64> = values.collect();
                let count = sorted.len();
                AggregateResult::new(nearest_rank(&mut sorted, rank), count)
            }
        }
    }
}

/// Nearest-rank percentile without interpolation. Sorts `values` in place.
///
/// The index is `floor(len * rank / 100)` clamped to the last element.
/// Returns `0.0` for an empty slice.
pub fn nearest_rank(values: &mut [f64], rank: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let index = (values.len() as f64 * rank / 100.0) as usize;
    values[index.min(values.len() - 1)]
}

/// Outcome of one aggregation query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateResult {
    pub value: f64,
    /// Samples inside the window. Zero means there was nothing to aggregate.
    pub sample_count: usize,
}

impl AggregateResult {
    pub fn new(value: f64, sample_count: usize) -> Self {
        Self {
            value,
            sample_count,
        }
    }

    pub fn empty() -> Self {
        Self::new(0.0, 0)
    }

    pub fn has_data(&self) -> bool {
        self.sample_count > 0
    }

    /// `None` when no sample fell inside the window.
    pub fn value_or_none(&self) -> Option<f64> {
        self.has_data().then_some(self.value)
    }
}

/// Stateless query layer over a shared [`SeriesRegistry`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<SeriesRegistry>,
}

impl Aggregator {
    pub fn new(registry: Arc<SeriesRegistry>) -> Self {
        Self { registry }
    }

    /// Run `function` over the window ending now.
    pub fn evaluate(
        &self,
        function: QueryFunction,
        name: &str,
        labels: &Labels,
        window: Duration,
    ) -> AggregateResult {
        self.evaluate_at(function, name, labels, window, Utc::now())
    }

    /// Run `function` over the window ending at `now`.
    pub fn evaluate_at(
        &self,
        function: QueryFunction,
        name: &str,
        labels: &Labels,
        window: Duration,
        now: DateTime<Utc>,
    ) -> AggregateResult {
        let Some(series) = self.registry.lookup(name, labels) else {
            return AggregateResult::empty();
        };

        let start = window_start(now, window);
        series.with_samples(|samples| {
            let values = samples
                .iter()
                .filter(|s| s.timestamp > start)
                .map(|s| s.value);
            function.apply(values, window)
        })
    }

    pub fn sum(&self, name: &str, labels: &Labels, window: Duration) -> f64 {
        self.evaluate(QueryFunction::Sum, name, labels, window).value
    }

    pub fn average(&self, name: &str, labels: &Labels, window: Duration) -> f64 {
        self.evaluate(QueryFunction::Avg, name, labels, window).value
    }

    pub fn max(&self, name: &str, labels: &Labels, window: Duration) -> f64 {
        self.evaluate(QueryFunction::Max, name, labels, window).value
    }

    pub fn rate(&self, name: &str, labels: &Labels, window: Duration) -> f64 {
        self.evaluate(QueryFunction::Rate, name, labels, window).value
    }

    pub fn percentile(&self, name: &str, labels: &Labels, window: Duration, rank: f64) -> f64 {
        self.evaluate(QueryFunction::Percentile(rank), name, labels, window)
            .value
    }
}

/// Exclusive lower bound of the window ending at `now`.
fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricType;
    use chrono::Duration as ChronoDuration;
    use proptest::prelude::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Registry holding `values` for `cpu{host=web1}`, one second apart,
    /// the newest one second before `now`.
    fn seeded(values: &[f64], now: DateTime<Utc>) -> Aggregator {
        let registry = Arc::new(SeriesRegistry::new());
        let l = labels(&[("host", "web1")]);
        let n = values.len() as i64;
        for (i, v) in values.iter().enumerate() {
            let ts = now - ChronoDuration::seconds(n - i as i64);
            registry.record("cpu", &l, *v, ts, MetricType::Gauge);
        }
        Aggregator::new(registry)
    }

    const MINUTE: Duration = Duration::from_secs(60);

    // ---- QueryFunction parsing ----

    #[test]
    fn parses_known_functions() {
        assert_eq!("sum".parse::<QueryFunction>(), Ok(QueryFunction::Sum));
        assert_eq!("avg".parse::<QueryFunction>(), Ok(QueryFunction::Avg));
        assert_eq!("max".parse::<QueryFunction>(), Ok(QueryFunction::Max));
        assert_eq!("rate".parse::<QueryFunction>(), Ok(QueryFunction::Rate));
        assert_eq!("p95".parse::<QueryFunction>(), Ok(QueryFunction::Percentile(95.0)));
        assert_eq!("p99".parse::<QueryFunction>(), Ok(QueryFunction::Percentile(99.0)));
    }

    #[test]
    fn rejects_unknown_functions() {
        assert_eq!(
            "median".parse::<QueryFunction>(),
            Err(UnknownFunction("median".to_string()))
        );
        assert!("p50".parse::<QueryFunction>().is_err());
        assert!("SUM".parse::<QueryFunction>().is_err());
    }

    // ---- pure functions ----

    #[test]
    fn percentile_uses_nearest_rank() {
        let mut values = vec![40.0, 10.0, 30.0, 20.0];
        assert_eq!(nearest_rank(&mut values, 50.0), 30.0);
    }

    #[test]
    fn percentile_clamps_to_last_element() {
        let mut values = vec![1.0, 2.0, 3.0];
        assert_eq!(nearest_rank(&mut values, 100.0), 3.0);
        assert_eq!(nearest_rank(&mut values, 99.0), 3.0);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(nearest_rank(&mut [], 95.0), 0.0);
    }

    #[test]
    fn rate_counts_samples_per_second() {
        let result = QueryFunction::Rate.apply([1.0, 1.0, 1.0, 1.0, 1.0], Duration::from_secs(10));
        assert_eq!(result.value, 0.5);
        assert_eq!(result.sample_count, 5);
    }

    #[test]
    fn rate_over_zero_window_is_zero() {
        let result = QueryFunction::Rate.apply([1.0], Duration::ZERO);
        assert_eq!(result.value, 0.0);
    }

    #[test]
    fn max_of_negative_values_is_not_clamped() {
        let result = QueryFunction::Max.apply([-5.0, -2.0, -9.0], MINUTE);
        assert_eq!(result.value, -2.0);
    }

    #[test]
    fn every_function_returns_zero_without_values() {
        for function in [
            QueryFunction::Sum,
            QueryFunction::Avg,
            QueryFunction::Max,
            QueryFunction::Rate,
            QueryFunction::Percentile(95.0),
        ] {
            let result = function.apply(std::iter::empty(), MINUTE);
            assert_eq!(result, AggregateResult::empty(), "{}", function);
            assert_eq!(result.value_or_none(), None);
        }
    }

    // ---- windowed queries ----

    #[test]
    fn sum_average_max_over_window() {
        let now = Utc::now();
        let agg = seeded(&[10.0, 20.0, 30.0, 40.0], now);
        let l = labels(&[("host", "web1")]);

        let sum = agg.evaluate_at(QueryFunction::Sum, "cpu", &l, MINUTE, now);
        let avg = agg.evaluate_at(QueryFunction::Avg, "cpu", &l, MINUTE, now);
        let max = agg.evaluate_at(QueryFunction::Max, "cpu", &l, MINUTE, now);

        assert_eq!(sum.value, 100.0);
        assert_eq!(avg.value, 25.0);
        assert_eq!(max.value, 40.0);
        assert_eq!(sum.sample_count, 4);
    }

    #[test]
    fn median_of_four_values_is_third_sorted() {
        let now = Utc::now();
        let agg = seeded(&[40.0, 10.0, 30.0, 20.0], now);
        let l = labels(&[("host", "web1")]);

        let p50 = agg.evaluate_at(QueryFunction::Percentile(50.0), "cpu", &l, MINUTE, now);
        assert_eq!(p50.value, 30.0);
    }

    #[test]
    fn window_start_is_exclusive() {
        let now = Utc::now();
        let registry = Arc::new(SeriesRegistry::new());
        let l = Labels::new();
        registry.record("m", &l, 1.0, now - ChronoDuration::seconds(10), MetricType::Gauge);
        registry.record("m", &l, 2.0, now - ChronoDuration::seconds(9), MetricType::Gauge);
        let agg = Aggregator::new(registry);

        let result = agg.evaluate_at(QueryFunction::Sum, "m", &l, Duration::from_secs(10), now);
        assert_eq!(result.value, 2.0);
        assert_eq!(result.sample_count, 1);
    }

    #[test]
    fn rate_over_ten_second_window() {
        let now = Utc::now();
        let agg = seeded(&[1.0; 5], now);
        let l = labels(&[("host", "web1")]);

        let rate = agg.evaluate_at(QueryFunction::Rate, "cpu", &l, Duration::from_secs(10), now);
        assert_eq!(rate.value, 0.5);
    }

    #[test]
    fn missing_series_reads_as_zero() {
        let agg = Aggregator::new(Arc::new(SeriesRegistry::new()));
        let l = labels(&[("host", "nope")]);

        assert_eq!(agg.sum("cpu", &l, MINUTE), 0.0);
        assert_eq!(agg.average("cpu", &l, MINUTE), 0.0);
        assert_eq!(agg.max("cpu", &l, MINUTE), 0.0);
        assert_eq!(agg.rate("cpu", &l, MINUTE), 0.0);
        assert_eq!(agg.percentile("cpu", &l, MINUTE, 99.0), 0.0);
        assert!(!agg.evaluate(QueryFunction::Sum, "cpu", &l, MINUTE).has_data());
    }

    #[test]
    fn expired_window_reads_as_zero() {
        let registry = Arc::new(SeriesRegistry::new());
        let l = Labels::new();
        registry.record("m", &l, 5.0, Utc::now() - ChronoDuration::hours(2), MetricType::Gauge);
        let agg = Aggregator::new(registry);

        assert_eq!(agg.sum("m", &l, MINUTE), 0.0);
        assert_eq!(agg.max("m", &l, MINUTE), 0.0);
        assert_eq!(agg.percentile("m", &l, MINUTE, 95.0), 0.0);
    }

    #[test]
    fn measured_zero_is_distinguishable_from_no_data() {
        let registry = Arc::new(SeriesRegistry::new());
        let l = Labels::new();
        registry.record("m", &l, 0.0, Utc::now(), MetricType::Gauge);
        let agg = Aggregator::new(registry);

        let result = agg.evaluate(QueryFunction::Max, "m", &l, MINUTE);
        assert_eq!(result.value_or_none(), Some(0.0));
    }

    #[test]
    fn queries_require_the_exact_label_set() {
        let now = Utc::now();
        let agg = seeded(&[10.0], now);
        assert_eq!(agg.sum("cpu", &Labels::new(), MINUTE), 0.0);
    }

    proptest! {
        #[test]
        fn percentile_is_a_member_within_bounds(
            values in prop::collection::vec(-1.0e6f64..1.0e6, 1..64),
            rank in 0.0f64..=100.0,
        ) {
            let mut sorted = values.clone();
            let result = nearest_rank(&mut sorted, rank);
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(values.contains(&result));
            prop_assert!(result >= min && result <= max);
        }
    }
}
