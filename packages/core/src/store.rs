//! In-memory series registry.
//!
//! `SeriesRegistry` maps a [`SeriesKey`] to a [`Series`]: an append-only
//! sequence of samples trimmed to a retention horizon on every append.
//! Series are created lazily on the first sample for a new identity and
//! are never removed.
//!
//! Locking is two-level. The registry holds one `RwLock` over the
//! key-to-series map and each series holds its own `RwLock` over its
//! samples. `record` keeps the map lock exclusively for the whole
//! create-append-prune step, so writes are serialized against each other
//! and against readers resolving a handle. Readers only hold the map lock
//! long enough to clone the series `Arc`, then read under the series lock.
//!
//! There is no background sweep: a series that stops receiving samples
//! keeps its stale samples until its next `record`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::types::{Labels, Metric, MetricType, Sample, SeriesKey};

/// Default retention horizon for samples held in memory.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// One time series: identity, declared type and its samples in arrival order.
#[derive(Debug)]
pub struct Series {
    key: SeriesKey,
    metric_type: MetricType,
    samples: RwLock<VecDeque<Sample>>,
}

impl Series {
    fn new(key: SeriesKey, metric_type: MetricType) -> Self {
        Self {
            key,
            metric_type,
            samples: RwLock::new(VecDeque::new()),
        }
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// Type declared by the first sample recorded for this identity.
    pub fn metric_type(&self) -> &MetricType {
        &self.metric_type
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    /// Copy of the samples currently held, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.read().iter().copied().collect()
    }

    /// Run `f` over the samples while holding the series read lock.
    pub fn with_samples<R>(&self, f: impl FnOnce(&VecDeque<Sample>) -> R) -> R {
        let samples = self.samples.read();
        f(&samples)
    }

    fn append_and_prune(&self, sample: Sample, cutoff: DateTime<Utc>) {
        let mut samples = self.samples.write();
        samples.push_back(sample);
        samples.retain(|s| s.timestamp > cutoff);
    }
}

/// Registry of every series seen by this process.
#[derive(Debug)]
pub struct SeriesRegistry {
    series: RwLock<HashMap<SeriesKey, Arc<Series>>>,
    retention: Duration,
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesRegistry {
    /// Create an empty registry with the default 24 hour retention.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Append a sample to the series for `(name, labels)`, creating the
    /// series if needed, then drop samples older than the retention
    /// horizon from that series.
    ///
    /// Inputs are not validated: NaN values and empty names are stored
    /// as given.
    pub fn record(
        &self,
        name: &str,
        labels: &Labels,
        value: f64,
        timestamp: DateTime<Utc>,
        metric_type: MetricType,
    ) {
        let key = SeriesKey::new(name, labels);
        let cutoff = self.cutoff(Utc::now());

        let mut map = self.series.write();
        let series = map.entry(key).or_insert_with_key(|key| {
            tracing::debug!("Creating series {} ({})", key, metric_type);
            Arc::new(Series::new(key.clone(), metric_type))
        });
        series.append_and_prune(Sample::new(value, timestamp), cutoff);
    }

    /// Record an ingestion record.
    pub fn record_metric(&self, metric: &Metric) {
        self.record(
            &metric.name,
            &metric.labels,
            metric.value,
            metric.timestamp,
            metric.metric_type.clone(),
        );
    }

    /// Shared handle to the series for `(name, labels)`, if it exists.
    pub fn lookup(&self, name: &str, labels: &Labels) -> Option<Arc<Series>> {
        self.get(&SeriesKey::new(name, labels))
    }

    pub fn get(&self, key: &SeriesKey) -> Option<Arc<Series>> {
        self.series.read().get(key).cloned()
    }

    /// Point-in-time copy of the key-to-series map. The series handles
    /// are shared, so their samples keep changing after the snapshot.
    pub fn snapshot(&self) -> HashMap<SeriesKey, Arc<Series>> {
        self.series.read().clone()
    }

    /// Number of distinct series.
    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
