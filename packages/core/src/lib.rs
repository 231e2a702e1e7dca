// Library root: exposes the alerting core to the binary and to
// integration tests in `tests/`.

pub mod aggregator;
pub mod alerts;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod rules;
pub mod scheduler;
pub mod store;
pub mod types;

// Process bootstrapping, only needed by the binary.
pub mod cli;
pub mod config;
pub mod logging;

pub use aggregator::{AggregateResult, Aggregator, QueryFunction};
pub use rules::{Alert, AlertRule, RuleEvaluator};
pub use store::{Series, SeriesRegistry};
pub use types::{Labels, Metric, MetricType, Sample, SeriesKey};
