//! Prometheus self-metrics for the alerting core.
//!
//! [`EngineMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it to
//! ingestion and the rule evaluator.

use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts, Registry};

/// All process-level metrics.
pub struct EngineMetrics {
    /// Samples accepted into the series registry.
    pub samples_recorded_total: Counter,
    /// Ingestion records that could not be decoded.
    pub ingest_rejected_total: Counter,
    /// Distinct series currently held by the registry.
    pub series_active: Gauge,
    /// Rule evaluations attempted (one per rule per tick).
    pub rule_evaluations_total: Counter,
    /// Rule evaluations skipped because the rule was malformed.
    pub rules_skipped_total: Counter,
    /// Threshold breaches observed.
    pub alerts_fired_total: Counter,
    /// Alerts discarded because the output channel was full or closed.
    pub alerts_dropped_total: Counter,
    /// Wall time of one full evaluation pass, in seconds.
    pub evaluation_duration: Histogram,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl EngineMetrics {
    /// Create and register all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let samples_recorded_total = Counter::with_opts(Opts::new(
            "metric_sentinel_samples_recorded_total",
            "Samples recorded into the series registry",
        ))?;

        let ingest_rejected_total = Counter::with_opts(Opts::new(
            "metric_sentinel_ingest_rejected_total",
            "Ingestion records rejected as malformed",
        ))?;

        let series_active = Gauge::with_opts(Opts::new(
            "metric_sentinel_series_active",
            "Distinct series held in memory",
        ))?;

        let rule_evaluations_total = Counter::with_opts(Opts::new(
            "metric_sentinel_rule_evaluations_total",
            "Alert rule evaluations attempted",
        ))?;

        let rules_skipped_total = Counter::with_opts(Opts::new(
            "metric_sentinel_rules_skipped_total",
            "Alert rule evaluations skipped as malformed",
        ))?;

        let alerts_fired_total = Counter::with_opts(Opts::new(
            "metric_sentinel_alerts_fired_total",
            "Alert rules that breached their threshold",
        ))?;

        let alerts_dropped_total = Counter::with_opts(Opts::new(
            "metric_sentinel_alerts_dropped_total",
            "Alerts dropped because the output channel was unavailable",
        ))?;

        let evaluation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "metric_sentinel_evaluation_duration_seconds",
                "Duration of one rule evaluation pass in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;

        registry.register(Box::new(samples_recorded_total.clone()))?;
        registry.register(Box::new(ingest_rejected_total.clone()))?;
        registry.register(Box::new(series_active.clone()))?;
        registry.register(Box::new(rule_evaluations_total.clone()))?;
        registry.register(Box::new(rules_skipped_total.clone()))?;
        registry.register(Box::new(alerts_fired_total.clone()))?;
        registry.register(Box::new(alerts_dropped_total.clone()))?;
        registry.register(Box::new(evaluation_duration.clone()))?;

        Ok(Self {
            samples_recorded_total,
            ingest_rejected_total,
            series_active,
            rule_evaluations_total,
            rules_skipped_total,
            alerts_fired_total,
            alerts_dropped_total,
            evaluation_duration,
            registry,
        })
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
