//! Rule evaluator: one pass over the rule set per tick.
//!
//! Each pass takes a copy of the current rule set, so `load_rules` and
//! `add_rule` never change the rules seen by a pass already in progress.
//! Passes are stateless: a rule that keeps breaching fires on every tick.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::aggregator::Aggregator;
use crate::alerts::{AlertDispatcher, DeliveryOutcome};
use crate::metrics::EngineMetrics;
use crate::rules::error::RuleError;
use crate::rules::types::{Alert, AlertRule};

/// Counts for one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub fired: usize,
    pub delivered: usize,
    pub dropped: usize,
    pub skipped: usize,
}

pub struct RuleEvaluator {
    aggregator: Aggregator,
    rules: RwLock<Vec<AlertRule>>,
    dispatcher: AlertDispatcher,
    metrics: Option<Arc<EngineMetrics>>,
}

impl RuleEvaluator {
    pub fn new(aggregator: Aggregator, dispatcher: AlertDispatcher) -> Self {
        Self {
            aggregator,
            rules: RwLock::new(Vec::new()),
            dispatcher,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the whole rule set.
    pub fn load_rules(&self, rules: Vec<AlertRule>) {
        tracing::info!("Loading {} alert rules", rules.len());
        *self.rules.write() = rules;
    }

    pub fn add_rule(&self, rule: AlertRule) {
        tracing::debug!("Adding alert rule {}", rule.name);
        self.rules.write().push(rule);
    }

    /// Copy of the current rule set.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().clone()
    }

    pub fn evaluate_once(&self) -> EvaluationSummary {
        self.evaluate_at(Utc::now())
    }

    /// Evaluate every rule against windows ending at `now` and offer each
    /// resulting alert to the output channel.
    pub fn evaluate_at(&self, now: DateTime<Utc>) -> EvaluationSummary {
        let started = Instant::now();
        let rules = self.rules();
        let mut summary = EvaluationSummary::default();

        for rule in &rules {
            summary.evaluated += 1;
            let alert = match self.evaluate_rule(rule, now) {
                Ok(Some(alert)) => alert,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!("Skipping rule {} this tick: {}", rule.name, err);
                    summary.skipped += 1;
                    continue;
                }
            };

            summary.fired += 1;
            match self.dispatcher.offer(alert) {
                DeliveryOutcome::Delivered => summary.delivered += 1,
                DeliveryOutcome::Dropped(alert) => {
                    tracing::warn!(
                        "Alert channel is full, dropping alert for rule {} (value {})",
                        alert.rule.name,
                        alert.value
                    );
                    summary.dropped += 1;
                }
                DeliveryOutcome::Closed(alert) => {
                    tracing::warn!(
                        "Alert channel is closed, dropping alert for rule {}",
                        alert.rule.name
                    );
                    summary.dropped += 1;
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.rule_evaluations_total.inc_by(summary.evaluated as f64);
            metrics.rules_skipped_total.inc_by(summary.skipped as f64);
            metrics.alerts_fired_total.inc_by(summary.fired as f64);
            metrics.alerts_dropped_total.inc_by(summary.dropped as f64);
            metrics
                .evaluation_duration
                .observe(started.elapsed().as_secs_f64());
        }

        summary
    }

    /// Evaluate a single rule. `Ok(None)` means the threshold was not breached.
    pub fn evaluate_rule(
        &self,
        rule: &AlertRule,
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>, RuleError> {
        let compiled = rule.compile()?;
        let result = self.aggregator.evaluate_at(
            compiled.query.function,
            &compiled.query.metric,
            &compiled.query.labels,
            compiled.window,
            now,
        );

        tracing::debug!(
            "Rule {}: {} = {} over {} samples",
            rule.name,
            compiled.query.function,
            result.value,
            result.sample_count
        );

        if compiled.operator.compare(result.value, rule.threshold) {
            Ok(Some(Alert::firing(rule, result.value, now)))
        } else {
            Ok(None)
        }
    }
}
