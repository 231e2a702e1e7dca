//! Rule evaluation scheduler.
//!
//! Drives the evaluation loop: each tick runs one full pass of the rule
//! evaluator. Cancellation is only observed between ticks, so a pass that
//! has started always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::rules::RuleEvaluator;

/// Default evaluation interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Run the rule evaluation loop until `cancel` fires.
///
/// The first pass runs immediately. `interval` must be non-zero.
/// Returns the number of completed passes.
pub async fn run_evaluation_loop(
    evaluator: Arc<RuleEvaluator>,
    interval: Duration,
    cancel: CancellationToken,
) -> u64 {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        "Rule evaluation started (interval: {})",
        humantime::format_duration(interval)
    );

    let mut passes = 0;
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!("Cancellation received. Stopping rule evaluation.");
                break;
            }

            _ = ticker.tick() => {
                evaluate_tick(&evaluator);
                passes += 1;
            }
        }
    }

    tracing::info!("Rule evaluation stopped cleanly after {} passes", passes);
    passes
}

/// Execute a single pass and log its summary. Extracted for testability.
fn evaluate_tick(evaluator: &RuleEvaluator) {
    let summary = evaluator.evaluate_once();

    if summary.dropped > 0 {
        tracing::warn!(
            "{} alerts dropped this tick (channel unavailable)",
            summary.dropped
        );
    }

    tracing::debug!(
        "Evaluated {} rules: {} fired, {} delivered, {} skipped",
        summary.evaluated,
        summary.fired,
        summary.delivered,
        summary.skipped,
    );
}
