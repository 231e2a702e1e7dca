//! Default alert consumer: logs every alert it receives.

use tokio::sync::mpsc;

use crate::rules::Alert;

/// Drain `rx` until every sender is dropped. Returns the number of alerts
/// handled.
pub async fn run_notifier(mut rx: mpsc::Receiver<Alert>) -> usize {
    let mut handled = 0;
    while let Some(alert) = rx.recv().await {
        log_alert(&alert);
        handled += 1;
    }
    tracing::info!("Alert notifier stopped after {} alerts", handled);
    handled
}

fn log_alert(alert: &Alert) {
    tracing::warn!(
        rule = %alert.rule.name,
        value = alert.value,
        threshold = alert.rule.threshold,
        operator = %alert.rule.operator,
        status = %alert.status,
        "Alert triggered"
    );
    if let Some(summary) = alert.rule.annotations.get("summary") {
        tracing::info!(rule = %alert.rule.name, "{}", summary);
    }
}
