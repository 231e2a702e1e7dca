//! Bounded, non-blocking alert channel.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::rules::Alert;

/// Default number of alerts buffered for the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Result of offering an alert to the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The channel was full; the alert is handed back to the caller.
    Dropped(Alert),
    /// The consumer has gone away.
    Closed(Alert),
}

/// Producer half of the alert channel.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    tx: mpsc::Sender<Alert>,
}

/// Create a dispatcher and its receiver. A capacity of zero is raised to one.
pub fn channel(capacity: usize) -> (AlertDispatcher, mpsc::Receiver<Alert>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (AlertDispatcher { tx }, rx)
}

impl AlertDispatcher {
    /// Try to enqueue `alert` without waiting.
    pub fn offer(&self, alert: Alert) -> DeliveryOutcome {
        match self.tx.try_send(alert) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(TrySendError::Full(alert)) => DeliveryOutcome::Dropped(alert),
            Err(TrySendError::Closed(alert)) => DeliveryOutcome::Closed(alert),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    use crate::rules::AlertRule;

    fn make_alert(value: f64) -> Alert {
        let rule = AlertRule {
            name: "r".to_string(),
            query: "sum m".to_string(),
            threshold: 0.0,
            operator: ">".to_string(),
            duration: "1m".to_string(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
        };
        Alert::firing(&rule, value, Utc::now())
    }

    #[test]
    fn offer_delivers_while_capacity_remains() {
        let (dispatcher, mut rx) = channel(2);
        assert_eq!(dispatcher.offer(make_alert(1.0)), DeliveryOutcome::Delivered);
        assert_eq!(dispatcher.offer(make_alert(2.0)), DeliveryOutcome::Delivered);

        assert_eq!(rx.try_recv().unwrap().value, 1.0);
        assert_eq!(rx.try_recv().unwrap().value, 2.0);
    }

    #[test]
    fn offer_drops_when_full() {
        let (dispatcher, _rx) = channel(1);
        dispatcher.offer(make_alert(1.0));

        match dispatcher.offer(make_alert(2.0)) {
            DeliveryOutcome::Dropped(alert) => assert_eq!(alert.value, 2.0),
            other => panic!("expected drop, got {:?}", other),
        }
    }

    #[test]
    fn offer_reports_closed_consumer() {
        let (dispatcher, rx) = channel(4);
        drop(rx);
        assert!(matches!(
            dispatcher.offer(make_alert(1.0)),
            DeliveryOutcome::Closed(_)
        ));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (dispatcher, _rx) = channel(0);
        assert_eq!(dispatcher.offer(make_alert(1.0)), DeliveryOutcome::Delivered);
        assert!(matches!(
            dispatcher.offer(make_alert(2.0)),
            DeliveryOutcome::Dropped(_)
        ));
    }
}
