//! Alert delivery.
//!
//! The evaluator hands alerts to an [`AlertDispatcher`], which offers them
//! to a bounded channel without ever waiting. The receiving half belongs
//! to a single consumer such as [`notifier::run_notifier`].

pub mod dispatch;
pub mod notifier;

pub use dispatch::{channel, AlertDispatcher, DeliveryOutcome, DEFAULT_CHANNEL_CAPACITY};
