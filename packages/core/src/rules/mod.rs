//! Alert rules
//!
//! Rule representation, query parsing, rule file loading and the
//! evaluator that turns aggregated values into alerts.

pub mod engine;
pub mod error;
pub mod loader;
pub mod query;
pub mod types;

pub use engine::{EvaluationSummary, RuleEvaluator};
pub use error::RuleError;
pub use query::RuleQuery;
pub use types::{Alert, AlertRule, AlertStatus, CompiledRule, Operator};
