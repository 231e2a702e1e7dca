//! Error types for malformed alert rules.
//!
//! None of these are fatal: the evaluator skips the offending rule for
//! the current tick and tries it again on the next one.

use thiserror::Error;

use crate::aggregator::UnknownFunction;

/// Why a rule could not be evaluated.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("query '{query}' needs a function and a metric name")]
    IncompleteQuery { query: String },

    #[error(transparent)]
    UnknownFunction(#[from] UnknownFunction),

    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("invalid duration '{duration}': {source}")]
    InvalidDuration {
        duration: String,
        #[source]
        source: humantime::DurationError,
    },
}

impl RuleError {
    pub fn incomplete_query(query: impl Into<String>) -> Self {
        Self::IncompleteQuery {
            query: query.into(),
        }
    }

    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
        }
    }
}
