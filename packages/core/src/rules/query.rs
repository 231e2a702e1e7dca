//! Rule query parsing.
//!
//! A query is whitespace separated: `function metric [key=value ...]`.
//! Label tokens that do not contain exactly one `=` are ignored.

use std::str::FromStr;

use crate::aggregator::QueryFunction;
use crate::rules::error::RuleError;
use crate::types::Labels;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleQuery {
    pub function: QueryFunction,
    pub metric: String,
    pub labels: Labels,
}

impl RuleQuery {
    pub fn parse(query: &str) -> Result<Self, RuleError> {
        let mut tokens = query.split_whitespace();
        let (Some(function), Some(metric)) = (tokens.next(), tokens.next()) else {
            return Err(RuleError::incomplete_query(query));
        };
        let function = function.parse::<QueryFunction>()?;

        let mut labels = Labels::new();
        for token in tokens {
            let mut parts = token.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    labels.insert(key.to_string(), value.to_string());
                }
                _ => tracing::debug!("Ignoring label filter '{}' in query '{}'", token, query),
            }
        }

        Ok(Self {
            function,
            metric: metric.to_string(),
            labels,
        })
    }
}

impl FromStr for RuleQuery {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
