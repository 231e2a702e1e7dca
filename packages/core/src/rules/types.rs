//! Alert rule and alert event types.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::error::RuleError;
use crate::rules::query::RuleQuery;
use crate::types::{null_as_default, Labels};

/// Comparison applied between the query result and the rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Operator {
    /// `true` when `value <op> threshold` holds.
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Ge => value >= threshold,
            Operator::Lt => value < threshold,
            Operator::Le => value <= threshold,
            Operator::Eq => value == threshold,
            Operator::Ne => value != threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }
}

impl FromStr for Operator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            other => Err(RuleError::unknown_operator(other)),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold rule as loaded from the rule file.
///
/// `operator` and `duration` are kept as written so that a malformed
/// value only disables the rule at evaluation time instead of rejecting
/// the whole rule set on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub name: String,
    /// `function metric [key=value ...]`, e.g. `avg cpu_usage host=web1`.
    pub query: String,
    pub threshold: f64,
    pub operator: String,
    /// Trailing window the query aggregates over, e.g. `5m`.
    pub duration: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Labels,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: HashMap<String, String>,
}

impl AlertRule {
    /// Parse every textual field of the rule.
    pub fn compile(&self) -> Result<CompiledRule, RuleError> {
        let window = humantime::parse_duration(self.duration.trim()).map_err(|source| {
            RuleError::InvalidDuration {
                duration: self.duration.clone(),
                source,
            }
        })?;
        let query = RuleQuery::parse(&self.query)?;
        let operator = self.operator.trim().parse()?;

        Ok(CompiledRule {
            query,
            operator,
            window,
        })
    }
}

/// Parsed form of an [`AlertRule`], valid for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub query: RuleQuery,
    pub operator: Operator,
    pub window: Duration,
}

/// Alert lifecycle state. Evaluation only ever produces `Firing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Firing => f.write_str("firing"),
        }
    }
}

/// A threshold breach observed during one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Snapshot of the rule at the time it fired.
    pub rule: AlertRule,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub status: AlertStatus,
    pub labels: Labels,
}

impl Alert {
    pub fn firing(rule: &AlertRule, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            rule: rule.clone(),
            value,
            timestamp,
            status: AlertStatus::Firing,
            labels: rule.labels.clone(),
        }
    }
}
