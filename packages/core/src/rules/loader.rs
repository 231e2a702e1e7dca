//! Rule file loading.
//!
//! A rule file is a JSON array of [`AlertRule`] objects. Loading only
//! checks the JSON shape; queries, operators and durations are checked
//! at evaluation time (or up front with [`validate_rules`]).

use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::rules::error::RuleError;
use crate::rules::types::AlertRule;

/// Read and parse a rule file.
pub fn load_rules_file(path: impl AsRef<Path>) -> Result<Vec<AlertRule>, AppError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let rules = parse_rules(&raw)
        .map_err(|err| AppError::Parse(format!("{}: {}", path.display(), err)))?;
    tracing::info!("Loaded {} alert rules from {}", rules.len(), path.display());
    Ok(rules)
}

pub fn parse_rules(raw: &str) -> Result<Vec<AlertRule>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Compile every rule and return the ones that would be skipped, with
/// the reason.
pub fn validate_rules(rules: &[AlertRule]) -> Vec<(&AlertRule, RuleError)> {
    rules
        .iter()
        .filter_map(|rule| rule.compile().err().map(|err| (rule, err)))
        .collect()
}
