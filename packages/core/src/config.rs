use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::alerts::DEFAULT_CHANNEL_CAPACITY;
use crate::cli::RunArgs;
use crate::error::AppError;
use crate::scheduler::DEFAULT_INTERVAL;

const DEFAULT_RETENTION_HOURS: u64 = 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub rules_path: PathBuf,
    pub check_interval: Duration,
    pub alert_channel_capacity: usize,
    pub retention: Duration,
}

impl Config {
    /// Build the config from CLI overrides, falling back to the process
    /// environment and then to defaults.
    pub fn from_env(args: &RunArgs) -> Result<Self, AppError> {
        Self::from_sources(args, |key| env::var(key).ok())
    }

    pub fn from_sources(
        args: &RunArgs,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let rules_path = args
            .rules
            .clone()
            .or_else(|| lookup("RULES_PATH").map(PathBuf::from))
            .ok_or_else(|| AppError::Config("RULES_PATH is required".to_string()))?;

        let check_interval = match args.interval.clone().or_else(|| lookup("CHECK_INTERVAL")) {
            Some(raw) => humantime::parse_duration(raw.trim()).map_err(|err| {
                AppError::Config(format!("CHECK_INTERVAL '{}' is invalid: {}", raw, err))
            })?,
            None => DEFAULT_INTERVAL,
        };
        if check_interval.is_zero() {
            return Err(AppError::Config("CHECK_INTERVAL must be greater than zero".to_string()));
        }

        let alert_channel_capacity = match args.channel_capacity {
            Some(capacity) => capacity,
            None => parse_number(&lookup, "ALERT_CHANNEL_CAPACITY")?
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY as u64) as usize,
        };
        if alert_channel_capacity == 0 {
            return Err(AppError::Config(
                "ALERT_CHANNEL_CAPACITY must be greater than zero".to_string(),
            ));
        }

        let retention_hours = match args.retention_hours {
            Some(hours) => hours,
            None => parse_number(&lookup, "RETENTION_HOURS")?.unwrap_or(DEFAULT_RETENTION_HOURS),
        };
        if retention_hours == 0 {
            return Err(AppError::Config("RETENTION_HOURS must be greater than zero".to_string()));
        }
        let retention_secs = retention_hours
            .checked_mul(3600)
            .ok_or_else(|| AppError::Config("RETENTION_HOURS is too large".to_string()))?;

        Ok(Self {
            rules_path,
            check_interval,
            alert_channel_capacity,
            retention: Duration::from_secs(retention_secs),
        })
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, AppError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| AppError::Config(format!("{} must be a valid number", key)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_rules_path_is_set() {
        let config =
            Config::from_sources(&RunArgs::default(), env_of(&[("RULES_PATH", "rules.json")]))
                .unwrap();
        assert_eq!(config.rules_path, PathBuf::from("rules.json"));
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.alert_channel_capacity, 100);
        assert_eq!(config.retention, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn environment_values_are_parsed() {
        let config = Config::from_sources(
            &RunArgs::default(),
            env_of(&[
                ("RULES_PATH", "r.json"),
                ("CHECK_INTERVAL", "1m"),
                ("ALERT_CHANNEL_CAPACITY", "5"),
                ("RETENTION_HOURS", "2"),
            ]),
        )
        .unwrap();
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.alert_channel_capacity, 5);
        assert_eq!(config.retention, Duration::from_secs(7200));
    }

    #[test]
    fn cli_overrides_environment() {
        let args = RunArgs {
            rules: Some(PathBuf::from("cli.json")),
            interval: Some("10s".to_string()),
            channel_capacity: Some(7),
            retention_hours: Some(1),
            print_metrics: false,
        };
        let config = Config::from_sources(
            &args,
            env_of(&[("RULES_PATH", "env.json"), ("CHECK_INTERVAL", "1h")]),
        )
        .unwrap();
        assert_eq!(config.rules_path, PathBuf::from("cli.json"));
        assert_eq!(config.check_interval, Duration::from_secs(10));
        assert_eq!(config.alert_channel_capacity, 7);
        assert_eq!(config.retention, Duration::from_secs(3600));
    }

    #[test]
    fn missing_rules_path_is_an_error() {
        let err = Config::from_sources(&RunArgs::default(), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("RULES_PATH"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("CHECK_INTERVAL", "soon"),
            ("CHECK_INTERVAL", "0s"),
            ("ALERT_CHANNEL_CAPACITY", "lots"),
            ("ALERT_CHANNEL_CAPACITY", "0"),
            ("RETENTION_HOURS", "-1"),
            ("RETENTION_HOURS", "0"),
        ] {
            let result = Config::from_sources(
                &RunArgs::default(),
                env_of(&[("RULES_PATH", "r.json"), (key, value)]),
            );
            assert!(result.is_err(), "{}={} should be rejected", key, value);
        }
    }

    #[test]
    fn oversized_retention_is_rejected() {
        let args = RunArgs {
            retention_hours: Some(u64::MAX),
            ..RunArgs::default()
        };
        let err = Config::from_sources(&args, env_of(&[("RULES_PATH", "r.json")])).unwrap_err();
        assert!(err.to_string().contains("RETENTION_HOURS"));

        let result = Config::from_sources(
            &RunArgs::default(),
            env_of(&[("RULES_PATH", "r.json"), ("RETENTION_HOURS", &u64::MAX.to_string())]),
        );
        assert!(result.is_err());
    }
}
