use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Metric Sentinel CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "metric-sentinel",
    version,
    about = "In-memory metrics store with threshold alerting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest JSON-lines metrics from stdin and evaluate alert rules until Ctrl+C
    Run(RunArgs),
    /// Validate a rule file and exit
    Check(CheckArgs),
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Path to the JSON rule file (overrides RULES_PATH)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Rule evaluation interval, e.g. 30s or 1m (overrides CHECK_INTERVAL)
    #[arg(long)]
    pub interval: Option<String>,

    /// Alert channel capacity (overrides ALERT_CHANNEL_CAPACITY)
    #[arg(long)]
    pub channel_capacity: Option<usize>,

    /// Sample retention in hours (overrides RETENTION_HOURS)
    #[arg(long)]
    pub retention_hours: Option<u64>,

    /// Log the self-metrics in Prometheus text format on shutdown
    #[arg(long)]
    pub print_metrics: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Path to the JSON rule file (overrides RULES_PATH)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}
