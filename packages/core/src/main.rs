use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use metric_sentinel::alerts::{self, notifier::run_notifier};
use metric_sentinel::cli::{CheckArgs, Cli, Command, RunArgs};
use metric_sentinel::config::Config;
use metric_sentinel::error::AppError;
use metric_sentinel::ingest::ingest_lines;
use metric_sentinel::logging::init_logging;
use metric_sentinel::metrics::EngineMetrics;
use metric_sentinel::rules::loader::{load_rules_file, validate_rules};
use metric_sentinel::scheduler::run_evaluation_loop;
use metric_sentinel::{Aggregator, RuleEvaluator, SeriesRegistry};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging("info");

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Check(args) => check(args),
    };

    let code = match result {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!("{}", err);
            1
        }
    };
    // Exit explicitly: the stdin reader may still be parked in a blocking read.
    process::exit(code);
}

async fn run(args: RunArgs) -> Result<(), AppError> {
    let config = Config::from_env(&args)?;
    tracing::info!("Service started with config: {:?}", config);

    let metrics = Arc::new(EngineMetrics::new()?);
    let registry = Arc::new(SeriesRegistry::with_retention(config.retention));
    let (dispatcher, alert_rx) = alerts::channel(config.alert_channel_capacity);

    let evaluator = RuleEvaluator::new(Aggregator::new(Arc::clone(&registry)), dispatcher)
        .with_metrics(Arc::clone(&metrics));
    evaluator.load_rules(load_rules_file(&config.rules_path)?);
    let evaluator = Arc::new(evaluator);

    let cancel = CancellationToken::new();
    let notifier = tokio::spawn(run_notifier(alert_rx));
    let evaluation = tokio::spawn(run_evaluation_loop(
        Arc::clone(&evaluator),
        config.check_interval,
        cancel.clone(),
    ));
    let ingestion = {
        let registry = Arc::clone(&registry);
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(err) = ingest_lines(stdin, &registry, Some(&metrics)).await {
                tracing::error!("Ingestion stopped: {}", err);
            }
        })
    };

    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    ingestion.abort();

    if let Err(err) = evaluation.await {
        tracing::error!("Evaluation task failed: {}", err);
    }
    // Last sender goes away here, which lets the notifier drain and stop.
    drop(evaluator);
    if let Err(err) = notifier.await {
        tracing::error!("Notifier task failed: {}", err);
    }

    if args.print_metrics {
        tracing::info!("Final metrics:\n{}", metrics.render()?);
    }
    tracing::info!("Alerting system shutdown complete ({} series in memory)", registry.len());
    Ok(())
}

fn check(args: CheckArgs) -> Result<(), AppError> {
    let path = args
        .rules
        .or_else(|| env::var("RULES_PATH").ok().map(PathBuf::from))
        .ok_or_else(|| AppError::Config("RULES_PATH is required".to_string()))?;

    let rules = load_rules_file(&path)?;
    let invalid = validate_rules(&rules);
    for (rule, err) in &invalid {
        tracing::error!("Rule {} is malformed: {}", rule.name, err);
    }

    if !invalid.is_empty() {
        return Err(AppError::Config(format!(
            "{} of {} rules in {} are malformed",
            invalid.len(),
            rules.len(),
            path.display()
        )));
    }

    tracing::info!("All {} rules in {} are valid", rules.len(), path.display());
    Ok(())
}
