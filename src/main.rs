//! Fraud Risk Engine - Main Entry Point
//!
//! Reads newline-delimited commands from stdin and writes one JSON response
//! per line to stdout. A line is either a transaction object to score,
//! `retrain`, or `info`. Logs go to stderr.

use anyhow::{Context, Result};
use fraud_risk_engine::{
    config::{AppConfig, LoggingConfig},
    metrics::{EngineMetrics, MetricsReporter},
    ScoringEngine, Transaction,
};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
const METRICS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let (config, loaded_from_file) = load_config(&config_path)?;

    init_logging(&config.logging)?;
    info!("Starting Fraud Risk Engine");
    if loaded_from_file {
        info!(path = %config_path, "Configuration loaded");
    } else {
        warn!(path = %config_path, "Configuration file not found, using defaults");
    }
    info!(
        high = config.detection.risk_levels.high,
        medium = config.detection.risk_levels.medium,
        artifact = %config.model.artifact_path().display(),
        "Risk level thresholds"
    );

    let metrics = Arc::new(EngineMetrics::new());
    let engine = Arc::new(ScoringEngine::with_metrics(config, Arc::clone(&metrics)));
    Arc::clone(&engine)
        .initialize_async()
        .await
        .context("Failed to initialize scoring engine")?;

    tokio::spawn(MetricsReporter::new(Arc::clone(&metrics), METRICS_INTERVAL).start());
    if let Some(interval) = engine.retrain_interval() {
        info!(hours = interval.as_secs() / 3600, "Retrain scheduler enabled");
        Arc::clone(&engine).spawn_retrain_scheduler(interval);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let response = match command {
            "retrain" => to_json(Arc::clone(&engine).retrain_async().await),
            "info" => to_json(engine.model_info()),
            payload => score_line(&engine, payload),
        };

        stdout.write_all(response.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("Input closed, shutting down");
    metrics.log_summary();
    Ok(())
}

/// Parse, validate and score one transaction line
fn score_line(engine: &ScoringEngine, payload: &str) -> serde_json::Value {
    let transaction = match serde_json::from_str::<Transaction>(payload) {
        Ok(tx) => tx,
        Err(e) => {
            warn!(error = %e, "Failed to deserialize transaction");
            return json!({ "error": format!("invalid transaction: {e}") });
        }
    };
    match transaction.validate() {
        Ok(tx) => to_json(engine.score(&tx)),
        Err(e) => {
            warn!(error = %e, "Transaction rejected");
            json!({ "error": e.to_string() })
        }
    }
}

fn to_json<T: Serialize, E: std::fmt::Display>(result: std::result::Result<T, E>) -> serde_json::Value {
    match result {
        Ok(value) => serde_json::to_value(value)
            .unwrap_or_else(|e| json!({ "error": format!("failed to encode response: {e}") })),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

fn load_config(path: &str) -> Result<(AppConfig, bool)> {
    if Path::new(path).exists() {
        Ok((AppConfig::load_from_path(path)?, true))
    } else {
        let config = AppConfig::default();
        config.validate()?;
        Ok((config, false))
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("fraud_risk_engine={}", logging.level)),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if logging.format == "pretty" {
        builder.pretty().try_init()
    } else {
        builder.json().try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
