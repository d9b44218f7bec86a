//! dataflow-rs - Main Entry Point
//!
//! Usage: `dataflow-rs [config]`
//!
//! Runs the mode named in the config (stats, generate or walk). Pipeline
//! output goes to stdout; logs go to stderr and, optionally, a log file.

use anyhow::Context;
use dataflow_rs::config::{LogSettings, RunConfig};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "info,dataflow_rs=debug";

fn init_logging(settings: &LogSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(settings.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
        })
    };

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_filter(filter());

    let (file_layer, guard) = match &settings.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    // Logging is not up yet, so load failures can only go to stderr.
    let config = match &config_path {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunConfig::load_or_default(None),
    };

    let _log_guard = init_logging(&config.log)?;
    tracing::info!("Starting dataflow-rs");

    let report = dataflow_rs::app::run(&config).context("Failed to run pipeline")?;
    for outcome in report.failures() {
        if let Err(e) = &outcome.result {
            tracing::error!("Task {} '{}': {}", outcome.id, outcome.name, e);
        }
    }
    if let Some(e) = report.first_failure() {
        anyhow::bail!("Pipeline failed: {}", e);
    }

    tracing::info!("Done");
    Ok(())
}
