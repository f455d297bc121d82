//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::pipeline::{SessionRun, SessionRunConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }
    if !args.scenario.exists() {
        anyhow::bail!("Scenario file not found: {}", args.scenario.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let scenario = config_loader::ConfigLoader::load_scenario_from_path(&args.scenario)
        .with_context(|| format!("Failed to load scenario from {}", args.scenario.display()))?;

    info!(
        min_latency_us = blueprint.timing.min_latency_us,
        max_latency_us = blueprint.timing.max_latency_us,
        session_timeout_secs = blueprint.timing.session_timeout_secs,
        sinks = blueprint.effective_sinks().len(),
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration and scenario are valid, exiting");
        return Ok(());
    }

    let config = SessionRunConfig {
        blueprint,
        scenario,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let stats = SessionRun::new(config)
        .run()
        .await
        .context("Session run failed")?;

    stats.print_summary();

    info!(accepted = stats.accepted(), "Blink Sync finished");
    Ok(())
}
