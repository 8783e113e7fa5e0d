//! `agent` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::AgentArgs;
use crate::pipeline::AgentPipeline;

use super::{load_blueprint, shutdown_signal};

/// Execute the `agent` command
pub async fn run_agent(args: &AgentArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    let mut blueprint = load_blueprint(&args.config)?;

    // Apply CLI overrides
    if let Some(ref endpoint) = args.endpoint {
        info!(endpoint = %endpoint, "Overriding store endpoint from CLI");
        blueprint.forwarder.endpoint = endpoint.clone();
    }
    if let Some(max_rows) = args.max_rows {
        blueprint.agent.max_rows = max_rows;
    }
    if let Some(batch_size) = args.batch_size {
        blueprint.agent.batch_size = batch_size;
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        endpoint = %blueprint.forwarder.endpoint,
        batch_size = blueprint.agent.batch_size,
        read_interval_ms = blueprint.agent.read_interval_ms,
        max_rows = blueprint.agent.max_rows,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_agent_summary(&blueprint);
        return Ok(());
    }

    let pipeline = AgentPipeline::new(blueprint);
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Agent execution failed")?;

    info!(
        rows = stats.report.rows_read,
        batches = stats.report.batches_forwarded,
        failed = stats.report.batches_failed,
        rows_per_sec = format!("{:.2}", stats.rows_per_sec()),
        "Agent finished"
    );
    stats.print_summary();
    Ok(())
}

/// Print configuration summary for dry-run mode
fn print_agent_summary(blueprint: &contracts::RoadwatchBlueprint) {
    let streams = &blueprint.agent.streams;
    println!("\n=== Agent Configuration ===\n");
    println!("Streams (headers: {}):", streams.has_headers);
    println!("  accelerometer: {}", streams.accelerometer.display());
    println!("  gps:           {}", streams.gps.display());
    println!("  parking:       {}", streams.parking.display());
    println!(
        "\nClassifier: rest_value={}, epsilon={}",
        blueprint.classifier.rest_value, blueprint.classifier.epsilon
    );
    println!(
        "Forwarder: {} (timeout {} ms, {} attempts)",
        blueprint.forwarder.endpoint, blueprint.forwarder.timeout_ms, blueprint.forwarder.max_attempts
    );
    println!();
}
