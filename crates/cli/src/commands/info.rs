//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{RoadwatchBlueprint, StreamKind};
use tracing::info;

use crate::cli::InfoArgs;

use super::load_blueprint;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");
    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&blueprint)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else if args.toml {
        let toml = config_loader::ConfigLoader::to_toml(&blueprint)
            .context("Failed to serialize config info")?;
        println!("{}", toml);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn print_config_info(blueprint: &RoadwatchBlueprint) {
    let agent = &blueprint.agent;
    println!("\n=== roadwatch configuration ({:?}) ===\n", blueprint.version);

    println!("Agent:");
    println!("  Read interval: {} ms", agent.read_interval_ms);
    println!("  Read timeout: {} ms", agent.read_timeout_ms);
    println!("  Batch size: {}", agent.batch_size);
    if agent.max_rows == 0 {
        println!("  Max rows: unlimited");
    } else {
        println!("  Max rows: {}", agent.max_rows);
    }

    println!("\nStreams:");
    for kind in StreamKind::ALL {
        println!(
            "  - {:<13} {} [{}]",
            kind.as_str(),
            agent.streams.path(kind).display(),
            kind.fields().join(",")
        );
    }

    println!("\nClassifier:");
    println!("  Rest value: {}", blueprint.classifier.rest_value);
    println!("  Epsilon: {}", blueprint.classifier.epsilon);

    let forwarder = &blueprint.forwarder;
    println!("\nForwarder:");
    println!("  Endpoint: {}", forwarder.endpoint);
    println!("  Timeout: {} ms", forwarder.timeout_ms);
    println!(
        "  Retry: {} attempts, backoff {}..{} ms",
        forwarder.max_attempts, forwarder.initial_backoff_ms, forwarder.max_backoff_ms
    );

    let store = &blueprint.store;
    println!("\nStore:");
    println!("  Listen: {}", store.listen_addr);
    println!("  Database: {}", store.database_url);
    println!("  Max connections: {}", store.max_connections);
    println!("  Subscriber queue: {}", store.subscriber_queue_capacity);
    println!();
}
