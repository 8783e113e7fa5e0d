//! `serve` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ServeArgs;
use crate::pipeline::StorePipeline;

use super::{load_blueprint, shutdown_signal};

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    let mut blueprint = load_blueprint(&args.config)?;

    if let Some(ref listen) = args.listen {
        info!(listen = %listen, "Overriding listen address from CLI");
        blueprint.store.listen_addr = listen.clone();
    }
    if let Some(ref url) = args.database_url {
        blueprint.store.database_url = url.clone();
    }
    if let Some(capacity) = args.queue_capacity {
        blueprint.store.subscriber_queue_capacity = capacity;
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    let pipeline = StorePipeline::start(&blueprint.store)
        .await
        .context("Store startup failed")?;
    pipeline
        .serve(shutdown_signal())
        .await
        .context("Store execution failed")?;

    info!("roadwatch store finished");
    Ok(())
}
