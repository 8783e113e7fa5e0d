//! # roadwatch CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 边缘代理 (`agent`) 与中心存储 (`serve`) 的编排
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::{init_with_config, level_for_verbosity, ObservabilityConfig};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_agent, run_info, run_serve, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: (cli.metrics_port != 0).then_some(cli.metrics_port),
        default_log_level: level_for_verbosity(cli.verbose, cli.quiet).to_string(),
        env_filter: !cli.quiet,
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "roadwatch starting");

    let result = match &cli.command {
        Commands::Agent(args) => run_agent(args).await,
        Commands::Serve(args) => run_serve(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
