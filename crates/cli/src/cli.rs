//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// roadwatch - road surface monitoring: edge agent and central store
#[derive(Parser, Debug)]
#[command(
    name = "roadwatch",
    author,
    version,
    about = "Road surface monitoring agent and store",
    long_about = "Reads aligned accelerometer / GPS / parking streams, classifies the road \n\
                  surface, and forwards batches to a store that persists them atomically \n\
                  and pushes every committed record to live subscribers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ROADWATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ROADWATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "ROADWATCH_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the edge agent: read streams, classify, forward batches
    Agent(AgentArgs),

    /// Run the store: ingress API, persistence, subscriber feed
    Serve(ServeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `agent` command
#[derive(Parser, Debug, Clone)]
pub struct AgentArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "roadwatch.toml", env = "ROADWATCH_CONFIG")]
    pub config: PathBuf,

    /// Override the store endpoint from configuration
    #[arg(long, env = "ROADWATCH_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Stop after this many readings (overrides configuration; 0 = unlimited)
    #[arg(long, env = "ROADWATCH_MAX_ROWS")]
    pub max_rows: Option<u64>,

    /// Override the batch size from configuration
    #[arg(long, env = "ROADWATCH_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Validate configuration and exit without running the agent
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "roadwatch.toml", env = "ROADWATCH_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address from configuration
    #[arg(long, env = "ROADWATCH_LISTEN")]
    pub listen: Option<String>,

    /// Override the database URL from configuration
    #[arg(long, env = "ROADWATCH_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Override the per-subscriber queue capacity
    #[arg(long, env = "ROADWATCH_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "roadwatch.toml", env = "ROADWATCH_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "roadwatch.toml", env = "ROADWATCH_CONFIG")]
    pub config: PathBuf,

    /// Output the effective configuration (defaults applied) as JSON
    #[arg(long, conflicts_with = "toml")]
    pub json: bool,

    /// Output the effective configuration (defaults applied) as TOML
    #[arg(long)]
    pub toml: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
