//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stream Forwarder - route subscription events to message brokers
#[derive(Parser, Debug)]
#[command(
    name = "stream-forwarder",
    author,
    version,
    about = "Forward subscription events to broker destinations",
    long_about = "Receives events from one or more subscriptions, selects a route for each \n\
                  event with JSONPath rules and publishes it to the routed destination.\n\n\
                  On SIGINT/SIGTERM the subscriptions are closed, buffered events are \n\
                  still forwarded and in-flight deliveries are awaited before exit."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STREAM_FORWARDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STREAM_FORWARDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the forwarder until the subscriptions end or a shutdown signal arrives
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML, JSON or YAML)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "STREAM_FORWARDER_CONFIG"
    )]
    pub config: PathBuf,

    /// Log failed deliveries and keep running
    #[arg(long, env = "STREAM_FORWARDER_IGNORE_SINK_ERRORS")]
    pub ignore_sink_errors: bool,

    /// Log replay marker storage failures and keep running
    #[arg(long, env = "STREAM_FORWARDER_IGNORE_REPLAY_STORAGE_ERRORS")]
    pub ignore_replay_storage_errors: bool,

    /// Seconds allowed for opening a subscription (0 = no timeout)
    #[arg(long, default_value = "10", env = "STREAM_FORWARDER_SOURCE_CONNECTION_TIMEOUT")]
    pub source_connection_timeout: u64,

    /// Validate configuration and exit without forwarding
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "STREAM_FORWARDER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
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
