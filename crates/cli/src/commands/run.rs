//! `run` command implementation.

use anyhow::{Context, Result};
use application::{create_router, Application, ApplicationOptions, CancellationToken};
use std::time::Duration;
use tracing::info;

use super::info::print_config_info;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::report::print_summary;
use crate::signal::spawn_shutdown_listener;

/// Execute the `run` command
pub async fn run_forwarder(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let subscriptions = config.source.subscriptions.len();
    let destinations = config.sink.destinations.len();
    info!(
        subscriptions,
        destinations,
        rules = config.router.rules.len(),
        default_route = config.router.default_route.is_some(),
        "Configuration loaded"
    );

    // Dry run - compile the routing table and exit
    if args.dry_run {
        create_router(&config.router).map_err(CliError::from)?;
        info!("Dry run mode - configuration is valid, exiting");
        print_config_info(&config);
        return Ok(());
    }

    // Initialize Metrics (optional)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let options = ApplicationOptions {
        ignore_sink_errors: args.ignore_sink_errors,
        ignore_replay_storage_errors: args.ignore_replay_storage_errors,
        source_connection_timeout: (args.source_connection_timeout > 0)
            .then(|| Duration::from_secs(args.source_connection_timeout)),
    };
    info!(
        ignore_sink_errors = options.ignore_sink_errors,
        ignore_replay_storage_errors = options.ignore_replay_storage_errors,
        source_connection_timeout = ?options.source_connection_timeout,
        "Run options"
    );

    let mut app = Application::new(config, options);
    app.configure()
        .await
        .map_err(CliError::from)
        .context("Failed to configure forwarder")?;

    // Setup graceful shutdown handler
    let shutdown = CancellationToken::new();
    let listener = spawn_shutdown_listener(shutdown.clone());

    info!("Starting forwarder...");
    let result = app.run(shutdown).await;
    listener.abort();

    let stats = result.map_err(CliError::from)?;
    info!(
        received = stats.received(),
        forwarded = stats.forwarded(),
        dropped = stats.dropped(),
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Forwarder completed successfully"
    );

    // Print detailed statistics
    print_summary(&stats, subscriptions, destinations);

    info!("Stream Forwarder finished");
    Ok(())
}
