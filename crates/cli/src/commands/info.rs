//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ForwarderConfig, ReplayStorageConfig, SubscriptionConfig, TransportConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    subscriptions: Vec<SubscriptionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay: Option<String>,
    destinations: Vec<DestinationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_route: Option<String>,
    rules: Vec<RuleInfo>,
}

#[derive(Serialize)]
struct SubscriptionInfo {
    name: String,
    kind: String,
    detail: String,
}

#[derive(Serialize)]
struct DestinationInfo {
    name: String,
    transport: String,
    target: String,
    exchanges: Vec<String>,
}

#[derive(Serialize)]
struct RuleInfo {
    condition: String,
    route: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn describe_subscription(subscription: &SubscriptionConfig) -> String {
    match subscription {
        SubscriptionConfig::File { path, channel } => match channel {
            Some(channel) => format!("{} (channel {})", path.display(), channel),
            None => path.display().to_string(),
        },
        SubscriptionConfig::Mock {
            channel,
            interval_ms,
            count,
        } => match count {
            Some(count) => format!("{channel} every {interval_ms} ms, {count} events"),
            None => format!("{channel} every {interval_ms} ms"),
        },
    }
}

fn describe_transport(transport: &TransportConfig) -> String {
    match transport {
        TransportConfig::Log => "tracing log".to_string(),
        TransportConfig::File { path } => path.display().to_string(),
        TransportConfig::Udp {
            addr,
            max_datagram_size,
        } => format!("{addr} (max {max_datagram_size} bytes)"),
    }
}

fn describe_replay(replay: &ReplayStorageConfig) -> String {
    let storage = match replay {
        ReplayStorageConfig::Memory { .. } => "memory".to_string(),
        ReplayStorageConfig::File { path, .. } => format!("file {}", path.display()),
    };
    match replay.key_prefix() {
        Some(prefix) => format!("{storage}, key prefix '{prefix}'"),
        None => storage,
    }
}

fn build_config_info(config: &ForwarderConfig) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", config.version),
        subscriptions: config
            .source
            .subscriptions
            .iter()
            .map(|(name, subscription)| SubscriptionInfo {
                name: name.clone(),
                kind: subscription.kind().to_string(),
                detail: describe_subscription(subscription),
            })
            .collect(),
        replay: config.source.replay.as_ref().map(describe_replay),
        destinations: config
            .sink
            .destinations
            .iter()
            .map(|(name, destination)| DestinationInfo {
                name: name.clone(),
                transport: destination.transport.kind().to_string(),
                target: describe_transport(&destination.transport),
                exchanges: destination
                    .exchanges
                    .iter()
                    .map(|exchange| exchange.name.clone())
                    .collect(),
            })
            .collect(),
        default_route: config.router.default_route.as_ref().map(ToString::to_string),
        rules: config
            .router
            .rules
            .iter()
            .map(|rule| RuleInfo {
                condition: rule.condition.clone(),
                route: rule.route.to_string(),
            })
            .collect(),
    }
}

fn tree_prefix(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "`-"
    } else {
        "|-"
    }
}

/// Human-readable configuration overview
pub(crate) fn print_config_info(config: &ForwarderConfig) {
    let info = build_config_info(config);

    println!("================================================================");
    println!("                 Stream Forwarder Configuration");
    println!("================================================================\n");
    println!("Version: {}", info.version);

    println!("\nSubscriptions ({})", info.subscriptions.len());
    for (i, subscription) in info.subscriptions.iter().enumerate() {
        println!(
            "   {} {} [{}] {}",
            tree_prefix(i, info.subscriptions.len()),
            subscription.name,
            subscription.kind,
            subscription.detail
        );
    }
    match &info.replay {
        Some(replay) => println!("   Replay markers: {}", replay),
        None => println!("   Replay markers: disabled"),
    }

    println!("\nDestinations ({})", info.destinations.len());
    for (i, destination) in info.destinations.iter().enumerate() {
        println!(
            "   {} {} [{}] {}",
            tree_prefix(i, info.destinations.len()),
            destination.name,
            destination.transport,
            destination.target
        );
        println!("         exchanges: {}", destination.exchanges.join(", "));
    }

    println!("\nRouting ({} rules)", info.rules.len());
    for (i, rule) in info.rules.iter().enumerate() {
        println!("   {}. {} -> {}", i + 1, rule.condition, rule.route);
    }
    match &info.default_route {
        Some(route) => println!("   default -> {}", route),
        None => println!("   default -> (drop)"),
    }

    println!();
}
