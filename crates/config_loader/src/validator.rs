//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个订阅，名称非空
//! - mock 订阅 interval_ms > 0
//! - 至少一个投递目标，每个目标至少声明一个 exchange (名称非空且唯一)
//! - udp 地址合法
//! - 路由指向已存在的目标与已声明的 exchange，routing_key 非空，属性键合法
//! - 规则条件非空 (编译检查由 router 完成)

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{
    ForwarderConfig, ForwarderError, Route, SubscriptionConfig, TransportConfig,
    ALLOWED_ROUTE_PROPERTIES,
};

/// 校验 ForwarderConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    validate_subscriptions(config)?;
    validate_destinations(config)?;
    validate_routes(config)?;
    validate_rule_conditions(config)?;
    Ok(())
}

/// 校验订阅定义
fn validate_subscriptions(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    let source = &config.source;

    if source.subscriptions.is_empty() {
        return Err(ForwarderError::config_validation(
            "source.subscriptions",
            "at least one subscription is required",
        ));
    }

    if source.buffer_size == 0 {
        return Err(ForwarderError::config_validation(
            "source.buffer_size",
            "buffer_size must be > 0",
        ));
    }

    for (name, subscription) in &source.subscriptions {
        if name.trim().is_empty() {
            return Err(ForwarderError::config_validation(
                "source.subscriptions",
                "subscription name cannot be empty",
            ));
        }

        if let SubscriptionConfig::Mock {
            channel,
            interval_ms,
            ..
        } = subscription
        {
            if *interval_ms == 0 {
                return Err(ForwarderError::config_validation(
                    format!("source.subscriptions.{name}.interval_ms"),
                    "interval_ms must be > 0",
                ));
            }
            if channel.is_empty() {
                return Err(ForwarderError::config_validation(
                    format!("source.subscriptions.{name}.channel"),
                    "channel cannot be empty",
                ));
            }
        }
    }
    Ok(())
}

/// 校验投递目标
fn validate_destinations(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    let destinations = &config.sink.destinations;

    if destinations.is_empty() {
        return Err(ForwarderError::config_validation(
            "sink.destinations",
            "at least one destination is required",
        ));
    }

    for (name, destination) in destinations {
        if name.trim().is_empty() {
            return Err(ForwarderError::config_validation(
                "sink.destinations",
                "destination name cannot be empty",
            ));
        }

        if destination.exchanges.is_empty() {
            return Err(ForwarderError::config_validation(
                format!("sink.destinations.{name}.exchanges"),
                "at least one exchange must be declared",
            ));
        }

        let mut seen = HashSet::new();
        for (idx, exchange) in destination.exchanges.iter().enumerate() {
            if exchange.name.is_empty() {
                return Err(ForwarderError::config_validation(
                    format!("sink.destinations.{name}.exchanges[{idx}].name"),
                    "exchange name cannot be empty",
                ));
            }
            if !seen.insert(exchange.name.as_str()) {
                return Err(ForwarderError::config_validation(
                    format!("sink.destinations.{name}.exchanges[name={}]", exchange.name),
                    "duplicate exchange name",
                ));
            }
        }

        if let TransportConfig::Udp { addr, .. } = &destination.transport {
            addr.parse::<SocketAddr>().map_err(|e| {
                ForwarderError::config_validation(
                    format!("sink.destinations.{name}.addr"),
                    format!("invalid socket address '{addr}': {e}"),
                )
            })?;
        }
    }
    Ok(())
}

/// 校验所有路由 (默认路由 + 规则路由)
fn validate_routes(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    for (field, route) in config.routes() {
        validate_route(config, &field, route)?;
    }
    Ok(())
}

fn validate_route(config: &ForwarderConfig, field: &str, route: &Route) -> Result<(), ForwarderError> {
    let destination = config
        .sink
        .destinations
        .get(&route.destination)
        .ok_or_else(|| {
            ForwarderError::config_validation(
                format!("{field}.destination"),
                format!("destination '{}' is not defined", route.destination),
            )
        })?;

    if !destination.declares_exchange(&route.exchange) {
        return Err(ForwarderError::config_validation(
            format!("{field}.exchange"),
            format!(
                "exchange '{}' is not declared on destination '{}'",
                route.exchange, route.destination
            ),
        ));
    }

    if route.routing_key.is_empty() {
        return Err(ForwarderError::config_validation(
            format!("{field}.routing_key"),
            "routing_key cannot be empty",
        ));
    }

    if let Some(properties) = &route.properties {
        if let Some(key) = properties
            .keys()
            .find(|key| !ALLOWED_ROUTE_PROPERTIES.contains(&key.as_str()))
        {
            return Err(ForwarderError::config_validation(
                format!("{field}.properties.{key}"),
                format!("unknown delivery property '{key}'"),
            ));
        }
    }
    Ok(())
}

/// 校验规则条件非空
fn validate_rule_conditions(config: &ForwarderConfig) -> Result<(), ForwarderError> {
    for (idx, rule) in config.router.rules.iter().enumerate() {
        if rule.condition.trim().is_empty() {
            return Err(ForwarderError::config_validation(
                format!("router.rules[{idx}].condition"),
                "condition cannot be empty",
            ));
        }
    }
    Ok(())
}
