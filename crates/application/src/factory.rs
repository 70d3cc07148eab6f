//! 组件工厂
//!
//! 从 `ForwarderConfig` 各段构建运行时组件：订阅源、路由器。
//! 投递目标由 `dispatcher::create_message_sink` 构建。

use std::sync::Arc;

use contracts::{ForwarderError, RouterConfig, SourceConfig};
use ingestion::{
    AnyMessageSource, AnyReplayStorage, Feed, MultiMessageSource, ReplayTracker,
    SubscriptionSource,
};
use routing::{MessageRouter, RoutingCondition, RoutingRule};
use tracing::{info, instrument, warn};

use crate::ApplicationOptions;

/// 构建订阅源
///
/// 单个订阅返回 `Single`，多个订阅返回 fan-in 的 `Multi`。
/// 配置了 replay 存储时，所有订阅共享同一个存储实例。
#[instrument(
    name = "factory_create_source",
    skip(config, options),
    fields(subscriptions = config.subscriptions.len())
)]
pub fn create_message_source(
    config: &SourceConfig,
    options: &ApplicationOptions,
) -> Result<AnyMessageSource, ForwarderError> {
    if config.subscriptions.is_empty() {
        return Err(ForwarderError::config_validation(
            "source.subscriptions",
            "at least one subscription is required",
        ));
    }

    let storage = config
        .replay
        .as_ref()
        .map(|replay| (Arc::new(AnyReplayStorage::from_config(replay)), replay.key_prefix()));

    let mut sources = Vec::with_capacity(config.subscriptions.len());
    for (name, subscription) in &config.subscriptions {
        let mut source =
            SubscriptionSource::new(name, Feed::from_config(subscription), config.buffer_size)
                .with_connection_timeout(options.source_connection_timeout);

        if let Some((storage, prefix)) = &storage {
            let key_prefix = match prefix {
                Some(prefix) => format!("{prefix}:{name}"),
                None => name.clone(),
            };
            source = source.with_replay(ReplayTracker::new(
                Arc::clone(storage),
                key_prefix,
                options.ignore_replay_storage_errors,
            ));
        }

        info!(
            subscription = %name,
            kind = subscription.kind(),
            replay = storage.is_some(),
            "Subscription configured"
        );
        sources.push(source);
    }

    if sources.len() == 1 {
        if let Some(source) = sources.pop() {
            return Ok(AnyMessageSource::Single(source));
        }
    }
    Ok(AnyMessageSource::Multi(MultiMessageSource::new(sources)))
}

/// 构建路由器，编译所有规则条件
///
/// # Errors
/// 条件表达式无法编译时返回 `InvalidRoutingCondition`
pub fn create_router(config: &RouterConfig) -> Result<MessageRouter, ForwarderError> {
    let mut router = MessageRouter::new(config.default_route.clone());
    for rule in &config.rules {
        let condition = RoutingCondition::new(rule.condition.as_str())?;
        router.add_rule(RoutingRule::new(condition, rule.route.clone()));
    }

    if router.rule_count() == 0 && router.default_route().is_none() {
        warn!("No routing rules and no default route, every message will be dropped");
    }
    info!(
        rules = router.rule_count(),
        default_route = ?router.default_route().map(ToString::to_string),
        "Router configured"
    );
    Ok(router)
}
