//! MessageRouter - ordered rules with a default fallback
//!
//! The router is built once at startup and shared read-only by every
//! forwarding task. `find_route` never mutates state.

use contracts::{Message, Route};
use serde_json::{json, Value};
use tracing::info;

use crate::RoutingCondition;

/// Counter incremented whenever no rule matches and the default route is used
const ROUTE_FALLBACK_TOTAL: &str = "forwarder_route_fallback_total";

/// A condition paired with the route it selects
#[derive(Debug, Clone)]
pub struct RoutingRule {
    condition: RoutingCondition,
    route: Route,
}

impl RoutingRule {
    pub fn new(condition: RoutingCondition, route: Route) -> Self {
        Self { condition, route }
    }

    pub fn condition(&self) -> &RoutingCondition {
        &self.condition
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Whether the rule applies to the routing envelope
    #[inline]
    pub fn is_matching(&self, envelope: &Value) -> bool {
        self.condition.is_matching(envelope)
    }
}

/// Outcome of a routing decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteResolution<'a> {
    /// Rule at `index` matched
    Rule { index: usize, route: &'a Route },
    /// No rule matched, default route used
    Default(&'a Route),
    /// No rule matched and no default route configured
    Unrouted,
}

impl<'a> RouteResolution<'a> {
    /// Resolved route, if any
    pub fn route(&self) -> Option<&'a Route> {
        match *self {
            Self::Rule { route, .. } | Self::Default(route) => Some(route),
            Self::Unrouted => None,
        }
    }
}

/// First-match-wins router
#[derive(Debug, Clone, Default)]
pub struct MessageRouter {
    /// Rules in priority order
    rules: Vec<RoutingRule>,

    /// Used when no rule matches, `None` drops the message
    default_route: Option<Route>,
}

impl MessageRouter {
    /// Create a router without rules
    #[must_use]
    pub fn new(default_route: Option<Route>) -> Self {
        Self {
            rules: Vec::new(),
            default_route,
        }
    }

    /// Create a router from an ordered rule list
    #[must_use]
    pub fn with_rules(default_route: Option<Route>, rules: Vec<RoutingRule>) -> Self {
        Self {
            rules,
            default_route,
        }
    }

    /// Append a rule with the lowest priority
    pub fn add_rule(&mut self, rule: RoutingRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    pub fn default_route(&self) -> Option<&Route> {
        self.default_route.as_ref()
    }

    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Build the envelope conditions are evaluated against
    pub fn envelope(source_id: &str, message: &Message) -> Value {
        json!([{ "source_id": source_id, "message": message.as_value() }])
    }

    /// Route for `message` received from `source_id`, `None` means drop
    pub fn find_route(&self, source_id: &str, message: &Message) -> Option<&Route> {
        self.resolve(source_id, message).route()
    }

    /// Same as [`find_route`](Self::find_route) but reports which branch was taken
    pub fn resolve(&self, source_id: &str, message: &Message) -> RouteResolution<'_> {
        let envelope = Self::envelope(source_id, message);

        if let Some((index, rule)) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.is_matching(&envelope))
        {
            return RouteResolution::Rule {
                index,
                route: rule.route(),
            };
        }

        match &self.default_route {
            Some(route) => {
                info!(
                    source_id,
                    channel = message.channel().unwrap_or_default(),
                    route = %route,
                    "no rule matched, using default route"
                );
                metrics::counter!(ROUTE_FALLBACK_TOTAL).increment(1);
                RouteResolution::Default(route)
            }
            None => RouteResolution::Unrouted,
        }
    }
}

#[cfg(test)]
mod tests {
    use contracts::{Message, Route};
    use serde_json::json;

    use crate::{MessageRouter, RouteResolution, RoutingCondition, RoutingRule};

    fn rule(expression: &str, routing_key: &str) -> RoutingRule {
        RoutingRule::new(
            RoutingCondition::new(expression).unwrap(),
            Route::new("broker1", "events", routing_key),
        )
    }

    fn message(channel: &str) -> Message {
        Message::new(json!({
            "channel": channel,
            "data": { "event": { "replayId": 1 }, "sobject": { "Priority": "High" } }
        }))
    }

    // =============================================================================
    // Basic router tests
    // =============================================================================

    #[test]
    fn test_new_router_has_no_rules() {
        let router = MessageRouter::new(None);
        assert_eq!(router.rule_count(), 0);
        assert!(router.default_route().is_none());
    }

    #[test]
    fn test_add_rule_appends() {
        let mut router = MessageRouter::new(None);
        router.add_rule(rule("$[?@.source_id == 'a']", "a"));
        router.add_rule(rule("$[?@.source_id == 'b']", "b"));

        assert_eq!(router.rule_count(), 2);
        assert_eq!(router.rules()[1].route().routing_key, "b");
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = MessageRouter::envelope("org1", &message("/topic/A"));
        assert_eq!(envelope[0]["source_id"], json!("org1"));
        assert_eq!(envelope[0]["message"]["channel"], json!("/topic/A"));
    }

    // =============================================================================
    // Matching tests
    // =============================================================================

    #[test]
    fn test_source_id_routing_with_default() {
        let default = Route::new("broker1", "events", "default");
        let mut router = MessageRouter::new(Some(default.clone()));
        router.add_rule(rule("$[?@.source_id == 'org1']", "org1"));

        let from_org1 = router.find_route("org1", &message("/topic/A")).unwrap();
        assert_eq!(from_org1.routing_key, "org1");

        let from_org2 = router.find_route("org2", &message("/topic/A")).unwrap();
        assert_eq!(from_org2, &default);
    }

    #[test]
    fn test_first_match_wins() {
        let router = MessageRouter::with_rules(
            None,
            vec![
                rule("$[?@.message.channel == '/topic/A']", "first"),
                rule("$[?@.source_id == 'org1']", "second"),
            ],
        );

        let resolution = router.resolve("org1", &message("/topic/A"));
        assert!(matches!(resolution, RouteResolution::Rule { index: 0, .. }));
        assert_eq!(resolution.route().unwrap().routing_key, "first");

        let resolution = router.resolve("org1", &message("/topic/B"));
        assert!(matches!(resolution, RouteResolution::Rule { index: 1, .. }));
    }

    #[test]
    fn test_payload_field_condition() {
        let router = MessageRouter::with_rules(
            None,
            vec![rule(
                "$[?@.message.data.sobject.Priority == 'High']",
                "urgent",
            )],
        );
        let route = router.find_route("org1", &message("/topic/A")).unwrap();
        assert_eq!(route.routing_key, "urgent");
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let router = MessageRouter::with_rules(
            Some(Route::new("broker1", "events", "default")),
            vec![rule("$[?@.source_id == 'org1']", "org1")],
        );
        let msg = message("/topic/A");

        let first = router.find_route("org1", &msg).cloned();
        for _ in 0..10 {
            assert_eq!(router.find_route("org1", &msg).cloned(), first);
        }
    }

    // =============================================================================
    // Fallback tests
    // =============================================================================

    #[test]
    fn test_default_used_when_nothing_matches() {
        let default = Route::new("broker1", "events", "default");
        let router = MessageRouter::with_rules(
            Some(default.clone()),
            vec![rule("$[?@.source_id == 'org9']", "org9")],
        );
        assert_eq!(
            router.resolve("org1", &message("/topic/A")),
            RouteResolution::Default(&default)
        );
    }

    #[test]
    fn test_no_rules_no_default_drops() {
        let router = MessageRouter::new(None);
        assert_eq!(
            router.resolve("org1", &message("/topic/A")),
            RouteResolution::Unrouted
        );
        assert!(router.find_route("org1", &message("/topic/A")).is_none());
    }
}
