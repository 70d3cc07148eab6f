//! # Routing
//!
//! Message routing module.
//!
//! Responsibilities:
//! - Compile JSONPath routing conditions
//! - Evaluate conditions against `[{source_id, message}]`
//! - Resolve the first matching rule, falling back to the default route
//!
//! # Example
//!
//! ```
//! use contracts::{Message, Route};
//! use routing::{MessageRouter, RoutingCondition, RoutingRule};
//! use serde_json::json;
//!
//! let condition = RoutingCondition::new("$[?@.source_id == 'org1']").unwrap();
//! let mut router = MessageRouter::new(Some(Route::new("broker1", "events", "default")));
//! router.add_rule(RoutingRule::new(condition, Route::new("broker1", "events", "org1")));
//!
//! let message = Message::new(json!({ "channel": "/topic/Cases" }));
//! let route = router.find_route("org1", &message).unwrap();
//! assert_eq!(route.routing_key, "org1");
//! ```

mod condition;
mod router;

pub use condition::RoutingCondition;
pub use router::{MessageRouter, RouteResolution, RoutingRule};
