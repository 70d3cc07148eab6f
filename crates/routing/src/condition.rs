//! RoutingCondition - compiled JSONPath predicate

use std::fmt;

use contracts::ForwarderError;
use serde_json::Value;
use serde_json_path::JsonPath;

/// Compiled JSONPath expression
///
/// The expression is evaluated against the routing envelope
/// `[{"source_id": ..., "message": ...}]`; it matches when the query
/// selects at least one node. Typical conditions are filter selectors such
/// as `$[?@.source_id == 'org1']` or `$[?@.message.channel == '/topic/Cases']`.
#[derive(Debug, Clone)]
pub struct RoutingCondition {
    expression: String,
    path: JsonPath,
}

impl RoutingCondition {
    /// Compile `expression`
    ///
    /// # Errors
    /// `ForwarderError::InvalidRoutingCondition` if the expression is not valid JSONPath
    pub fn new(expression: impl Into<String>) -> Result<Self, ForwarderError> {
        let expression = expression.into();
        let path = JsonPath::parse(&expression)
            .map_err(|e| ForwarderError::invalid_condition(&expression, e.to_string()))?;
        Ok(Self { expression, path })
    }

    /// Source text of the expression
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the expression selects anything in `envelope`
    pub fn is_matching(&self, envelope: &Value) -> bool {
        !self.path.query(envelope).is_empty()
    }
}

impl fmt::Display for RoutingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(source_id: &str, message: Value) -> Value {
        json!([{ "source_id": source_id, "message": message }])
    }

    #[test]
    fn test_matches_source_id() {
        let condition = RoutingCondition::new("$[?@.source_id == 'org1']").unwrap();
        assert!(condition.is_matching(&envelope("org1", json!({}))));
        assert!(!condition.is_matching(&envelope("org2", json!({}))));
    }

    #[test]
    fn test_matches_nested_message_field() {
        let condition =
            RoutingCondition::new("$[?@.message.data.sobject.Status == 'Closed']").unwrap();
        let closed = json!({ "data": { "sobject": { "Status": "Closed" } } });
        let open = json!({ "data": { "sobject": { "Status": "New" } } });

        assert!(condition.is_matching(&envelope("org1", closed)));
        assert!(!condition.is_matching(&envelope("org1", open)));
    }

    #[test]
    fn test_parenthesized_filter() {
        let condition = RoutingCondition::new("$[?(@.source_id == 'org1')]").unwrap();
        assert!(condition.is_matching(&envelope("org1", json!({}))));
    }

    #[test]
    fn test_plain_path_matches_when_present() {
        let condition = RoutingCondition::new("$[0].message.channel").unwrap();
        assert!(condition.is_matching(&envelope("org1", json!({ "channel": "/topic/A" }))));
        assert!(!condition.is_matching(&envelope("org1", json!({ "payload": 1 }))));
    }

    #[test]
    fn test_invalid_expression() {
        let err = RoutingCondition::new("$[?@.source_id ==").unwrap_err();
        assert!(matches!(err, ForwarderError::InvalidRoutingCondition { .. }));
        assert!(err.to_string().contains("$[?@.source_id =="));
    }

    #[test]
    fn test_display_is_expression() {
        let condition = RoutingCondition::new("$[0]").unwrap();
        assert_eq!(condition.to_string(), "$[0]");
        assert_eq!(condition.expression(), "$[0]");
    }
}
