//! Routing filter - connection table evaluation
//!
//! Rules only restrict: with no rule applying to this port, every connection
//! receives every stream.

use contracts::{is_wildcard, ConnectionDescriptor, ContractError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingFilter {
    rules: Vec<ConnectionDescriptor>,
}

impl RoutingFilter {
    /// Build a filter, rejecting the whole table if any row is malformed
    pub fn new(rules: Vec<ConnectionDescriptor>) -> Result<Self, ContractError> {
        for (idx, rule) in rules.iter().enumerate() {
            rule.check().map_err(|e| match e {
                ContractError::ConfigValidation { field, message } => {
                    ContractError::config_validation(
                        format!("connection_table[{idx}].{field}"),
                        message,
                    )
                }
                other => other,
            })?;
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ConnectionDescriptor] {
        &self.rules
    }

    fn applies_to_port<'a>(
        &'a self,
        port_name: &'a str,
    ) -> impl Iterator<Item = &'a ConnectionDescriptor> + 'a {
        self.rules
            .iter()
            .filter(move |rule| is_wildcard(&rule.port_name) || rule.port_name == port_name)
    }

    /// True if `connection_id` should receive `stream_id` on `port_name`
    pub fn allows(&self, port_name: &str, connection_id: &str, stream_id: &str) -> bool {
        let mut listed = false;
        for rule in self.applies_to_port(port_name) {
            listed = true;
            let connection_matches =
                is_wildcard(&rule.connection_id) || rule.connection_id == connection_id;
            let stream_matches = is_wildcard(&rule.stream_id) || rule.stream_id == stream_id;
            if connection_matches && stream_matches {
                return true;
            }
        }
        !listed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(c: &str, s: &str, p: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::new(c, s, p)
    }

    #[test]
    fn test_empty_filter_is_open() {
        let filter = RoutingFilter::default();
        assert!(filter.allows("out", "c1", "s1"));
        assert!(filter.allows("out", "c2", "anything"));
    }

    #[test]
    fn test_exact_rule() {
        let filter = RoutingFilter::new(vec![rule("c1", "s1", "*")]).unwrap();
        assert!(filter.allows("out", "c1", "s1"));
        assert!(!filter.allows("out", "c2", "s1"));
        assert!(!filter.allows("out", "c1", "s2"));
        assert!(!filter.allows("out", "c2", "s2"));
    }

    #[test]
    fn test_wildcard_connection() {
        let filter = RoutingFilter::new(vec![rule("", "s1", "out")]).unwrap();
        assert!(filter.allows("out", "c1", "s1"));
        assert!(filter.allows("out", "c9", "s1"));
        assert!(!filter.allows("out", "c1", "s2"));
    }

    #[test]
    fn test_rules_for_other_ports_do_not_apply() {
        let filter = RoutingFilter::new(vec![rule("c1", "s1", "other_port")]).unwrap();
        assert!(filter.allows("out", "c2", "s2"));
        assert!(!filter.allows("other_port", "c2", "s2"));
    }

    #[test]
    fn test_order_is_irrelevant() {
        let a = RoutingFilter::new(vec![rule("c1", "s1", ""), rule("c2", "s2", "")]).unwrap();
        let b = RoutingFilter::new(vec![rule("c2", "s2", ""), rule("c1", "s1", "")]).unwrap();
        for (c, s) in [("c1", "s1"), ("c2", "s2"), ("c1", "s2"), ("c3", "s1")] {
            assert_eq!(a.allows("out", c, s), b.allows("out", c, s));
        }
    }

    #[test]
    fn test_malformed_rule_rejects_table() {
        let result = RoutingFilter::new(vec![rule("c1", "s1", ""), rule("c2 ", "s1", "")]);
        match result {
            Err(ContractError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "connection_table[1].connection_id");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
