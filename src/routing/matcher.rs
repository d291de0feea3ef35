//! Rule matching logic.
//!
//! # Responsibilities
//! - Match a request path against path-prefix rules
//! - Resolve the rule bound to a dedicated listener port
//!
//! # Design Decisions
//! - First match in list order wins; no longest-prefix ordering
//! - Prefix match is a literal, case-sensitive `starts_with`
//! - No regex to guarantee O(n) matching

use crate::routing::rule::ProxyRule;

/// Matches the request path against a literal prefix.
#[derive(Debug, Clone, Copy)]
pub struct PathPrefixMatcher<'a> {
    prefix: &'a str,
}

impl<'a> PathPrefixMatcher<'a> {
    /// Build a matcher for a rule, if it carries a non-empty prefix.
    pub fn for_rule(rule: &'a ProxyRule) -> Option<Self> {
        rule.path_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|prefix| Self { prefix })
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.prefix)
    }
}

/// First rule (in list order) whose prefix is a literal prefix of `path`.
pub fn first_path_match<'a>(rules: &'a [ProxyRule], path: &str) -> Option<&'a ProxyRule> {
    rules.iter().find(|rule| {
        PathPrefixMatcher::for_rule(rule)
            .map(|m| m.matches(path))
            .unwrap_or(false)
    })
}

/// The rule bound to a dedicated listener port.
pub fn rule_for_port(rules: &[ProxyRule], port: u16) -> Option<&ProxyRule> {
    rules.iter().find(|rule| rule.port == Some(port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix_rule(id: &str, prefix: &str) -> ProxyRule {
        ProxyRule::with_prefix(prefix, "http://backend").id(id)
    }

    #[test]
    fn test_prefix_match() {
        let rules = vec![prefix_rule("api", "/api")];
        assert_eq!(first_path_match(&rules, "/api/users").map(|r| r.id.as_str()), Some("api"));
        assert_eq!(first_path_match(&rules, "/api").map(|r| r.id.as_str()), Some("api"));
        assert!(first_path_match(&rules, "/other").is_none());
        assert!(first_path_match(&rules, "/API/users").is_none());
    }

    #[test]
    fn test_first_match_depends_on_order() {
        let broad = prefix_rule("broad", "/api");
        let narrow = prefix_rule("narrow", "/api/v2");

        let rules = vec![broad.clone(), narrow.clone()];
        assert_eq!(first_path_match(&rules, "/api/v2/items").unwrap().id, "broad");

        let rules = vec![narrow, broad];
        assert_eq!(first_path_match(&rules, "/api/v2/items").unwrap().id, "narrow");
        assert_eq!(first_path_match(&rules, "/api/v1/items").unwrap().id, "broad");
    }

    #[test]
    fn test_port_rules_ignored_for_paths() {
        let rules = vec![ProxyRule::with_port(9000, "http://y").id("p")];
        assert!(first_path_match(&rules, "/anything").is_none());
        assert_eq!(rule_for_port(&rules, 9000).unwrap().id, "p");
        assert!(rule_for_port(&rules, 9001).is_none());
    }

    #[test]
    fn test_empty_prefix_never_matches() {
        let mut rule = prefix_rule("empty", "");
        rule.port = Some(9000);
        assert!(first_path_match(&[rule], "/").is_none());
    }
}
